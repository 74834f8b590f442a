//! Ballz headless runner
//!
//! Plays a seeded game against a toy physics stand-in: every launched ball
//! strikes a few random items, then lands somewhere on the floor. Useful for
//! eyeballing turn flow in the logs (`RUST_LOG=debug`).

#[cfg(not(target_arch = "wasm32"))]
use std::collections::VecDeque;

#[cfg(not(target_arch = "wasm32"))]
use glam::Vec2;
#[cfg(not(target_arch = "wasm32"))]
use rand::{Rng, SeedableRng};
#[cfg(not(target_arch = "wasm32"))]
use rand_pcg::Pcg32;

#[cfg(not(target_arch = "wasm32"))]
use ballz::persistence;
#[cfg(not(target_arch = "wasm32"))]
use ballz::sim::{
    GameState, InputEvent, PhysicsEvent, PoolCommand, ProjectileId, TickInput, TurnPhase, tick,
};
#[cfg(not(target_arch = "wasm32"))]
use ballz::{Scoreboard, Settings};

#[cfg(not(target_arch = "wasm32"))]
/// Ticks a launched ball spends in the air
const FLIGHT_TICKS: u32 = 40;
#[cfg(not(target_arch = "wasm32"))]
/// Give up after this many turns
const MAX_TURNS: u32 = 200;

#[cfg(not(target_arch = "wasm32"))]
/// A ball in the air: id and ticks until it lands
struct Flight {
    id: ProjectileId,
    ticks_left: u32,
}

#[cfg(not(target_arch = "wasm32"))]
/// Stand-in for the physics engine
struct ToyPhysics {
    rng: Pcg32,
    flights: VecDeque<Flight>,
}

#[cfg(not(target_arch = "wasm32"))]
impl ToyPhysics {
    fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            flights: VecDeque::new(),
        }
    }

    fn apply(&mut self, commands: &[PoolCommand]) {
        for command in commands {
            match *command {
                PoolCommand::Launch { id, .. } => self.flights.push_back(Flight {
                    id,
                    ticks_left: FLIGHT_TICKS,
                }),
                PoolCommand::MoveTo { id, .. } => self.flights.retain(|f| f.id != id),
            }
        }
    }

    fn step(&mut self, state: &GameState) -> Vec<PhysicsEvent> {
        let targets: Vec<_> = state
            .generator
            .items()
            .filter(|i| !i.is_spacer())
            .map(|i| i.id)
            .collect();
        let mut events = Vec::new();
        for flight in &mut self.flights {
            flight.ticks_left -= 1;
            if !targets.is_empty() && self.rng.random_bool(0.1) {
                let item = targets[self.rng.random_range(0..targets.len())];
                events.push(PhysicsEvent::Hit { item });
            }
            if flight.ticks_left == 0 {
                let x = self.rng.random_range(10.0..360.0);
                events.push(PhysicsEvent::Settled {
                    projectile: flight.id,
                    pos: Vec2::new(x, state.settings.floor_y),
                });
            }
        }
        self.flights.retain(|f| f.ticks_left > 0);
        events
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Ballz headless run starting...");

    let seed = 2024;
    let mut state = match GameState::new(seed, Settings::default()) {
        Ok(state) => state,
        Err(err) => {
            log::error!("Could not start game: {err}");
            return;
        }
    };
    let mut physics = ToyPhysics::new(seed ^ 0x5eed);
    let mut scores = Scoreboard::new();
    let mut aim_rng = Pcg32::seed_from_u64(seed.wrapping_mul(31));

    while !state.is_game_over() && state.turn < MAX_TURNS {
        let mut input = TickInput::default();

        if state.pool.phase() == TurnPhase::Ready {
            // save and restore mid-run, like an app being suspended
            if state.turn % 10 == 0 {
                if let Ok(blob) = persistence::save(&state) {
                    match persistence::restore_or_default(Some(blob.as_slice()), seed, Settings::default()) {
                        Ok(restored) => state = restored,
                        Err(err) => log::error!("Restore failed: {err}"),
                    }
                }
            }
            let origin = state.pool.origin();
            let aim = origin + Vec2::new(aim_rng.random_range(-150.0..150.0), 200.0);
            input.input.push(InputEvent::AimBegin(aim));
            input.input.push(InputEvent::AimEnd(aim));
        }
        input.physics = physics.step(&state);

        let out = tick(&mut state, &input);
        physics.apply(&out.commands);
        for event in &out.events {
            scores.record(event);
        }
        for err in &out.rejected {
            log::warn!("Rejected: {err}");
        }
    }

    log::info!(
        "Finished: turn {}, balls {}, best {}, currency {}",
        state.turn,
        state.pool.capacity(),
        scores.best,
        scores.currency
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The headless runner is native only; wasm hosts drive `sim::tick` themselves.
}
