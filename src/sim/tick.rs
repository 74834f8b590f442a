//! Fixed-rate simulation tick
//!
//! The host calls [`tick`] once per frame with whatever input and collision
//! events arrived since the last call. Physics reports are applied before
//! player input, so a settle reported alongside an abort still counts as
//! having happened first. Removed items are then handed to the pool and the
//! pool advances one step.

use glam::Vec2;

use super::item::{Collected, ItemId};
use super::pool::{PoolCommand, ProjectileId, TurnPhase};
use super::state::{GameEvent, GameState};
use crate::error::SimError;

/// Player input, in the order it happened
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    AimBegin(Vec2),
    AimUpdate(Vec2),
    AimEnd(Vec2),
    /// Skip the rest of the volley and recall every projectile
    Abort,
    /// Fast-forward one step (up to 3x)
    SpeedUp,
}

/// Reports from the physics collaborator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhysicsEvent {
    /// A projectile touched the floor and stopped at `pos`
    Settled { projectile: ProjectileId, pos: Vec2 },
    /// A projectile struck a row item
    Hit { item: ItemId },
}

/// Everything that happened since the previous tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub input: Vec<InputEvent>,
    pub physics: Vec<PhysicsEvent>,
}

/// What the host must do and what it should know about
#[derive(Debug, Clone, Default)]
pub struct TickOutput {
    pub commands: Vec<PoolCommand>,
    pub events: Vec<GameEvent>,
    /// Input that was refused, with the reason
    pub rejected: Vec<SimError>,
}

/// Advance the game by one host tick
pub fn tick(state: &mut GameState, input: &TickInput) -> TickOutput {
    let mut out = TickOutput::default();
    if state.is_game_over() {
        return out;
    }

    for event in &input.physics {
        match *event {
            PhysicsEvent::Hit { item } => {
                if state.generator.apply_hit(item).is_none() {
                    log::debug!("Hit for unknown item {:?}", item);
                }
            }
            PhysicsEvent::Settled { projectile, pos } => {
                state.pool.on_settled(projectile, pos);
            }
        }
    }

    for event in &input.input {
        let result = match *event {
            InputEvent::AimBegin(point) | InputEvent::AimUpdate(point) => state.aim_update(point),
            InputEvent::AimEnd(point) => state.aim_end(point),
            InputEvent::Abort => {
                out.commands.extend(state.pool.return_all());
                Ok(())
            }
            InputEvent::SpeedUp => {
                state.pool.speed_up();
                Ok(())
            }
        };
        if let Err(err) = result {
            log::debug!("Input {:?} rejected: {}", event, err);
            out.rejected.push(err);
        }
    }

    for item in state.generator.collect_removable_items() {
        let event = match item.on_collect() {
            Some(Collected::Block { pos }) => GameEvent::BlockDestroyed { item: item.id, pos },
            Some(Collected::Ball { pos }) => GameEvent::BallCollected {
                item: item.id,
                projectile: state.pool.add_converted(pos),
                pos,
            },
            Some(Collected::Currency { pos }) => GameEvent::CurrencyCollected { item: item.id, pos },
            None => continue,
        };
        out.events.push(event);
    }

    let closing = state.pool.phase() == TurnPhase::Settled;
    out.commands.extend(state.pool.tick());
    if closing {
        state.open_turn(&mut out.events);
    }

    out
}
