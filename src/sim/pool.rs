//! Projectile pool and the per-turn state machine
//!
//! Ready -> Firing -> Draining -> Settled -> Ready
//!
//! The pool never moves anything itself. Every step returns [`PoolCommand`]s
//! that the host applies to its physics bodies, and the host reports back
//! through [`BallManager::on_settled`].

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::trajectory::TrajectoryProjector;
use crate::consts::MAX_BALLS;
use crate::error::{ConfigError, SimError};
use crate::settings::{Settings, SpeedPreset};

/// Identifier of a pool projectile (1-based, by position in the pool)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectileId(pub u32);

/// Turn phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    /// All projectiles at rest at the origin, waiting for aim
    Ready,
    /// Launching one projectile per shot interval
    Firing,
    /// Everything launched, waiting for projectiles to settle
    Draining,
    /// All at rest; the next tick merges converted balls and reopens
    Settled,
}

/// Side effects for the host to carry out
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoolCommand {
    /// Apply `impulse` to a projectile sitting at the origin
    Launch { id: ProjectileId, impulse: Vec2 },
    /// Stop the projectile's physics and move it to `target`
    MoveTo { id: ProjectileId, target: Vec2 },
}

/// A pool member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: ProjectileId,
    pub pos: Vec2,
    pub resting: bool,
}

impl Projectile {
    fn new(id: u32, pos: Vec2) -> Self {
        Self {
            id: ProjectileId(id),
            pos,
            resting: true,
        }
    }
}

/// Persisted pool state (the turn phase always restores to Ready)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub capacity: usize,
    pub origin: Vec2,
}

/// Owns the projectiles and runs the turn
#[derive(Debug, Clone)]
pub struct BallManager {
    balls: Vec<Projectile>,
    /// Converted from ball items this turn, merged when the turn settles
    pending: Vec<Projectile>,
    /// Projectiles that settled this turn, oldest first
    settled: VecDeque<ProjectileId>,
    active_count: usize,
    origin: Vec2,
    phase: TurnPhase,
    aim: Option<Vec2>,
    last_impulse: Option<Vec2>,
    origin_recomputed: bool,
    aborted: bool,
    shot_ticks: u32,
    shot_delay: u32,
    speed: SpeedPreset,
    floor_y: f32,
    projector: TrajectoryProjector,
    prev_turn: Option<PoolSnapshot>,
}

impl BallManager {
    pub fn new(settings: &Settings) -> Result<Self, SimError> {
        Self::with_state(
            settings,
            PoolSnapshot {
                capacity: settings.number_of_balls,
                origin: settings.start_origin,
            },
        )
    }

    /// Rebuild a pool from persisted state, always in `Ready`
    pub fn with_state(settings: &Settings, snapshot: PoolSnapshot) -> Result<Self, SimError> {
        if snapshot.capacity == 0 {
            return Err(ConfigError::ZeroCapacity.into());
        }
        if snapshot.capacity > MAX_BALLS {
            return Err(ConfigError::TooManyBalls(snapshot.capacity).into());
        }
        if !snapshot.origin.is_finite() {
            return Err(SimError::StateCorruption("origin is not finite".into()));
        }

        let balls = (1..=snapshot.capacity as u32)
            .map(|i| Projectile::new(i, snapshot.origin))
            .collect();

        Ok(Self {
            balls,
            pending: Vec::new(),
            settled: VecDeque::new(),
            active_count: 0,
            origin: snapshot.origin,
            phase: TurnPhase::Ready,
            aim: None,
            last_impulse: None,
            origin_recomputed: false,
            aborted: false,
            shot_ticks: 0,
            shot_delay: settings.shot_delay_ticks,
            speed: SpeedPreset::Normal,
            floor_y: settings.floor_y,
            projector: TrajectoryProjector::new(settings.aim_box_half_width, settings.impulse_damping),
            prev_turn: None,
        })
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            capacity: self.capacity(),
            origin: self.origin,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == TurnPhase::Ready
    }

    pub fn capacity(&self) -> usize {
        self.balls.len()
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Projectiles not yet launched this turn
    pub fn resting_count(&self) -> usize {
        self.capacity() - self.active_count
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn aim(&self) -> Option<Vec2> {
        self.aim
    }

    pub fn speed(&self) -> SpeedPreset {
        self.speed
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.balls
    }

    pub fn pending(&self) -> &[Projectile] {
        &self.pending
    }

    pub fn projector(&self) -> &TrajectoryProjector {
        &self.projector
    }

    /// Start a turn aimed at `aim`
    ///
    /// An aim on the origin reuses the previous turn's impulse; with no
    /// previous turn it is rejected.
    pub fn fire(&mut self, aim: Vec2) -> Result<(), SimError> {
        if self.phase != TurnPhase::Ready {
            return Err(SimError::NotReady);
        }
        if !aim.is_finite() {
            return Err(SimError::InvalidAim { x: aim.x, y: aim.y });
        }
        let impulse = match self.projector.impulse(self.origin, aim) {
            Some(impulse) => impulse,
            None => self.last_impulse.ok_or(SimError::DegenerateAim)?,
        };

        self.save_turn_state();
        self.last_impulse = Some(impulse);
        self.aim = Some(aim);
        self.settled.clear();
        self.shot_ticks = 0;
        self.phase = TurnPhase::Firing;
        log::info!(
            "Firing {} balls from ({:.1}, {:.1}) toward ({:.1}, {:.1})",
            self.capacity(),
            self.origin.x,
            self.origin.y,
            aim.x,
            aim.y
        );
        Ok(())
    }

    /// Recall everything to the origin and stop launching
    pub fn return_all(&mut self) -> Vec<PoolCommand> {
        if !matches!(self.phase, TurnPhase::Firing | TurnPhase::Draining) {
            return Vec::new();
        }
        self.aborted = true;
        // A settle queued before the recall still picks the origin; nothing
        // after the recall may move it.
        if let Some(&first) = self.settled.front() {
            self.recompute_origin(first);
        }
        self.origin_recomputed = true;

        let origin = self.origin;
        self.balls
            .iter_mut()
            .map(|ball| {
                ball.resting = true;
                ball.pos = origin;
                PoolCommand::MoveTo {
                    id: ball.id,
                    target: origin,
                }
            })
            .collect()
    }

    /// Step up the fast-forward level
    pub fn speed_up(&mut self) -> SpeedPreset {
        if matches!(self.phase, TurnPhase::Firing | TurnPhase::Draining) {
            self.speed = self.speed.faster();
            log::info!("Speeding up to {}", self.speed.as_str());
        }
        self.speed
    }

    /// A projectile came to rest at `pos`
    ///
    /// Returns false when the event was ignored (unknown id, or the
    /// projectile was not in flight).
    pub fn on_settled(&mut self, id: ProjectileId, pos: Vec2) -> bool {
        let Some(ball) = self.balls.iter_mut().find(|b| b.id == id) else {
            log::warn!("Settle event for unknown projectile {:?}", id);
            return false;
        };
        if ball.resting {
            log::debug!("Ignoring settle for resting projectile {:?}", id);
            return false;
        }
        ball.resting = true;
        ball.pos = pos;
        self.settled.push_back(id);
        true
    }

    /// Queue a ball converted from a row item; it joins when the turn settles
    pub fn add_converted(&mut self, pos: Vec2) -> ProjectileId {
        let id = (self.balls.len() + self.pending.len() + 1) as u32;
        let ball = Projectile::new(id, Vec2::new(pos.x, self.floor_y));
        let id = ball.id;
        self.pending.push(ball);
        id
    }

    /// Advance the turn by one host tick
    pub fn tick(&mut self) -> Vec<PoolCommand> {
        let mut commands = Vec::new();
        match self.phase {
            TurnPhase::Ready => {}
            TurnPhase::Firing => {
                self.drain_one(&mut commands);
                if self.aborted || self.active_count >= self.capacity() {
                    self.phase = TurnPhase::Draining;
                } else if self.shot_ticks >= self.speed.shot_delay(self.shot_delay) {
                    self.launch_next(&mut commands);
                    self.shot_ticks = 0;
                } else {
                    self.shot_ticks += 1;
                }
            }
            TurnPhase::Draining => {
                self.drain_one(&mut commands);
                if self.settled.is_empty() && self.balls.iter().all(|b| b.resting) {
                    self.phase = TurnPhase::Settled;
                }
            }
            TurnPhase::Settled => {
                self.merge_pending(&mut commands);
                self.active_count = 0;
                self.aborted = false;
                self.origin_recomputed = false;
                self.speed = SpeedPreset::Normal;
                self.aim = None;
                self.phase = TurnPhase::Ready;
                log::info!("Turn settled with {} balls", self.capacity());
            }
        }
        commands
    }

    /// Remember capacity and origin at the start of a turn
    pub fn save_turn_state(&mut self) {
        self.prev_turn = Some(self.snapshot());
    }

    /// Undo back to the last saved turn start, once
    pub fn restore_previous_turn(&mut self) -> bool {
        if self.phase != TurnPhase::Ready {
            return false;
        }
        let Some(prev) = self.prev_turn.take() else {
            return false;
        };
        self.balls.truncate(prev.capacity);
        self.pending.clear();
        self.origin = prev.origin;
        for ball in &mut self.balls {
            ball.pos = prev.origin;
            ball.resting = true;
        }
        log::info!("Restored previous turn: {} balls", prev.capacity);
        true
    }

    fn launch_next(&mut self, commands: &mut Vec<PoolCommand>) {
        let Some(impulse) = self.last_impulse else {
            return;
        };
        let ball = &mut self.balls[self.active_count];
        ball.resting = false;
        commands.push(PoolCommand::Launch {
            id: ball.id,
            impulse,
        });
        self.active_count += 1;
    }

    fn drain_one(&mut self, commands: &mut Vec<PoolCommand>) {
        let Some(id) = self.settled.pop_front() else {
            return;
        };
        self.recompute_origin(id);
        let origin = self.origin;
        if let Some(ball) = self.balls.iter_mut().find(|b| b.id == id) {
            ball.pos = origin;
        }
        commands.push(PoolCommand::MoveTo { id, target: origin });
    }

    /// The first settle of a turn becomes the next origin, clamped to the floor
    fn recompute_origin(&mut self, id: ProjectileId) {
        if self.origin_recomputed {
            return;
        }
        self.origin_recomputed = true;
        if let Some(ball) = self.balls.iter().find(|b| b.id == id) {
            let mut origin = ball.pos;
            if origin.y > self.floor_y {
                origin.y = self.floor_y;
            }
            self.origin = origin;
            log::debug!("New origin ({:.1}, {:.1})", origin.x, origin.y);
        }
    }

    fn merge_pending(&mut self, commands: &mut Vec<PoolCommand>) {
        let origin = self.origin;
        for mut ball in self.pending.drain(..) {
            ball.id = ProjectileId(self.balls.len() as u32 + 1);
            ball.pos = origin;
            ball.resting = true;
            commands.push(PoolCommand::MoveTo {
                id: ball.id,
                target: origin,
            });
            self.balls.push(ball);
        }
    }
}
