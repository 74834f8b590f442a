//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Driven by the host's fixed tick only
//! - Seeded RNG only
//! - Stable iteration order (rows oldest first, pool by projectile id)
//! - No rendering or physics dependencies

pub mod generator;
pub mod item;
pub mod pool;
pub mod state;
pub mod tick;
pub mod trajectory;

pub use generator::{GeneratorSnapshot, HitReport, ItemGenerator};
pub use item::{Collected, HitEffect, Item, ItemBody, ItemId, ItemKind};
pub use pool::{BallManager, PoolCommand, PoolSnapshot, Projectile, ProjectileId, TurnPhase};
pub use state::{GameEvent, GamePhase, GameState, RngState};
pub use tick::{InputEvent, PhysicsEvent, TickInput, TickOutput, tick};
pub use trajectory::{TrajectoryProjector, project_to_box};
