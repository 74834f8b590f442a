//! Ballz - turn-based simulation core for a ball-launching brick breaker
//!
//! Core modules:
//! - `sim`: Deterministic simulation (turn state machine, rows of items, trajectory math)
//! - `persistence`: Snapshot/restore with fallback to a fresh game
//! - `settings`: Data-driven game configuration
//! - `score`: Default scoring/reward collaborator
//!
//! Nothing here draws. The host owns rendering and physics and talks to the
//! core through [`sim::tick`] and the events/commands it returns.

pub mod error;
pub mod persistence;
pub mod score;
pub mod settings;
pub mod sim;

pub use error::{ConfigError, SimError};
pub use score::Scoreboard;
pub use settings::{RowLayout, Settings, SpeedPreset};

/// Game configuration constants
pub mod consts {
    /// Slots per row
    pub const ITEMS_PER_ROW: usize = 8;
    /// Projectiles a new game starts with
    pub const STARTING_BALLS: usize = 10;
    /// Largest pool a game may be configured or restored with
    pub const MAX_BALLS: usize = 10_000;
    /// Starting ceiling for generated hit block counts
    pub const STARTING_MAX_HIT_COUNT: u32 = 10;
    /// How much `max_hit_count` grows whenever a ball item is struck
    pub const BALL_HIT_BONUS: u32 = 2;

    /// Slot roll is drawn from 1..=100; at or above this the slot stays empty
    pub const SPACER_ROLL_THRESHOLD: u32 = 60;

    /// Default item weights (percent)
    pub const HIT_BLOCK_WEIGHT: u32 = 65;
    pub const BALL_WEIGHT: u32 = 25;
    pub const CURRENCY_WEIGHT: u32 = 10;

    /// Half-width of the box the aim line is projected onto
    pub const AIM_BOX_HALF_WIDTH: f32 = 20.0;
    /// Divisor turning the projected box offset into an impulse
    pub const IMPULSE_DAMPING: f32 = 5.0;
    /// Reach of the on-screen aim guide
    pub const AIM_GUIDE_REACH: f32 = 200.0;

    /// Ticks between two launches at normal speed
    pub const SHOT_DELAY_TICKS: u32 = 6;
}
