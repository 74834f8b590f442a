//! Error taxonomy for the simulation core

use thiserror::Error;

/// Invalid configuration, rejected at construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("projectile pool capacity must be positive")]
    ZeroCapacity,
    #[error("projectile pool capacity {0} exceeds {}", crate::consts::MAX_BALLS)]
    TooManyBalls(usize),
    #[error("aim box half-width must be positive and finite")]
    BadAimBox,
    #[error("impulse damping must be positive and finite")]
    BadDamping,
    #[error("items per row must be positive")]
    ZeroItemsPerRow,
    #[error("item weight table is empty")]
    EmptyWeightTable,
}

/// Everything the core can report to its caller
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Persisted state could not be used. Callers recover by starting fresh.
    #[error("persisted state is corrupt: {0}")]
    StateCorruption(String),

    /// A programming bug. Fatal in debug builds, self-healed in release.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Aim point is not finite or lies outside the playfield
    #[error("aim point ({x}, {y}) is outside the playfield")]
    InvalidAim { x: f32, y: f32 },

    /// Aim point equals the origin and there is no previous direction to reuse
    #[error("aim point coincides with the launch origin")]
    DegenerateAim,

    /// The pool is mid-turn and cannot accept a new aim
    #[error("projectiles are not ready to fire")]
    NotReady,

    #[error("the game is over")]
    GameOver,
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::StateCorruption(err.to_string())
    }
}
