//! Game state and turn bookkeeping
//!
//! Ties the row generator and the projectile pool together. The two never
//! reference each other; everything that crosses over goes through here.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::generator::ItemGenerator;
use super::item::ItemId;
use super::pool::{BallManager, ProjectileId};
use super::trajectory::project_to_box;
use crate::error::SimError;
use crate::settings::Settings;

/// Whether the run is still going
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    /// No further row can be placed
    GameOver,
}

/// Notifications for the view, scoring and reward collaborators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    /// A turn opened and a new row was placed on top
    TurnStarted { turn: u32 },
    /// A hit block broke
    BlockDestroyed { item: ItemId, pos: Vec2 },
    /// A ball item was collected and will join the pool
    BallCollected { item: ItemId, projectile: ProjectileId, pos: Vec2 },
    /// A currency item was collected
    CurrencyCollected { item: ItemId, pos: Vec2 },
    /// Rows reached the floor
    GameOver { turn: u32 },
}

/// RNG state wrapper for serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    pub fn to_rng(&self) -> Pcg32 {
        if self.stream == 0 {
            Pcg32::seed_from_u64(self.seed)
        } else {
            Pcg32::new(self.seed, self.stream)
        }
    }
}

/// Complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// Turns opened so far (also the score)
    pub turn: u32,
    pub phase: GamePhase,
    pub generator: ItemGenerator,
    pub pool: BallManager,
    pub settings: Settings,
    /// Aim guide segment (origin, end) while the player is aiming
    pub aim_guide: Option<(Vec2, Vec2)>,
    rng: Pcg32,
}

impl GameState {
    /// Start a new run and open its first turn
    pub fn new(seed: u64, settings: Settings) -> Result<Self, SimError> {
        settings.validate()?;
        let generator = ItemGenerator::new(&settings)?;
        let pool = BallManager::new(&settings)?;
        let mut state = Self::from_parts(settings, RngState::new(seed), 0, generator, pool);
        let mut events = Vec::new();
        state.open_turn(&mut events);
        log::info!("New game (seed {seed})");
        Ok(state)
    }

    /// Assemble a state from restored pieces
    pub fn from_parts(
        settings: Settings,
        rng_state: RngState,
        turn: u32,
        generator: ItemGenerator,
        pool: BallManager,
    ) -> Self {
        let mut state = Self {
            seed: rng_state.seed,
            turn,
            phase: GamePhase::Playing,
            generator,
            pool,
            settings,
            aim_guide: None,
            rng: rng_state.to_rng(),
        };
        if turn > 0 && !state.room_for_next_row() {
            state.phase = GamePhase::GameOver;
        }
        state
    }

    /// Stream is keyed on the turn so a restored run replays identically
    pub fn rng_state(&self) -> RngState {
        RngState {
            seed: self.seed,
            stream: self.turn as u64,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    /// Show (or move) the aim guide
    pub fn aim_update(&mut self, point: Vec2) -> Result<(), SimError> {
        self.check_aim(point)?;
        let origin = self.pool.origin();
        self.aim_guide = project_to_box(origin, point, self.settings.aim_guide_reach)
            .map(|end| (origin, end));
        Ok(())
    }

    /// Release the aim and start firing
    pub fn aim_end(&mut self, point: Vec2) -> Result<(), SimError> {
        self.aim_guide = None;
        self.check_aim(point)?;
        self.pool.fire(point)?;
        self.generator.reveal_all();
        Ok(())
    }

    /// Generate the next row and check whether the one after it still fits
    pub fn open_turn(&mut self, events: &mut Vec<GameEvent>) {
        if self.is_game_over() {
            return;
        }
        self.turn += 1;
        self.generator.generate_row(&mut self.rng);
        log::info!(
            "Turn {} opened: {} rows, {} items, {} balls",
            self.turn,
            self.generator.row_count(),
            self.generator.item_count(),
            self.pool.capacity()
        );
        events.push(GameEvent::TurnStarted { turn: self.turn });

        if !self.room_for_next_row() {
            self.phase = GamePhase::GameOver;
            log::info!("Game over after {} turns", self.turn);
            events.push(GameEvent::GameOver { turn: self.turn });
        }
    }

    fn room_for_next_row(&self) -> bool {
        self.generator.can_place_row(
            self.settings.floor_y,
            self.settings.layout.row_height,
            self.settings.lookahead_rows,
        )
    }

    fn check_aim(&self, point: Vec2) -> Result<(), SimError> {
        if self.is_game_over() {
            return Err(SimError::GameOver);
        }
        if !self.pool.is_ready() {
            return Err(SimError::NotReady);
        }
        if !self.settings.in_playfield(point) {
            log::warn!("Rejected aim at ({}, {})", point.x, point.y);
            return Err(SimError::InvalidAim {
                x: point.x,
                y: point.y,
            });
        }
        Ok(())
    }
}
