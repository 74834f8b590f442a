//! Save/load persistence
//!
//! Features:
//! - Versioned JSON envelope
//! - Pool and generator snapshots only; the turn phase is never saved
//! - Corruption detection with fallback to a fresh game
//!
//! Where the bytes live is up to the host.

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::settings::Settings;
use crate::sim::{BallManager, GameState, GeneratorSnapshot, ItemGenerator, PoolSnapshot, RngState};

/// Current save format version
pub const SAVE_VERSION: u32 = 1;

/// Everything needed to resume a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveEnvelope {
    pub version: u32,
    pub rng: RngState,
    pub turn: u32,
    pub pool: PoolSnapshot,
    pub generator: GeneratorSnapshot,
}

impl SaveEnvelope {
    pub fn capture(state: &GameState) -> Self {
        Self {
            version: SAVE_VERSION,
            rng: state.rng_state(),
            turn: state.turn,
            pool: state.pool.snapshot(),
            generator: state.generator.snapshot(),
        }
    }
}

/// Serialize a running game
pub fn save(state: &GameState) -> Result<Vec<u8>, SimError> {
    let blob = serde_json::to_vec(&SaveEnvelope::capture(state))?;
    log::info!("Saved turn {} ({} bytes)", state.turn, blob.len());
    Ok(blob)
}

/// Parse and version-check a save blob
pub fn load(blob: &[u8]) -> Result<SaveEnvelope, SimError> {
    let envelope: SaveEnvelope = serde_json::from_slice(blob)?;
    if envelope.version != SAVE_VERSION {
        return Err(SimError::StateCorruption(format!(
            "unsupported save version {}",
            envelope.version
        )));
    }
    Ok(envelope)
}

/// Rebuild a game from a save blob
pub fn restore(blob: &[u8], settings: Settings) -> Result<GameState, SimError> {
    let envelope = load(blob)?;
    let generator = ItemGenerator::from_snapshot(&settings, &envelope.generator)?;
    let pool = BallManager::with_state(&settings, envelope.pool).map_err(|err| match err {
        SimError::Config(err) => SimError::StateCorruption(err.to_string()),
        other => other,
    })?;
    log::info!(
        "Restored turn {} with {} balls",
        envelope.turn,
        envelope.pool.capacity
    );
    Ok(GameState::from_parts(
        settings,
        envelope.rng,
        envelope.turn,
        generator,
        pool,
    ))
}

/// Restore a saved game, or start a fresh one if there is no usable save
///
/// Only a bad `settings` is an error; a bad save never is.
pub fn restore_or_default(blob: Option<&[u8]>, seed: u64, settings: Settings) -> Result<GameState, SimError> {
    settings.validate()?;
    if let Some(blob) = blob {
        match restore(blob, settings.clone()) {
            Ok(state) => return Ok(state),
            Err(err) => log::warn!("Discarding saved game: {err}"),
        }
    }
    GameState::new(seed, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ItemKind;
    use glam::Vec2;

    fn layout(state: &GameState) -> Vec<Vec<(ItemKind, u32)>> {
        state
            .generator
            .rows()
            .iter()
            .map(|row| row.iter().map(|i| (i.kind(), i.hit_count())).collect())
            .collect()
    }

    fn game_with_rows(seed: u64, rows: usize) -> GameState {
        let mut state = GameState::new(seed, Settings::default()).unwrap();
        let mut events = Vec::new();
        while state.generator.row_count() < rows {
            state.open_turn(&mut events);
        }
        state
    }

    #[test]
    fn test_save_load_roundtrip() {
        let _ = env_logger::builder().is_test(true).try_init();
        let state = game_with_rows(31337, 3);
        assert!(state
            .generator
            .items()
            .any(|i| i.kind() == ItemKind::HitBlock));

        let blob = save(&state).unwrap();
        let restored = restore(&blob, Settings::default()).unwrap();

        assert_eq!(layout(&restored), layout(&state));
        assert_eq!(restored.turn, state.turn);
        assert_eq!(restored.pool.snapshot(), state.pool.snapshot());
        assert_eq!(restored.generator.max_hit_count(), state.generator.max_hit_count());
        assert!(restored.pool.is_ready());
    }

    #[test]
    fn test_restore_keeps_empty_rows_above_live_rows() {
        let mut state = game_with_rows(8, 3);
        // empty the middle row in place
        let ids: Vec<_> = state.generator.rows()[1]
            .iter()
            .filter(|i| !i.is_spacer())
            .map(|i| (i.id, i.hit_count().max(1)))
            .collect();
        for (id, hits) in ids {
            for _ in 0..hits {
                state.generator.apply_hit(id);
            }
        }
        state.generator.collect_removable_items();

        let blob = save(&state).unwrap();
        let restored = restore(&blob, Settings::default()).unwrap();
        assert_eq!(layout(&restored), layout(&state));
        let positions = |s: &GameState| s.generator.items().map(|i| i.pos).collect::<Vec<Vec2>>();
        assert_eq!(positions(&restored), positions(&state));
    }

    #[test]
    fn test_garbage_falls_back_to_fresh_game() {
        let state = restore_or_default(Some(b"definitely not json".as_slice()), 4, Settings::default()).unwrap();
        assert_eq!(state.turn, 1);
        assert_eq!(state.pool.capacity(), Settings::default().number_of_balls);
    }

    #[test]
    fn test_unknown_kind_falls_back_to_fresh_game() {
        let state = game_with_rows(12, 2);
        let mut envelope = SaveEnvelope::capture(&state);
        envelope.generator.row_kinds[0][0] = 200;
        let blob = serde_json::to_vec(&envelope).unwrap();

        assert!(matches!(
            restore(&blob, Settings::default()),
            Err(SimError::StateCorruption(_))
        ));
        let fresh = restore_or_default(Some(blob.as_slice()), 4, Settings::default()).unwrap();
        assert_eq!(fresh.turn, 1);
    }

    #[test]
    fn test_zero_capacity_save_is_corrupt() {
        let state = game_with_rows(12, 1);
        let mut envelope = SaveEnvelope::capture(&state);
        envelope.pool.capacity = 0;
        let blob = serde_json::to_vec(&envelope).unwrap();
        assert!(matches!(
            restore(&blob, Settings::default()),
            Err(SimError::StateCorruption(_))
        ));
    }

    #[test]
    fn test_oversized_capacity_falls_back_to_fresh_game() {
        let state = game_with_rows(12, 1);
        let mut envelope = SaveEnvelope::capture(&state);
        envelope.pool.capacity = 1usize << 32;
        let blob = serde_json::to_vec(&envelope).unwrap();
        assert!(matches!(
            restore(&blob, Settings::default()),
            Err(SimError::StateCorruption(_))
        ));
        let fresh = restore_or_default(Some(blob.as_slice()), 4, Settings::default()).unwrap();
        assert_eq!(fresh.pool.capacity(), Settings::default().number_of_balls);
    }

    #[test]
    fn test_overflowing_weights_fall_back_to_fresh_game() {
        let state = game_with_rows(12, 2);
        let mut envelope = SaveEnvelope::capture(&state);
        envelope.generator.item_weights.insert(ItemKind::HitBlock, u32::MAX);
        let blob = serde_json::to_vec(&envelope).unwrap();
        let fresh = restore_or_default(Some(blob.as_slice()), 4, Settings::default()).unwrap();
        assert_eq!(fresh.turn, 1);
    }

    #[test]
    fn test_wrong_version_rejected() {
        let state = game_with_rows(12, 1);
        let mut envelope = SaveEnvelope::capture(&state);
        envelope.version = 99;
        let blob = serde_json::to_vec(&envelope).unwrap();
        assert!(load(&blob).is_err());
    }

    #[test]
    fn test_no_save_starts_fresh() {
        let state = restore_or_default(None, 4, Settings::default()).unwrap();
        assert_eq!(state.turn, 1);
    }
}
