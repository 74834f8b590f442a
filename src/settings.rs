//! Game settings and tuning
//!
//! Everything the core needs to know about the playfield and the balance
//! knobs. Loaded from JSON by the host, defaults match the shipped game.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{ConfigError, SimError};
use crate::sim::ItemKind;

/// Fast-forward levels for the firing cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpeedPreset {
    #[default]
    Normal,
    Double,
    Triple,
}

impl SpeedPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedPreset::Normal => "1x",
            SpeedPreset::Double => "2x",
            SpeedPreset::Triple => "3x",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "1x" | "normal" => Some(SpeedPreset::Normal),
            "2x" | "double" => Some(SpeedPreset::Double),
            "3x" | "triple" => Some(SpeedPreset::Triple),
            _ => None,
        }
    }

    /// Speed multiplier applied by the host to its physics step
    pub fn multiplier(&self) -> u32 {
        match self {
            SpeedPreset::Normal => 1,
            SpeedPreset::Double => 2,
            SpeedPreset::Triple => 3,
        }
    }

    /// Ticks between launches for a given base delay (6 -> 3 -> 1)
    pub fn shot_delay(&self, base: u32) -> u32 {
        match self {
            SpeedPreset::Normal => base,
            SpeedPreset::Double => base / 2,
            SpeedPreset::Triple => base / 6,
        }
    }

    /// Next faster preset, saturating at 3x
    pub fn faster(&self) -> Self {
        match self {
            SpeedPreset::Normal => SpeedPreset::Double,
            SpeedPreset::Double | SpeedPreset::Triple => SpeedPreset::Triple,
        }
    }
}

/// Where rows sit in world space (y grows upward, floor at the bottom)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowLayout {
    /// x of the left edge of slot 0
    pub left: f32,
    /// Width of one slot
    pub slot_width: f32,
    /// Center line of the newest row
    pub top: f32,
    /// Vertical distance between two rows
    pub row_height: f32,
}

impl Default for RowLayout {
    fn default() -> Self {
        Self {
            left: 0.0,
            slot_width: 46.0,
            top: 560.0,
            row_height: 46.0,
        }
    }
}

impl RowLayout {
    /// Center of a slot, for row `row` of `row_count` (row 0 nearest the floor)
    pub fn slot_center(&self, row: usize, row_count: usize, slot: usize) -> Vec2 {
        let rows_below_top = row_count.saturating_sub(1 + row) as f32;
        Vec2::new(
            self.left + self.slot_width * (slot as f32 + 0.5),
            self.top - self.row_height * rows_below_top,
        )
    }
}

/// Game settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // === Pool ===
    /// Projectiles the pool starts with
    pub number_of_balls: usize,
    /// Half-width of the aim projection box
    pub aim_box_half_width: f32,
    /// Divisor applied to the projected offset to get an impulse
    pub impulse_damping: f32,
    /// Reach of the aim guide shown while aiming
    pub aim_guide_reach: f32,
    /// Ticks between launches at normal speed
    pub shot_delay_ticks: u32,

    // === Rows ===
    /// Slots per row
    pub items_per_row: usize,
    /// Starting ceiling for hit block counts
    pub max_hit_count: u32,
    /// Initial item weights
    pub item_weights: BTreeMap<ItemKind, u32>,
    /// Rows placement
    pub layout: RowLayout,
    /// Rows of headroom the next row needs before the game ends
    pub lookahead_rows: u32,

    // === Playfield ===
    /// Floor line: projectiles rest on it, items must stay above it
    pub floor_y: f32,
    /// Ceiling line: aim points must be below it
    pub ceiling_y: f32,
    /// Initial launch point
    pub start_origin: Vec2,
}

impl Default for Settings {
    fn default() -> Self {
        let mut item_weights = BTreeMap::new();
        item_weights.insert(ItemKind::HitBlock, HIT_BLOCK_WEIGHT);
        item_weights.insert(ItemKind::Ball, BALL_WEIGHT);
        item_weights.insert(ItemKind::Currency, CURRENCY_WEIGHT);

        Self {
            number_of_balls: STARTING_BALLS,
            aim_box_half_width: AIM_BOX_HALF_WIDTH,
            impulse_damping: IMPULSE_DAMPING,
            aim_guide_reach: AIM_GUIDE_REACH,
            shot_delay_ticks: SHOT_DELAY_TICKS,

            items_per_row: ITEMS_PER_ROW,
            max_hit_count: STARTING_MAX_HIT_COUNT,
            item_weights,
            layout: RowLayout::default(),
            lookahead_rows: 1,

            floor_y: 60.0,
            ceiling_y: 600.0,
            start_origin: Vec2::new(184.0, 60.0),
        }
    }
}

impl Settings {
    /// Parse settings from JSON
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to JSON
    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configurations the core cannot run with
    pub fn validate(&self) -> Result<(), SimError> {
        if self.number_of_balls == 0 {
            return Err(ConfigError::ZeroCapacity.into());
        }
        if self.number_of_balls > MAX_BALLS {
            return Err(ConfigError::TooManyBalls(self.number_of_balls).into());
        }
        if !(self.aim_box_half_width.is_finite() && self.aim_box_half_width > 0.0) {
            return Err(ConfigError::BadAimBox.into());
        }
        if !(self.impulse_damping.is_finite() && self.impulse_damping > 0.0) {
            return Err(ConfigError::BadDamping.into());
        }
        if self.items_per_row == 0 {
            return Err(ConfigError::ZeroItemsPerRow.into());
        }
        if self.item_weights.values().all(|&w| w == 0) {
            return Err(ConfigError::EmptyWeightTable.into());
        }
        Ok(())
    }

    /// True if `point` lies strictly between floor and ceiling
    pub fn in_playfield(&self, point: Vec2) -> bool {
        point.is_finite() && point.y > self.floor_y && point.y < self.ceiling_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let mut settings = Settings::default();
        settings.number_of_balls = 0;
        assert_eq!(
            settings.validate(),
            Err(SimError::Config(ConfigError::ZeroCapacity))
        );

        let mut settings = Settings::default();
        settings.items_per_row = 0;
        assert_eq!(
            settings.validate(),
            Err(SimError::Config(ConfigError::ZeroItemsPerRow))
        );

        let mut settings = Settings::default();
        settings.item_weights.clear();
        assert_eq!(
            settings.validate(),
            Err(SimError::Config(ConfigError::EmptyWeightTable))
        );

        let mut settings = Settings::default();
        settings.number_of_balls = MAX_BALLS + 1;
        assert_eq!(
            settings.validate(),
            Err(SimError::Config(ConfigError::TooManyBalls(MAX_BALLS + 1)))
        );
    }

    #[test]
    fn test_validate_rejects_degenerate_projection() {
        for damping in [0.0, -5.0, f32::NAN, f32::INFINITY] {
            let settings = Settings {
                impulse_damping: damping,
                ..Default::default()
            };
            assert_eq!(
                settings.validate(),
                Err(SimError::Config(ConfigError::BadDamping)),
                "{damping}"
            );
        }
        for half_width in [0.0, -20.0, f32::NAN] {
            let settings = Settings {
                aim_box_half_width: half_width,
                ..Default::default()
            };
            assert_eq!(
                settings.validate(),
                Err(SimError::Config(ConfigError::BadAimBox)),
                "{half_width}"
            );
        }
    }

    #[test]
    fn test_json_roundtrip_keeps_weights() {
        let json = Settings::default().to_json().unwrap();
        let parsed = Settings::from_json(&json).unwrap();
        assert_eq!(parsed.item_weights.get(&ItemKind::Ball), Some(&BALL_WEIGHT));
        assert_eq!(parsed.items_per_row, ITEMS_PER_ROW);
    }

    #[test]
    fn test_garbage_json_is_rejected() {
        assert!(matches!(
            Settings::from_json("{ not json"),
            Err(SimError::StateCorruption(_))
        ));
    }

    #[test]
    fn test_speed_preset_cadence() {
        assert_eq!(SpeedPreset::Normal.shot_delay(6), 6);
        assert_eq!(SpeedPreset::Double.shot_delay(6), 3);
        assert_eq!(SpeedPreset::Triple.shot_delay(6), 1);
        assert_eq!(SpeedPreset::Triple.faster(), SpeedPreset::Triple);
        assert_eq!(SpeedPreset::from_str("2X"), Some(SpeedPreset::Double));
        assert_eq!(SpeedPreset::from_str("warp"), None);
    }

    #[test]
    fn test_layout_newest_row_on_top() {
        let layout = RowLayout::default();
        let newest = layout.slot_center(2, 3, 0);
        let oldest = layout.slot_center(0, 3, 0);
        assert_eq!(newest.y, layout.top);
        assert_eq!(oldest.y, layout.top - 2.0 * layout.row_height);
        assert_eq!(newest.x, layout.slot_width * 0.5);
    }
}
