//! Row generator
//!
//! Owns the rows of items between the ceiling and the floor. Row 0 is the
//! oldest row (closest to the floor), the last row is the newest. Every row
//! always holds exactly `items_per_row` items; removed items leave a spacer
//! behind.

use std::collections::{BTreeMap, HashSet};

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use super::item::{HitEffect, Item, ItemId, ItemKind};
use crate::consts::{BALL_HIT_BONUS, SPACER_ROLL_THRESHOLD};
use crate::error::{ConfigError, SimError};
use crate::settings::{RowLayout, Settings};

/// Persisted generator state: rows as parallel (kind, hit count) arrays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorSnapshot {
    pub max_hit_count: u32,
    pub total_weight: u32,
    pub item_weights: BTreeMap<ItemKind, u32>,
    pub draw_table: Vec<ItemKind>,
    pub row_kinds: Vec<Vec<u8>>,
    pub row_hit_counts: Vec<Vec<u32>>,
}

/// Result of routing a hit event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitReport {
    pub kind: ItemKind,
    pub effect: HitEffect,
}

/// Generates, tracks and compacts rows of items
#[derive(Debug, Clone)]
pub struct ItemGenerator {
    rows: Vec<Vec<Item>>,
    items_per_row: usize,
    max_hit_count: u32,
    item_weights: BTreeMap<ItemKind, u32>,
    draw_table: Vec<ItemKind>,
    total_weight: u32,
    next_id: u32,
    layout: RowLayout,
}

impl ItemGenerator {
    /// Create an empty generator from settings
    pub fn new(settings: &Settings) -> Result<Self, SimError> {
        if settings.items_per_row == 0 {
            return Err(ConfigError::ZeroItemsPerRow.into());
        }

        let mut generator = Self {
            rows: Vec::new(),
            items_per_row: settings.items_per_row,
            max_hit_count: settings.max_hit_count,
            item_weights: BTreeMap::new(),
            draw_table: Vec::new(),
            total_weight: 0,
            next_id: 1,
            layout: settings.layout,
        };
        for (&kind, &weight) in &settings.item_weights {
            generator.add_item_type(kind, weight);
        }
        if generator.draw_table.is_empty() {
            return Err(ConfigError::EmptyWeightTable.into());
        }
        Ok(generator)
    }

    /// Rebuild a generator from a snapshot, re-instantiating every item in
    /// its original row and slot
    pub fn from_snapshot(settings: &Settings, snapshot: &GeneratorSnapshot) -> Result<Self, SimError> {
        let mut generator = Self::new(settings)?;

        if snapshot.row_kinds.len() != snapshot.row_hit_counts.len() {
            return Err(SimError::StateCorruption(format!(
                "{} kind rows but {} hit count rows",
                snapshot.row_kinds.len(),
                snapshot.row_hit_counts.len()
            )));
        }
        let weight_sum = snapshot
            .item_weights
            .values()
            .try_fold(0u32, |sum, &w| sum.checked_add(w))
            .ok_or_else(|| SimError::StateCorruption("item weights overflow".into()))?;
        if weight_sum != snapshot.total_weight || snapshot.draw_table.len() != weight_sum as usize {
            return Err(SimError::StateCorruption(format!(
                "weight total {} does not match weights ({}) or draw table ({})",
                snapshot.total_weight,
                weight_sum,
                snapshot.draw_table.len()
            )));
        }
        if snapshot.draw_table.is_empty() {
            return Err(ConfigError::EmptyWeightTable.into());
        }

        let mut rows = Vec::with_capacity(snapshot.row_kinds.len());
        for (kinds, hit_counts) in snapshot.row_kinds.iter().zip(&snapshot.row_hit_counts) {
            if kinds.len() != generator.items_per_row || hit_counts.len() != kinds.len() {
                return Err(SimError::StateCorruption(format!(
                    "row has {} kinds and {} hit counts, expected {}",
                    kinds.len(),
                    hit_counts.len(),
                    generator.items_per_row
                )));
            }
            let mut row = Vec::with_capacity(kinds.len());
            for (&code, &hit_count) in kinds.iter().zip(hit_counts) {
                let kind = ItemKind::from_code(code)
                    .ok_or_else(|| SimError::StateCorruption(format!("unknown item kind {code}")))?;
                let id = generator.next_item_id();
                let mut item = Item::of_kind(id, kind, hit_count);
                item.visible = !item.is_spacer();
                row.push(item);
            }
            rows.push(row);
        }

        generator.rows = rows;
        generator.max_hit_count = snapshot.max_hit_count;
        generator.item_weights = snapshot.item_weights.clone();
        generator.total_weight = snapshot.total_weight;
        generator.draw_table = snapshot.draw_table.clone();
        generator.relayout();

        log::info!("Restored {} rows from snapshot", generator.rows.len());
        Ok(generator)
    }

    pub fn snapshot(&self) -> GeneratorSnapshot {
        GeneratorSnapshot {
            max_hit_count: self.max_hit_count,
            total_weight: self.total_weight,
            item_weights: self.item_weights.clone(),
            draw_table: self.draw_table.clone(),
            row_kinds: self
                .rows
                .iter()
                .map(|row| row.iter().map(|item| item.kind().code()).collect())
                .collect(),
            row_hit_counts: self
                .rows
                .iter()
                .map(|row| row.iter().map(Item::hit_count).collect())
                .collect(),
        }
    }

    pub fn rows(&self) -> &[Vec<Item>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn items_per_row(&self) -> usize {
        self.items_per_row
    }

    pub fn max_hit_count(&self) -> u32 {
        self.max_hit_count
    }

    pub fn total_weight(&self) -> u32 {
        self.total_weight
    }

    pub fn item_weights(&self) -> &BTreeMap<ItemKind, u32> {
        &self.item_weights
    }

    /// Number of non-spacer items on the board
    pub fn item_count(&self) -> usize {
        self.items().filter(|item| !item.is_spacer()).count()
    }

    /// All items, oldest row first
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.rows.iter().flatten()
    }

    /// Add weight for an item kind; weights accumulate across calls
    pub fn add_item_type(&mut self, kind: ItemKind, weight: u32) {
        if weight == 0 {
            return;
        }
        *self.item_weights.entry(kind).or_insert(0) += weight;
        self.total_weight += weight;

        self.draw_table.clear();
        for (&kind, &weight) in &self.item_weights {
            log::debug!("Weight table: {} x {:?}", weight, kind);
            self.draw_table
                .extend(std::iter::repeat_n(kind, weight as usize));
        }
    }

    /// Generate a new row on top of the board
    ///
    /// Each slot rolls 1..=100: at or above the threshold it stays empty,
    /// otherwise its kind is drawn from the weight table.
    pub fn generate_row<R: Rng>(&mut self, rng: &mut R) -> &[Item] {
        let mut row = Vec::with_capacity(self.items_per_row);
        for _ in 0..self.items_per_row {
            let roll = rng.random_range(1..=100);
            let kind = if roll >= SPACER_ROLL_THRESHOLD {
                ItemKind::Spacer
            } else {
                self.draw_table
                    .choose(rng)
                    .copied()
                    .unwrap_or(ItemKind::Spacer)
            };
            let item = self.instantiate(kind, rng);
            row.push(item);
        }

        let dump: String = row.iter().map(|i| format!("[{}]", i.kind().tag())).collect();
        log::debug!("Generated row {}: {}", self.rows.len(), dump);

        self.rows.push(row);
        self.relayout();
        self.check_or_heal();

        self.rows.last().map(Vec::as_slice).unwrap_or_default()
    }

    /// Make every item on the board visible
    pub fn reveal_all(&mut self) {
        for item in self.rows.iter_mut().flatten() {
            item.visible = !item.is_spacer();
        }
    }

    /// Route a hit event to the item with `id`
    ///
    /// Striking a ball item raises `max_hit_count`, because that ball will
    /// join the pool and later rows should keep up with it.
    pub fn apply_hit(&mut self, id: ItemId) -> Option<HitReport> {
        let item = self.rows.iter_mut().flatten().find(|item| item.id == id)?;
        let effect = item.apply_hit();
        let kind = item.kind();
        if kind == ItemKind::Ball {
            self.max_hit_count = self.max_hit_count.saturating_add(BALL_HIT_BONUS);
            log::debug!("Ball item {:?} struck, max hit count now {}", id, self.max_hit_count);
        }
        Some(HitReport { kind, effect })
    }

    /// Pull out every item that should be removed, leave spacers in their
    /// slots, then drop empty rows from the floor end
    pub fn collect_removable_items(&mut self) -> Vec<Item> {
        let mut removed = Vec::new();
        let mut next_id = self.next_id;

        for row in &mut self.rows {
            for slot in row.iter_mut() {
                if slot.should_be_removed() {
                    let spacer = Item::spacer(ItemId(next_id), slot.pos);
                    next_id += 1;
                    removed.push(std::mem::replace(slot, spacer));
                }
            }
        }
        self.next_id = next_id;

        self.remove_empty_rows();
        if !removed.is_empty() {
            self.check_or_heal();
        }
        removed
    }

    /// Whether every item still fits above `floor_y` after moving down
    /// `row_height * row_count`. Landing exactly on the floor still fits.
    pub fn can_place_row(&self, floor_y: f32, row_height: f32, row_count: u32) -> bool {
        let drop = row_height * row_count as f32;
        self.items()
            .filter(|item| !item.is_spacer())
            .all(|item| item.pos.y - drop >= floor_y)
    }

    /// Verify row widths and id uniqueness
    pub fn check_invariants(&self) -> Result<(), SimError> {
        let mut seen = HashSet::new();
        for (index, row) in self.rows.iter().enumerate() {
            if row.len() != self.items_per_row {
                return Err(SimError::InvariantViolation(format!(
                    "row {index} has {} items, expected {}",
                    row.len(),
                    self.items_per_row
                )));
            }
            for item in row {
                if !seen.insert(item.id) {
                    return Err(SimError::InvariantViolation(format!(
                        "duplicate item id {:?}",
                        item.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Drop rows from the floor end while they hold only spacers
    ///
    /// Stops at the first row with anything in it. Empty rows above that row
    /// stay, so a reload lays the board out exactly as it was.
    fn remove_empty_rows(&mut self) {
        let empty_prefix = self
            .rows
            .iter()
            .take_while(|row| row.iter().all(Item::is_spacer))
            .count();
        if empty_prefix > 0 {
            log::debug!("Compacting {} empty rows from the floor end", empty_prefix);
            self.rows.drain(..empty_prefix);
        }
    }

    fn instantiate<R: Rng>(&mut self, kind: ItemKind, rng: &mut R) -> Item {
        let id = self.next_item_id();
        match kind {
            ItemKind::HitBlock => {
                let min = self.max_hit_count / 2;
                let count = rng.random_range(min..=self.max_hit_count);
                Item::hit_block(id, count)
            }
            other => Item::of_kind(id, other, 0),
        }
    }

    fn next_item_id(&mut self) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        id
    }

    fn relayout(&mut self) {
        let row_count = self.rows.len();
        for (r, row) in self.rows.iter_mut().enumerate() {
            for (slot, item) in row.iter_mut().enumerate() {
                item.pos = self.layout.slot_center(r, row_count, slot);
            }
        }
    }

    fn check_or_heal(&mut self) {
        if let Err(err) = self.check_invariants() {
            debug_assert!(false, "{err}");
            log::error!("{err}; resetting board");
            self.rows.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn generator() -> ItemGenerator {
        ItemGenerator::new(&Settings::default()).unwrap()
    }

    /// Build rows directly from kinds, spacers as 'S', blocks as 'H', ...
    fn board(rows: &[&str]) -> ItemGenerator {
        let mut settings = Settings::default();
        settings.items_per_row = rows[0].len();
        let snapshot = GeneratorSnapshot {
            max_hit_count: 10,
            total_weight: 100,
            item_weights: settings.item_weights.clone(),
            draw_table: ItemGenerator::new(&settings).unwrap().draw_table,
            row_kinds: rows
                .iter()
                .map(|row| {
                    row.chars()
                        .map(|c| match c {
                            'H' => 1,
                            'B' => 2,
                            'C' => 3,
                            _ => 0,
                        })
                        .collect()
                })
                .collect(),
            row_hit_counts: rows.iter().map(|row| vec![1; row.len()]).collect(),
        };
        ItemGenerator::from_snapshot(&settings, &snapshot).unwrap()
    }

    fn layout_of(generator: &ItemGenerator) -> Vec<String> {
        generator
            .rows()
            .iter()
            .map(|row| row.iter().map(|i| i.kind().tag()).collect())
            .collect()
    }

    fn first_id(generator: &ItemGenerator, kind: ItemKind) -> ItemId {
        generator.items().find(|i| i.kind() == kind).unwrap().id
    }

    #[test]
    fn test_default_weight_table() {
        let g = generator();
        assert_eq!(g.total_weight(), 100);
        assert_eq!(g.draw_table.len(), 100);
        assert_eq!(
            g.draw_table.iter().filter(|&&k| k == ItemKind::HitBlock).count(),
            65
        );
    }

    #[test]
    fn test_add_item_type_accumulates() {
        let mut g = generator();
        g.add_item_type(ItemKind::Currency, 5);
        assert_eq!(g.item_weights()[&ItemKind::Currency], 15);
        assert_eq!(g.total_weight(), 105);
        assert_eq!(g.draw_table.len(), 105);
        g.add_item_type(ItemKind::Ball, 0);
        assert_eq!(g.total_weight(), 105);
    }

    #[test]
    fn test_empty_weights_rejected() {
        let mut settings = Settings::default();
        settings.item_weights.clear();
        assert_eq!(
            ItemGenerator::new(&settings).unwrap_err(),
            SimError::Config(ConfigError::EmptyWeightTable)
        );
    }

    #[test]
    fn test_rows_keep_width_and_ids_stay_unique() {
        let mut g = generator();
        let mut rng = Pcg32::seed_from_u64(11);
        for _ in 0..20 {
            g.generate_row(&mut rng);
        }
        assert!(g.rows().iter().all(|r| r.len() == ITEMS));
        assert!(g.check_invariants().is_ok());
    }

    const ITEMS: usize = crate::consts::ITEMS_PER_ROW;

    #[test]
    fn test_hit_then_collect_leaves_spacer() {
        let mut g = board(&["HSSB", "SCSS"]);
        let block = first_id(&g, ItemKind::HitBlock);
        let report = g.apply_hit(block).unwrap();
        assert_eq!(report.effect, HitEffect::Damaged { remaining: 0 });

        let removed = g.collect_removable_items();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, block);
        assert_eq!(layout_of(&g), vec!["SSSB", "SCSS"]);
    }

    #[test]
    fn test_unknown_item_hit_is_ignored() {
        let mut g = board(&["HSSS"]);
        assert!(g.apply_hit(ItemId(9999)).is_none());
    }

    #[test]
    fn test_compaction_removes_only_floor_prefix() {
        // floor end first: the middle row empties but sits above a live row
        let mut g = board(&["HSSS", "SCSS", "SSBS"]);
        let coin = first_id(&g, ItemKind::Currency);
        g.apply_hit(coin);
        g.collect_removable_items();
        assert_eq!(layout_of(&g), vec!["HSSS", "SSSS", "SSBS"]);

        // clearing the floor row drops it and the empty row behind it
        let block = first_id(&g, ItemKind::HitBlock);
        g.apply_hit(block);
        g.collect_removable_items();
        assert_eq!(layout_of(&g), vec!["SSBS"]);
    }

    #[test]
    fn test_compaction_keeps_positions_of_survivors() {
        let mut g = board(&["HSSS", "SSBS"]);
        let ball = g.items().find(|i| i.kind() == ItemKind::Ball).unwrap().clone();
        let block = first_id(&g, ItemKind::HitBlock);
        g.apply_hit(block);
        g.collect_removable_items();
        let after = g.items().find(|i| i.kind() == ItemKind::Ball).unwrap();
        assert_eq!(after.pos, ball.pos);
    }

    #[test]
    fn test_ball_hit_raises_max_hit_count() {
        let mut g = board(&["BSSS"]);
        let before = g.max_hit_count();
        let ball = first_id(&g, ItemKind::Ball);
        g.apply_hit(ball);
        assert_eq!(g.max_hit_count(), before + 2);
    }

    #[test]
    fn test_hit_counts_follow_max_hit_count() {
        let mut g = board(&["BSSS"]);
        let ball = first_id(&g, ItemKind::Ball);
        g.apply_hit(ball);
        let max = g.max_hit_count();
        assert_eq!(max, 12);

        let mut rng = Pcg32::seed_from_u64(5);
        let mut seen = HashSet::new();
        for _ in 0..2000 {
            let item = g.instantiate(ItemKind::HitBlock, &mut rng);
            let count = item.hit_count();
            assert!((max / 2..=max).contains(&count), "{count}");
            seen.insert(count);
        }
        // every value in [6, 12] shows up over 2000 draws
        assert_eq!(seen.len(), (max - max / 2 + 1) as usize);
    }

    #[test]
    fn test_spacer_rate_is_about_forty_percent_filled() {
        let mut g = generator();
        let mut rng = Pcg32::seed_from_u64(42);
        let mut filled = 0;
        let rows = 500;
        for _ in 0..rows {
            filled += g
                .generate_row(&mut rng)
                .iter()
                .filter(|i| !i.is_spacer())
                .count();
        }
        let ratio = filled as f32 / (rows * ITEMS) as f32;
        // 59 of 100 rolls place an item
        assert!((0.53..0.65).contains(&ratio), "{ratio}");
    }

    #[test]
    fn test_can_place_row_boundary_is_inclusive() {
        let g = board(&["HSSS"]);
        let y = g.items().next().unwrap().pos.y;
        let h = 40.0;
        // exactly on the floor after one row
        assert!(g.can_place_row(y - h, h, 1));
        assert!(!g.can_place_row(y - h + 0.5, h, 1));
        assert!(g.can_place_row(y - h - 0.5, h, 1));
    }

    #[test]
    fn test_can_place_row_ignores_spacers() {
        let g = board(&["SSSS"]);
        assert!(g.can_place_row(10_000.0, 40.0, 1));
    }

    #[test]
    fn test_snapshot_roundtrip_preserves_rows() {
        let mut g = generator();
        let mut rng = Pcg32::seed_from_u64(3);
        for _ in 0..3 {
            g.generate_row(&mut rng);
        }
        let snapshot = g.snapshot();
        let restored = ItemGenerator::from_snapshot(&Settings::default(), &snapshot).unwrap();

        let kinds = |g: &ItemGenerator| -> Vec<Vec<(ItemKind, u32)>> {
            g.rows()
                .iter()
                .map(|r| r.iter().map(|i| (i.kind(), i.hit_count())).collect())
                .collect()
        };
        assert_eq!(kinds(&g), kinds(&restored));
        assert_eq!(restored.max_hit_count(), g.max_hit_count());
        let pos: Vec<Vec2> = g.items().map(|i| i.pos).collect();
        let restored_pos: Vec<Vec2> = restored.items().map(|i| i.pos).collect();
        assert_eq!(pos, restored_pos);
    }

    #[test]
    fn test_snapshot_with_unknown_kind_is_corrupt() {
        let g = board(&["HSSS"]);
        let mut snapshot = g.snapshot();
        snapshot.row_kinds[0][1] = 42;
        let mut settings = Settings::default();
        settings.items_per_row = 4;
        assert!(matches!(
            ItemGenerator::from_snapshot(&settings, &snapshot),
            Err(SimError::StateCorruption(_))
        ));
    }

    #[test]
    fn test_snapshot_with_ragged_row_is_corrupt() {
        let mut g = generator();
        g.generate_row(&mut Pcg32::seed_from_u64(1));
        let mut snapshot = g.snapshot();
        snapshot.row_kinds[0].pop();
        snapshot.row_hit_counts[0].pop();
        assert!(matches!(
            ItemGenerator::from_snapshot(&Settings::default(), &snapshot),
            Err(SimError::StateCorruption(_))
        ));
    }

    #[test]
    fn test_snapshot_with_overflowing_weights_is_corrupt() {
        let g = generator();
        let mut snapshot = g.snapshot();
        snapshot.item_weights.insert(ItemKind::HitBlock, u32::MAX);
        assert!(matches!(
            ItemGenerator::from_snapshot(&Settings::default(), &snapshot),
            Err(SimError::StateCorruption(_))
        ));
    }

    #[test]
    fn test_ball_hit_bonus_saturates() {
        let mut g = board(&["BSSS"]);
        g.max_hit_count = u32::MAX - 1;
        g.apply_hit(first_id(&g, ItemKind::Ball));
        assert_eq!(g.max_hit_count(), u32::MAX);
    }

    #[test]
    fn test_ragged_row_violates_invariants() {
        let mut g = board(&["HSSS", "SBSS"]);
        assert!(g.check_invariants().is_ok());
        g.rows[1].pop();
        assert!(matches!(
            g.check_invariants(),
            Err(SimError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_duplicate_id_violates_invariants() {
        let mut g = board(&["HSSS", "SBSS"]);
        g.rows[1][2].id = g.rows[0][0].id;
        assert!(matches!(
            g.check_invariants(),
            Err(SimError::InvariantViolation(_))
        ));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "duplicate item id")]
    fn test_corrupt_board_asserts_in_debug() {
        let mut g = board(&["HSSS", "SBSS"]);
        g.rows[1][2].id = g.rows[0][0].id;
        g.check_or_heal();
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_corrupt_board_resets_in_release() {
        let mut g = board(&["HSSS", "SBSS"]);
        g.rows[0].pop();
        g.check_or_heal();
        assert_eq!(g.row_count(), 0);
        assert!(g.check_invariants().is_ok());
    }

    proptest! {
        #[test]
        fn rows_never_go_ragged(seed in any::<u64>(), hits in prop::collection::vec(0usize..64, 0..40)) {
            let mut g = generator();
            let mut rng = Pcg32::seed_from_u64(seed);
            for _ in 0..4 {
                g.generate_row(&mut rng);
            }
            let ids: Vec<ItemId> = g.items().map(|i| i.id).collect();
            for h in hits {
                g.apply_hit(ids[h % ids.len()]);
                g.collect_removable_items();
                prop_assert!(g.rows().iter().all(|r| r.len() == ITEMS));
                // never an empty row at the floor end
                if let Some(first) = g.rows().first() {
                    prop_assert!(first.iter().any(|i| !i.is_spacer()));
                }
            }
        }
    }
}
