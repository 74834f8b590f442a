//! Row items: spacers, hit blocks, collectible balls and currency
//!
//! One closed enum carries each kind's payload; every lifecycle query is a
//! plain `match` over it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Session-unique identifier of a row item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u32);

/// Item kinds, with their persisted codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKind {
    Spacer,
    HitBlock,
    Ball,
    Currency,
}

impl ItemKind {
    /// Code used in persisted row arrays
    pub fn code(&self) -> u8 {
        match self {
            ItemKind::Spacer => 0,
            ItemKind::HitBlock => 1,
            ItemKind::Ball => 2,
            ItemKind::Currency => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ItemKind::Spacer),
            1 => Some(ItemKind::HitBlock),
            2 => Some(ItemKind::Ball),
            3 => Some(ItemKind::Currency),
            _ => None,
        }
    }

    /// One-letter tag for row dumps in the log
    pub fn tag(&self) -> char {
        match self {
            ItemKind::Spacer => 'S',
            ItemKind::HitBlock => 'H',
            ItemKind::Ball => 'B',
            ItemKind::Currency => 'C',
        }
    }
}

/// Kind-specific payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemBody {
    /// Empty slot
    Spacer,
    /// Needs `hit_count` more hits before it breaks
    HitBlock { hit_count: u32 },
    /// Joins the projectile pool once struck
    Ball { struck: bool },
    /// Single-hit collectible
    Currency { struck: bool },
}

/// What striking an item did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitEffect {
    /// Nothing to do (spacer, or a block already at zero)
    None,
    /// A block lost one hit point; `remaining` is what is left
    Damaged { remaining: u32 },
    /// A ball item was struck and will convert on collection
    BallStruck,
    /// A currency item was struck and will pay out on collection
    CurrencyStruck,
}

/// What collecting a removed item hands to the rest of the game
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collected {
    /// Broken hit block
    Block { pos: Vec2 },
    /// Converts into a projectile
    Ball { pos: Vec2 },
    /// Reward for the scoring collaborator
    Currency { pos: Vec2 },
}

/// A single row slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub pos: Vec2,
    /// New items stay hidden until their row is revealed
    pub visible: bool,
    pub body: ItemBody,
}

impl Item {
    pub fn spacer(id: ItemId, pos: Vec2) -> Self {
        Self {
            id,
            pos,
            visible: false,
            body: ItemBody::Spacer,
        }
    }

    pub fn hit_block(id: ItemId, hit_count: u32) -> Self {
        Self::with_body(id, ItemBody::HitBlock { hit_count })
    }

    pub fn ball(id: ItemId) -> Self {
        Self::with_body(id, ItemBody::Ball { struck: false })
    }

    pub fn currency(id: ItemId) -> Self {
        Self::with_body(id, ItemBody::Currency { struck: false })
    }

    /// Build a fresh item of `kind`; `hit_count` only matters for hit blocks
    pub fn of_kind(id: ItemId, kind: ItemKind, hit_count: u32) -> Self {
        match kind {
            ItemKind::Spacer => Self::spacer(id, Vec2::ZERO),
            ItemKind::HitBlock => Self::hit_block(id, hit_count),
            ItemKind::Ball => Self::ball(id),
            ItemKind::Currency => Self::currency(id),
        }
    }

    fn with_body(id: ItemId, body: ItemBody) -> Self {
        Self {
            id,
            pos: Vec2::ZERO,
            visible: false,
            body,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self.body {
            ItemBody::Spacer => ItemKind::Spacer,
            ItemBody::HitBlock { .. } => ItemKind::HitBlock,
            ItemBody::Ball { .. } => ItemKind::Ball,
            ItemBody::Currency { .. } => ItemKind::Currency,
        }
    }

    pub fn is_spacer(&self) -> bool {
        matches!(self.body, ItemBody::Spacer)
    }

    /// Remaining hits for blocks, 0 for everything else
    pub fn hit_count(&self) -> u32 {
        match self.body {
            ItemBody::HitBlock { hit_count } => hit_count,
            _ => 0,
        }
    }

    /// Apply one impact
    pub fn apply_hit(&mut self) -> HitEffect {
        match &mut self.body {
            ItemBody::Spacer => HitEffect::None,
            ItemBody::HitBlock { hit_count } => {
                if *hit_count == 0 {
                    return HitEffect::None;
                }
                *hit_count -= 1;
                HitEffect::Damaged {
                    remaining: *hit_count,
                }
            }
            ItemBody::Ball { struck } => {
                *struck = true;
                HitEffect::BallStruck
            }
            ItemBody::Currency { struck } => {
                *struck = true;
                HitEffect::CurrencyStruck
            }
        }
    }

    pub fn should_be_removed(&self) -> bool {
        match self.body {
            ItemBody::Spacer => false,
            ItemBody::HitBlock { hit_count } => hit_count == 0,
            ItemBody::Ball { struck } | ItemBody::Currency { struck } => struck,
        }
    }

    /// Hand-off payload once the item has been pulled out of its row
    pub fn on_collect(&self) -> Option<Collected> {
        let pos = self.pos;
        match self.body {
            ItemBody::Spacer => None,
            ItemBody::HitBlock { .. } => Some(Collected::Block { pos }),
            ItemBody::Ball { .. } => Some(Collected::Ball { pos }),
            ItemBody::Currency { .. } => Some(Collected::Currency { pos }),
        }
    }
}
