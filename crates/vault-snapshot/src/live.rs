//! Live player state at the engine boundary.
//!
//! These are the mutable values the game engine owns. The external item
//! codec is responsible for translating engine item stacks into [`LiveItem`];
//! from there on everything is plain data this crate can snapshot and
//! reconstruct without reaching into engine internals.

use std::collections::BTreeMap;

use crate::player::EffectSnapshot;
use crate::tag::TagCompound;

/// One live item stack, already passed through the item codec.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveItem {
    /// Item type identifier, e.g. `"diamond_sword"`. `"air"` means empty.
    pub kind: String,
    /// Durability used, 0 for undamaged or non-damageable items.
    pub durability: u16,
    /// Stack size.
    pub count: u32,
    /// Exotic per-item metadata.
    pub tags: TagCompound,
}

impl LiveItem {
    /// Whether this stack holds nothing worth snapshotting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kind == "air" || self.count == 0
    }
}

/// The full mutable state of one connected player.
///
/// `Default` is the state of a freshly created player, which is also what a
/// player is reset to when no snapshot exists for a context.
#[derive(Debug, Clone, PartialEq)]
pub struct LivePlayer {
    pub level: u32,
    /// Progress towards the next level, in `[0, 1)`.
    pub exp: f32,
    pub exp_total: u32,
    pub food_level: u32,
    pub exhaustion: f32,
    pub saturation: f32,
    pub health: f64,
    pub max_health: f64,
    /// Occupied main inventory slots only.
    pub inventory: BTreeMap<u32, LiveItem>,
    /// Occupied ender chest slots only.
    pub ender_chest: BTreeMap<u32, LiveItem>,
    pub armor: [Option<LiveItem>; 4],
    pub effects: Vec<EffectSnapshot>,
    pub held_slot: u32,
}

impl Default for LivePlayer {
    fn default() -> Self {
        Self {
            level: 0,
            exp: 0.0,
            exp_total: 0,
            food_level: 20,
            exhaustion: 0.0,
            saturation: 5.0,
            health: 20.0,
            max_health: 20.0,
            inventory: BTreeMap::new(),
            ender_chest: BTreeMap::new(),
            armor: [None, None, None, None],
            effects: Vec::new(),
            held_slot: 0,
        }
    }
}

impl LivePlayer {
    /// Reset to the state of a first connection: default vitals, empty
    /// inventories, no effects, held slot 0.
    pub fn reset_to_new(&mut self) {
        *self = Self::default();
    }
}
