//! Player state snapshots.
//!
//! A [`PlayerSnapshot`] is a frozen copy of everything that swaps when a
//! player crosses a world group or gamemode boundary: experience, hunger,
//! health, both inventories, armor and status effects. Snapshots are built
//! from a live player or from their JSON export, and are never mutated.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use crate::error::{SnapshotError, SnapshotResult};
use crate::item::ItemSnapshot;
use crate::live::{LiveItem, LivePlayer};

/// A status effect descriptor, shared between live state and snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectSnapshot {
    pub kind: String,
    pub duration_ticks: i32,
    pub amplifier: i32,
    pub ambient: bool,
    pub particles: bool,
    pub icon: bool,
}

/// A frozen copy of a player's swappable state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    level: u32,
    exp: f32,
    /// Total experience points; `None` when unknown (imported data).
    exp_total: Option<u32>,
    food_level: u32,
    exhaustion: f32,
    saturation: f32,
    health: f64,
    max_health: f64,
    inventory: BTreeMap<u32, ItemSnapshot>,
    ender_chest: BTreeMap<u32, ItemSnapshot>,
    armor: [Option<ItemSnapshot>; 4],
    effects: Vec<EffectSnapshot>,
}

impl PlayerSnapshot {
    /// Assemble a snapshot from already-frozen parts. Importers use this;
    /// everything else goes through [`PlayerSnapshot::snap`].
    #[expect(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        level: u32,
        exp: f32,
        exp_total: Option<u32>,
        food_level: u32,
        exhaustion: f32,
        saturation: f32,
        health: f64,
        max_health: f64,
        inventory: BTreeMap<u32, ItemSnapshot>,
        ender_chest: BTreeMap<u32, ItemSnapshot>,
        armor: [Option<ItemSnapshot>; 4],
        effects: Vec<EffectSnapshot>,
    ) -> Self {
        Self {
            level,
            exp,
            exp_total,
            food_level,
            exhaustion,
            saturation,
            health,
            max_health,
            inventory,
            ender_chest,
            armor,
            effects,
        }
    }

    /// Snapshot a live player.
    #[must_use]
    pub fn snap(player: &LivePlayer) -> Self {
        Self::snap_inner(player, false)
    }

    /// Snapshot a live player mid-respawn.
    ///
    /// Respawn-time vitals are transient (the player just died), so the
    /// snapshot records respawn defaults instead of end-of-life values.
    #[must_use]
    pub fn snap_respawn(player: &LivePlayer) -> Self {
        Self::snap_inner(player, true)
    }

    fn snap_inner(player: &LivePlayer, from_respawn: bool) -> Self {
        let armor = [
            player.armor[0].as_ref().and_then(ItemSnapshot::snap),
            player.armor[1].as_ref().and_then(ItemSnapshot::snap),
            player.armor[2].as_ref().and_then(ItemSnapshot::snap),
            player.armor[3].as_ref().and_then(ItemSnapshot::snap),
        ];

        Self {
            level: player.level,
            exp: player.exp,
            exp_total: Some(player.exp_total),
            food_level: if from_respawn { 20 } else { player.food_level },
            exhaustion: if from_respawn { 0.0 } else { player.exhaustion },
            saturation: if from_respawn { 5.0 } else { player.saturation },
            health: if from_respawn {
                player.max_health
            } else {
                player.health
            },
            max_health: player.max_health,
            inventory: snap_inventory(&player.inventory),
            ender_chest: snap_inventory(&player.ender_chest),
            armor,
            effects: player.effects.clone(),
        }
    }

    /// Apply this snapshot to a live player, fully replacing vitals,
    /// inventories, armor and effects. Never partially applied.
    pub fn reconstruct(&self, player: &mut LivePlayer) {
        player.level = self.level;
        player.exp = self.exp;
        if let Some(total) = self.exp_total {
            player.exp_total = total;
        }
        player.food_level = self.food_level;
        player.exhaustion = self.exhaustion;
        player.saturation = self.saturation;
        player.health = self.health;
        player.max_health = self.max_health;

        player.inventory = reconstruct_inventory(&self.inventory);
        player.ender_chest = reconstruct_inventory(&self.ender_chest);
        player.armor = [
            self.armor[0].as_ref().map(ItemSnapshot::reconstruct),
            self.armor[1].as_ref().map(ItemSnapshot::reconstruct),
            self.armor[2].as_ref().map(ItemSnapshot::reconstruct),
            self.armor[3].as_ref().map(ItemSnapshot::reconstruct),
        ];
        player.effects = self.effects.clone();
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn exp_total(&self) -> Option<u32> {
        self.exp_total
    }

    #[must_use]
    pub fn health(&self) -> f64 {
        self.health
    }

    #[must_use]
    pub fn inventory(&self) -> &BTreeMap<u32, ItemSnapshot> {
        &self.inventory
    }

    #[must_use]
    pub fn armor(&self) -> &[Option<ItemSnapshot>; 4] {
        &self.armor
    }

    #[must_use]
    pub fn effects(&self) -> &[EffectSnapshot] {
        &self.effects
    }

    /// Serialize to the on-disk JSON tree.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut object = serde_json::Map::new();

        object.insert("level".into(), Value::from(self.level));
        object.insert("exp".into(), Value::from(f64::from(self.exp)));
        object.insert(
            "expTotal".into(),
            self.exp_total.map_or(Value::from(-1), Value::from),
        );
        object.insert("foodLevel".into(), Value::from(self.food_level));
        object.insert("exhaustion".into(), Value::from(f64::from(self.exhaustion)));
        object.insert("saturation".into(), Value::from(f64::from(self.saturation)));
        object.insert("health".into(), Value::from(self.health));
        object.insert("maxHealth".into(), Value::from(self.max_health));

        let armor = self
            .armor
            .iter()
            .map(|slot| slot.as_ref().map_or(Value::Null, ItemSnapshot::to_json))
            .collect();
        object.insert("armor".into(), Value::Array(armor));

        object.insert("inventory".into(), inventory_to_json(&self.inventory));
        object.insert("enderChest".into(), inventory_to_json(&self.ender_chest));

        let effects = self.effects.iter().map(effect_to_json).collect();
        object.insert("effects".into(), Value::Array(effects));

        Value::Object(object)
    }

    /// Serialize to a JSON string.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Deserialize from the on-disk JSON tree.
    ///
    /// Missing fields fall back to documented defaults so that records from
    /// older versions still load; malformed sub-records (a bad slot index,
    /// a broken item or effect entry) are skipped with a diagnostic instead
    /// of failing the whole record.
    pub fn from_json(json: &Value) -> SnapshotResult<Self> {
        let object = json
            .as_object()
            .ok_or(SnapshotError::Malformed("player snapshot is not an object"))?;

        let exp_total = match object.get("expTotal").and_then(Value::as_i64) {
            Some(total) if total >= 0 => Some(total as u32),
            _ => None,
        };

        let mut armor = [None, None, None, None];
        if let Some(slots) = object.get("armor").and_then(Value::as_array) {
            for (index, slot) in slots.iter().take(4).enumerate() {
                if slot.is_object() {
                    match ItemSnapshot::from_json(slot) {
                        Ok(item) => armor[index] = Some(item),
                        Err(error) => {
                            warn!(slot = index, %error, "skipping malformed armor item");
                        }
                    }
                }
            }
        }

        let effects = object
            .get("effects")
            .and_then(Value::as_array)
            .map(|entries| {
                entries.iter().filter_map(effect_from_json).collect()
            })
            .unwrap_or_default();

        Ok(Self {
            level: get_u32(object, "level", 0),
            exp: get_f32(object, "exp", 0.0),
            exp_total,
            food_level: get_u32(object, "foodLevel", 20),
            exhaustion: get_f32(object, "exhaustion", 0.0),
            saturation: get_f32(object, "saturation", 5.0),
            health: get_f64(object, "health", 20.0),
            max_health: get_f64(object, "maxHealth", 20.0),
            inventory: inventory_from_json(object.get("inventory")),
            ender_chest: inventory_from_json(object.get("enderChest")),
            armor,
            effects,
        })
    }

    /// Deserialize from a JSON string.
    pub fn from_json_str(text: &str) -> SnapshotResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }
}

fn snap_inventory(slots: &BTreeMap<u32, LiveItem>) -> BTreeMap<u32, ItemSnapshot> {
    slots
        .iter()
        .filter_map(|(index, item)| ItemSnapshot::snap(item).map(|snap| (*index, snap)))
        .collect()
}

fn reconstruct_inventory(snapshot: &BTreeMap<u32, ItemSnapshot>) -> BTreeMap<u32, LiveItem> {
    snapshot
        .iter()
        .map(|(index, item)| (*index, item.reconstruct()))
        .collect()
}

fn inventory_to_json(inventory: &BTreeMap<u32, ItemSnapshot>) -> Value {
    let mut object = serde_json::Map::new();
    for (index, item) in inventory {
        object.insert(index.to_string(), item.to_json());
    }
    Value::Object(object)
}

fn inventory_from_json(json: Option<&Value>) -> BTreeMap<u32, ItemSnapshot> {
    let mut inventory = BTreeMap::new();
    let Some(object) = json.and_then(Value::as_object) else {
        return inventory;
    };

    for (key, value) in object {
        if !value.is_object() {
            continue;
        }

        let Ok(index) = key.parse::<u32>() else {
            warn!(slot = %key, "skipping item with invalid slot index");
            continue;
        };

        match ItemSnapshot::from_json(value) {
            Ok(item) => {
                inventory.insert(index, item);
            }
            Err(error) => warn!(slot = index, %error, "skipping malformed item snapshot"),
        }
    }

    inventory
}

fn effect_to_json(effect: &EffectSnapshot) -> Value {
    let mut object = serde_json::Map::new();
    object.insert("type".into(), Value::String(effect.kind.clone()));
    object.insert("duration".into(), Value::from(effect.duration_ticks));
    object.insert("amplifier".into(), Value::from(effect.amplifier));
    object.insert("ambient".into(), Value::Bool(effect.ambient));
    object.insert("has-particles".into(), Value::Bool(effect.particles));
    object.insert("has-icon".into(), Value::Bool(effect.icon));
    Value::Object(object)
}

fn effect_from_json(json: &Value) -> Option<EffectSnapshot> {
    let object = json.as_object()?;

    let Some(kind) = object.get("type").and_then(Value::as_str) else {
        warn!("skipping status effect without a type");
        return None;
    };

    Some(EffectSnapshot {
        kind: kind.to_owned(),
        duration_ticks: object.get("duration").and_then(Value::as_i64).unwrap_or(1) as i32,
        amplifier: object.get("amplifier").and_then(Value::as_i64).unwrap_or(1) as i32,
        ambient: object
            .get("ambient")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        particles: object
            .get("has-particles")
            .and_then(Value::as_bool)
            .unwrap_or(true),
        icon: object
            .get("has-icon")
            .and_then(Value::as_bool)
            .unwrap_or(true),
    })
}

fn get_u32(object: &serde_json::Map<String, Value>, key: &str, default: u32) -> u32 {
    object
        .get(key)
        .and_then(Value::as_u64)
        .map_or(default, |v| v as u32)
}

fn get_f32(object: &serde_json::Map<String, Value>, key: &str, default: f32) -> f32 {
    object
        .get(key)
        .and_then(Value::as_f64)
        .map_or(default, |v| v as f32)
}

fn get_f64(object: &serde_json::Map<String, Value>, key: &str, default: f64) -> f64 {
    object.get(key).and_then(Value::as_f64).unwrap_or(default)
}
