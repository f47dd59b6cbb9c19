//! Item stack snapshots.

use serde_json::Value;

use crate::error::{SnapshotError, SnapshotResult};
use crate::live::LiveItem;
use crate::tag::{TagCompound, compound_from_json, compound_to_json};

/// A frozen copy of one item stack. Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSnapshot {
    kind: String,
    durability: u16,
    count: u32,
    tags: TagCompound,
}

impl ItemSnapshot {
    /// Snapshot a live item. Empty stacks yield `None`.
    #[must_use]
    pub fn snap(item: &LiveItem) -> Option<Self> {
        if item.is_empty() {
            return None;
        }

        Some(Self {
            kind: item.kind.clone(),
            durability: item.durability,
            count: item.count,
            tags: item.tags.clone(),
        })
    }

    /// Rebuild a live item from this snapshot.
    #[must_use]
    pub fn reconstruct(&self) -> LiveItem {
        LiveItem {
            kind: self.kind.clone(),
            durability: self.durability,
            count: self.count,
            tags: self.tags.clone(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn durability(&self) -> u16 {
        self.durability
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub fn tags(&self) -> &TagCompound {
        &self.tags
    }

    /// Serialize to the on-disk JSON shape.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut object = serde_json::Map::new();
        object.insert("id".into(), Value::String(self.kind.clone()));
        object.insert("Damage".into(), Value::from(self.durability));
        object.insert("Count".into(), Value::from(self.count));
        object.insert("NBT".into(), Value::Object(compound_to_json(&self.tags)));
        Value::Object(object)
    }

    /// Deserialize from the on-disk JSON shape.
    ///
    /// Errors on structurally broken records (not an object, missing or
    /// non-string id); missing numeric fields take their defaults.
    pub fn from_json(json: &Value) -> SnapshotResult<Self> {
        let object = json
            .as_object()
            .ok_or(SnapshotError::Malformed("item snapshot is not an object"))?;

        let kind = object
            .get("id")
            .and_then(Value::as_str)
            .ok_or(SnapshotError::Malformed("item snapshot has no id"))?
            .to_owned();

        let durability = object
            .get("Damage")
            .and_then(Value::as_u64)
            .map_or(0, |v| v as u16);
        let count = object
            .get("Count")
            .and_then(Value::as_u64)
            .map_or(1, |v| v as u32);
        let tags = object
            .get("NBT")
            .and_then(compound_from_json)
            .unwrap_or_default();

        Ok(Self {
            kind,
            durability,
            count,
            tags,
        })
    }
}
