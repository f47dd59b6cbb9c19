//! Runtime configuration, loaded elsewhere and consumed read-only here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Plugin configuration.
///
/// Loading the file is an external concern; this crate only reads the
/// deserialized values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// When true, every gamemode inside a group has its own snapshot slot.
    /// When false all gamemodes share the canonical slot.
    #[serde(rename = "per-gamemode-inventories")]
    pub per_gamemode_inventories: bool,

    /// Group name → worlds in that group. Worlds not listed anywhere land
    /// in the reserved default group at table rebuild time.
    #[serde(rename = "world-groups")]
    pub world_groups: BTreeMap<String, Vec<String>>,
}
