//! Immutable, precision-preserving player state snapshots.
//!
//! This crate holds the data model that the rest of the workspace persists
//! and swaps around:
//!
//! - [`TagValue`] / [`TagCompound`]: nested per-item metadata with exact
//!   numeric round-tripping (64-bit identifiers never go through `f64`)
//! - [`ItemSnapshot`]: one frozen item stack
//! - [`PlayerSnapshot`]: a player's full swappable state for one
//!   (world group, gamemode) context
//! - [`LivePlayer`] / [`LiveItem`]: the mutable engine-boundary types that
//!   snapshots are taken from and reconstructed onto
//!
//! Snapshots serialize to a JSON tree whose field names match the historical
//! on-disk format, so records written by older versions still load.

mod error;
mod gamemode;
mod item;
mod live;
mod player;
mod tag;

pub use error::{SnapshotError, SnapshotResult};
pub use gamemode::GameMode;
pub use item::ItemSnapshot;
pub use live::{LiveItem, LivePlayer};
pub use player::{EffectSnapshot, PlayerSnapshot};
pub use tag::{TagCompound, TagValue, compound_from_json, compound_to_json};
