//! Deterministic snapshot file layout.
//!
//! One file per (player, group, gamemode):
//!
//! ```text
//! <root>/<group>/<first-2-chars-of-uuid>/<uuid>.<GAMEMODE>.json
//! ```
//!
//! The two-character shard bounds per-directory fan-out even with hundreds
//! of thousands of players.

use std::path::{Path, PathBuf};

use uuid::Uuid;
use vault_snapshot::GameMode;

/// Path of the snapshot file for one (player, group, gamemode) key.
#[must_use]
pub fn snapshot_path(root: &Path, player: Uuid, group: &str, mode: GameMode) -> PathBuf {
    let id = player.to_string(); // hyphenated lowercase
    let shard = &id[..2];
    root.join(group)
        .join(shard)
        .join(format!("{id}.{mode}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_is_sharded_by_uuid_prefix() {
        let player = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let path = snapshot_path(Path::new("/data/snapshots"), player, "survival", GameMode::Creative);
        assert_eq!(
            path,
            Path::new(
                "/data/snapshots/survival/55/550e8400-e29b-41d4-a716-446655440000.CREATIVE.json"
            )
        );
    }

    #[test]
    fn uppercase_input_lands_in_the_same_shard() {
        let lower = Uuid::parse_str("abcdef00-0000-4000-8000-000000000000").unwrap();
        let upper = Uuid::parse_str("ABCDEF00-0000-4000-8000-000000000000").unwrap();
        let root = Path::new("/data/snapshots");
        assert_eq!(
            snapshot_path(root, lower, "g", GameMode::Survival),
            snapshot_path(root, upper, "g", GameMode::Survival)
        );
    }
}
