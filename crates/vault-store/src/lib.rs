//! Asynchronous sharded file store for player snapshots.
//!
//! One JSON file per (player, world group, gamemode) key, sharded by the
//! first two characters of the player id. All reads and writes run on a
//! dedicated IO thread; callers pass continuations that are executed on
//! their own thread when they call [`SnapshotStore::drain_completions`],
//! so the store never blocks or touches game state off the main line.
//!
//! A missing file is the normal "first visit" case and loads as `Ok(None)`.

mod error;
mod paths;
mod worker;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{trace, warn};
use uuid::Uuid;
use vault_snapshot::{GameMode, PlayerSnapshot};

pub use error::{StoreError, StoreResult};
pub use paths::snapshot_path;

use worker::IoWorker;

/// Everything stored for one player: group name → gamemode → snapshot.
pub type SnapshotTable = BTreeMap<String, BTreeMap<GameMode, PlayerSnapshot>>;

/// File-backed snapshot store with a background IO worker.
pub struct SnapshotStore {
    root: PathBuf,
    worker: IoWorker,
}

impl SnapshotStore {
    /// Open a store rooted at `<data_dir>/snapshots` and spawn its worker.
    pub fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self {
            root: data_dir.as_ref().join("snapshots"),
            worker: IoWorker::spawn("vault-snapshots-io")?,
        })
    }

    /// Persist one snapshot. Parent directories are created as needed; a
    /// directory-creation failure fails this save and reaches `callback`.
    /// A failed save is reported, not retried.
    pub fn save(
        &self,
        player: Uuid,
        group: &str,
        mode: GameMode,
        snapshot: &PlayerSnapshot,
        callback: impl FnOnce(StoreResult<()>) + Send + 'static,
    ) {
        let path = snapshot_path(&self.root, player, group, mode);
        let snapshot = snapshot.clone();

        self.worker.submit(
            move || {
                let json = snapshot.to_json_string();
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&path, json)?;
                trace!(path = %path.display(), "saved snapshot");
                Ok(())
            },
            callback,
        );
    }

    /// Load one snapshot. `Ok(None)` when no file exists for the key.
    pub fn load(
        &self,
        player: Uuid,
        group: &str,
        mode: GameMode,
        callback: impl FnOnce(StoreResult<Option<PlayerSnapshot>>) + Send + 'static,
    ) {
        let path = snapshot_path(&self.root, player, group, mode);
        self.worker.submit(move || read_snapshot(&path), callback);
    }

    /// Load every (group × gamemode) record for a player in one pass.
    ///
    /// A single unreadable or malformed file is skipped with a diagnostic;
    /// it never fails the other records.
    pub fn load_all(
        &self,
        player: Uuid,
        groups: Vec<String>,
        callback: impl FnOnce(StoreResult<SnapshotTable>) + Send + 'static,
    ) {
        let root = self.root.clone();

        self.worker.submit(
            move || {
                let mut table = SnapshotTable::new();

                for group in groups {
                    let mut modes = BTreeMap::new();

                    for mode in GameMode::ALL {
                        let path = snapshot_path(&root, player, &group, mode);
                        match read_snapshot(&path) {
                            Ok(Some(snapshot)) => {
                                modes.insert(mode, snapshot);
                            }
                            Ok(None) => {}
                            Err(error) => {
                                warn!(
                                    %player, group, %mode, %error,
                                    "skipping unreadable snapshot record"
                                );
                            }
                        }
                    }

                    table.insert(group, modes);
                }

                Ok(table)
            },
            callback,
        );
    }

    /// List which (group, gamemode) keys have a stored snapshot for a
    /// player. Diagnostics helper, same async contract as the loads.
    pub fn list(
        &self,
        player: Uuid,
        groups: Vec<String>,
        callback: impl FnOnce(StoreResult<Vec<(String, GameMode)>>) + Send + 'static,
    ) {
        let root = self.root.clone();

        self.worker.submit(
            move || {
                let mut found = Vec::new();
                for group in groups {
                    for mode in GameMode::ALL {
                        if snapshot_path(&root, player, &group, mode).is_file() {
                            found.push((group.clone(), mode));
                        }
                    }
                }
                Ok(found)
            },
            callback,
        );
    }

    /// Run pending continuations on the calling thread. The owner calls
    /// this once per scheduler tick.
    pub fn drain_completions(&self) -> usize {
        self.worker.drain_completions()
    }
}

fn read_snapshot(path: &Path) -> StoreResult<Option<PlayerSnapshot>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(PlayerSnapshot::from_json_str(&text)?)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error.into()),
    }
}
