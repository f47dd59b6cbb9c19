//! Per-player in-memory snapshot cache.

use std::collections::BTreeMap;

use tracing::warn;
use uuid::Uuid;
use vault_snapshot::{GameMode, PlayerSnapshot};
use vault_store::{SnapshotTable, StoreResult};

/// Whether a player is free to transition right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionState {
    /// Data is loaded and no swap is mid-flight.
    Idle,
    /// An async load is outstanding or a swap is between its save and its
    /// scheduled apply. Transitions are rejected in this window.
    TransitionPending,
}

/// One connected player's cached snapshots: group → gamemode → snapshot.
///
/// Owned and mutated only by the main scheduling line; the store worker
/// never touches it (results arrive via drained completions).
#[derive(Debug)]
pub struct PlayerStash {
    player: Uuid,
    snapshots: SnapshotTable,
    /// Set once the initial async load finishes, successfully or not.
    data_loaded: bool,
    /// Set while a swap is between saving the old context and applying the
    /// new one. Guards against rapid repeated transitions duplicating items.
    changes_being_applied: bool,
}

impl PlayerStash {
    #[must_use]
    pub fn new(player: Uuid) -> Self {
        Self {
            player,
            snapshots: SnapshotTable::new(),
            data_loaded: false,
            changes_being_applied: false,
        }
    }

    #[must_use]
    pub fn player(&self) -> Uuid {
        self.player
    }

    #[must_use]
    pub fn is_data_loaded(&self) -> bool {
        self.data_loaded
    }

    /// The explicit transition state derived from the lifecycle flags.
    #[must_use]
    pub fn transition_state(&self) -> TransitionState {
        if self.data_loaded && !self.changes_being_applied {
            TransitionState::Idle
        } else {
            TransitionState::TransitionPending
        }
    }

    /// Mark the start of a swap (old context saved, apply scheduled).
    pub fn begin_swap(&mut self) {
        self.changes_being_applied = true;
    }

    /// Mark the scheduled apply as done; transitions are legal again.
    pub fn finish_swap(&mut self) {
        self.changes_being_applied = false;
    }

    /// Complete the initial load.
    ///
    /// On error the cache stays empty but the player is unblocked anyway:
    /// stalling them forever is worse than losing historical state, though
    /// it does mean their next context switches start from scratch. The
    /// trade is deliberate and logged loudly.
    pub fn finish_load(&mut self, result: StoreResult<SnapshotTable>) {
        match result {
            Ok(table) => {
                self.snapshots = table;
            }
            Err(error) => {
                warn!(
                    player = %self.player, %error,
                    "unable to load snapshots; check storage permissions. This \
                     player will lose state on world-group or gamemode change!"
                );
            }
        }
        self.data_loaded = true;
    }

    /// The cached snapshot for a context, if any.
    #[must_use]
    pub fn get(&self, group: &str, mode: GameMode) -> Option<&PlayerSnapshot> {
        self.snapshots.get(group)?.get(&mode)
    }

    /// Insert a snapshot into the cache, replacing any previous one. The
    /// insert is synchronous so a read later in the same tick sees it;
    /// durable persistence is the caller's (async) job.
    pub fn insert(&mut self, group: &str, mode: GameMode, snapshot: PlayerSnapshot) {
        self.snapshots
            .entry(group.to_owned())
            .or_insert_with(BTreeMap::new)
            .insert(mode, snapshot);
    }
}
