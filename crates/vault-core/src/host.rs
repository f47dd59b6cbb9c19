//! Capability traits at the engine boundary.
//!
//! The core never talks to the game engine directly; it sees it through
//! these narrow traits. Production wires them to the real server, tests
//! wire them to in-memory fakes.

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;
use vault_snapshot::{GameMode, LivePlayer, PlayerSnapshot};

/// The live game session: who is connected, where, and in what state.
pub trait SessionDirectory {
    /// Players currently connected.
    fn online_players(&self) -> Vec<Uuid>;

    /// Every player the server has ever seen, online or not.
    fn all_known_players(&self) -> Vec<Uuid>;

    fn is_online(&self, player: Uuid) -> bool;

    /// Forcibly disconnect a player with a message.
    fn kick(&mut self, player: Uuid, message: &str);

    /// Mutable access to a connected player's live state. `None` when the
    /// player is offline.
    fn live_player(&mut self, player: Uuid) -> Option<&mut LivePlayer>;

    /// The world a connected player is currently in.
    fn world_of(&self, player: Uuid) -> Option<String>;

    /// The gamemode a connected player is currently in.
    fn gamemode_of(&self, player: Uuid) -> Option<GameMode>;
}

/// The world registry: which worlds exist.
pub trait WorldRegistry {
    fn worlds(&self) -> Vec<String>;
}

/// Everything the core needs from the engine.
pub trait Host: SessionDirectory + WorldRegistry {}

impl<T: SessionDirectory + WorldRegistry> Host for T {}

/// Result of asking an importer for one translated snapshot.
pub type ImportResult =
    Result<Option<PlayerSnapshot>, Box<dyn std::error::Error + Send + Sync>>;

/// A pluggable source of legacy player data.
///
/// New sources implement this capability; the import pipeline is agnostic
/// to where the data comes from.
pub trait Importer {
    /// Short human-readable source name, used in operator messages.
    fn name(&self) -> &str;

    /// Whether the legacy data source is available at all. Checked before
    /// anything disruptive happens.
    fn can_import(&self) -> bool;

    fn on_begin(&mut self);

    fn on_end(&mut self);

    /// The legacy system's own world grouping, adopted as the canonical
    /// group table for the run.
    fn world_groups(&self) -> BTreeMap<String, BTreeSet<String>>;

    /// Translate the legacy record for one (player, group, gamemode) key.
    /// `Ok(None)` means there is nothing worth keeping for that key.
    fn import_snapshot(&mut self, player: Uuid, group: &str, mode: GameMode) -> ImportResult;
}

/// Where import progress messages go (the operator who started the run).
pub trait ImportReporter {
    fn message(&mut self, text: &str);
}
