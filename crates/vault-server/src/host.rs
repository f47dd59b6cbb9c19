//! A minimal in-memory engine implementing the core's host traits.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;
use uuid::Uuid;
use vault_core::{SessionDirectory, WorldRegistry};
use vault_snapshot::{GameMode, LivePlayer};

struct Session {
    live: LivePlayer,
    world: String,
    mode: GameMode,
}

/// Every "engine" fact the demo needs, held in plain maps.
#[derive(Default)]
pub struct MemoryHost {
    sessions: BTreeMap<Uuid, Session>,
    known: BTreeSet<Uuid>,
    worlds: Vec<String>,
}

impl MemoryHost {
    pub fn with_worlds(worlds: &[&str]) -> Self {
        Self {
            worlds: worlds.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn connect(&mut self, player: Uuid, world: &str, mode: GameMode) {
        self.known.insert(player);
        self.sessions.insert(
            player,
            Session {
                live: LivePlayer::default(),
                world: world.to_owned(),
                mode,
            },
        );
    }

    pub fn disconnect(&mut self, player: Uuid) {
        self.sessions.remove(&player);
    }

    pub fn move_to(&mut self, player: Uuid, world: &str) {
        if let Some(session) = self.sessions.get_mut(&player) {
            session.world = world.to_owned();
        }
    }

    pub fn live_player_mut(&mut self, player: Uuid) -> Option<&mut LivePlayer> {
        self.sessions.get_mut(&player).map(|s| &mut s.live)
    }

    pub fn live_player_ref(&self, player: Uuid) -> Option<&LivePlayer> {
        self.sessions.get(&player).map(|s| &s.live)
    }
}

impl SessionDirectory for MemoryHost {
    fn online_players(&self) -> Vec<Uuid> {
        self.sessions.keys().copied().collect()
    }

    fn all_known_players(&self) -> Vec<Uuid> {
        self.known.iter().copied().collect()
    }

    fn is_online(&self, player: Uuid) -> bool {
        self.sessions.contains_key(&player)
    }

    fn kick(&mut self, player: Uuid, message: &str) {
        info!(%player, message, "kicked");
        self.disconnect(player);
    }

    fn live_player(&mut self, player: Uuid) -> Option<&mut LivePlayer> {
        self.live_player_mut(player)
    }

    fn world_of(&self, player: Uuid) -> Option<String> {
        self.sessions.get(&player).map(|s| s.world.clone())
    }

    fn gamemode_of(&self, player: Uuid) -> Option<GameMode> {
        self.sessions.get(&player).map(|s| s.mode)
    }
}

impl WorldRegistry for MemoryHost {
    fn worlds(&self) -> Vec<String> {
        self.worlds.clone()
    }
}
