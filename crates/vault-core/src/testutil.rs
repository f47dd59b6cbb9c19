//! In-memory fakes for exercising the core without a game engine.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;
use vault_snapshot::{GameMode, LivePlayer, PlayerSnapshot};

use crate::host::{ImportReporter, ImportResult, Importer, SessionDirectory, WorldRegistry};
use crate::manager::PlayerManager;

pub(crate) struct FakePlayer {
    pub(crate) live: LivePlayer,
    pub(crate) world: String,
    pub(crate) mode: GameMode,
}

#[derive(Default)]
pub(crate) struct FakeHost {
    pub(crate) online: BTreeMap<Uuid, FakePlayer>,
    pub(crate) offline: BTreeSet<Uuid>,
    pub(crate) kicked: Vec<(Uuid, String)>,
    pub(crate) worlds: Vec<String>,
}

impl FakeHost {
    pub(crate) fn with_worlds(worlds: &[&str]) -> Self {
        Self {
            worlds: worlds.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn connect(&mut self, world: &str, mode: GameMode) -> Uuid {
        let player = Uuid::new_v4();
        self.connect_as(player, world, mode);
        player
    }

    pub(crate) fn connect_as(&mut self, player: Uuid, world: &str, mode: GameMode) {
        self.offline.remove(&player);
        self.online.insert(
            player,
            FakePlayer {
                live: LivePlayer::default(),
                world: world.to_owned(),
                mode,
            },
        );
    }

    pub(crate) fn disconnect(&mut self, player: Uuid) {
        self.online.remove(&player);
        self.offline.insert(player);
    }

    pub(crate) fn move_to(&mut self, player: Uuid, world: &str) {
        if let Some(state) = self.online.get_mut(&player) {
            state.world = world.to_owned();
        }
    }

    pub(crate) fn live(&self, player: Uuid) -> &LivePlayer {
        &self.online[&player].live
    }
}

impl SessionDirectory for FakeHost {
    fn online_players(&self) -> Vec<Uuid> {
        self.online.keys().copied().collect()
    }

    fn all_known_players(&self) -> Vec<Uuid> {
        self.online
            .keys()
            .copied()
            .chain(self.offline.iter().copied())
            .collect()
    }

    fn is_online(&self, player: Uuid) -> bool {
        self.online.contains_key(&player)
    }

    fn kick(&mut self, player: Uuid, message: &str) {
        self.kicked.push((player, message.to_owned()));
        self.disconnect(player);
    }

    fn live_player(&mut self, player: Uuid) -> Option<&mut LivePlayer> {
        self.online.get_mut(&player).map(|state| &mut state.live)
    }

    fn world_of(&self, player: Uuid) -> Option<String> {
        self.online.get(&player).map(|state| state.world.clone())
    }

    fn gamemode_of(&self, player: Uuid) -> Option<GameMode> {
        self.online.get(&player).map(|state| state.mode)
    }
}

impl WorldRegistry for FakeHost {
    fn worlds(&self) -> Vec<String> {
        self.worlds.clone()
    }
}

/// Tick the manager (sleeping a moment between ticks so the store worker
/// can make progress) until `done` holds.
///
/// # Panics
///
/// Panics if `done` does not hold within five seconds.
pub(crate) fn pump_until(
    manager: &mut PlayerManager<FakeHost>,
    mut done: impl FnMut(&PlayerManager<FakeHost>) -> bool,
) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done(manager) {
        assert!(Instant::now() < deadline, "timed out waiting on the manager");
        manager.tick();
        std::thread::sleep(Duration::from_millis(1));
    }
}

pub(crate) struct FakeImporter {
    pub(crate) available: bool,
    pub(crate) groups: BTreeMap<String, BTreeSet<String>>,
    pub(crate) records: BTreeMap<(Uuid, String, GameMode), PlayerSnapshot>,
    pub(crate) failing: BTreeSet<Uuid>,
    pub(crate) begun: Arc<AtomicBool>,
    pub(crate) ended: Arc<AtomicBool>,
}

impl FakeImporter {
    pub(crate) fn new(groups: BTreeMap<String, BTreeSet<String>>) -> Self {
        Self {
            available: true,
            groups,
            records: BTreeMap::new(),
            failing: BTreeSet::new(),
            begun: Arc::new(AtomicBool::new(false)),
            ended: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Importer for FakeImporter {
    fn name(&self) -> &str {
        "fake-legacy"
    }

    fn can_import(&self) -> bool {
        self.available
    }

    fn on_begin(&mut self) {
        self.begun.store(true, Ordering::SeqCst);
    }

    fn on_end(&mut self) {
        self.ended.store(true, Ordering::SeqCst);
    }

    fn world_groups(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.groups.clone()
    }

    fn import_snapshot(&mut self, player: Uuid, group: &str, mode: GameMode) -> ImportResult {
        if self.failing.contains(&player) {
            return Err("legacy database row is corrupt".into());
        }
        Ok(self.records.get(&(player, group.to_owned(), mode)).cloned())
    }
}

#[derive(Clone, Default)]
pub(crate) struct RecordingReporter {
    pub(crate) messages: Arc<Mutex<Vec<String>>>,
}

impl ImportReporter for RecordingReporter {
    fn message(&mut self, text: &str) {
        self.messages.lock().unwrap().push(text.to_owned());
    }
}
