//! Player manager: stash lifecycle and the transition state machine.
//!
//! One `PlayerManager` owns everything that mutates on the main line: the
//! host handle, the snapshot store, the group table, every connected
//! player's stash and the tick scheduler. Engine events (login, quit,
//! world change, gamemode change, respawn) enter here; the manager decides
//! whether a snapshot swap is legal, saves the old context and schedules
//! the apply of the new one on the next tick, after the engine event has
//! finished its own side effects.

use std::collections::HashMap;
use std::path::Path;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, error, warn};
use uuid::Uuid;
use vault_snapshot::{GameMode, PlayerSnapshot};
use vault_store::{SnapshotStore, SnapshotTable, StoreResult};

use crate::config::Config;
use crate::error::CoreResult;
use crate::groups::GroupTable;
use crate::host::Host;
use crate::import::{ImportProcess, LoginGate};
use crate::scheduler::{Scheduler, Tick};
use crate::stash::{PlayerStash, TransitionState};

/// How long a disconnected player's stash is kept around, to tolerate
/// quick reconnects (60 seconds at 20 ticks per second).
const UNLOAD_GRACE_TICKS: Tick = 60 * 20;

/// Outcome of a transition attempt.
///
/// `Rejected` is not an error: the caller must cancel the triggering
/// world/gamemode change, otherwise the player ends up in the new context
/// without the matching snapshot swap.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Allowed,
    Rejected,
}

/// Outcome of a login attempt against the maintenance gate.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginDecision {
    Allowed,
    Denied(String),
}

/// Results marshalled back from the store worker, consumed on the main
/// line during [`PlayerManager::tick`].
pub(crate) enum StoreEvent {
    Loaded {
        player: Uuid,
        result: StoreResult<SnapshotTable>,
    },
    Saved {
        player: Uuid,
        group: String,
        mode: GameMode,
        result: StoreResult<()>,
    },
}

/// Everything the scheduler's tasks operate on: the manager minus the
/// scheduler itself.
pub(crate) struct CoreState<H: Host> {
    pub(crate) host: H,
    pub(crate) store: SnapshotStore,
    pub(crate) config: Config,
    pub(crate) groups: GroupTable,
    pub(crate) stashes: HashMap<Uuid, PlayerStash>,
    pub(crate) import: Option<ImportProcess>,
    pub(crate) login_gate: LoginGate,
    pub(crate) events_tx: Sender<StoreEvent>,
    events_rx: Receiver<StoreEvent>,
}

impl<H: Host> CoreState<H> {
    fn drain_store_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                StoreEvent::Loaded { player, result } => {
                    if let Some(stash) = self.stashes.get_mut(&player) {
                        stash.finish_load(result);
                    } else {
                        // Player disconnected and got unloaded while the
                        // load was in flight.
                        debug!(%player, "snapshot load finished for an unloaded stash");
                    }
                }
                StoreEvent::Saved {
                    player,
                    group,
                    mode,
                    result,
                } => {
                    if let Err(err) = result {
                        error!(
                            %player, group, %mode, error = %err,
                            "unable to save player snapshot"
                        );
                    }
                }
            }
        }
    }

    /// Get the stash for a player, creating it and queueing its initial
    /// load on first reference.
    pub(crate) fn ensure_stash(&mut self, player: Uuid) -> &PlayerStash {
        if !self.stashes.contains_key(&player) {
            self.stashes.insert(player, PlayerStash::new(player));

            let tx = self.events_tx.clone();
            self.store
                .load_all(player, self.groups.group_names(), move |result| {
                    let _ = tx.send(StoreEvent::Loaded { player, result });
                });
        }

        &self.stashes[&player]
    }

    /// The gamemode a snapshot gets tagged with for this player right now.
    pub(crate) fn context_mode(&self, player: Uuid) -> GameMode {
        if self.config.per_gamemode_inventories {
            self.host.gamemode_of(player).unwrap_or(GameMode::CANONICAL)
        } else {
            GameMode::CANONICAL
        }
    }

    /// Cache a snapshot (visible to reads in the same tick) and persist it
    /// in the background.
    pub(crate) fn save_snapshot(
        &mut self,
        player: Uuid,
        group: &str,
        mode: GameMode,
        snapshot: PlayerSnapshot,
    ) {
        if let Some(stash) = self.stashes.get_mut(&player) {
            stash.insert(group, mode, snapshot.clone());
        }

        let tx = self.events_tx.clone();
        let group_name = group.to_owned();
        self.store.save(player, group, mode, &snapshot, move |result| {
            let _ = tx.send(StoreEvent::Saved {
                player,
                group: group_name,
                mode,
                result,
            });
        });
    }

    /// Reconstruct the player from the cached snapshot for the context, or
    /// reset them to a fresh state when none exists.
    pub(crate) fn apply_snapshot(&mut self, player: Uuid, group: &str, mode: GameMode) {
        if !self.host.is_online(player) {
            return;
        }

        let snapshot = self
            .stashes
            .get(&player)
            .and_then(|stash| stash.get(group, mode))
            .cloned();

        let Some(live) = self.host.live_player(player) else {
            return;
        };

        match snapshot {
            Some(snapshot) => snapshot.reconstruct(live),
            None => live.reset_to_new(),
        }
    }
}

/// The core of the plugin: owns the state and the tick scheduler.
pub struct PlayerManager<H: Host> {
    pub(crate) state: CoreState<H>,
    pub(crate) scheduler: Scheduler<CoreState<H>>,
}

impl<H: Host> PlayerManager<H> {
    /// Build the manager: open the store under `data_dir` and build the
    /// group table from the configuration plus the registry's worlds.
    pub fn new(host: H, config: Config, data_dir: impl AsRef<Path>) -> CoreResult<Self> {
        let store = SnapshotStore::open(data_dir)?;
        let worlds = host.worlds();
        let groups = GroupTable::rebuild(&config.world_groups, worlds.iter().map(String::as_str));
        let (events_tx, events_rx) = unbounded();

        Ok(Self {
            state: CoreState {
                host,
                store,
                config,
                groups,
                stashes: HashMap::new(),
                import: None,
                login_gate: LoginGate::Open,
                events_tx,
                events_rx,
            },
            scheduler: Scheduler::new(),
        })
    }

    /// Advance one tick: marshal store completions onto this line, apply
    /// their events, then run scheduled tasks.
    pub fn tick(&mut self) {
        self.state.store.drain_completions();
        self.state.drain_store_events();
        self.scheduler.tick(&mut self.state);
    }

    #[must_use]
    pub fn now(&self) -> Tick {
        self.scheduler.now()
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.state.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.state.host
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.state.config
    }

    /// Rebuild the group table wholesale from the configuration and the
    /// currently known worlds.
    pub fn reload_groups(&mut self) {
        let worlds = self.state.host.worlds();
        self.state.groups = GroupTable::rebuild(
            &self.state.config.world_groups,
            worlds.iter().map(String::as_str),
        );
    }

    #[must_use]
    pub fn group_of(&self, world: &str) -> &str {
        self.state.groups.group_of(world)
    }

    #[must_use]
    pub fn groups(&self) -> &GroupTable {
        &self.state.groups
    }

    /// A login attempt. Denied while the maintenance gate is closed;
    /// otherwise the player's stash load is queued right away so their
    /// data is usually ready by the time they finish connecting.
    pub fn on_login_attempt(&mut self, player: Uuid) -> LoginDecision {
        if let Some(message) = self.state.login_denied_message() {
            return LoginDecision::Denied(message);
        }

        self.state.ensure_stash(player);
        LoginDecision::Allowed
    }

    /// A disconnect (quit or kick). The stash is dropped after a grace
    /// delay, and only if the player has not reconnected meanwhile.
    pub fn on_quit(&mut self, player: Uuid) {
        self.scheduler.run_later(UNLOAD_GRACE_TICKS, move |state, _| {
            if !state.host.is_online(player) {
                state.stashes.remove(&player);
                debug!(%player, "unloaded stash after disconnect grace period");
            }
        });
    }

    /// A world finished loading at runtime.
    pub fn on_world_loaded(&mut self, world: &str) {
        self.state.groups.register_in_default(world);
    }

    /// A player is moving between worlds (teleport, portal). `Rejected`
    /// means the caller must cancel the move.
    pub fn on_world_change(&mut self, player: Uuid, from_world: &str, to_world: &str) -> Transition {
        self.world_transition(player, from_world, to_world, false)
    }

    /// A player is respawning into a different world. A respawn cannot be
    /// cancelled without leaving the player in an invalid state, so this
    /// never rejects; if the guards are not satisfied the swap is skipped
    /// with a warning instead.
    pub fn on_respawn_world_change(&mut self, player: Uuid, from_world: &str, to_world: &str) {
        let _ = self.world_transition(player, from_world, to_world, true);
    }

    fn world_transition(
        &mut self,
        player: Uuid,
        from_world: &str,
        to_world: &str,
        is_respawn: bool,
    ) -> Transition {
        let old_group = self.state.groups.group_of(from_world).to_owned();
        let new_group = self.state.groups.group_of(to_world).to_owned();

        // Same group: nothing swaps, the move is always fine.
        if old_group == new_group {
            return Transition::Allowed;
        }

        let stash = self.state.ensure_stash(player);
        if stash.transition_state() == TransitionState::TransitionPending {
            if is_respawn {
                warn!(
                    %player, from_world, to_world,
                    "snapshot data not ready during respawn; skipping the inventory swap"
                );
                return Transition::Allowed;
            }
            return Transition::Rejected;
        }

        let mode = self.state.context_mode(player);
        let Some(live) = self.state.host.live_player(player) else {
            return Transition::Allowed;
        };
        let snapshot = if is_respawn {
            PlayerSnapshot::snap_respawn(live)
        } else {
            PlayerSnapshot::snap(live)
        };

        self.state.save_snapshot(player, &old_group, mode, snapshot);
        self.begin_swap(player, new_group, mode);
        Transition::Allowed
    }

    /// A player is changing gamemode. `Rejected` means the caller must
    /// cancel the change. A no-op when per-gamemode separation is off.
    pub fn on_gamemode_change(
        &mut self,
        player: Uuid,
        old_mode: GameMode,
        new_mode: GameMode,
    ) -> Transition {
        if old_mode == new_mode || !self.state.config.per_gamemode_inventories {
            return Transition::Allowed;
        }

        let stash = self.state.ensure_stash(player);
        if stash.transition_state() == TransitionState::TransitionPending {
            return Transition::Rejected;
        }

        let Some(world) = self.state.host.world_of(player) else {
            return Transition::Allowed;
        };
        let group = self.state.groups.group_of(&world).to_owned();

        let Some(live) = self.state.host.live_player(player) else {
            return Transition::Allowed;
        };
        let snapshot = PlayerSnapshot::snap(live);

        self.state.save_snapshot(player, &group, old_mode, snapshot);
        self.begin_swap(player, group, new_mode);
        Transition::Allowed
    }

    /// Enter the swap window and schedule the apply for the next tick, so
    /// the engine event that triggered the change finishes first.
    fn begin_swap(&mut self, player: Uuid, new_group: String, mode: GameMode) {
        if let Some(stash) = self.state.stashes.get_mut(&player) {
            stash.begin_swap();
        }

        self.scheduler.run_next_tick(move |state, _| {
            state.apply_snapshot(player, &new_group, mode);
            if let Some(stash) = state.stashes.get_mut(&player) {
                stash.finish_swap();
            }
        });
    }

    /// List which (group, gamemode) keys have a stored snapshot for a
    /// player. Diagnostics helper; the callback runs during a later tick.
    pub fn list_stored_contexts(
        &self,
        player: Uuid,
        callback: impl FnOnce(StoreResult<Vec<(String, GameMode)>>) + Send + 'static,
    ) {
        self.state
            .store
            .list(player, self.state.groups.group_names(), callback);
    }

    /// Whether a player's initial snapshot load has completed.
    #[must_use]
    pub fn is_data_loaded(&self, player: Uuid) -> bool {
        self.state
            .stashes
            .get(&player)
            .is_some_and(PlayerStash::is_data_loaded)
    }

    /// The explicit transition state for a player, if their stash exists.
    #[must_use]
    pub fn transition_state(&self, player: Uuid) -> Option<TransitionState> {
        self.state
            .stashes
            .get(&player)
            .map(PlayerStash::transition_state)
    }

    /// The cached snapshot for a (player, group, gamemode) key, if any.
    #[must_use]
    pub fn cached_snapshot(
        &self,
        player: Uuid,
        group: &str,
        mode: GameMode,
    ) -> Option<&PlayerSnapshot> {
        self.state.stashes.get(&player)?.get(group, mode)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use vault_snapshot::{LiveItem, LivePlayer, TagCompound};

    use super::*;
    use crate::host::SessionDirectory;
    use crate::testutil::{FakeHost, pump_until};

    fn make_manager(per_gamemode: bool) -> (PlayerManager<FakeHost>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let manager = make_manager_in(per_gamemode, &dir);
        (manager, dir)
    }

    fn make_manager_in(per_gamemode: bool, dir: &tempfile::TempDir) -> PlayerManager<FakeHost> {
        let host = FakeHost::with_worlds(&["world", "world_nether", "world_creative"]);
        let config = Config {
            per_gamemode_inventories: per_gamemode,
            world_groups: BTreeMap::from([
                (
                    "survival".to_owned(),
                    vec!["world".to_owned(), "world_nether".to_owned()],
                ),
                ("creative".to_owned(), vec!["world_creative".to_owned()]),
            ]),
        };
        PlayerManager::new(host, config, dir.path()).unwrap()
    }

    fn pickaxe() -> LiveItem {
        LiveItem {
            kind: "diamond_pickaxe".to_owned(),
            durability: 12,
            count: 1,
            tags: TagCompound::new(),
        }
    }

    #[test]
    fn login_queues_the_initial_load() {
        let (mut manager, _dir) = make_manager(false);
        let player = manager.host_mut().connect("world", GameMode::Survival);

        assert_eq!(manager.on_login_attempt(player), LoginDecision::Allowed);
        assert!(!manager.is_data_loaded(player));

        pump_until(&mut manager, |m| m.is_data_loaded(player));
    }

    #[test]
    fn transitions_rejected_until_data_loads() {
        let (mut manager, _dir) = make_manager(false);
        let player = manager.host_mut().connect("world", GameMode::Survival);
        let _ = manager.on_login_attempt(player);

        assert_eq!(
            manager.on_world_change(player, "world", "world_creative"),
            Transition::Rejected
        );

        pump_until(&mut manager, |m| m.is_data_loaded(player));
        assert_eq!(
            manager.on_world_change(player, "world", "world_creative"),
            Transition::Allowed
        );
    }

    #[test]
    fn respawn_before_load_skips_the_swap_without_rejecting() {
        let (mut manager, _dir) = make_manager(false);
        let player = manager.host_mut().connect("world", GameMode::Survival);
        let _ = manager.on_login_attempt(player);

        manager.on_respawn_world_change(player, "world", "world_creative");
        assert!(
            manager
                .cached_snapshot(player, "survival", GameMode::Survival)
                .is_none()
        );
    }

    #[test]
    fn group_change_saves_old_context_and_applies_next_tick() {
        let (mut manager, _dir) = make_manager(false);
        let player = manager.host_mut().connect("world", GameMode::Survival);
        let _ = manager.on_login_attempt(player);
        pump_until(&mut manager, |m| m.is_data_loaded(player));

        {
            let live = manager.host_mut().live_player(player).unwrap();
            live.level = 7;
            live.inventory.insert(0, pickaxe());
        }

        assert_eq!(
            manager.on_world_change(player, "world", "world_creative"),
            Transition::Allowed
        );
        manager.host_mut().move_to(player, "world_creative");

        // The old context is cached synchronously, under the canonical
        // gamemode because separation is off.
        let saved = manager
            .cached_snapshot(player, "survival", GameMode::Survival)
            .unwrap();
        assert_eq!(saved.level(), 7);
        assert_eq!(saved.inventory().len(), 1);

        // The live state is untouched until the scheduled apply.
        assert_eq!(manager.host().live(player).level, 7);
        assert_eq!(
            manager.transition_state(player),
            Some(TransitionState::TransitionPending)
        );

        manager.tick();

        // No snapshot existed for the creative group: fresh state.
        assert_eq!(manager.host().live(player).level, 0);
        assert!(manager.host().live(player).inventory.is_empty());
        assert_eq!(manager.transition_state(player), Some(TransitionState::Idle));

        // Moving back restores the saved context.
        assert_eq!(
            manager.on_world_change(player, "world_creative", "world"),
            Transition::Allowed
        );
        manager.host_mut().move_to(player, "world");
        manager.tick();

        assert_eq!(manager.host().live(player).level, 7);
        assert_eq!(manager.host().live(player).inventory[&0], pickaxe());
    }

    #[test]
    fn overlapping_transition_rejected_during_swap_window() {
        let (mut manager, _dir) = make_manager(false);
        let player = manager.host_mut().connect("world", GameMode::Survival);
        let _ = manager.on_login_attempt(player);
        pump_until(&mut manager, |m| m.is_data_loaded(player));

        assert_eq!(
            manager.on_world_change(player, "world", "world_creative"),
            Transition::Allowed
        );
        assert_eq!(
            manager.on_world_change(player, "world_creative", "world"),
            Transition::Rejected
        );

        manager.tick();
        assert_eq!(
            manager.on_world_change(player, "world_creative", "world"),
            Transition::Allowed
        );
    }

    #[test]
    fn same_group_moves_do_not_touch_snapshots() {
        let (mut manager, _dir) = make_manager(false);
        let player = manager.host_mut().connect("world", GameMode::Survival);
        let _ = manager.on_login_attempt(player);
        pump_until(&mut manager, |m| m.is_data_loaded(player));

        manager.host_mut().live_player(player).unwrap().level = 5;
        assert_eq!(
            manager.on_world_change(player, "world", "world_nether"),
            Transition::Allowed
        );

        assert!(
            manager
                .cached_snapshot(player, "survival", GameMode::Survival)
                .is_none()
        );
        manager.tick();
        assert_eq!(manager.host().live(player).level, 5);
    }

    #[test]
    fn respawn_saves_reset_vitals_for_the_old_context() {
        let (mut manager, _dir) = make_manager(false);
        let player = manager.host_mut().connect("world", GameMode::Survival);
        let _ = manager.on_login_attempt(player);
        pump_until(&mut manager, |m| m.is_data_loaded(player));

        {
            let live = manager.host_mut().live_player(player).unwrap();
            live.health = 3.0;
            live.food_level = 6;
            live.exhaustion = 2.5;
            live.saturation = 0.5;
            live.inventory.insert(4, pickaxe());
        }

        manager.on_respawn_world_change(player, "world", "world_creative");
        manager.host_mut().move_to(player, "world_creative");

        let saved = manager
            .cached_snapshot(player, "survival", GameMode::Survival)
            .unwrap()
            .clone();
        let mut probe = LivePlayer::default();
        saved.reconstruct(&mut probe);

        assert_eq!(probe.health, 20.0);
        assert_eq!(probe.food_level, 20);
        assert_eq!(probe.exhaustion, 0.0);
        assert_eq!(probe.saturation, 5.0);
        // The inventory itself survives the respawn snapshot.
        assert_eq!(probe.inventory[&4], pickaxe());
    }

    #[test]
    fn gamemode_change_swaps_when_separation_enabled() {
        let (mut manager, _dir) = make_manager(true);
        let player = manager.host_mut().connect("world", GameMode::Survival);
        let _ = manager.on_login_attempt(player);
        pump_until(&mut manager, |m| m.is_data_loaded(player));

        manager.host_mut().live_player(player).unwrap().level = 3;

        assert_eq!(
            manager.on_gamemode_change(player, GameMode::Survival, GameMode::Creative),
            Transition::Allowed
        );
        manager.host_mut().online.get_mut(&player).unwrap().mode = GameMode::Creative;
        manager.tick();

        assert_eq!(manager.host().live(player).level, 0);
        assert_eq!(
            manager
                .cached_snapshot(player, "survival", GameMode::Survival)
                .unwrap()
                .level(),
            3
        );

        assert_eq!(
            manager.on_gamemode_change(player, GameMode::Creative, GameMode::Survival),
            Transition::Allowed
        );
        manager.host_mut().online.get_mut(&player).unwrap().mode = GameMode::Survival;
        manager.tick();

        assert_eq!(manager.host().live(player).level, 3);
    }

    #[test]
    fn gamemode_change_is_noop_when_separation_disabled() {
        let (mut manager, _dir) = make_manager(false);
        let player = manager.host_mut().connect("world", GameMode::Survival);
        let _ = manager.on_login_attempt(player);
        pump_until(&mut manager, |m| m.is_data_loaded(player));

        manager.host_mut().live_player(player).unwrap().level = 3;
        assert_eq!(
            manager.on_gamemode_change(player, GameMode::Survival, GameMode::Creative),
            Transition::Allowed
        );

        assert!(
            manager
                .cached_snapshot(player, "survival", GameMode::Survival)
                .is_none()
        );
        manager.tick();
        assert_eq!(manager.host().live(player).level, 3);
    }

    #[test]
    fn quit_unloads_the_stash_after_the_grace_period() {
        let (mut manager, _dir) = make_manager(false);
        let player = manager.host_mut().connect("world", GameMode::Survival);
        let _ = manager.on_login_attempt(player);
        pump_until(&mut manager, |m| m.is_data_loaded(player));

        manager.host_mut().disconnect(player);
        manager.on_quit(player);

        for _ in 0..(UNLOAD_GRACE_TICKS - 1) {
            manager.tick();
        }
        assert!(manager.is_data_loaded(player));

        manager.tick();
        assert_eq!(manager.transition_state(player), None);
    }

    #[test]
    fn reconnect_within_the_grace_period_keeps_the_stash() {
        let (mut manager, _dir) = make_manager(false);
        let player = manager.host_mut().connect("world", GameMode::Survival);
        let _ = manager.on_login_attempt(player);
        pump_until(&mut manager, |m| m.is_data_loaded(player));

        manager.host_mut().disconnect(player);
        manager.on_quit(player);
        manager
            .host_mut()
            .connect_as(player, "world", GameMode::Survival);

        for _ in 0..=UNLOAD_GRACE_TICKS {
            manager.tick();
        }
        assert!(manager.is_data_loaded(player));
    }

    #[test]
    fn runtime_loaded_worlds_join_the_default_group() {
        let (mut manager, _dir) = make_manager(false);

        manager.on_world_loaded("event_arena");
        assert_eq!(manager.group_of("event_arena"), "default");
        assert_eq!(manager.group_of("world"), "survival");

        manager.reload_groups();
        assert_eq!(manager.group_of("world"), "survival");
    }

    #[test]
    fn snapshots_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let player;

        {
            let mut manager = make_manager_in(false, &dir);
            player = manager.host_mut().connect("world", GameMode::Survival);
            let _ = manager.on_login_attempt(player);
            pump_until(&mut manager, |m| m.is_data_loaded(player));

            manager.host_mut().live_player(player).unwrap().level = 9;
            assert_eq!(
                manager.on_world_change(player, "world", "world_creative"),
                Transition::Allowed
            );
            manager.tick();
            // Dropping the manager joins the store worker, flushing the save.
        }

        let mut manager = make_manager_in(false, &dir);
        manager
            .host_mut()
            .connect_as(player, "world_creative", GameMode::Survival);
        let _ = manager.on_login_attempt(player);
        pump_until(&mut manager, |m| m.is_data_loaded(player));

        assert_eq!(
            manager
                .cached_snapshot(player, "survival", GameMode::Survival)
                .unwrap()
                .level(),
            9
        );
    }
}
