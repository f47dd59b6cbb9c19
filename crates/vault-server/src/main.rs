//! Demo runner wiring the snapshot core to a small in-memory engine.
//!
//! This binary:
//! 1. Loads the configuration (`VAULT_CONFIG` path, or a built-in demo)
//! 2. Builds an in-memory host with a survival and a creative world group
//! 3. Plays a scripted session: login, world-group change, reconnect
//!
//! Environment:
//! - `VAULT_CONFIG` - path to a JSON configuration file
//! - `VAULT_DATA_DIR` - where snapshots are stored (default `data/`)

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::info;
use uuid::Uuid;
use vault_core::{Config, LoginDecision, PlayerManager, Transition};
use vault_snapshot::{GameMode, LiveItem, TagCompound};

mod host;

use host::MemoryHost;

/// One game tick at 20 ticks per second.
const TICK_DELTA: Duration = Duration::from_millis(50);

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vault_server=info".parse()?)
                .add_directive("vault_core=info".parse()?)
                .add_directive("vault_store=info".parse()?),
        )
        .init();

    info!("starting the snapshot demo host");

    let config = load_config()?;
    let data_dir = std::env::var("VAULT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"));
    info!(data_dir = %data_dir.display(), "opening the snapshot store");

    let host = MemoryHost::with_worlds(&["world", "world_nether", "world_creative"]);
    let mut manager = PlayerManager::new(host, config, &data_dir)?;

    let player = Uuid::new_v4();
    manager
        .host_mut()
        .connect(player, "world", GameMode::Survival);

    match manager.on_login_attempt(player) {
        LoginDecision::Allowed => info!(%player, "player connected"),
        LoginDecision::Denied(message) => {
            info!(%player, %message, "player denied");
            return Ok(());
        }
    }

    run_until(&mut manager, |m| m.is_data_loaded(player));
    info!(%player, "snapshot data loaded");

    // Give the player something worth keeping.
    if let Some(live) = manager.host_mut().live_player_mut(player) {
        live.level = 12;
        live.inventory.insert(
            0,
            LiveItem {
                kind: "diamond_pickaxe".to_owned(),
                durability: 3,
                count: 1,
                tags: TagCompound::new(),
            },
        );
    }
    info!("gave the player a pickaxe and 12 levels");

    // Move them into the creative group.
    match manager.on_world_change(player, "world", "world_creative") {
        Transition::Allowed => {
            manager.host_mut().move_to(player, "world_creative");
            info!("moved to world_creative; the survival context is saved");
        }
        Transition::Rejected => info!("move rejected; snapshot data not ready"),
    }
    tick(&mut manager);
    log_live(&manager, player, "after entering the creative group");

    // And back.
    if manager.on_world_change(player, "world_creative", "world") == Transition::Allowed {
        manager.host_mut().move_to(player, "world");
    }
    tick(&mut manager);
    log_live(&manager, player, "after returning to the survival group");

    manager.host_mut().disconnect(player);
    manager.on_quit(player);
    info!("player disconnected; snapshots are on disk under the data directory");

    Ok(())
}

fn load_config() -> eyre::Result<Config> {
    if let Ok(path) = std::env::var("VAULT_CONFIG") {
        info!(%path, "loading configuration");
        let text = std::fs::read_to_string(&path)?;
        return Ok(serde_json::from_str(&text)?);
    }

    Ok(Config {
        per_gamemode_inventories: false,
        world_groups: BTreeMap::from([
            (
                "survival".to_owned(),
                vec!["world".to_owned(), "world_nether".to_owned()],
            ),
            ("creative".to_owned(), vec!["world_creative".to_owned()]),
        ]),
    })
}

fn tick(manager: &mut PlayerManager<MemoryHost>) {
    let start = Instant::now();
    manager.tick();
    let elapsed = start.elapsed();
    if elapsed < TICK_DELTA {
        std::thread::sleep(TICK_DELTA - elapsed);
    }
}

/// Tick at game speed until `done` holds, with a safety cutoff.
fn run_until(
    manager: &mut PlayerManager<MemoryHost>,
    mut done: impl FnMut(&PlayerManager<MemoryHost>) -> bool,
) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done(manager) && Instant::now() < deadline {
        tick(manager);
    }
}

fn log_live(manager: &PlayerManager<MemoryHost>, player: Uuid, context: &str) {
    let Some(live) = manager.host().live_player_ref(player) else {
        return;
    };
    info!(
        level = live.level,
        items = live.inventory.len(),
        "{context}"
    );
}
