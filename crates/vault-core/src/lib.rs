//! Per-context player state management.
//!
//! The core sits between the game engine and the snapshot store. It keeps
//! one in-memory stash per connected player, decides whether world-group
//! and gamemode transitions are legal, swaps snapshots when they are, and
//! runs the throttled batch import of legacy data behind a maintenance
//! login gate.
//!
//! The engine is abstracted behind the [`host`] capability traits; all
//! state mutation happens on one cooperative line of control driven by
//! [`PlayerManager::tick`].

mod config;
mod error;
mod groups;
mod host;
mod import;
mod manager;
mod scheduler;
mod stash;
#[cfg(test)]
mod testutil;

pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use groups::{DEFAULT_GROUP, GroupTable};
pub use host::{Host, ImportReporter, ImportResult, Importer, SessionDirectory, WorldRegistry};
pub use import::{ImportPhase, ImportStatus, LoginGate};
pub use manager::{LoginDecision, PlayerManager, Transition};
pub use scheduler::{Scheduler, Tick, TimerControl};
pub use stash::{PlayerStash, TransitionState};
