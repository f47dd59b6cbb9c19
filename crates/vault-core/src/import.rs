//! Throttled batch import of legacy snapshot data.
//!
//! One import may run at a time. Starting it kicks every connected player
//! and closes the login gate; the run then drains a queue of known players
//! on a repeating timer, a bounded batch per tick, so the main line never
//! stalls on a huge legacy database. When the queue is empty the gate
//! moves to [`LoginGate::AwaitingOperator`] and stays closed until the
//! operator confirms with [`PlayerManager::finalize_import`].

use std::collections::VecDeque;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;
use vault_snapshot::GameMode;

use crate::error::{CoreError, CoreResult};
use crate::groups::GroupTable;
use crate::host::{Host, ImportReporter, Importer};
use crate::manager::{CoreState, PlayerManager, StoreEvent};
use crate::scheduler::{Tick, TimerControl};

/// Players translated per timer run.
const PLAYERS_PER_BATCH: usize = 16;

/// Ticks between batches.
const TICKS_BETWEEN_BATCHES: Tick = 1;

/// Ticks before the first batch, leaving the kick messages time to flush.
const INITIAL_DELAY_TICKS: Tick = 2;

/// A progress line is forced at this batch even if the percentage has not
/// moved, so the operator sees the run is alive on very large databases.
const FORCED_REPORT_BATCH: usize = 3;

const MAINTENANCE_KICK_MESSAGE: &str = "Maintenance in progress, please come back later.";

/// Where an import run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    NotStarted,
    Running,
    Completed,
}

/// The login gate. Closed for everyone while an import runs or awaits the
/// operator's confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginGate {
    #[default]
    Open,
    Importing,
    AwaitingOperator,
}

/// A point-in-time progress report for an import run.
#[derive(Debug, Clone, Copy)]
pub struct ImportStatus {
    pub phase: ImportPhase,
    pub processed: usize,
    pub total: usize,
    /// Rounded whole percentage of players processed.
    pub percentage: i32,
    /// Cumulative moving average cost of one player, in milliseconds.
    pub mean_cost_ms: f64,
    /// Estimated remaining wall time, in milliseconds.
    pub eta_ms: f64,
}

/// Cumulative moving average after folding in the `n`-th sample.
pub(crate) fn update_mean(mean: f64, n: usize, sample: f64) -> f64 {
    (sample + (n as f64 - 1.0) * mean) / n as f64
}

pub(crate) struct ImportProcess {
    importer: Box<dyn Importer>,
    reporter: Box<dyn ImportReporter>,
    queue: VecDeque<Uuid>,
    /// Group names captured from the importer at the start of the run.
    groups: Vec<String>,
    total: usize,
    processed: usize,
    mean_cost_ms: f64,
    last_percentage: i32,
    batches_run: usize,
    phase: ImportPhase,
}

impl ImportProcess {
    fn percentage(&self) -> i32 {
        if self.total == 0 {
            100
        } else {
            ((self.processed as f64 / self.total as f64) * 100.0).round() as i32
        }
    }

    fn eta_ms(&self) -> f64 {
        self.mean_cost_ms * self.queue.len() as f64
    }

    pub(crate) fn status(&self) -> ImportStatus {
        ImportStatus {
            phase: self.phase,
            processed: self.processed,
            total: self.total,
            percentage: self.percentage(),
            mean_cost_ms: self.mean_cost_ms,
            eta_ms: self.eta_ms(),
        }
    }

    /// Report progress when the rounded percentage moved, plus one forced
    /// checkpoint early in the run.
    fn maybe_report_progress(&mut self) {
        let percentage = self.percentage();
        if percentage == self.last_percentage && self.batches_run != FORCED_REPORT_BATCH {
            return;
        }
        self.last_percentage = percentage;

        let eta_seconds = (self.eta_ms() / 1000.0).ceil() as u64;
        let text = format!(
            "Importing snapshots from {}: {percentage}%... ({} of {} players, about {eta_seconds}s remaining)",
            self.importer.name(),
            self.processed,
            self.total,
        );
        info!("{text}");
        self.reporter.message(&text);
    }
}

impl<H: Host> CoreState<H> {
    /// The message a login attempt is denied with, or `None` when the gate
    /// is open.
    pub(crate) fn login_denied_message(&self) -> Option<String> {
        match self.login_gate {
            LoginGate::Open => None,
            LoginGate::Importing => {
                let progress = self.import.as_ref().map_or_else(String::new, |import| {
                    let status = import.status();
                    let eta_seconds = (status.eta_ms / 1000.0).ceil() as u64;
                    format!(
                        "\n{}% completed ({} of {} players, about {eta_seconds}s remaining)",
                        status.percentage, status.processed, status.total
                    )
                });
                Some(format!("{MAINTENANCE_KICK_MESSAGE}{progress}"))
            }
            LoginGate::AwaitingOperator => Some(format!(
                "{MAINTENANCE_KICK_MESSAGE}\nThe import is complete; the server reopens shortly."
            )),
        }
    }

    /// One timer run of the import pipeline: translate a bounded batch of
    /// players, then report and reschedule. Cancels itself on completion.
    pub(crate) fn process_import_batch(&mut self) -> TimerControl {
        let Some(import) = self.import.as_mut() else {
            return TimerControl::Cancel;
        };

        for _ in 0..PLAYERS_PER_BATCH {
            let Some(player) = import.queue.pop_front() else {
                import.phase = ImportPhase::Completed;
                import.importer.on_end();
                import.reporter.message(
                    "Import complete. Run the finalize command to reopen the server.",
                );
                info!(
                    processed = import.processed,
                    "import complete; awaiting operator confirmation"
                );
                self.login_gate = LoginGate::AwaitingOperator;
                return TimerControl::Cancel;
            };

            let started = Instant::now();

            for group in &import.groups {
                for mode in GameMode::ALL {
                    match import.importer.import_snapshot(player, group, mode) {
                        Ok(Some(snapshot)) => {
                            let tx = self.events_tx.clone();
                            let group_name = group.clone();
                            self.store.save(player, group, mode, &snapshot, move |result| {
                                let _ = tx.send(StoreEvent::Saved {
                                    player,
                                    group: group_name,
                                    mode,
                                    result,
                                });
                            });
                        }
                        // Nothing worth keeping for this key.
                        Ok(None) => {}
                        Err(error) => {
                            warn!(
                                %player, group, %mode, %error,
                                "unable to import this record; skipping it"
                            );
                        }
                    }
                }
            }

            import.processed += 1;
            import.mean_cost_ms = update_mean(
                import.mean_cost_ms,
                import.processed,
                started.elapsed().as_secs_f64() * 1000.0,
            );
        }

        import.batches_run += 1;
        import.maybe_report_progress();
        TimerControl::Continue
    }
}

impl<H: Host> PlayerManager<H> {
    /// Start an import run.
    ///
    /// The importer's availability is checked before anything disruptive
    /// happens; only then is every connected player kicked and the login
    /// gate closed. The importer's own world grouping replaces the
    /// configured table for the run.
    pub fn begin_import(
        &mut self,
        importer: Box<dyn Importer>,
        mut reporter: Box<dyn ImportReporter>,
    ) -> CoreResult<()> {
        if self.state.import.is_some() || self.state.login_gate != LoginGate::Open {
            return Err(CoreError::ImportAlreadyRunning);
        }

        if !importer.can_import() {
            let name = importer.name().to_owned();
            reporter.message(&format!(
                "The {name} importer cannot run, probably due to a missing dependency. Aborting."
            ));
            return Err(CoreError::ImporterUnavailable(name));
        }

        for player in self.state.host.online_players() {
            self.state.host.kick(player, MAINTENANCE_KICK_MESSAGE);
        }
        self.state.stashes.clear();
        self.state.login_gate = LoginGate::Importing;

        let mut importer = importer;
        importer.on_begin();

        // The importer's own grouping governs this run only; the configured
        // resolver is left alone and stays in force afterwards.
        let group_table = GroupTable::from_groups(importer.world_groups());
        info!("world groups found by the {} importer:", importer.name());
        for (group, worlds) in group_table.iter() {
            info!(group, worlds = ?worlds);
        }

        let queue: VecDeque<Uuid> = self.state.host.all_known_players().into();
        let total = queue.len();

        reporter.message(&format!(
            "Starting import from {}: {total} players, {PLAYERS_PER_BATCH} per batch every \
             {TICKS_BETWEEN_BATCHES} tick(s).",
            importer.name()
        ));
        reporter.message("Progress is reported here and in the console.");
        info!(total, "import started");

        self.state.import = Some(ImportProcess {
            importer,
            reporter,
            queue,
            groups: group_table.group_names(),
            total,
            processed: 0,
            mean_cost_ms: 0.0,
            last_percentage: -1,
            batches_run: 0,
            phase: ImportPhase::Running,
        });

        self.scheduler
            .run_timer(INITIAL_DELAY_TICKS, TICKS_BETWEEN_BATCHES, |state, _| {
                state.process_import_batch()
            });

        Ok(())
    }

    /// Operator confirmation after a completed import: reopen the login
    /// gate and drop the finished run. Returns false when there is nothing
    /// awaiting confirmation.
    pub fn finalize_import(&mut self) -> bool {
        if self.state.login_gate != LoginGate::AwaitingOperator {
            return false;
        }

        self.state.login_gate = LoginGate::Open;
        self.state.import = None;
        info!("import finalized; logins are open again");
        true
    }

    #[must_use]
    pub fn login_gate(&self) -> LoginGate {
        self.state.login_gate
    }

    /// Progress of the current import run, if one exists.
    #[must_use]
    pub fn import_status(&self) -> Option<ImportStatus> {
        self.state.import.as_ref().map(ImportProcess::status)
    }
}
