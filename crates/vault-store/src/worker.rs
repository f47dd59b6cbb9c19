//! IO worker thread with main-line completion marshalling.
//!
//! Callers submit a unit of work plus a continuation. The work runs on a
//! dedicated worker thread; the continuation is queued and only executed
//! when the owning thread calls [`IoWorker::drain_completions`]. That keeps
//! the contract the rest of the workspace relies on: file IO never blocks
//! the main line, and results never touch game state from a foreign thread.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::error;

use crate::error::StoreResult;

type Job = Box<dyn FnOnce() -> Completion + Send + 'static>;
type Completion = Box<dyn FnOnce() + Send + 'static>;

/// A single background IO thread plus its completion queue.
pub struct IoWorker {
    jobs: Option<Sender<Job>>,
    completions: Receiver<Completion>,
    handle: Option<JoinHandle<()>>,
}

impl IoWorker {
    /// Spawn the worker thread.
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let (jobs_tx, jobs_rx) = unbounded::<Job>();
        let (done_tx, done_rx) = unbounded::<Completion>();

        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                for job in jobs_rx {
                    let completion = job();
                    if done_tx.send(completion).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            jobs: Some(jobs_tx),
            completions: done_rx,
            handle: Some(handle),
        })
    }

    /// Submit `work` for background execution; `callback` runs with its
    /// result during a later [`drain_completions`](Self::drain_completions).
    pub fn submit<T: Send + 'static>(
        &self,
        work: impl FnOnce() -> StoreResult<T> + Send + 'static,
        callback: impl FnOnce(StoreResult<T>) + Send + 'static,
    ) {
        let job: Job = Box::new(move || {
            let result = work();
            Box::new(move || callback(result))
        });

        let sent = self.jobs.as_ref().is_some_and(|tx| tx.send(job).is_ok());
        if !sent {
            // Only happens during shutdown; the callback is dropped.
            error!("io worker is gone, dropping submitted work");
        }
    }

    /// Run every queued continuation on the calling thread. Returns how
    /// many ran.
    pub fn drain_completions(&self) -> usize {
        let mut ran = 0;
        while let Ok(completion) = self.completions.try_recv() {
            completion();
            ran += 1;
        }
        ran
    }
}

impl Drop for IoWorker {
    fn drop(&mut self) {
        // Closing the job channel lets the worker finish its queue and exit.
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("io worker thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn completions_only_run_when_drained() {
        let worker = IoWorker::spawn("test-io").unwrap();
        let ran = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&ran);
        worker.submit(|| Ok(41), move |result| {
            assert_eq!(result.unwrap(), 41);
            flag.store(true, Ordering::SeqCst);
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        while worker.drain_completions() == 0 {
            assert!(Instant::now() < deadline, "worker never completed");
            thread::sleep(Duration::from_millis(1));
        }
        assert!(ran.load(Ordering::SeqCst));
    }
}
