//! Lifecycle supervision of per-match workers.
//!
//! The supervisor owns the registry of running workers. It is an
//! explicit, injected object shared (behind `Arc`) by the discovery
//! cycle and the HTTP control endpoints; all registry access goes
//! through its mutex.

use crate::error::{Result, ScrapeError};
use crate::worker::MatchWorker;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wicketwatch_core::MatchId;
use wicketwatch_db::{tracked_matches, Database};

/// Observable status of one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    /// The worker loop is running.
    Running,
    /// A stop has been signalled; the worker has not yet been joined.
    Stopping,
}

/// Registry entry for one worker.
///
/// The join handle is taken out by the stop path; an entry with a taken
/// handle still blocks duplicate starts until the stop completes.
struct WorkerHandle {
    status: WorkerStatus,
    cancel: CancellationToken,
    join: Option<JoinHandle<()>>,
}

/// Owns the per-match workers: starts one per added identifier, stops
/// one per removed identifier, and guarantees at most one worker per
/// identifier at any time.
pub struct WorkerSupervisor {
    worker: Arc<dyn MatchWorker>,
    db: Arc<Database>,
    workers: Mutex<HashMap<MatchId, WorkerHandle>>,
}

impl WorkerSupervisor {
    /// Create a supervisor spawning the given worker implementation.
    #[must_use]
    pub fn new(worker: Arc<dyn MatchWorker>, db: Arc<Database>) -> Self {
        Self {
            worker,
            db,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Launch a worker for the identifier.
    ///
    /// # Errors
    /// Returns `AlreadyRunning` when a handle (running or stopping)
    /// already exists; no second worker is created.
    pub fn start(&self, id: MatchId) -> Result<()> {
        let mut workers = self.workers.lock().expect("registry lock poisoned");
        if workers.contains_key(&id) {
            return Err(ScrapeError::AlreadyRunning(id));
        }

        let cancel = CancellationToken::new();
        let join = tokio::spawn({
            let worker = Arc::clone(&self.worker);
            let worker_id = id.clone();
            let worker_cancel = cancel.clone();
            async move {
                worker.run(worker_id, worker_cancel).await;
            }
        });

        tracing::info!("Scraping started for {}", id);
        workers.insert(
            id,
            WorkerHandle {
                status: WorkerStatus::Running,
                cancel,
                join: Some(join),
            },
        );
        Ok(())
    }

    /// Stop the worker for the identifier.
    ///
    /// Two-phase protocol: signal the cancellation token, wait up to
    /// `timeout` for the task to exit, then unconditionally remove the
    /// handle and delete the persisted record. A worker that missed the
    /// deadline keeps running briefly; it will observe the flag at its
    /// next poll, and nothing will restart it unless the identifier is
    /// rediscovered.
    ///
    /// # Errors
    /// Returns `NotFound` when no handle exists; the store is not touched.
    pub async fn stop(&self, id: &MatchId, timeout: Duration) -> Result<()> {
        let (cancel, join) = {
            let mut workers = self.workers.lock().expect("registry lock poisoned");
            match workers.get_mut(id) {
                None => return Err(ScrapeError::NotFound(id.clone())),
                Some(handle) => {
                    handle.status = WorkerStatus::Stopping;
                    (handle.cancel.clone(), handle.join.take())
                }
            }
        };

        tracing::info!("Stopping scraping for {}", id);
        cancel.cancel();

        if let Some(mut join) = join {
            match tokio::time::timeout(timeout, &mut join).await {
                Ok(Ok(())) => tracing::info!("Scraping stopped for {}", id),
                Ok(Err(e)) => tracing::error!("Worker task for {} panicked: {}", id, e),
                Err(_) => tracing::warn!(
                    "Worker for {} is still alive after {:?}, cleaning up anyway",
                    id,
                    timeout
                ),
            }
        }

        self.workers
            .lock()
            .expect("registry lock poisoned")
            .remove(id);
        tracked_matches::delete(self.db.pool(), id).await?;
        Ok(())
    }

    /// Whether a handle exists for the identifier.
    #[must_use]
    pub fn is_tracking(&self, id: &MatchId) -> bool {
        self.workers
            .lock()
            .expect("registry lock poisoned")
            .contains_key(id)
    }

    /// Snapshot of every registered worker and its status.
    #[must_use]
    pub fn running(&self) -> HashMap<MatchId, WorkerStatus> {
        self.workers
            .lock()
            .expect("registry lock poisoned")
            .iter()
            .map(|(id, handle)| (id.clone(), handle.status))
            .collect()
    }

    /// Cancel and drain every worker. Used at process shutdown.
    pub async fn shutdown(&self, timeout: Duration) {
        let drained: Vec<(MatchId, WorkerHandle)> = {
            let mut workers = self.workers.lock().expect("registry lock poisoned");
            workers.drain().collect()
        };

        for (_, handle) in &drained {
            handle.cancel.cancel();
        }
        for (id, handle) in drained {
            if let Some(join) = handle.join {
                if tokio::time::timeout(timeout, join).await.is_err() {
                    tracing::warn!("Worker for {} did not exit during shutdown", id);
                }
            }
        }
    }
}
