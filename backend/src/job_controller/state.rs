//! Manages the state of background dispatch jobs.
//!
//! Sending a whole batch takes one channel round-trip per record, so uploads
//! and resends return a job id immediately and the dispatch runs outside the
//! request/response cycle (see `job_controller::dispatch`).
//!
//! The main components are:
//! - `JobsState`: a clonable, thread-safe struct holding the status of every job.
//!   It is injected into the Actix application state in `main.rs`.
//! - `JobUpdate`: a message carrying a status change from a running job.
//! - `BatchClaim`: held by a running dispatch job so no second job starts on the
//!   same batch.
//! - `start_job_updater`: a long-running task that applies `JobUpdate`s received
//!   on an MPSC channel to the shared map. Only the most recent finished jobs are
//!   kept.

use common::jobs::JobStatus;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, RwLock};

/// Finished (completed or failed) jobs kept for status queries.
pub const FINISHED_JOBS_KEPT: usize = 1000;

/// A thread-safe, shareable container for the state of all background jobs.
#[derive(Clone)]
pub struct JobsState {
    /// Job id to its latest status. Read by `GET /api/jobs/{job_id}`, written
    /// by `start_job_updater` and by the job scheduler.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,

    /// Running jobs push their progress here instead of locking `jobs`.
    pub tx: mpsc::Sender<JobUpdate>,

    /// Batches with a dispatch job in flight.
    dispatching: Arc<Mutex<HashSet<i64>>>,
}

impl JobsState {
    /// Create the state and the receiver that `start_job_updater` must drain.
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<JobUpdate>) {
        let (tx, rx) = mpsc::channel(buffer);
        let state = JobsState {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            tx,
            dispatching: Arc::default(),
        };
        (state, rx)
    }

    pub async fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Reserve `batch_id` for one dispatch run. `None` while another run holds
    /// it; the reservation ends when the returned claim is dropped.
    pub fn claim_batch(&self, batch_id: i64) -> Option<BatchClaim> {
        let mut dispatching = self.dispatching.lock().unwrap_or_else(|p| p.into_inner());
        dispatching.insert(batch_id).then(|| BatchClaim {
            batch_id,
            dispatching: self.dispatching.clone(),
        })
    }

    pub fn is_dispatching(&self, batch_id: i64) -> bool {
        self.dispatching
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&batch_id)
    }
}

/// Exclusive right to dispatch one batch.
#[derive(Debug)]
pub struct BatchClaim {
    batch_id: i64,
    dispatching: Arc<Mutex<HashSet<i64>>>,
}

impl Drop for BatchClaim {
    fn drop(&mut self) {
        self.dispatching
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.batch_id);
    }
}

/// A status update for one background job.
#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

/// Apply `JobUpdate`s to the shared map until every sender is dropped.
///
/// Takes the map rather than the whole `JobsState` so the updater itself does
/// not keep the channel open.
pub async fn start_job_updater(
    jobs: Arc<RwLock<HashMap<String, JobStatus>>>,
    rx: mpsc::Receiver<JobUpdate>,
) {
    apply_job_updates(jobs, rx, FINISHED_JOBS_KEPT).await;
}

/// Updater loop keeping at most `keep_finished` finished jobs, dropping the
/// oldest first.
pub(crate) async fn apply_job_updates(
    jobs: Arc<RwLock<HashMap<String, JobStatus>>>,
    mut rx: mpsc::Receiver<JobUpdate>,
    keep_finished: usize,
) {
    let mut finished = VecDeque::new();
    while let Some(update) = rx.recv().await {
        let mut jobs = jobs.write().await;
        if matches!(update.status, JobStatus::Completed(_) | JobStatus::Failed(_)) {
            finished.push_back(update.job_id.clone());
        }
        jobs.insert(update.job_id, update.status);
        while finished.len() > keep_finished {
            if let Some(oldest) = finished.pop_front() {
                jobs.remove(&oldest);
            }
        }
    }
}
