//! # Dispatch Jobs
//!
//! Runs `pipeline::dispatch::dispatch_batch` in the background for uploads and
//! resends.
//!
//! ## Workflow:
//!
//! 1.  `schedule_dispatch_job` claims the batch, creates a `job_id`, registers it
//!     as `Pending` and returns it to the caller right away. A batch that already
//!     has a run in flight is refused, so no recipient is messaged twice by
//!     overlapping runs.
//! 2.  A Tokio task drives the dispatch. After every record it reports
//!     `InProgress(percent)` through the `JobsState` channel, skipping repeats of
//!     the same percentage.
//! 3.  When the run ends the job becomes `Completed` with the JSON-encoded
//!     `DispatchReport`, or `Failed` with the error that stopped it. Records the
//!     run did not reach stay as they were. The batch claim is released when the
//!     task ends.

use super::state::{JobUpdate, JobsState};
use crate::channel::MessageChannel;
use crate::error::{PipelineError, Result};
use crate::pipeline::dispatch::dispatch_batch;
use crate::store::Store;
use common::jobs::JobStatus;
use log::{error, info};
use std::sync::Arc;
use uuid::Uuid;

/// Start dispatching `batch_id` in the background and return the job id.
///
/// Fails with `InvalidInput` while another job is dispatching the same batch.
pub async fn schedule_dispatch_job(
    state: &JobsState,
    store: Store,
    channel: Arc<dyn MessageChannel>,
    batch_id: i64,
) -> Result<String> {
    let claim = state.claim_batch(batch_id).ok_or_else(|| {
        PipelineError::InvalidInput(format!("batch {} is already being dispatched", batch_id))
    })?;

    let job_id = Uuid::new_v4().to_string();
    state
        .jobs
        .write()
        .await
        .insert(job_id.clone(), JobStatus::Pending);

    let tx = state.tx.clone();
    let job = job_id.clone();
    tokio::spawn(async move {
        let progress_tx = tx.clone();
        let progress_job = job.clone();
        let mut last_percent = None;
        let progress = move |processed: usize, total: usize| {
            let percent = if total > 0 {
                (processed as f32 / total as f32 * 100.0) as u32
            } else {
                100
            };
            if last_percent != Some(percent) {
                last_percent = Some(percent);
                // Progress is best effort; a full channel drops the update.
                let _ = progress_tx.try_send(JobUpdate {
                    job_id: progress_job.clone(),
                    status: JobStatus::InProgress(percent),
                });
            }
        };

        let status = match dispatch_batch(&store, channel.as_ref(), batch_id, progress).await {
            Ok(report) => {
                info!("job {} finished dispatching batch {}", job, batch_id);
                JobStatus::Completed(serde_json::to_string(&report).unwrap_or_default())
            }
            Err(e) => {
                error!("job {} failed dispatching batch {}: {}", job, batch_id, e);
                JobStatus::Failed(e.to_string())
            }
        };
        // The batch is free again once a final status is published.
        drop(claim);
        let _ = tx.send(JobUpdate { job_id: job, status }).await;
    });

    Ok(job_id)
}
