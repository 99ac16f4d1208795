use serde::{Deserialize, Serialize};

/// Status of a background dispatch job, polled by clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    /// Percentage of records processed.
    InProgress(u32),
    /// JSON-encoded `DispatchReport` of the finished run.
    Completed(String),
    Failed(String),
}
