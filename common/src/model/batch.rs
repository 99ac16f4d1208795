use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One communication campaign ("event") tied to a single template.
///
/// A batch owns the records uploaded with it; deleting the batch removes its
/// records and their field values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: i64,
    pub template_id: i64,
    pub name: String,
    /// Free-form label chosen by staff (e.g. "Admission", "Fee reminder").
    pub kind: String,
    pub description: String,
    /// MD5 of the uploaded spreadsheet, if the batch was created from a file.
    pub source_md5: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A batch together with its delivery counters, as listed on the console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    #[serde(flatten)]
    pub batch: Batch,
    pub template_name: String,
    pub total_records: u64,
    /// Records whose last outcome is not `Sent` (pending included).
    pub failed_records: u64,
}

/// Result of one dispatch run over a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub batch_id: i64,
    /// Records loaded for the run.
    pub total: usize,
    /// Records for which the channel was called and the outcome stored.
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
}

impl DispatchReport {
    /// Records left untouched because the run stopped on a fault.
    pub fn not_attempted(&self) -> usize {
        self.total - self.attempted
    }
}
