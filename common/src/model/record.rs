use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Last known delivery state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryOutcome {
    /// Never attempted.
    Pending,
    Sent,
    Failed,
}

impl DeliveryOutcome {
    pub fn from_delivered(delivered: bool) -> Self {
        if delivered {
            DeliveryOutcome::Sent
        } else {
            DeliveryOutcome::Failed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Pending => "pending",
            DeliveryOutcome::Sent => "sent",
            DeliveryOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeliveryOutcome::Pending),
            "sent" => Ok(DeliveryOutcome::Sent),
            "failed" => Ok(DeliveryOutcome::Failed),
            other => Err(format!("unknown delivery outcome '{}'", other)),
        }
    }
}

/// One (field, value) pair attached to a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub field_id: i64,
    pub field_name: String,
    pub value: String,
}

/// One recipient ("student") of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub batch_id: i64,
    /// WhatsApp number the notification goes to.
    pub contact: String,
    pub email: Option<String>,
    pub outcome: DeliveryOutcome,
    pub values: Vec<FieldValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn value_of(&self, field_name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.field_name == field_name)
            .map(|v| v.value.as_str())
    }

    /// Value stored for the field with id `field_id`. Names may repeat across
    /// a template's fields; ids do not.
    pub fn value_for(&self, field_id: i64) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.field_id == field_id)
            .map(|v| v.value.as_str())
    }
}

/// A record ready to be stored, produced by ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub contact: String,
    pub email: Option<String>,
    /// `(field_id, value)` pairs; fields missing from the row are absent.
    pub values: Vec<(i64, String)>,
}

/// Record labelled with its batch and template names, values keyed by field
/// name rather than field id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub id: i64,
    pub batch_name: String,
    pub template_name: String,
    pub values_by_name: BTreeMap<String, String>,
    pub contact: String,
    pub email: Option<String>,
    pub outcome: DeliveryOutcome,
}
