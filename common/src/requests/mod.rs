use serde::{Deserialize, Serialize};

/// Payload for creating a template together with its initial fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    pub channel_template: String,
    #[serde(default)]
    pub preview_text: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldRequest>,
}

/// Partial update of a template; absent members are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,
    pub channel_template: Option<String>,
    pub preview_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRequest {
    pub name: String,
    pub sequence: i32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial update of a field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFieldRequest {
    pub name: Option<String>,
    pub sequence: Option<i32>,
    pub active: Option<bool>,
}

/// Batch metadata sent as the `json` part of an upload, before the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBatchRequest {
    pub template_id: i64,
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

/// Partial update of a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBatchRequest {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub description: Option<String>,
}

/// Adds one record to an existing batch and sends it immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecordRequest {
    pub batch_id: i64,
    pub contact: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Values keyed by field name.
    #[serde(default)]
    pub values: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRecordRequest {
    pub contact: Option<String>,
    /// An empty string removes the stored email.
    pub email: Option<String>,
}

/// Response of an upload or resend: the batch and the job dispatching it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchScheduled {
    pub batch_id: i64,
    pub job_id: String,
}
