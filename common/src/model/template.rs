use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A notification template ("alert"): the messaging-channel template id plus
/// the named, ordered fields whose values fill its positional parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,
    /// Human display name, unique across templates.
    pub name: String,
    /// Identifier of the approved template on the messaging channel.
    pub channel_template: String,
    pub preview_text: Option<String>,
    pub fields: Vec<Field>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Active fields in resolution order (ascending `sequence`).
    ///
    /// The sort is stable, so fields sharing a sequence number keep the order
    /// in which they were fetched.
    pub fn ordered_fields(&self) -> Vec<&Field> {
        let mut fields: Vec<&Field> = self.fields.iter().filter(|f| f.active).collect();
        fields.sort_by_key(|f| f.sequence);
        fields
    }

    /// Names of the active fields in resolution order.
    pub fn field_names(&self) -> Vec<String> {
        self.ordered_fields()
            .into_iter()
            .map(|f| f.name.clone())
            .collect()
    }
}

/// One named slot of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: i64,
    pub template_id: i64,
    pub name: String,
    /// Position of the field in the channel's parameter list.
    pub sequence: i32,
    /// Inactive fields are neither required at upload nor sent.
    pub active: bool,
}
