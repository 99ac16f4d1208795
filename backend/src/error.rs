use thiserror::Error;

/// Errors raised by the store, the dispatch pipeline and the messaging channel.
///
/// A soft delivery failure (the channel answered but did not deliver) is not
/// an error; it is recorded as a `Failed` outcome on the record.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Upload rejected before anything was written.
    #[error("spreadsheet is missing the following required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// The channel could not be reached or broke mid-request.
    #[error("messaging channel fault: {0}")]
    ChannelFault(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// The uploaded file could not be read as a table.
    #[error("could not decode spreadsheet: {0}")]
    Decode(String),

    #[error("could not write export: {0}")]
    Encode(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A blocking store task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl PipelineError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        PipelineError::NotFound { entity, id }
    }

    /// Whether the error comes from the request rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingColumns(_)
                | PipelineError::Decode(_)
                | PipelineError::InvalidInput(_)
        )
    }
}

impl From<csv::Error> for PipelineError {
    fn from(e: csv::Error) -> Self {
        PipelineError::Decode(e.to_string())
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
