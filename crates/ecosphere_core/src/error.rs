use thiserror::Error;

/// Engine error taxonomy.
///
/// Soft errors are contained at phase boundaries and logged as
/// severity-error events; only invariant violations abort a run.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invariant violation: {0}")]
    Invariant(String),

    #[error("{subsystem}: {message}")]
    Subsystem { subsystem: String, message: String },

    #[error("persistence failure: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("snapshot encoding failure: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl SimError {
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, SimError::Invariant(_) | SimError::Config(_))
    }
}
