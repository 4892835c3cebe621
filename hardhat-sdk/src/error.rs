//! Error types for the monitoring engine.

use thiserror::Error;

/// Errors raised by storage collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The durable record does not exist.
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// Reading from or writing to the backend failed.
    #[error("storage I/O failed: {0}")]
    Io(String),

    /// A document could not be encoded or decoded.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// The backend refused the request or is offline.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the monitoring engine.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The gear id is not in the monitored set.
    #[error("Personnel not found: {0}")]
    PersonnelNotFound(String),

    /// A storage collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Encoding a notification or record failed.
    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),

    /// Thresholds or intervals are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Timers need a Tokio runtime and none is running.
    #[error("no Tokio runtime available to schedule {0}")]
    NoRuntime(&'static str),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Malformed(err.to_string())
    }
}
