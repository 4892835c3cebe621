//! Error types for adapters.

use hardhat_sdk::StoreError;
use thiserror::Error;

/// Errors that can occur in the filesystem-backed stores.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored content could not be parsed.
    #[error("Failed to parse stored document: {0}")]
    Parse(String),

    /// A key or collection name cannot be mapped to a file name.
    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    /// The durable record does not exist.
    #[error("Record not found: {0}")]
    RecordNotFound(String),
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::Parse(err.to_string())
    }
}

impl From<AdapterError> for StoreError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Io(e) => StoreError::Io(e.to_string()),
            AdapterError::Parse(msg) => StoreError::Malformed(msg),
            AdapterError::InvalidName(name) => {
                StoreError::Malformed(format!("invalid name: {}", name))
            }
            AdapterError::RecordNotFound(id) => StoreError::RecordNotFound(id),
        }
    }
}

/// Only names made of ASCII alphanumerics, `-`, `_` and `.` map to files,
/// and never `.` or `..` alone.
pub(crate) fn check_name(name: &str) -> Result<(), AdapterError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(AdapterError::InvalidName(name.to_string()))
    }
}
