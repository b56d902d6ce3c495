use thiserror::Error;

/// Errors that can occur during state store operations.
///
/// Any of these surfacing mid-invocation means the host is unavailable for
/// that invocation; nothing is partially committed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Read error: {reason}")]
    ReadError { reason: String },

    #[error("Write error: {reason}")]
    WriteError { reason: String },

    #[error("Batch error: {reason}")]
    BatchError { reason: String },

    #[error("Invalid range: start {start:?} is beyond end {end:?}")]
    InvalidRange { start: String, end: String },
}
