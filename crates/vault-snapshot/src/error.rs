//! Snapshot error types.

use thiserror::Error;

/// Snapshot error type.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The JSON text could not be parsed at all.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON was well-formed but does not describe a snapshot.
    #[error("malformed snapshot: {0}")]
    Malformed(&'static str),
}

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;
