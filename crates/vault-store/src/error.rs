//! Store error types.

use thiserror::Error;

/// Store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error while reading or writing a snapshot file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot file exists but its content is unusable.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] vault_snapshot::SnapshotError),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
