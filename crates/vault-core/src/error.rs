//! Core error types.

use thiserror::Error;

/// Core error type.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The persistent store could not be opened or used.
    #[error("store error: {0}")]
    Store(#[from] vault_store::StoreError),

    /// The selected importer cannot run, usually because its data source
    /// is missing. Reported before anything disruptive happens.
    #[error("the {0} importer cannot run, probably due to a missing dependency")]
    ImporterUnavailable(String),

    /// Only one import may run at a time.
    #[error("an import is already running")]
    ImportAlreadyRunning,
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
