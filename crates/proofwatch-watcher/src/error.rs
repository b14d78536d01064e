//! Error type for the watcher loop.
//!
//! Per-record failures (a record that fails to baseline, an anchoring
//! attempt that errors) are absorbed into the record's proof block or
//! logged; only store-level failures escape the loop.

use proofwatch_store::StoreError;
use thiserror::Error;

/// Errors that terminate a watcher loop.
#[derive(Debug, Error)]
pub enum WatcherError {
    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;
