//! Error types for the signal store.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to open or access the database.
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    /// Failed to serialize or deserialize a record.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No record with the given id.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The record already carries a baseline; the baseline is write-once.
    #[error("baseline already exists for record {0}")]
    BaselineExists(String),

    /// The store is not configured to deliver change notifications.
    /// Callers fall back to polling.
    #[error("change feed unavailable")]
    FeedUnavailable,

    /// Stored bytes could not be interpreted.
    #[error("corrupt stored data: {0}")]
    Corrupt(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
