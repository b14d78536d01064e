//! Error types for verification.

use proofwatch_ledger::AnchorError;
use proofwatch_store::StoreError;
use thiserror::Error;

/// Errors surfaced to verification callers.
///
/// `InvalidQuery` (the caller's input is malformed), `NotFound` (the query
/// is well-formed but matches nothing) and `NoBaseline` (the record exists
/// but was never baselined) are distinct outcomes, never folded into each
/// other or into internal faults.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The query is malformed (unparseable timestamp, empty ticker, ...).
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// No record matches the resolved window.
    #[error("no matching record")]
    NotFound,

    /// The matched record carries no proof block.
    #[error("record has no baseline")]
    NoBaseline,

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A ledger operation that must succeed (escrow submission) failed.
    #[error(transparent)]
    Anchor(#[from] AnchorError),
}

/// Result type for verification operations.
pub type Result<T> = std::result::Result<T, VerifyError>;
