//! Error types for ledger anchoring.

use thiserror::Error;

/// Errors from the anchoring capability.
///
/// `Disabled` is an expected outcome, not a fault: it distinguishes
/// "anchoring is not configured" from a genuine operational failure, so
/// callers never have to infer configuration state from caught exceptions.
#[derive(Debug, Error)]
pub enum AnchorError {
    /// Anchoring is not configured (no network client, account or key).
    /// Baselines proceed without a ledger transaction.
    #[error("ledger anchoring is disabled")]
    Disabled,

    /// Submitting the anchoring transaction failed. Absorbed by the
    /// watcher into `status = failed` with this text recorded.
    #[error("ledger submission failed: {0}")]
    Submission(String),

    /// A ledger lookup failed. Treated as inconclusive by verification.
    #[error("ledger lookup failed: {0}")]
    Lookup(String),

    /// The configured signing key does not control the configured account.
    #[error("seed/account mismatch")]
    KeyMismatch,
}

/// Result type for anchor operations.
pub type Result<T> = std::result::Result<T, AnchorError>;
