//! # ProofWatch Verify
//!
//! The read side of the integrity engine: answers verification queries
//! about protected records, anchors and checks standalone credentials, and
//! passes validated escrow operations through to the ledger seam.
//!
//! The interesting part is [`verify::classify`]: all local, live and
//! on-ledger observations collapse into one [`VerdictCode`] with a fixed
//! precedence, so every caller sees the same interpretation of the same
//! facts.

pub mod credential;
pub mod error;
pub mod escrow;
pub mod verify;

pub use credential::{CredentialAnchor, CredentialCheck, CredentialProof};
pub use error::{Result, VerifyError};
pub use escrow::{EscrowOutcome, EscrowService};
pub use verify::{
    classify, resolve_window, LedgerCheck, VerdictCode, VerificationService, VerifyQuery,
    VerifyReport,
};
