//! # ProofWatch Ledger
//!
//! The ledger anchoring seam: a narrow async [`LedgerAnchor`] trait plus
//! two implementations.
//!
//! - [`DisabledAnchor`] for deployments without a configured ledger; every
//!   operation reports [`AnchorError::Disabled`] so callers can tell
//!   "not configured" apart from "tried and failed".
//! - [`MemoryAnchor`] for tests and local runs, a deterministic fake
//!   ledger with switchable submission outcomes.
//!
//! A real network-backed anchor implements the same trait out of tree;
//! nothing in the engine depends on more than this surface.

pub mod anchor;
pub mod error;
pub mod memory;

pub use anchor::{
    AnchorReceipt, DisabledAnchor, EscrowCreate, EscrowFinish, EscrowReceipt, LedgerAnchor,
    LedgerTx, MemoQuery, MEMO_SCAN_SPAN,
};
pub use error::{AnchorError, Result};
pub use memory::{AnchorMode, MemoryAnchor};
