//! # ProofWatch Store
//!
//! Persistence for integrity-protected signal records, built on sled.
//!
//! The store plays two roles:
//!
//! 1. **Record storage** for the two monitored collections (coin and stock
//!    signals), each record carrying its embedded proof block.
//! 2. **Change source** for the watcher: every write appends to an ordered
//!    per-collection oplog and broadcasts to live subscribers, and the
//!    watcher's resume marker persists in a meta tree so a restart resumes
//!    from the last processed position instead of the start of time.
//!
//! The engine-side write operations encode the integrity invariants
//! directly: [`Collection::set_baseline`] is write-once,
//! [`Collection::record_tamper`] appends to the history and preserves the
//! baseline by construction, and [`Collection::enrich_tx`] only ever fills
//! previously-empty fields.

pub mod error;
pub mod storage;

pub use error::{Result, StoreError};
pub use storage::{ChangeEvent, ChangeOp, Collection, SignalStore, TamperUpdate};
