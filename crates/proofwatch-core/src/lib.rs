//! # ProofWatch Core - Canonical Fingerprints for Signal Records
//!
//! This crate turns a trading signal record into a single, reproducible
//! cryptographic fingerprint. Everything else in the workspace (the change
//! watcher, the verification service, the ledger anchor) is built on the
//! guarantee established here: the same logical record always hashes to the
//! same digest, and any change to a meaning-bearing field changes it.
//!
//! ## What gets fingerprinted
//!
//! Only a fixed whitelist of meaning-bearing fields participates:
//!
//! | canonical key | source field | rounding |
//! |---------------|--------------|----------|
//! | `type`        | `strategy`   | — |
//! | `symbol`      | `ticker`     | — |
//! | `ts`          | `dateAdded`  | UTC instant, millisecond precision |
//! | `payload.close` | `close`    | 4 decimals |
//! | `payload.rsi` | `RSI_5` (coin) / `RSI_240` (stock) | 2 decimals |
//! | `payload.mn`  | `mn`         | 4 decimals |
//!
//! Storage ids, bookkeeping timestamps and the embedded proof block itself
//! are deliberately excluded: fields irrelevant to meaning cannot affect the
//! fingerprint and cannot be replayed into it.
//!
//! ## Threat Model
//!
//! The canonical form defends against:
//!
//! - **Key reordering**: object keys are sorted, so semantically identical
//!   records produce bytewise identical canonical strings.
//! - **Float representation noise**: per-field rounding means a value and
//!   its rounded form encode identically, so re-serialization through a
//!   database driver never produces a spurious mismatch.
//! - **Timezone ambiguity**: timestamps normalize to one UTC instant string
//!   regardless of how the producer encoded the zone.
//!
//! ## Example
//!
//! ```rust
//! use proofwatch_core::{canonical_string, sha256_hex, RecordKind, SignalRecord};
//! use chrono::{TimeZone, Utc};
//!
//! let record = SignalRecord {
//!     id: "abc".to_string(),
//!     ticker: "BITGET:BTCUSDT.P".to_string(),
//!     strategy: "buy/MN2".to_string(),
//!     date_added: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
//!     close: 97282.7,
//!     rsi_5: Some(22.51),
//!     rsi_240: None,
//!     mn: -0.6,
//!     proof: None,
//! };
//!
//! let canon = canonical_string(&record, RecordKind::Coin);
//! let digest = sha256_hex(&canon);
//! assert_eq!(digest.len(), 64);
//! assert_eq!(digest, sha256_hex(&canonical_string(&record, RecordKind::Coin)));
//! ```

pub mod canon;
pub mod hash;
pub mod model;

pub use canon::{canon_target, canonical_string, canonicalize, RecordKind};
pub use hash::{normalize_hex, sha256_hex};
pub use model::{
    LedgerNetwork, ProofBlock, ProofStatus, SignalRecord, TamperEvent,
};
