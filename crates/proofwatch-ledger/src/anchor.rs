//! The ledger anchor capability consumed by the integrity engine.
//!
//! The engine never constructs, signs or submits ledger transactions
//! itself; it consumes the narrow [`LedgerAnchor`] trait. Keeping the
//! boundary this thin lets every integrity property be tested against the
//! deterministic in-memory implementation, independent of real network or
//! ledger behavior. Idempotency and retry policy belong to the anchor
//! implementation, not to its callers.

use crate::error::{AnchorError, Result};
use async_trait::async_trait;
use proofwatch_core::{normalize_hex, LedgerNetwork};
use serde::{Deserialize, Serialize};

/// Half-width of the ledger-index window scanned when a transaction must
/// be located by memo instead of by known hash.
pub const MEMO_SCAN_SPAN: u32 = 2000;

/// Outcome of anchoring a digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorReceipt {
    /// Whether the ledger validated the transaction.
    pub validated: bool,
    /// Hash of the anchoring transaction, when known.
    pub tx_hash: Option<String>,
    /// Ledger index the transaction validated in.
    pub ledger_index: Option<u32>,
    /// The digest as embedded in the transaction memo, normalized hex.
    pub memo_hex: String,
}

/// A ledger transaction as seen by memo lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTx {
    /// Transaction hash.
    pub hash: String,
    /// Ledger index the transaction validated in.
    pub ledger_index: u32,
    /// Memo data entries, normalized hex.
    pub memos: Vec<String>,
}

impl LedgerTx {
    /// True if any memo equals the expected digest (formatting-insensitive).
    pub fn memo_matches(&self, expected: &str) -> bool {
        let expected = normalize_hex(expected);
        self.memos.iter().any(|m| normalize_hex(m) == expected)
    }
}

/// Lookup key for [`LedgerAnchor::find_memo`]: either a known transaction
/// hash, or an account plus ledger position plus expected memo for a
/// bounded scan.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoQuery {
    /// Known transaction hash, if any. Takes precedence over scanning.
    pub tx_hash: Option<String>,
    /// Account whose transactions to scan.
    pub account: Option<String>,
    /// Center of the scanned ledger-index window.
    pub ledger_index: Option<u32>,
    /// Expected memo digest, normalized for comparison.
    pub memo_hex: Option<String>,
}

impl MemoQuery {
    /// Direct lookup by known transaction hash.
    pub fn by_tx(tx_hash: impl Into<String>) -> Self {
        Self {
            tx_hash: Some(tx_hash.into()),
            account: None,
            ledger_index: None,
            memo_hex: None,
        }
    }

    /// Bounded scan of `account`'s transactions around `ledger_index` for
    /// one whose memo matches `memo_hex`.
    pub fn by_scan(
        account: impl Into<String>,
        ledger_index: u32,
        memo_hex: impl Into<String>,
    ) -> Self {
        Self {
            tx_hash: None,
            account: Some(account.into()),
            ledger_index: Some(ledger_index),
            memo_hex: Some(normalize_hex(&memo_hex.into())),
        }
    }
}

/// Parameters for creating a conditional ledger payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowCreate {
    /// Destination account.
    pub destination: String,
    /// Escrowed amount in drops.
    pub amount_drops: String,
    /// Optional cancel time-lock, seconds from now.
    pub cancel_after_secs: Option<u64>,
    /// Optional finish time-lock, seconds from now.
    pub finish_after_secs: Option<u64>,
    /// Optional crypto-condition, hex.
    pub condition_hex: Option<String>,
    /// Optional integrity memo, hex.
    pub memo_hex: Option<String>,
}

/// Parameters for finishing a conditional ledger payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowFinish {
    /// Account that created the escrow.
    pub owner: String,
    /// Sequence number of the escrow-create transaction.
    pub offer_sequence: u32,
    /// Fulfillment for the crypto-condition, hex.
    pub fulfillment_hex: Option<String>,
    /// Optional memo, hex.
    pub memo_hex: Option<String>,
}

/// Outcome of an escrow operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowReceipt {
    /// Whether the ledger validated the transaction.
    pub validated: bool,
    /// Hash of the escrow transaction.
    pub tx_hash: Option<String>,
    /// Ledger index the transaction validated in.
    pub ledger_index: Option<u32>,
    /// Sequence number needed to finish the escrow (create only).
    pub offer_sequence: Option<u32>,
}

/// The anchoring capability.
///
/// Two concerns: anchoring a digest into a transaction memo, and locating
/// a previously anchored digest. Escrow operations ride along as thin
/// pass-throughs; they share the network identity and nothing else.
#[async_trait]
pub trait LedgerAnchor: Send + Sync {
    /// Network this anchor submits to.
    fn network(&self) -> LedgerNetwork;

    /// Anchoring account, when configured.
    fn account(&self) -> Option<String>;

    /// Anchors a digest by embedding it as transaction memo data.
    ///
    /// Returns [`AnchorError::Disabled`] when anchoring is not configured;
    /// any other error is a failed attempt, terminal for this submission.
    async fn submit(&self, digest: &str) -> Result<AnchorReceipt>;

    /// Locates a transaction by known hash, or by scanning a bounded
    /// ledger-index window for one whose memo matches. `Ok(None)` means
    /// conclusively not found; `Err` means the lookup was inconclusive.
    async fn find_memo(&self, query: &MemoQuery) -> Result<Option<LedgerTx>>;

    /// Creates a conditional ledger payment.
    async fn create_escrow(&self, req: &EscrowCreate) -> Result<EscrowReceipt>;

    /// Finishes a conditional ledger payment.
    async fn finish_escrow(&self, req: &EscrowFinish) -> Result<EscrowReceipt>;
}

/// Anchor used when no ledger is configured. Every operation reports
/// [`AnchorError::Disabled`]; baselining proceeds with `status = pending`
/// and verification treats ledger checks as inconclusive.
#[derive(Debug, Clone, Default)]
pub struct DisabledAnchor;

#[async_trait]
impl LedgerAnchor for DisabledAnchor {
    fn network(&self) -> LedgerNetwork {
        LedgerNetwork::Testnet
    }

    fn account(&self) -> Option<String> {
        None
    }

    async fn submit(&self, _digest: &str) -> Result<AnchorReceipt> {
        Err(AnchorError::Disabled)
    }

    async fn find_memo(&self, _query: &MemoQuery) -> Result<Option<LedgerTx>> {
        Err(AnchorError::Disabled)
    }

    async fn create_escrow(&self, _req: &EscrowCreate) -> Result<EscrowReceipt> {
        Err(AnchorError::Disabled)
    }

    async fn finish_escrow(&self, _req: &EscrowFinish) -> Result<EscrowReceipt> {
        Err(AnchorError::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memo_matches_is_formatting_insensitive() {
        let tx = LedgerTx {
            hash: "ABC".to_string(),
            ledger_index: 10,
            memos: vec!["AABBCC".to_string()],
        };
        assert!(tx.memo_matches("aabbcc"));
        assert!(tx.memo_matches("0xAABBCC"));
        assert!(!tx.memo_matches("aabbcd"));
    }

    #[tokio::test]
    async fn test_disabled_anchor_reports_disabled() {
        let anchor = DisabledAnchor;
        assert!(matches!(
            anchor.submit("aa").await.unwrap_err(),
            AnchorError::Disabled
        ));
        assert!(matches!(
            anchor.find_memo(&MemoQuery::by_tx("X")).await.unwrap_err(),
            AnchorError::Disabled
        ));
    }
}
