//! Deterministic in-memory anchor for tests and local runs.
//!
//! `MemoryAnchor` behaves like a tiny single-account ledger: submissions
//! become transactions with synthetic hashes and monotonically increasing
//! ledger indexes, and lookups scan them the way a real anchor scans an
//! account's history. The mode knob makes the three submission outcomes
//! (validated, pending, failed) reproducible on demand.

use crate::anchor::{
    AnchorReceipt, EscrowCreate, EscrowFinish, EscrowReceipt, LedgerAnchor, LedgerTx, MemoQuery,
    MEMO_SCAN_SPAN,
};
use crate::error::{AnchorError, Result};
use async_trait::async_trait;
use proofwatch_core::{normalize_hex, sha256_hex, LedgerNetwork};
use std::sync::Mutex;

/// How submissions behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorMode {
    /// Submissions validate immediately.
    Validate,
    /// Submissions are accepted but never validate.
    Pending,
    /// Submissions fail with a submission error.
    Fail,
}

#[derive(Debug, Default)]
struct LedgerState {
    txs: Vec<LedgerTx>,
    next_ledger_index: u32,
    next_sequence: u32,
}

/// In-memory [`LedgerAnchor`] implementation.
#[derive(Debug)]
pub struct MemoryAnchor {
    network: LedgerNetwork,
    account: String,
    mode: AnchorMode,
    state: Mutex<LedgerState>,
}

impl MemoryAnchor {
    /// Anchor whose submissions validate immediately.
    pub fn validating(account: impl Into<String>) -> Self {
        Self::with_mode(account, AnchorMode::Validate)
    }

    /// Anchor whose submissions stay pending.
    pub fn pending(account: impl Into<String>) -> Self {
        Self::with_mode(account, AnchorMode::Pending)
    }

    /// Anchor whose submissions fail.
    pub fn failing(account: impl Into<String>) -> Self {
        Self::with_mode(account, AnchorMode::Fail)
    }

    /// Anchor with an explicit mode.
    pub fn with_mode(account: impl Into<String>, mode: AnchorMode) -> Self {
        Self {
            network: LedgerNetwork::Testnet,
            account: account.into(),
            mode,
            state: Mutex::new(LedgerState {
                txs: Vec::new(),
                next_ledger_index: 1000,
                next_sequence: 1,
            }),
        }
    }

    /// Number of transactions recorded so far.
    pub fn tx_count(&self) -> usize {
        self.state.lock().expect("anchor state poisoned").txs.len()
    }

    fn record_tx(&self, memo: Option<String>) -> (String, u32) {
        let mut state = self.state.lock().expect("anchor state poisoned");
        let ledger_index = state.next_ledger_index;
        state.next_ledger_index += 1;
        let hash = sha256_hex(&format!("{}:{}:{}", self.account, ledger_index, memo.as_deref().unwrap_or("")))
            .to_uppercase();
        state.txs.push(LedgerTx {
            hash: hash.clone(),
            ledger_index,
            memos: memo.into_iter().collect(),
        });
        (hash, ledger_index)
    }
}

#[async_trait]
impl LedgerAnchor for MemoryAnchor {
    fn network(&self) -> LedgerNetwork {
        self.network
    }

    fn account(&self) -> Option<String> {
        Some(self.account.clone())
    }

    async fn submit(&self, digest: &str) -> Result<AnchorReceipt> {
        if self.mode == AnchorMode::Fail {
            return Err(AnchorError::Submission("memory anchor in fail mode".to_string()));
        }
        let memo = normalize_hex(digest);
        let (tx_hash, ledger_index) = self.record_tx(Some(memo.clone()));
        Ok(AnchorReceipt {
            validated: self.mode == AnchorMode::Validate,
            tx_hash: Some(tx_hash),
            ledger_index: Some(ledger_index),
            memo_hex: memo,
        })
    }

    async fn find_memo(&self, query: &MemoQuery) -> Result<Option<LedgerTx>> {
        let state = self.state.lock().expect("anchor state poisoned");

        if let Some(tx_hash) = &query.tx_hash {
            return Ok(state.txs.iter().find(|t| &t.hash == tx_hash).cloned());
        }

        let (Some(account), Some(center), Some(memo)) =
            (&query.account, query.ledger_index, &query.memo_hex)
        else {
            return Ok(None);
        };
        if account != &self.account {
            return Ok(None);
        }
        let min = center.saturating_sub(MEMO_SCAN_SPAN);
        let max = center.saturating_add(MEMO_SCAN_SPAN);
        Ok(state
            .txs
            .iter()
            .find(|t| t.ledger_index >= min && t.ledger_index <= max && t.memo_matches(memo))
            .cloned())
    }

    async fn create_escrow(&self, req: &EscrowCreate) -> Result<EscrowReceipt> {
        if self.mode == AnchorMode::Fail {
            return Err(AnchorError::Submission("memory anchor in fail mode".to_string()));
        }
        let memo = req.memo_hex.as_deref().map(normalize_hex);
        let (tx_hash, ledger_index) = self.record_tx(memo);
        let offer_sequence = {
            let mut state = self.state.lock().expect("anchor state poisoned");
            let seq = state.next_sequence;
            state.next_sequence += 1;
            seq
        };
        Ok(EscrowReceipt {
            validated: self.mode == AnchorMode::Validate,
            tx_hash: Some(tx_hash),
            ledger_index: Some(ledger_index),
            offer_sequence: Some(offer_sequence),
        })
    }

    async fn finish_escrow(&self, req: &EscrowFinish) -> Result<EscrowReceipt> {
        if self.mode == AnchorMode::Fail {
            return Err(AnchorError::Submission("memory anchor in fail mode".to_string()));
        }
        let memo = req.memo_hex.as_deref().map(normalize_hex);
        let (tx_hash, ledger_index) = self.record_tx(memo);
        Ok(EscrowReceipt {
            validated: self.mode == AnchorMode::Validate,
            tx_hash: Some(tx_hash),
            ledger_index: Some(ledger_index),
            offer_sequence: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_validating() {
        let anchor = MemoryAnchor::validating("rTEST");
        let receipt = anchor.submit("0xAABB").await.unwrap();
        assert!(receipt.validated);
        assert_eq!(receipt.memo_hex, "aabb");
        assert!(receipt.tx_hash.is_some());
        assert!(receipt.ledger_index.is_some());
    }

    #[tokio::test]
    async fn test_submit_pending_and_failing() {
        let pending = MemoryAnchor::pending("rTEST");
        assert!(!pending.submit("aa").await.unwrap().validated);

        let failing = MemoryAnchor::failing("rTEST");
        assert!(matches!(
            failing.submit("aa").await.unwrap_err(),
            AnchorError::Submission(_)
        ));
        assert_eq!(failing.tx_count(), 0);
    }

    #[tokio::test]
    async fn test_find_memo_by_tx_hash() {
        let anchor = MemoryAnchor::validating("rTEST");
        let receipt = anchor.submit("aabb").await.unwrap();
        let tx_hash = receipt.tx_hash.unwrap();

        let found = anchor.find_memo(&MemoQuery::by_tx(&tx_hash)).await.unwrap();
        assert!(found.unwrap().memo_matches("aabb"));

        let missing = anchor.find_memo(&MemoQuery::by_tx("NOPE")).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_find_memo_by_scan() {
        let anchor = MemoryAnchor::validating("rTEST");
        let receipt = anchor.submit("ccdd").await.unwrap();
        let ledger_index = receipt.ledger_index.unwrap();

        let query = MemoQuery::by_scan("rTEST", ledger_index + 100, "CCDD");
        let found = anchor.find_memo(&query).await.unwrap();
        assert!(found.is_some());

        // Outside the bounded window.
        let far = MemoQuery::by_scan("rTEST", ledger_index + MEMO_SCAN_SPAN + 10, "ccdd");
        assert!(anchor.find_memo(&far).await.unwrap().is_none());

        // Wrong account.
        let other = MemoQuery::by_scan("rOTHER", ledger_index, "ccdd");
        assert!(anchor.find_memo(&other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_escrow_round() {
        let anchor = MemoryAnchor::validating("rTEST");
        let created = anchor
            .create_escrow(&EscrowCreate {
                destination: "rDEST".to_string(),
                amount_drops: "1000000".to_string(),
                cancel_after_secs: Some(3600),
                finish_after_secs: None,
                condition_hex: None,
                memo_hex: Some("aa11".to_string()),
            })
            .await
            .unwrap();
        assert!(created.validated);
        let seq = created.offer_sequence.unwrap();

        let finished = anchor
            .finish_escrow(&EscrowFinish {
                owner: "rTEST".to_string(),
                offer_sequence: seq,
                fulfillment_hex: None,
                memo_hex: None,
            })
            .await
            .unwrap();
        assert!(finished.validated);
        assert!(finished.offer_sequence.is_none());
    }
}
