//! Escrow pass-through.
//!
//! Thin validated wrapper over the anchor's conditional-payment
//! operations. The service checks the request shape and derives the
//! explorer link; everything ledger-specific stays behind the anchor.

use crate::error::{Result, VerifyError};
use proofwatch_ledger::{EscrowCreate, EscrowFinish, LedgerAnchor};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Outcome of an escrow operation, with the derived explorer link.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowOutcome {
    /// Whether the ledger validated the transaction.
    pub validated: bool,
    /// Transaction hash.
    pub tx_hash: Option<String>,
    /// Ledger index the transaction validated in.
    pub ledger_index: Option<u32>,
    /// Sequence number needed to finish the escrow (create only).
    pub offer_sequence: Option<u32>,
    /// Explorer link for `tx_hash`.
    pub explorer_url: Option<String>,
}

/// Validated escrow operations over a ledger anchor.
#[derive(Clone)]
pub struct EscrowService {
    anchor: Arc<dyn LedgerAnchor>,
}

impl EscrowService {
    /// Creates an escrow service over the given anchor.
    pub fn new(anchor: Arc<dyn LedgerAnchor>) -> Self {
        Self { anchor }
    }

    /// Creates a conditional payment. The amount must be a positive drop
    /// count; unlike anchoring, a submission failure here surfaces to the
    /// caller.
    pub async fn create(&self, req: &EscrowCreate) -> Result<EscrowOutcome> {
        if req.destination.trim().is_empty() {
            return Err(VerifyError::InvalidQuery("empty destination".to_string()));
        }
        let drops: u64 = req
            .amount_drops
            .parse()
            .map_err(|_| VerifyError::InvalidQuery(format!("bad amount: {}", req.amount_drops)))?;
        if drops == 0 {
            return Err(VerifyError::InvalidQuery("zero amount".to_string()));
        }
        let receipt = self.anchor.create_escrow(req).await?;
        info!(
            destination = %req.destination,
            drops,
            tx_hash = receipt.tx_hash.as_deref().unwrap_or("-"),
            "escrow created"
        );
        Ok(self.outcome(receipt))
    }

    /// Finishes a conditional payment by owner and offer sequence.
    pub async fn finish(&self, req: &EscrowFinish) -> Result<EscrowOutcome> {
        if req.owner.trim().is_empty() {
            return Err(VerifyError::InvalidQuery("empty owner".to_string()));
        }
        let receipt = self.anchor.finish_escrow(req).await?;
        info!(
            owner = %req.owner,
            offer_sequence = req.offer_sequence,
            tx_hash = receipt.tx_hash.as_deref().unwrap_or("-"),
            "escrow finished"
        );
        Ok(self.outcome(receipt))
    }

    fn outcome(&self, receipt: proofwatch_ledger::EscrowReceipt) -> EscrowOutcome {
        let explorer_url = receipt
            .tx_hash
            .as_deref()
            .map(|h| self.anchor.network().explorer_url(h));
        EscrowOutcome {
            validated: receipt.validated,
            tx_hash: receipt.tx_hash,
            ledger_index: receipt.ledger_index,
            offer_sequence: receipt.offer_sequence,
            explorer_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofwatch_ledger::{AnchorError, DisabledAnchor, MemoryAnchor};

    fn create_req() -> EscrowCreate {
        EscrowCreate {
            destination: "rDEST".to_string(),
            amount_drops: "1000000".to_string(),
            cancel_after_secs: Some(3600),
            finish_after_secs: None,
            condition_hex: None,
            memo_hex: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_finish() {
        let svc = EscrowService::new(Arc::new(MemoryAnchor::validating("rTEST")));
        let created = svc.create(&create_req()).await.unwrap();
        assert!(created.validated);
        assert!(created
            .explorer_url
            .as_deref()
            .unwrap()
            .contains("testnet.xrpl.org"));

        let finished = svc
            .finish(&EscrowFinish {
                owner: "rTEST".to_string(),
                offer_sequence: created.offer_sequence.unwrap(),
                fulfillment_hex: None,
                memo_hex: None,
            })
            .await
            .unwrap();
        assert!(finished.validated);
    }

    #[tokio::test]
    async fn test_create_validates_request() {
        let svc = EscrowService::new(Arc::new(MemoryAnchor::validating("rTEST")));

        let mut req = create_req();
        req.destination = " ".to_string();
        assert!(matches!(
            svc.create(&req).await.unwrap_err(),
            VerifyError::InvalidQuery(_)
        ));

        let mut req = create_req();
        req.amount_drops = "not-a-number".to_string();
        assert!(matches!(
            svc.create(&req).await.unwrap_err(),
            VerifyError::InvalidQuery(_)
        ));

        let mut req = create_req();
        req.amount_drops = "0".to_string();
        assert!(matches!(
            svc.create(&req).await.unwrap_err(),
            VerifyError::InvalidQuery(_)
        ));
    }

    #[tokio::test]
    async fn test_disabled_anchor_surfaces() {
        let svc = EscrowService::new(Arc::new(DisabledAnchor));
        let err = svc.create(&create_req()).await.unwrap_err();
        assert!(matches!(err, VerifyError::Anchor(AnchorError::Disabled)));
    }
}
