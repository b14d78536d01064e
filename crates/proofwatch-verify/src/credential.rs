//! Credential anchoring.
//!
//! A credential is any JSON object whose integrity should be provable
//! later. Its canonical form is the object with the volatile `proof`
//! member removed, so issuing a credential and later re-canonicalizing the
//! issued document (proof embedded) produce the same digest.

use crate::error::{Result, VerifyError};
use chrono::{DateTime, Utc};
use proofwatch_core::{canonicalize, normalize_hex, sha256_hex, ProofStatus};
use proofwatch_ledger::{AnchorError, LedgerAnchor, MemoQuery};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// The member stripped before canonicalization.
const PROOF_MEMBER: &str = "proof";

/// Outcome of issuing a credential digest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialProof {
    /// Digest of the canonical credential, lowercase hex.
    pub digest: String,
    /// The canonical string that was hashed.
    pub canon: String,
    /// Anchoring status for the digest.
    pub status: ProofStatus,
    /// Anchoring transaction, when one was submitted.
    pub tx_hash: Option<String>,
    /// Ledger index the transaction validated in.
    pub ledger_index: Option<u32>,
    /// Explorer link for `tx_hash`.
    pub explorer_url: Option<String>,
    /// When the digest validated on-ledger, if it did.
    pub validated_at: Option<DateTime<Utc>>,
    /// Anchoring error text, if the attempt failed.
    pub error: Option<String>,
}

/// Result of checking a credential digest against the ledger.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialCheck {
    /// Digest that was checked, lowercase hex.
    pub digest: String,
    /// Whether a transaction was found (`None` when the lookup was
    /// inconclusive).
    pub found: Option<bool>,
    /// Whether the found transaction's memo matches the digest.
    pub memo_match: Option<bool>,
    /// The found transaction.
    pub tx_hash: Option<String>,
    /// Explorer link for `tx_hash`.
    pub explorer_url: Option<String>,
}

/// Issues and verifies credential digests through a ledger anchor.
#[derive(Clone)]
pub struct CredentialAnchor {
    anchor: Arc<dyn LedgerAnchor>,
}

impl CredentialAnchor {
    /// Creates a credential anchor over the given ledger seam.
    pub fn new(anchor: Arc<dyn LedgerAnchor>) -> Self {
        Self { anchor }
    }

    /// Canonical string and digest of a credential, `proof` member
    /// excluded. Rejects non-object credentials.
    pub fn digest(credential: &Value) -> Result<(String, String)> {
        let Value::Object(map) = credential else {
            return Err(VerifyError::InvalidQuery(
                "credential must be a JSON object".to_string(),
            ));
        };
        let mut stripped = map.clone();
        stripped.remove(PROOF_MEMBER);
        let canon = canonicalize(&Value::Object(stripped));
        let digest = sha256_hex(&canon);
        Ok((canon, digest))
    }

    /// Canonicalizes and hashes a credential, then anchors the digest.
    ///
    /// An unconfigured anchor leaves the digest `pending` without an
    /// error; a failed submission is absorbed as `failed` with the error
    /// text recorded, mirroring how record baselines absorb anchoring
    /// failures.
    pub async fn issue(&self, credential: &Value) -> Result<CredentialProof> {
        let (canon, digest) = Self::digest(credential)?;
        match self.anchor.submit(&digest).await {
            Ok(receipt) => {
                let explorer_url = receipt
                    .tx_hash
                    .as_deref()
                    .map(|h| self.anchor.network().explorer_url(h));
                Ok(CredentialProof {
                    digest,
                    canon,
                    status: if receipt.validated {
                        ProofStatus::OnLedger
                    } else {
                        ProofStatus::Pending
                    },
                    validated_at: receipt.validated.then(Utc::now),
                    tx_hash: receipt.tx_hash,
                    ledger_index: receipt.ledger_index,
                    explorer_url,
                    error: None,
                })
            }
            Err(AnchorError::Disabled) => Ok(CredentialProof {
                digest,
                canon,
                status: ProofStatus::Pending,
                tx_hash: None,
                ledger_index: None,
                explorer_url: None,
                validated_at: None,
                error: None,
            }),
            Err(err) => Ok(CredentialProof {
                digest,
                canon,
                status: ProofStatus::Failed,
                tx_hash: None,
                ledger_index: None,
                explorer_url: None,
                validated_at: None,
                error: Some(err.to_string()),
            }),
        }
    }

    /// Checks a credential (or a bare digest) against the ledger, using the
    /// supplied lookup hint. Lookup failures are inconclusive, not fatal.
    pub async fn verify(
        &self,
        credential: Option<&Value>,
        digest: Option<&str>,
        hint: MemoQuery,
    ) -> Result<CredentialCheck> {
        let digest = match (credential, digest) {
            (Some(credential), _) => Self::digest(credential)?.1,
            (None, Some(digest)) => normalize_hex(digest),
            (None, None) => {
                return Err(VerifyError::InvalidQuery(
                    "either a credential or a digest is required".to_string(),
                ))
            }
        };
        match self.anchor.find_memo(&hint).await {
            Ok(Some(tx)) => {
                let memo_match = tx.memo_matches(&digest);
                let explorer_url = Some(self.anchor.network().explorer_url(&tx.hash));
                Ok(CredentialCheck {
                    digest,
                    found: Some(true),
                    memo_match: Some(memo_match),
                    tx_hash: Some(tx.hash),
                    explorer_url,
                })
            }
            Ok(None) => Ok(CredentialCheck {
                digest,
                found: Some(false),
                memo_match: None,
                tx_hash: None,
                explorer_url: None,
            }),
            Err(err) => {
                warn!(%err, "credential lookup inconclusive");
                Ok(CredentialCheck {
                    digest,
                    found: None,
                    memo_match: None,
                    tx_hash: None,
                    explorer_url: None,
                })
            }
        }
    }
}
