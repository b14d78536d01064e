//! # Verification Service
//!
//! Answers "is this record still what was fingerprinted?" in three layers:
//! local (stored canon re-hashes to the stored digest), live (current
//! fields re-encode to the expected digest) and on-ledger (the anchoring
//! transaction exists and carries the expected memo). The layers collapse
//! into a single verdict code with a fixed precedence, so callers never
//! interpret field combinations themselves.
//!
//! Verification is read-mostly; its only write is the best-effort
//! enrichment of a transaction reference discovered during a ledger scan,
//! which fills previously-empty fields and nothing else.

use crate::error::{Result, VerifyError};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Timelike, Utc};
use proofwatch_core::{canonical_string, sha256_hex, ProofStatus, RecordKind, SignalRecord};
use proofwatch_ledger::{LedgerAnchor, MemoQuery};
use proofwatch_store::SignalStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Hours added by the producing system when it writes timezone-less
/// timestamps (KST).
const NAIVE_OFFSET_HOURS: i64 = 9;

/// A verification request.
#[derive(Debug, Clone)]
pub struct VerifyQuery {
    /// Which collection to search.
    pub kind: RecordKind,
    /// Ticker symbol of the record.
    pub ticker: String,
    /// Nominal signal timestamp, as supplied by the caller. RFC 3339 is
    /// taken as written; timezone-less input is interpreted as UTC+9.
    pub date_added: String,
    /// Expected closing price, used to disambiguate within the window.
    pub close: Option<f64>,
    /// Also re-encode the record's current fields and compare.
    pub compare_live: bool,
    /// Also look the anchoring transaction up on the ledger.
    pub check_ledger: bool,
}

impl VerifyQuery {
    /// Query for `ticker` at the nominal timestamp, local check only.
    pub fn new(kind: RecordKind, ticker: impl Into<String>, date_added: impl Into<String>) -> Self {
        Self {
            kind,
            ticker: ticker.into(),
            date_added: date_added.into(),
            close: None,
            compare_live: false,
            check_ledger: false,
        }
    }

    /// Constrains the match to records near this closing price.
    #[must_use]
    pub fn with_close(mut self, close: f64) -> Self {
        self.close = Some(close);
        self
    }

    /// Enables the live re-encode comparison.
    #[must_use]
    pub fn with_compare_live(mut self, enabled: bool) -> Self {
        self.compare_live = enabled;
        self
    }

    /// Enables the on-ledger transaction check.
    #[must_use]
    pub fn with_check_ledger(mut self, enabled: bool) -> Self {
        self.check_ledger = enabled;
        self
    }
}

/// What the ledger layer observed, if it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerCheck {
    /// No lookup was requested, or the record is not anchored.
    NotRequested,
    /// A lookup ran but failed; nothing can be concluded.
    Inconclusive,
    /// The lookup ran and found no matching transaction.
    NotFound,
    /// The transaction was found; `memo_match` compares its memo against
    /// the expected digest.
    Found { memo_match: bool },
}

/// Final verdict, ordered by precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictCode {
    /// The anchoring transaction exists but carries a different memo.
    MemoMismatch,
    /// The record diverged from its fingerprint (live mismatch, recorded
    /// tamper flag, or stored canon no longer hashing to the digest).
    Tampered,
    /// The digest is not (yet) validated on-ledger.
    Pending,
    /// The last anchoring attempt failed.
    Failed,
    /// The recorded anchoring transaction cannot be found on the ledger.
    TxNotFound,
    /// Intact locally and confirmed on-ledger with a matching memo.
    OkOnChain,
    /// Intact locally; the ledger lookup was attempted but inconclusive.
    OkButUncheckedMemo,
    /// Intact locally; no ledger check was requested.
    OkLocalOnly,
}

impl VerdictCode {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MemoMismatch => "memo_mismatch",
            Self::Tampered => "tampered",
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::TxNotFound => "tx_not_found",
            Self::OkOnChain => "ok_on_chain",
            Self::OkButUncheckedMemo => "ok_but_unchecked_memo",
            Self::OkLocalOnly => "ok_local_only",
        }
    }

    /// True for the three verdicts that report an intact record.
    pub fn is_ok(&self) -> bool {
        matches!(
            self,
            Self::OkOnChain | Self::OkButUncheckedMemo | Self::OkLocalOnly
        )
    }
}

impl std::fmt::Display for VerdictCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full verification report returned to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    /// Verdict code; see [`VerdictCode`].
    pub code: VerdictCode,
    /// Convenience flag, `code.is_ok()`.
    pub ok: bool,
    /// Id of the matched record.
    pub record_id: String,
    /// Baseline digest the record is expected to match.
    pub expected_hash: String,
    /// Anchoring status of the proof block.
    pub status: ProofStatus,
    /// Recorded tamper flag.
    pub tampered: bool,
    /// Stored baseline canon re-hashes to the baseline digest.
    pub local_match: bool,
    /// Whether the anchoring transaction was found (`None` when no
    /// conclusive lookup ran).
    pub on_ledger: Option<bool>,
    /// Whether the found transaction's memo matches the expected digest.
    pub memo_match: Option<bool>,
    /// Anchoring transaction, stored or discovered.
    pub tx_hash: Option<String>,
    /// Public explorer link for `tx_hash`.
    pub explorer_url: Option<String>,
    /// Digest re-encoded from the record's current fields, when requested.
    pub live_hash: Option<String>,
    /// Whether `live_hash` equals the expected digest.
    pub live_match: Option<bool>,
}

/// Pure verdict computation, applied in strict precedence order.
pub fn classify(
    status: ProofStatus,
    tampered: bool,
    local_match: bool,
    live_match: Option<bool>,
    ledger: LedgerCheck,
) -> VerdictCode {
    if let LedgerCheck::Found { memo_match: false } = ledger {
        return VerdictCode::MemoMismatch;
    }
    if live_match == Some(false) || tampered || !local_match {
        return VerdictCode::Tampered;
    }
    match status {
        ProofStatus::Pending => VerdictCode::Pending,
        ProofStatus::Failed => VerdictCode::Failed,
        ProofStatus::OnLedger => match ledger {
            LedgerCheck::NotFound => VerdictCode::TxNotFound,
            LedgerCheck::Found { .. } => VerdictCode::OkOnChain,
            LedgerCheck::Inconclusive => VerdictCode::OkButUncheckedMemo,
            LedgerCheck::NotRequested => VerdictCode::OkLocalOnly,
        },
    }
}

/// Resolves a nominal timestamp to the half-open search window
/// `[floor_minute(ts - 60s), +120s)`.
pub fn resolve_window(raw: &str) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let base = parse_timestamp(raw)?;
    let start = (base - Duration::seconds(60))
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .ok_or_else(|| VerifyError::InvalidQuery(format!("unrepresentable timestamp: {raw}")))?;
    Ok((start, start + Duration::seconds(120)))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(VerifyError::InvalidQuery("empty timestamp".to_string()));
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            // Timezone-less producer timestamps are UTC+9 wall-clock time.
            return Ok(Utc.from_utc_datetime(&(naive - Duration::hours(NAIVE_OFFSET_HOURS))));
        }
    }
    Err(VerifyError::InvalidQuery(format!(
        "unparseable timestamp: {raw}"
    )))
}

/// Price window for disambiguating records: absolute floor of `1e-4`,
/// widening to 5 basis points of the price.
fn close_range(close: f64) -> (f64, f64) {
    let tolerance = (close.abs() * 5e-4).max(1e-4);
    (close - tolerance, close + tolerance)
}

/// The verification service: resolves queries against the store and the
/// ledger anchor, producing [`VerifyReport`]s.
#[derive(Clone)]
pub struct VerificationService {
    store: SignalStore,
    anchor: Arc<dyn LedgerAnchor>,
}

impl VerificationService {
    /// Creates a service over `store`, checking the ledger through `anchor`.
    pub fn new(store: SignalStore, anchor: Arc<dyn LedgerAnchor>) -> Self {
        Self { store, anchor }
    }

    /// Runs a verification query end to end.
    pub async fn verify(&self, query: &VerifyQuery) -> Result<VerifyReport> {
        if query.ticker.trim().is_empty() {
            return Err(VerifyError::InvalidQuery("empty ticker".to_string()));
        }
        let (start, end) = resolve_window(&query.date_added)?;
        let collection = self.store.collection(query.kind);
        let record = collection
            .find_window(&query.ticker, start, end, query.close.map(close_range))?
            .ok_or(VerifyError::NotFound)?;
        let proof = record.proof.as_ref().ok_or(VerifyError::NoBaseline)?;

        // All comparisons run against the baseline: a record that already
        // carries a recorded tamper must keep reporting the divergence, not
        // match its own rehash.
        let expected_hash = proof.hash.clone();
        let local_match = sha256_hex(&proof.canon) == expected_hash;

        let (live_hash, live_match) = if query.compare_live {
            let live = sha256_hex(&canonical_string(&record, query.kind));
            let matched = live == expected_hash;
            (Some(live), Some(matched))
        } else {
            (None, None)
        };

        let mut tx_hash = proof.tx_hash.clone();
        let mut explorer_url = proof.explorer_url.clone();
        let expected_memo = proof.memo_hex.clone().unwrap_or_else(|| expected_hash.clone());

        let ledger = if query.check_ledger && proof.status == ProofStatus::OnLedger {
            self.check_ledger(&record, proof.tx_hash.as_deref(), &expected_memo)
                .await
                .map(|(check, discovered)| {
                    if let Some(found) = discovered {
                        if tx_hash.is_none() {
                            let url = proof.network.explorer_url(&found);
                            // Best-effort: a lost enrichment costs nothing.
                            if let Err(err) = collection.enrich_tx(&record.id, &found, &url) {
                                debug!(%err, id = %record.id, "tx enrichment failed");
                            }
                            tx_hash = Some(found);
                            explorer_url = Some(url);
                        }
                    }
                    check
                })?
        } else {
            LedgerCheck::NotRequested
        };

        let (on_ledger, memo_match) = match ledger {
            LedgerCheck::NotRequested | LedgerCheck::Inconclusive => (None, None),
            LedgerCheck::NotFound => (Some(false), None),
            LedgerCheck::Found { memo_match } => (Some(true), Some(memo_match)),
        };

        let code = classify(proof.status, proof.tampered, local_match, live_match, ledger);
        Ok(VerifyReport {
            code,
            ok: code.is_ok(),
            record_id: record.id.clone(),
            expected_hash,
            status: proof.status,
            tampered: proof.tampered,
            local_match,
            on_ledger,
            memo_match,
            tx_hash,
            explorer_url,
            live_hash,
            live_match,
        })
    }

    /// Looks the anchoring transaction up, by known hash when one is
    /// stored, otherwise by scanning around the recorded ledger position.
    /// Returns the check result plus the discovered transaction hash when
    /// the record did not already store one.
    async fn check_ledger(
        &self,
        record: &SignalRecord,
        known_tx: Option<&str>,
        expected_memo: &str,
    ) -> Result<(LedgerCheck, Option<String>)> {
        let proof = record.proof.as_ref().ok_or(VerifyError::NoBaseline)?;
        let query = match (known_tx, &proof.account, proof.ledger_index) {
            (Some(tx_hash), _, _) => MemoQuery::by_tx(tx_hash),
            (None, Some(account), Some(index)) => {
                MemoQuery::by_scan(account, index, expected_memo)
            }
            _ => return Ok((LedgerCheck::Inconclusive, None)),
        };
        match self.anchor.find_memo(&query).await {
            Ok(Some(tx)) => {
                let memo_match = tx.memo_matches(expected_memo);
                let discovered = known_tx.is_none().then_some(tx.hash);
                Ok((LedgerCheck::Found { memo_match }, discovered))
            }
            Ok(None) => Ok((LedgerCheck::NotFound, None)),
            Err(err) => {
                warn!(%err, id = %record.id, "ledger lookup inconclusive");
                Ok((LedgerCheck::Inconclusive, None))
            }
        }
    }
}

impl std::fmt::Debug for VerificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationService")
            .field("store", &self.store)
            .finish()
    }
}
