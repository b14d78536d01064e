//! # Collection Watcher
//!
//! One watcher per monitored collection. Each observed record moves through
//! a small state machine:
//!
//! ```text
//! unbaselined ──baseline──▶ baselined(clean) ──divergence──▶ baselined(tampered)
//!                                 │  ▲                            │  ▲
//!                                 └──┘ unchanged                  └──┘ further divergence
//! ```
//!
//! `tampered` is absorbing: once a divergence is recorded the flag never
//! resets, and each further divergence appends to the history while the
//! baseline fingerprint stays untouched.
//!
//! Change delivery is push-first. The watcher subscribes to the store's
//! live feed and replays the oplog from its persisted resume marker, so a
//! restart picks up where the previous run stopped. When the store reports
//! the feed as structurally unavailable the watcher falls back to a fixed
//! polling loop over a bounded lookback window; the fallback is one-way for
//! the life of the process.
//!
//! Per-record failures are scoped: an anchoring error is absorbed into the
//! record's proof block, any other failure is logged and the loop moves on.

use crate::config::WatcherConfig;
use crate::error::Result;
use chrono::{DateTime, Utc};
use proofwatch_core::{
    canonical_string, sha256_hex, ProofBlock, ProofStatus, SignalRecord, TamperEvent,
};
use proofwatch_ledger::{AnchorError, LedgerAnchor, MemoQuery};
use proofwatch_store::{ChangeEvent, ChangeOp, Collection, StoreError, TamperUpdate};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Outcome of one anchoring attempt, already mapped to proof-block fields.
struct AnchorOutcome {
    status: ProofStatus,
    tx_hash: Option<String>,
    ledger_index: Option<u32>,
    memo_hex: Option<String>,
    explorer_url: Option<String>,
    validated_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

/// Watches one collection for record changes and maintains proof blocks.
///
/// Cheap to clone; clones share the collection handle and the anchor.
#[derive(Clone)]
pub struct CollectionWatcher {
    collection: Collection,
    anchor: Arc<dyn LedgerAnchor>,
    config: WatcherConfig,
}

impl CollectionWatcher {
    /// Creates a watcher over `collection`, anchoring through `anchor`.
    pub fn new(collection: Collection, anchor: Arc<dyn LedgerAnchor>, config: WatcherConfig) -> Self {
        Self {
            collection,
            anchor,
            config,
        }
    }

    /// Runs the watcher until the change feed closes.
    ///
    /// Tries push delivery first; a store without change-feed support moves
    /// the watcher into the polling loop, which runs until cancelled.
    pub async fn run(&self) -> Result<()> {
        match self.collection.subscribe() {
            Ok(rx) => self.push_loop(rx).await,
            Err(StoreError::FeedUnavailable) => {
                info!(kind = %self.collection.kind(), "change feed unavailable, falling back to polling");
                self.poll_loop().await
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn push_loop(&self, mut rx: broadcast::Receiver<ChangeEvent>) -> Result<()> {
        let mut marker = self.collection.load_marker()?.unwrap_or(0);
        info!(kind = %self.collection.kind(), marker, "watching via change feed");

        // Catch up on everything written while we were not running.
        for event in self.collection.events_since(marker)? {
            marker = self.handle_event(&event).await?;
        }

        loop {
            match rx.recv().await {
                Ok(event) => {
                    // Replayed events can race the live feed at startup.
                    if event.seq <= marker {
                        continue;
                    }
                    marker = self.handle_event(&event).await?;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        kind = %self.collection.kind(),
                        skipped,
                        "change feed lagged, replaying from oplog"
                    );
                    for event in self.collection.events_since(marker)? {
                        marker = self.handle_event(&event).await?;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            }
        }
    }

    /// Processes one feed event and persists the advanced resume marker.
    ///
    /// Failures are scoped to the notification: a record that cannot be
    /// loaded or checked is logged and skipped, and the marker still
    /// advances so the rest of the feed keeps flowing.
    async fn handle_event(&self, event: &ChangeEvent) -> Result<u64> {
        match self.collection.get(&event.id) {
            Ok(Some(record)) => {
                if let Err(err) = self.evaluate(&record, op_name(event.op)).await {
                    warn!(
                        kind = %self.collection.kind(),
                        id = %event.id,
                        %err,
                        "record check failed"
                    );
                }
            }
            Ok(None) => debug!(id = %event.id, "changed record no longer present"),
            Err(err) => warn!(
                kind = %self.collection.kind(),
                id = %event.id,
                %err,
                "changed record could not be loaded"
            ),
        }
        self.collection.save_marker(event.seq)?;
        Ok(event.seq)
    }

    async fn poll_loop(&self) -> Result<()> {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        // A slow scan delays the next tick instead of stacking ticks.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.poll_once().await {
                Ok(checked) => debug!(kind = %self.collection.kind(), checked, "poll scan complete"),
                Err(err) => warn!(kind = %self.collection.kind(), %err, "poll scan failed"),
            }
        }
    }

    /// Runs one poll-mode scan over the lookback window. Returns the number
    /// of records examined.
    pub async fn poll_once(&self) -> Result<usize> {
        let since = Utc::now() - chrono::Duration::seconds(self.config.poll_lookback.as_secs() as i64);
        let records = self.collection.recent_since(since, self.config.poll_limit)?;
        let checked = records.len();
        for record in records {
            if let Err(err) = self.evaluate(&record, "poll").await {
                warn!(
                    kind = %self.collection.kind(),
                    id = %record.id,
                    %err,
                    "record check failed"
                );
            }
        }
        Ok(checked)
    }

    /// Evaluates a single record immediately: baselines it if it carries no
    /// proof block, otherwise checks it for divergence.
    pub async fn check_record(&self, record: &SignalRecord) -> Result<()> {
        self.evaluate(record, "change").await
    }

    async fn evaluate(&self, record: &SignalRecord, origin: &str) -> Result<()> {
        match &record.proof {
            None => self.create_baseline(record).await,
            Some(proof) => self.check_baselined(record, proof, origin).await,
        }
    }

    /// Canonicalizes, hashes and anchors a record seen for the first time.
    async fn create_baseline(&self, record: &SignalRecord) -> Result<()> {
        let canon = canonical_string(record, self.collection.kind());
        let digest = sha256_hex(&canon);
        let outcome = self.anchor_digest(&digest).await;
        let now = Utc::now();

        let block = ProofBlock {
            status: outcome.status,
            hash: digest.clone(),
            canon,
            tampered: false,
            network: self.anchor.network(),
            account: self.anchor.account(),
            tx_hash: outcome.tx_hash,
            ledger_index: outcome.ledger_index,
            memo_hex: outcome.memo_hex,
            explorer_url: outcome.explorer_url,
            signal_id: record.id.clone(),
            version: 1,
            note: Some("baseline created".to_string()),
            error: outcome.error,
            created_at: now,
            validated_at: outcome.validated_at,
            last_checked_at: Some(now),
            last_rehash: None,
            last_canon: None,
            prev_tx_hash: None,
            onchain_checked: false,
            onchain_memo_match: None,
            onchain_prev_tx_hash: None,
            history: Vec::new(),
        };

        match self.collection.set_baseline(&record.id, block) {
            Ok(_) => {
                info!(
                    kind = %self.collection.kind(),
                    id = %record.id,
                    ticker = %record.ticker,
                    status = %outcome.status,
                    "baseline created"
                );
                Ok(())
            }
            // A concurrent check already baselined this record.
            Err(StoreError::BaselineExists(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Recomputes the fingerprint of a baselined record and records a
    /// tamper event when it diverges from the last-known digest.
    async fn check_baselined(
        &self,
        record: &SignalRecord,
        proof: &ProofBlock,
        origin: &str,
    ) -> Result<()> {
        let new_canon = canonical_string(record, self.collection.kind());
        let new_hash = sha256_hex(&new_canon);
        let prev_hash = proof.current_hash();
        if new_hash == prev_hash {
            return Ok(());
        }

        warn!(
            kind = %self.collection.kind(),
            id = %record.id,
            ticker = %record.ticker,
            prev_hash,
            new_hash = %new_hash,
            "fingerprint divergence detected"
        );

        let (onchain_checked, onchain_memo_match, onchain_prev_tx_hash) =
            self.confirm_previous_anchor(proof).await;

        let outcome = if self.config.reanchor_on_tamper {
            self.anchor_digest(&new_hash).await
        } else {
            AnchorOutcome {
                status: ProofStatus::Pending,
                tx_hash: None,
                ledger_index: None,
                memo_hex: Some(new_hash.clone()),
                explorer_url: None,
                validated_at: None,
                error: None,
            }
        };

        let event = TamperEvent {
            at: Utc::now(),
            note: format!("tampered: {origin} detected"),
            prev_hash: Some(prev_hash.to_string()),
            new_hash: new_hash.clone(),
            prev_canon: Some(proof.current_canon().to_string()),
            new_canon: new_canon.clone(),
            details: diff_canons(proof.current_canon(), &new_canon),
        };

        self.collection.record_tamper(
            &record.id,
            TamperUpdate {
                event,
                status: outcome.status,
                tx_hash: outcome.tx_hash,
                ledger_index: outcome.ledger_index,
                memo_hex: outcome.memo_hex,
                explorer_url: outcome.explorer_url,
                validated_at: outcome.validated_at,
                error: outcome.error,
                onchain_checked,
                onchain_memo_match,
                onchain_prev_tx_hash,
            },
        )?;
        Ok(())
    }

    /// Best-effort check whether the previously anchored digest is still on
    /// the ledger before its record is marked tampered. Lookup failures are
    /// inconclusive, never blocking.
    async fn confirm_previous_anchor(
        &self,
        proof: &ProofBlock,
    ) -> (bool, Option<bool>, Option<String>) {
        if proof.status != ProofStatus::OnLedger {
            return (false, None, None);
        }
        let old_digest = proof.current_hash();
        let query = match (&proof.tx_hash, &proof.account, proof.ledger_index) {
            (Some(tx_hash), _, _) => MemoQuery::by_tx(tx_hash),
            (None, Some(account), Some(index)) => MemoQuery::by_scan(account, index, old_digest),
            _ => return (false, None, None),
        };
        match self.anchor.find_memo(&query).await {
            Ok(Some(tx)) => {
                let matched = tx.memo_matches(old_digest);
                (true, Some(matched), Some(tx.hash))
            }
            Ok(None) => (true, None, None),
            Err(err) => {
                debug!(%err, "previous anchor lookup inconclusive");
                (false, None, None)
            }
        }
    }

    /// Anchors a digest and maps the result onto proof-block fields. An
    /// unconfigured anchor leaves the digest pending without an error;
    /// a failed submission becomes `failed` with the error text recorded.
    async fn anchor_digest(&self, digest: &str) -> AnchorOutcome {
        match self.anchor.submit(digest).await {
            Ok(receipt) => {
                tokio::time::sleep(self.config.submit_pacing).await;
                let explorer_url = receipt
                    .tx_hash
                    .as_deref()
                    .map(|h| self.anchor.network().explorer_url(h));
                AnchorOutcome {
                    status: if receipt.validated {
                        ProofStatus::OnLedger
                    } else {
                        ProofStatus::Pending
                    },
                    validated_at: receipt.validated.then(Utc::now),
                    tx_hash: receipt.tx_hash,
                    ledger_index: receipt.ledger_index,
                    memo_hex: Some(receipt.memo_hex),
                    explorer_url,
                    error: None,
                }
            }
            Err(AnchorError::Disabled) => AnchorOutcome {
                status: ProofStatus::Pending,
                tx_hash: None,
                ledger_index: None,
                memo_hex: Some(digest.to_string()),
                explorer_url: None,
                validated_at: None,
                error: None,
            },
            Err(err) => {
                tokio::time::sleep(self.config.submit_pacing).await;
                AnchorOutcome {
                    status: ProofStatus::Failed,
                    tx_hash: None,
                    ledger_index: None,
                    memo_hex: Some(digest.to_string()),
                    explorer_url: None,
                    validated_at: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

impl std::fmt::Debug for CollectionWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionWatcher")
            .field("collection", &self.collection)
            .field("config", &self.config)
            .finish()
    }
}

fn op_name(op: ChangeOp) -> &'static str {
    match op {
        ChangeOp::Insert => "insert",
        ChangeOp::Update => "update",
        ChangeOp::Replace => "replace",
    }
}

/// Field-level diff of two canonical strings, flattened to dotted paths
/// (`payload.close`, `ts`, ...) with the old and new value per path.
fn diff_canons(prev: &str, new: &str) -> Map<String, Value> {
    let prev: Value = serde_json::from_str(prev).unwrap_or(Value::Null);
    let new: Value = serde_json::from_str(new).unwrap_or(Value::Null);
    let mut out = Map::new();
    diff_values("", &prev, &new, &mut out);
    out
}

fn diff_values(path: &str, prev: &Value, new: &Value, out: &mut Map<String, Value>) {
    match (prev, new) {
        (Value::Object(a), Value::Object(b)) => {
            let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
            for key in keys {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                diff_values(
                    &child,
                    a.get(key).unwrap_or(&Value::Null),
                    b.get(key).unwrap_or(&Value::Null),
                    out,
                );
            }
        }
        (p, n) if p != n => {
            out.insert(path.to_string(), json!({ "prev": p, "new": n }));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proofwatch_core::RecordKind;
    use proofwatch_ledger::{DisabledAnchor, MemoryAnchor};
    use proofwatch_store::SignalStore;
    use std::time::Duration;

    fn record(id: &str, ticker: &str) -> SignalRecord {
        SignalRecord {
            id: id.to_string(),
            ticker: ticker.to_string(),
            strategy: "buy/MN2".to_string(),
            date_added: Utc::now(),
            close: 97282.7,
            rsi_5: Some(22.51),
            rsi_240: None,
            mn: -0.6,
            proof: None,
        }
    }

    fn test_config() -> WatcherConfig {
        WatcherConfig::new().with_submit_pacing(Duration::ZERO)
    }

    fn watcher(store: &SignalStore, anchor: Arc<dyn LedgerAnchor>) -> CollectionWatcher {
        CollectionWatcher::new(store.collection(RecordKind::Coin), anchor, test_config())
    }

    #[tokio::test]
    async fn test_baseline_with_anchoring_disabled_is_pending() {
        let store = SignalStore::temporary().unwrap();
        let w = watcher(&store, Arc::new(DisabledAnchor));
        let col = store.collection(RecordKind::Coin);
        let id = col.insert(record("", "T")).unwrap();

        w.check_record(&col.get(&id).unwrap().unwrap()).await.unwrap();

        let proof = col.get(&id).unwrap().unwrap().proof.unwrap();
        assert_eq!(proof.status, ProofStatus::Pending);
        assert!(proof.error.is_none());
        assert!(proof.tx_hash.is_none());
        assert_eq!(proof.memo_hex.as_deref(), Some(proof.hash.as_str()));
        assert!(!proof.tampered);
    }

    #[tokio::test]
    async fn test_baseline_validated_goes_on_ledger() {
        let store = SignalStore::temporary().unwrap();
        let w = watcher(&store, Arc::new(MemoryAnchor::validating("rTEST")));
        let col = store.collection(RecordKind::Coin);
        let id = col.insert(record("", "T")).unwrap();

        w.check_record(&col.get(&id).unwrap().unwrap()).await.unwrap();

        let proof = col.get(&id).unwrap().unwrap().proof.unwrap();
        assert_eq!(proof.status, ProofStatus::OnLedger);
        assert!(proof.tx_hash.is_some());
        assert!(proof.validated_at.is_some());
        assert!(proof
            .explorer_url
            .as_deref()
            .unwrap()
            .starts_with("https://testnet.xrpl.org/transactions/"));
    }

    #[tokio::test]
    async fn test_baseline_submission_failure_recorded() {
        let store = SignalStore::temporary().unwrap();
        let w = watcher(&store, Arc::new(MemoryAnchor::failing("rTEST")));
        let col = store.collection(RecordKind::Coin);
        let id = col.insert(record("", "T")).unwrap();

        w.check_record(&col.get(&id).unwrap().unwrap()).await.unwrap();

        let proof = col.get(&id).unwrap().unwrap().proof.unwrap();
        assert_eq!(proof.status, ProofStatus::Failed);
        assert!(proof.error.is_some());
        // The digest itself is still recorded.
        assert_eq!(proof.memo_hex.as_deref(), Some(proof.hash.as_str()));
    }

    #[tokio::test]
    async fn test_unchanged_record_is_noop() {
        let store = SignalStore::temporary().unwrap();
        let w = watcher(&store, Arc::new(DisabledAnchor));
        let col = store.collection(RecordKind::Coin);
        let id = col.insert(record("", "T")).unwrap();

        w.check_record(&col.get(&id).unwrap().unwrap()).await.unwrap();
        // Redeliver without changing anything.
        w.check_record(&col.get(&id).unwrap().unwrap()).await.unwrap();

        let proof = col.get(&id).unwrap().unwrap().proof.unwrap();
        assert!(!proof.tampered);
        assert!(proof.history.is_empty());
    }

    #[tokio::test]
    async fn test_tamper_detected_and_chained() {
        let store = SignalStore::temporary().unwrap();
        let w = watcher(&store, Arc::new(MemoryAnchor::validating("rTEST")));
        let col = store.collection(RecordKind::Coin);
        let id = col.insert(record("", "T")).unwrap();

        w.check_record(&col.get(&id).unwrap().unwrap()).await.unwrap();
        let baseline = col.get(&id).unwrap().unwrap().proof.unwrap();
        let baseline_tx = baseline.tx_hash.clone().unwrap();

        // First divergence.
        let mut r = col.get(&id).unwrap().unwrap();
        r.close = 99999.0;
        col.update(&r).unwrap();
        w.check_record(&col.get(&id).unwrap().unwrap()).await.unwrap();

        let proof = col.get(&id).unwrap().unwrap().proof.unwrap();
        assert!(proof.tampered);
        assert_eq!(proof.hash, baseline.hash);
        assert_eq!(proof.canon, baseline.canon);
        assert_eq!(proof.history.len(), 1);
        assert_eq!(proof.history[0].prev_hash.as_deref(), Some(baseline.hash.as_str()));
        assert!(proof.history[0].details.contains_key("payload.close"));
        assert_eq!(proof.prev_tx_hash.as_deref(), Some(baseline_tx.as_str()));
        // Previous anchor confirmed against the fake ledger.
        assert!(proof.onchain_checked);
        assert_eq!(proof.onchain_memo_match, Some(true));
        let first_rehash = proof.last_rehash.clone().unwrap();

        // Second divergence chains off the first rehash, not the baseline.
        let mut r = col.get(&id).unwrap().unwrap();
        r.close = 88888.0;
        col.update(&r).unwrap();
        w.check_record(&col.get(&id).unwrap().unwrap()).await.unwrap();

        let proof = col.get(&id).unwrap().unwrap().proof.unwrap();
        assert_eq!(proof.history.len(), 2);
        assert_eq!(proof.history[1].prev_hash.as_deref(), Some(first_rehash.as_str()));
        assert_eq!(proof.hash, baseline.hash);
    }

    #[tokio::test]
    async fn test_tamper_without_reanchor_leaves_new_digest_pending() {
        let store = SignalStore::temporary().unwrap();
        let anchor = Arc::new(MemoryAnchor::validating("rTEST"));
        let w = CollectionWatcher::new(
            store.collection(RecordKind::Coin),
            anchor.clone(),
            test_config().with_reanchor_on_tamper(false),
        );
        let col = store.collection(RecordKind::Coin);
        let id = col.insert(record("", "T")).unwrap();

        w.check_record(&col.get(&id).unwrap().unwrap()).await.unwrap();
        assert_eq!(anchor.tx_count(), 1);

        let mut r = col.get(&id).unwrap().unwrap();
        r.mn = 0.9;
        col.update(&r).unwrap();
        w.check_record(&col.get(&id).unwrap().unwrap()).await.unwrap();

        // No second submission.
        assert_eq!(anchor.tx_count(), 1);
        let proof = col.get(&id).unwrap().unwrap().proof.unwrap();
        assert_eq!(proof.status, ProofStatus::Pending);
        assert!(proof.tx_hash.is_none());
        assert_eq!(proof.memo_hex.as_deref(), proof.last_rehash.as_deref());
    }

    #[tokio::test]
    async fn test_poll_once_baselines_recent_records() {
        let store = SignalStore::temporary_without_feed().unwrap();
        let w = watcher(&store, Arc::new(DisabledAnchor));
        let col = store.collection(RecordKind::Coin);
        col.insert(record("a", "T1")).unwrap();
        col.insert(record("b", "T2")).unwrap();

        let checked = w.poll_once().await.unwrap();
        assert_eq!(checked, 2);
        assert!(col.get("a").unwrap().unwrap().proof.is_some());
        assert!(col.get("b").unwrap().unwrap().proof.is_some());

        // Second scan is idempotent.
        let checked = w.poll_once().await.unwrap();
        assert_eq!(checked, 2);
        assert!(col.get("a").unwrap().unwrap().proof.unwrap().history.is_empty());
    }

    #[tokio::test]
    async fn test_poll_lookback_excludes_old_records() {
        let store = SignalStore::temporary_without_feed().unwrap();
        let w = watcher(&store, Arc::new(DisabledAnchor));
        let col = store.collection(RecordKind::Coin);

        let mut old = record("old", "T");
        old.date_added = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        col.insert(old).unwrap();

        let checked = w.poll_once().await.unwrap();
        assert_eq!(checked, 0);
        assert!(col.get("old").unwrap().unwrap().proof.is_none());
    }

    #[tokio::test]
    async fn test_push_loop_processes_live_inserts_and_advances_marker() {
        let store = SignalStore::temporary().unwrap();
        let w = watcher(&store, Arc::new(DisabledAnchor));
        let col = store.collection(RecordKind::Coin);

        let runner = w.clone();
        let handle = tokio::spawn(async move { runner.run().await });

        col.insert(record("a", "T")).unwrap();

        // Wait for the watcher to pick the insert up.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if col.get("a").unwrap().unwrap().proof.is_some() {
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "watcher never baselined");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let marker = col.load_marker().unwrap().unwrap();
        let last = col.events_since(0).unwrap().last().unwrap().seq;
        assert!(marker >= last);
        handle.abort();
    }

    #[tokio::test]
    async fn test_unloadable_record_event_still_advances_marker() {
        let store = SignalStore::temporary().unwrap();
        let w = watcher(&store, Arc::new(DisabledAnchor));
        let col = store.collection(RecordKind::Coin);

        // A notification whose record cannot be loaded must not stall the
        // feed position.
        let event = ChangeEvent {
            seq: 42,
            id: "ghost".to_string(),
            op: ChangeOp::Insert,
        };
        let seq = w.handle_event(&event).await.unwrap();
        assert_eq!(seq, 42);
        assert_eq!(col.load_marker().unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_run_falls_back_to_polling_and_baselines() {
        let store = SignalStore::temporary_without_feed().unwrap();
        let col = store.collection(RecordKind::Coin);
        let w = CollectionWatcher::new(
            col.clone(),
            Arc::new(DisabledAnchor),
            test_config().with_poll_interval(Duration::from_millis(20)),
        );

        let runner = w.clone();
        let handle = tokio::spawn(async move { runner.run().await });

        col.insert(record("a", "T")).unwrap();

        // The polling loop must pick the record up without a change feed.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if col.get("a").unwrap().unwrap().proof.is_some() {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "poll fallback never baselined"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
    }

    #[tokio::test]
    async fn test_push_replay_covers_writes_before_start() {
        let store = SignalStore::temporary().unwrap();
        let col = store.collection(RecordKind::Coin);
        // Written before any watcher runs.
        col.insert(record("a", "T")).unwrap();

        let w = watcher(&store, Arc::new(DisabledAnchor));
        let runner = w.clone();
        let handle = tokio::spawn(async move { runner.run().await });

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if col.get("a").unwrap().unwrap().proof.is_some() {
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "replay never baselined");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
    }

    #[test]
    fn test_diff_canons_flattens_paths() {
        let prev = r#"{"payload":{"close":100,"mn":0.5,"rsi":20},"symbol":"T","ts":"x","type":"buy"}"#;
        let new = r#"{"payload":{"close":101,"mn":0.5,"rsi":20},"symbol":"T","ts":"x","type":"buy"}"#;
        let diff = diff_canons(prev, new);
        assert_eq!(diff.len(), 1);
        let entry = diff.get("payload.close").unwrap();
        assert_eq!(entry["prev"], 100);
        assert_eq!(entry["new"], 101);
    }
}
