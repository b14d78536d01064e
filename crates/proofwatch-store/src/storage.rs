//! # Persistent Signal Store
//!
//! Sled-backed storage for the two monitored record collections. Each
//! collection owns three trees:
//!
//! | tree | key | value | purpose |
//! |------|-----|-------|---------|
//! | `{kind}_records` | record id | serialized `SignalRecord` | record storage |
//! | `{kind}_oplog`   | big-endian sequence | serialized `ChangeEvent` | ordered change feed |
//! | `{kind}_meta`    | `resume_marker` | big-endian sequence | watcher resume position |
//!
//! A record is stored as one serialized value under one key, so every
//! mutation — including a tamper-history append together with its status
//! fields — is a single atomic insert.
//!
//! Change delivery is push-first: every write appends an oplog entry and
//! broadcasts it to live subscribers. A store opened without a change feed
//! returns [`StoreError::FeedUnavailable`] from [`Collection::subscribe`],
//! which is the structural signal that moves a watcher to poll mode.

use crate::error::{Result, StoreError};
use chrono::{DateTime, Utc};
use proofwatch_core::{ProofBlock, ProofStatus, RecordKind, SignalRecord, TamperEvent};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Meta-tree key holding the watcher's resume position.
const RESUME_MARKER_KEY: &str = "resume_marker";

/// Capacity of the live change broadcast. A lagging subscriber drops the
/// oldest events and recovers via [`Collection::events_since`].
const FEED_CAPACITY: usize = 1024;

/// Kind of mutation observed on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    /// A record was created.
    Insert,
    /// Individual fields were updated.
    Update,
    /// The whole record was replaced.
    Replace,
}

/// One entry in a collection's ordered change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Monotonic position in the feed; doubles as the resume marker.
    pub seq: u64,
    /// Id of the affected record.
    pub id: String,
    /// What happened.
    pub op: ChangeOp,
}

/// The engine-side state written when tampering is recorded.
///
/// Applied atomically by [`Collection::record_tamper`]: the tamper event is
/// appended and the tracking fields updated in one write, while the
/// baseline `hash`/`canon` are preserved by construction.
#[derive(Debug, Clone)]
pub struct TamperUpdate {
    /// The divergence being recorded.
    pub event: TamperEvent,
    /// Anchoring status for the new digest.
    pub status: ProofStatus,
    /// Anchoring outcome for the new digest, if re-anchoring ran.
    pub tx_hash: Option<String>,
    /// Ledger index of the new anchoring transaction.
    pub ledger_index: Option<u32>,
    /// Memo carried by the new anchoring transaction.
    pub memo_hex: Option<String>,
    /// Explorer link for the new transaction.
    pub explorer_url: Option<String>,
    /// When the new digest validated, if it did.
    pub validated_at: Option<DateTime<Utc>>,
    /// Anchoring error for the new digest, if the attempt failed.
    pub error: Option<String>,
    /// Whether the previous anchor was checked against the ledger.
    pub onchain_checked: bool,
    /// Result of that check (`None` when inconclusive).
    pub onchain_memo_match: Option<bool>,
    /// Transaction found to carry the previous digest.
    pub onchain_prev_tx_hash: Option<String>,
}

/// Handle to one monitored collection.
///
/// Cheap to clone; clones share the underlying trees and the live change
/// feed. Thread-safe: sled trees support concurrent access, and every
/// record mutation is one atomic insert.
#[derive(Clone)]
pub struct Collection {
    kind: RecordKind,
    db: sled::Db,
    records: sled::Tree,
    oplog: sled::Tree,
    meta: sled::Tree,
    feed: broadcast::Sender<ChangeEvent>,
    feed_enabled: bool,
}

/// The signal store: one sled database holding both monitored collections.
#[derive(Clone)]
pub struct SignalStore {
    db: sled::Db,
    coin: Collection,
    stock: Collection,
}

impl SignalStore {
    /// Opens or creates a store at the given path with the change feed
    /// enabled.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_db(sled::open(path)?, true)
    }

    /// Opens a store whose collections report the change feed as
    /// structurally unavailable, forcing watchers into poll mode. Mirrors a
    /// backing store deployed without change notification support.
    pub fn open_without_feed<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_db(sled::open(path)?, false)
    }

    /// Creates a temporary in-memory store for testing. Data is lost when
    /// the store is dropped.
    pub fn temporary() -> Result<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?, true)
    }

    /// Temporary store without a change feed, for exercising poll fallback.
    pub fn temporary_without_feed() -> Result<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?, false)
    }

    fn from_db(db: sled::Db, feed_enabled: bool) -> Result<Self> {
        let coin = Collection::open(&db, RecordKind::Coin, feed_enabled)?;
        let stock = Collection::open(&db, RecordKind::Stock, feed_enabled)?;
        Ok(Self { db, coin, stock })
    }

    /// Handle to the collection for the given record kind.
    pub fn collection(&self, kind: RecordKind) -> Collection {
        match kind {
            RecordKind::Coin => self.coin.clone(),
            RecordKind::Stock => self.stock.clone(),
        }
    }

    /// Flushes all pending writes to disk.
    pub fn flush(&self) -> Result<usize> {
        Ok(self.db.flush()?)
    }
}

impl std::fmt::Debug for SignalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalStore")
            .field("coin_records", &self.coin.len())
            .field("stock_records", &self.stock.len())
            .finish()
    }
}

impl Collection {
    fn open(db: &sled::Db, kind: RecordKind, feed_enabled: bool) -> Result<Self> {
        let records = db.open_tree(format!("{kind}_records"))?;
        let oplog = db.open_tree(format!("{kind}_oplog"))?;
        let meta = db.open_tree(format!("{kind}_meta"))?;
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Ok(Self {
            kind,
            db: db.clone(),
            records,
            oplog,
            meta,
            feed,
            feed_enabled,
        })
    }

    /// The record kind this collection holds.
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // ------------------------------------------------------------------
    // Producer-side writes
    // ------------------------------------------------------------------

    /// Inserts a new record, assigning an id when none is set. Returns the
    /// record id.
    pub fn insert(&self, mut record: SignalRecord) -> Result<String> {
        if record.id.is_empty() {
            record.id = uuid::Uuid::new_v4().to_string();
        }
        self.put(&record, ChangeOp::Insert)?;
        Ok(record.id)
    }

    /// Updates an existing record in place.
    pub fn update(&self, record: &SignalRecord) -> Result<()> {
        if !self.records.contains_key(record.id.as_bytes())? {
            return Err(StoreError::NotFound(record.id.clone()));
        }
        self.put(record, ChangeOp::Update)
    }

    /// Replaces an existing record wholesale.
    pub fn replace(&self, record: &SignalRecord) -> Result<()> {
        if !self.records.contains_key(record.id.as_bytes())? {
            return Err(StoreError::NotFound(record.id.clone()));
        }
        self.put(record, ChangeOp::Replace)
    }

    fn put(&self, record: &SignalRecord, op: ChangeOp) -> Result<()> {
        let bytes = serde_json::to_vec(record)?;
        self.records.insert(record.id.as_bytes(), bytes)?;
        self.log_event(&record.id, op)
    }

    fn log_event(&self, id: &str, op: ChangeOp) -> Result<()> {
        // Sequence numbers start at 1, so a marker of 0 replays everything.
        let seq = self.db.generate_id()? + 1;
        let event = ChangeEvent {
            seq,
            id: id.to_string(),
            op,
        };
        self.oplog
            .insert(seq.to_be_bytes(), serde_json::to_vec(&event)?)?;
        // No live subscribers is fine; the oplog remains authoritative.
        let _ = self.feed.send(event);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Loads a record by id.
    pub fn get(&self, id: &str) -> Result<Option<SignalRecord>> {
        match self.records.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Finds the unique record for `ticker` whose `date_added` falls in the
    /// half-open window `[start, end)`, optionally constrained to a close
    /// price range.
    ///
    /// Full scan; the monitored collections are bounded (recent signal
    /// windows), so no secondary index is kept.
    pub fn find_window(
        &self,
        ticker: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        close_range: Option<(f64, f64)>,
    ) -> Result<Option<SignalRecord>> {
        for item in self.records.iter() {
            let (_, bytes) = item?;
            let record: SignalRecord = serde_json::from_slice(&bytes)?;
            if record.ticker != ticker {
                continue;
            }
            if record.date_added < start || record.date_added >= end {
                continue;
            }
            if let Some((lo, hi)) = close_range {
                if record.close < lo || record.close > hi {
                    continue;
                }
            }
            return Ok(Some(record));
        }
        Ok(None)
    }

    /// Returns up to `limit` records with `date_added >= since`, newest
    /// first. This is the poll-mode scan window.
    ///
    /// A value that no longer decodes is logged and skipped, so one bad
    /// entry cannot keep every record behind it out of the scan forever.
    pub fn recent_since(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<SignalRecord>> {
        let mut out = Vec::new();
        for item in self.records.iter() {
            let (key, bytes) = item?;
            let record: SignalRecord = match serde_json::from_slice(&bytes) {
                Ok(record) => record,
                Err(err) => {
                    warn!(
                        kind = %self.kind,
                        key = %String::from_utf8_lossy(&key),
                        %err,
                        "skipping undecodable record"
                    );
                    continue;
                }
            };
            if record.date_added >= since {
                out.push(record);
            }
        }
        out.sort_by(|a, b| b.date_added.cmp(&a.date_added));
        out.truncate(limit);
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Engine-side writes
    // ------------------------------------------------------------------

    /// Persists a freshly created baseline onto a record.
    ///
    /// The baseline is write-once: if the record already carries a proof
    /// block, [`StoreError::BaselineExists`] is returned and nothing
    /// changes.
    pub fn set_baseline(&self, id: &str, block: ProofBlock) -> Result<SignalRecord> {
        let mut record = self
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if record.proof.is_some() {
            return Err(StoreError::BaselineExists(id.to_string()));
        }
        record.proof = Some(block);
        self.put(&record, ChangeOp::Update)?;
        debug!(kind = %self.kind, id, "baseline persisted");
        Ok(record)
    }

    /// Records a tamper event: appends to the history, sets the monotonic
    /// `tampered` flag, tracks the new fingerprint and anchoring fields,
    /// and preserves the baseline `hash`/`canon` untouched.
    ///
    /// One atomic write covers the history append and every field it
    /// accompanies.
    pub fn record_tamper(&self, id: &str, update: TamperUpdate) -> Result<SignalRecord> {
        let mut record = self
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let proof = record
            .proof
            .as_mut()
            .ok_or_else(|| StoreError::Corrupt(format!("record {id} has no baseline")))?;

        proof.tampered = true;
        proof.last_rehash = Some(update.event.new_hash.clone());
        proof.last_canon = Some(update.event.new_canon.clone());
        proof.last_checked_at = Some(update.event.at);
        proof.prev_tx_hash = proof.tx_hash.take().or(proof.prev_tx_hash.take());
        proof.status = update.status;
        proof.tx_hash = update.tx_hash;
        proof.ledger_index = update.ledger_index;
        proof.memo_hex = update.memo_hex;
        proof.explorer_url = update.explorer_url.or(proof.explorer_url.take());
        proof.validated_at = update.validated_at;
        proof.onchain_checked = update.onchain_checked;
        proof.onchain_memo_match = update.onchain_memo_match;
        proof.onchain_prev_tx_hash = update.onchain_prev_tx_hash;
        if let Some(err) = update.error {
            proof.error = Some(err);
        }
        proof.history.push(update.event);

        self.put(&record, ChangeOp::Update)?;
        debug!(
            kind = %self.kind,
            id,
            events = record.proof.as_ref().map_or(0, |p| p.history.len()),
            "tamper event persisted"
        );
        Ok(record)
    }

    /// Best-effort enrichment: fills in a transaction reference discovered
    /// during verification, only where the fields are still empty.
    /// Idempotent and conflict-tolerant.
    pub fn enrich_tx(&self, id: &str, tx_hash: &str, explorer_url: &str) -> Result<()> {
        let mut record = self
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let Some(proof) = record.proof.as_mut() else {
            return Ok(());
        };
        if proof.tx_hash.is_some() {
            return Ok(());
        }
        proof.tx_hash = Some(tx_hash.to_string());
        if proof.explorer_url.is_none() {
            proof.explorer_url = Some(explorer_url.to_string());
        }
        self.put(&record, ChangeOp::Update)
    }

    // ------------------------------------------------------------------
    // Change feed
    // ------------------------------------------------------------------

    /// Subscribes to live change notifications.
    ///
    /// Returns [`StoreError::FeedUnavailable`] when the store was opened
    /// without change-feed support; the caller falls back to polling.
    pub fn subscribe(&self) -> Result<broadcast::Receiver<ChangeEvent>> {
        if !self.feed_enabled {
            return Err(StoreError::FeedUnavailable);
        }
        Ok(self.feed.subscribe())
    }

    /// Returns all oplog entries with `seq > after`, in order. Used to
    /// replay the feed from a resume marker after a restart.
    pub fn events_since(&self, after: u64) -> Result<Vec<ChangeEvent>> {
        let mut out = Vec::new();
        let start = after.saturating_add(1).to_be_bytes();
        for item in self.oplog.range(start..) {
            let (_, bytes) = item?;
            out.push(serde_json::from_slice(&bytes)?);
        }
        Ok(out)
    }

    /// Loads the persisted resume marker, if one was ever saved.
    pub fn load_marker(&self) -> Result<Option<u64>> {
        match self.meta.get(RESUME_MARKER_KEY)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_ref()
                    .try_into()
                    .map_err(|_| StoreError::Corrupt("resume marker".to_string()))?;
                Ok(Some(u64::from_be_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    /// Persists the resume marker. Durable enough to survive a graceful
    /// restart; not transactionally tied to the record write it follows.
    pub fn save_marker(&self, seq: u64) -> Result<()> {
        self.meta.insert(RESUME_MARKER_KEY, &seq.to_be_bytes())?;
        Ok(())
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("kind", &self.kind)
            .field("records", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proofwatch_core::LedgerNetwork;

    fn record(id: &str, ticker: &str) -> SignalRecord {
        SignalRecord {
            id: id.to_string(),
            ticker: ticker.to_string(),
            strategy: "buy/MN2".to_string(),
            date_added: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            close: 100.0,
            rsi_5: Some(25.0),
            rsi_240: None,
            mn: 0.5,
            proof: None,
        }
    }

    fn baseline(signal_id: &str, hash: &str) -> ProofBlock {
        ProofBlock {
            status: ProofStatus::Pending,
            hash: hash.to_string(),
            canon: "{}".to_string(),
            tampered: false,
            network: LedgerNetwork::Testnet,
            account: None,
            tx_hash: None,
            ledger_index: None,
            memo_hex: Some(hash.to_string()),
            explorer_url: None,
            signal_id: signal_id.to_string(),
            version: 1,
            note: Some("baseline created".to_string()),
            error: None,
            created_at: Utc::now(),
            validated_at: None,
            last_checked_at: None,
            last_rehash: None,
            last_canon: None,
            prev_tx_hash: None,
            onchain_checked: false,
            onchain_memo_match: None,
            onchain_prev_tx_hash: None,
            history: Vec::new(),
        }
    }

    fn tamper(prev: &str, new: &str) -> TamperUpdate {
        TamperUpdate {
            event: TamperEvent {
                at: Utc::now(),
                note: "tampered: update detected".to_string(),
                prev_hash: Some(prev.to_string()),
                new_hash: new.to_string(),
                prev_canon: Some("{}".to_string()),
                new_canon: "{\"x\":1}".to_string(),
                details: serde_json::Map::new(),
            },
            status: ProofStatus::Pending,
            tx_hash: None,
            ledger_index: None,
            memo_hex: Some(new.to_string()),
            explorer_url: None,
            validated_at: None,
            error: None,
            onchain_checked: false,
            onchain_memo_match: None,
            onchain_prev_tx_hash: None,
        }
    }

    #[test]
    fn test_insert_assigns_id() {
        let store = SignalStore::temporary().unwrap();
        let col = store.collection(RecordKind::Coin);

        let id = col.insert(record("", "T1")).unwrap();
        assert!(!id.is_empty());
        assert_eq!(col.get(&id).unwrap().unwrap().ticker, "T1");
    }

    #[test]
    fn test_collections_are_disjoint() {
        let store = SignalStore::temporary().unwrap();
        let coin = store.collection(RecordKind::Coin);
        let stock = store.collection(RecordKind::Stock);

        coin.insert(record("a", "COIN")).unwrap();
        assert!(stock.get("a").unwrap().is_none());
        assert_eq!(coin.len(), 1);
        assert_eq!(stock.len(), 0);
    }

    #[test]
    fn test_baseline_write_once() {
        let store = SignalStore::temporary().unwrap();
        let col = store.collection(RecordKind::Coin);
        col.insert(record("a", "T")).unwrap();

        col.set_baseline("a", baseline("a", "h1")).unwrap();
        let err = col.set_baseline("a", baseline("a", "h2")).unwrap_err();
        assert!(matches!(err, StoreError::BaselineExists(_)));

        // First baseline untouched.
        let stored = col.get("a").unwrap().unwrap();
        assert_eq!(stored.proof.unwrap().hash, "h1");
    }

    #[test]
    fn test_record_tamper_preserves_baseline_and_appends() {
        let store = SignalStore::temporary().unwrap();
        let col = store.collection(RecordKind::Coin);
        col.insert(record("a", "T")).unwrap();
        col.set_baseline("a", baseline("a", "h1")).unwrap();

        col.record_tamper("a", tamper("h1", "h2")).unwrap();
        let proof = col.get("a").unwrap().unwrap().proof.unwrap();
        assert!(proof.tampered);
        assert_eq!(proof.hash, "h1");
        assert_eq!(proof.last_rehash.as_deref(), Some("h2"));
        assert_eq!(proof.history.len(), 1);
        assert_eq!(proof.history[0].prev_hash.as_deref(), Some("h1"));

        // Second divergence chains off the first rehash.
        col.record_tamper("a", tamper("h2", "h3")).unwrap();
        let proof = col.get("a").unwrap().unwrap().proof.unwrap();
        assert_eq!(proof.hash, "h1");
        assert_eq!(proof.history.len(), 2);
        assert_eq!(proof.history[1].prev_hash.as_deref(), Some("h2"));
        assert!(proof.tampered);
    }

    #[test]
    fn test_enrich_fills_only_empty_fields() {
        let store = SignalStore::temporary().unwrap();
        let col = store.collection(RecordKind::Coin);
        col.insert(record("a", "T")).unwrap();
        col.set_baseline("a", baseline("a", "h1")).unwrap();

        col.enrich_tx("a", "TX1", "https://example/TX1").unwrap();
        col.enrich_tx("a", "TX2", "https://example/TX2").unwrap();

        let proof = col.get("a").unwrap().unwrap().proof.unwrap();
        assert_eq!(proof.tx_hash.as_deref(), Some("TX1"));
        assert_eq!(proof.explorer_url.as_deref(), Some("https://example/TX1"));
    }

    #[test]
    fn test_oplog_orders_and_replays() {
        let store = SignalStore::temporary().unwrap();
        let col = store.collection(RecordKind::Coin);

        col.insert(record("a", "T")).unwrap();
        let mut r = col.get("a").unwrap().unwrap();
        r.close = 101.0;
        col.update(&r).unwrap();

        let events = col.events_since(0).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].op, ChangeOp::Insert);
        assert_eq!(events[1].op, ChangeOp::Update);
        assert!(events[0].seq < events[1].seq);

        // Replay from a marker skips already-processed events.
        let tail = col.events_since(events[0].seq).unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].seq, events[1].seq);
    }

    #[tokio::test]
    async fn test_subscribe_delivers_live_events() {
        let store = SignalStore::temporary().unwrap();
        let col = store.collection(RecordKind::Coin);
        let mut rx = col.subscribe().unwrap();

        col.insert(record("a", "T")).unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.id, "a");
        assert_eq!(event.op, ChangeOp::Insert);
    }

    #[test]
    fn test_subscribe_unavailable_without_feed() {
        let store = SignalStore::temporary_without_feed().unwrap();
        let col = store.collection(RecordKind::Coin);
        assert!(matches!(
            col.subscribe().unwrap_err(),
            StoreError::FeedUnavailable
        ));
    }

    #[test]
    fn test_marker_roundtrip() {
        let store = SignalStore::temporary().unwrap();
        let col = store.collection(RecordKind::Coin);

        assert!(col.load_marker().unwrap().is_none());
        col.save_marker(42).unwrap();
        assert_eq!(col.load_marker().unwrap(), Some(42));
        col.save_marker(43).unwrap();
        assert_eq!(col.load_marker().unwrap(), Some(43));
    }

    #[test]
    fn test_marker_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SignalStore::open(dir.path()).unwrap();
            store
                .collection(RecordKind::Stock)
                .save_marker(7)
                .unwrap();
            store.flush().unwrap();
        }
        let store = SignalStore::open(dir.path()).unwrap();
        assert_eq!(
            store.collection(RecordKind::Stock).load_marker().unwrap(),
            Some(7)
        );
    }

    #[test]
    fn test_recent_since_window_and_limit() {
        let store = SignalStore::temporary().unwrap();
        let col = store.collection(RecordKind::Coin);

        for i in 0..5 {
            let mut r = record(&format!("r{i}"), "T");
            r.date_added = Utc.with_ymd_and_hms(2024, 5, 1, 12, i, 0).unwrap();
            col.insert(r).unwrap();
        }

        let since = Utc.with_ymd_and_hms(2024, 5, 1, 12, 2, 0).unwrap();
        let recent = col.recent_since(since, 2).unwrap();
        assert_eq!(recent.len(), 2);
        // Newest first.
        assert_eq!(recent[0].id, "r4");
        assert_eq!(recent[1].id, "r3");
    }

    #[test]
    fn test_recent_since_skips_undecodable_values() {
        let store = SignalStore::temporary().unwrap();
        let col = store.collection(RecordKind::Coin);
        col.insert(record("good", "T")).unwrap();
        // A value that no longer decodes as a record.
        col.records.insert(b"bad", b"not json".to_vec()).unwrap();

        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let recent = col.recent_since(since, 10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "good");
    }

    #[test]
    fn test_find_window_with_price_range() {
        let store = SignalStore::temporary().unwrap();
        let col = store.collection(RecordKind::Coin);
        col.insert(record("a", "T")).unwrap();

        let start = Utc.with_ymd_and_hms(2024, 5, 1, 11, 59, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 12, 1, 0).unwrap();

        let found = col
            .find_window("T", start, end, Some((99.9, 100.1)))
            .unwrap();
        assert!(found.is_some());

        let miss = col
            .find_window("T", start, end, Some((200.0, 201.0)))
            .unwrap();
        assert!(miss.is_none());

        let wrong_ticker = col.find_window("X", start, end, None).unwrap();
        assert!(wrong_ticker.is_none());
    }
}
