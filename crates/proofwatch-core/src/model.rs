//! Data model for integrity-protected signal records.
//!
//! A [`SignalRecord`] is owned by the producing subsystem; the integrity
//! engine only reads its meaning-bearing fields and appends the embedded
//! [`ProofBlock`]. Once created, the block belongs exclusively to the
//! engine: the baseline `hash`/`canon` pair is write-once, `tampered` only
//! ever transitions `false → true`, and `history` only grows.
//!
//! Serialization is camelCase to match the persisted JSON shape
//! (`dateAdded`, `txHash`, ...), with the RSI fields keeping their original
//! upper-case names on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A time-series trading signal, the subject of integrity protection.
///
/// The numeric payload (`close`, the shape-specific RSI, `mn`) together with
/// `ticker`, `strategy` and `date_added` defines the record's economic
/// meaning; everything else is bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalRecord {
    /// Storage identifier. Excluded from the canonical form.
    pub id: String,

    /// Ticker symbol, e.g. `BITGET:BTCUSDT.P`.
    pub ticker: String,

    /// Strategy label, e.g. `buy/MN2`.
    pub strategy: String,

    /// Signal timestamp as recorded by the producer.
    pub date_added: DateTime<Utc>,

    /// Closing price at signal time.
    pub close: f64,

    /// 5-period RSI. Present on coin-shaped records.
    #[serde(rename = "RSI_5", default, skip_serializing_if = "Option::is_none")]
    pub rsi_5: Option<f64>,

    /// 240-period RSI. Present on stock-shaped records.
    #[serde(rename = "RSI_240", default, skip_serializing_if = "Option::is_none")]
    pub rsi_240: Option<f64>,

    /// Momentum indicator.
    pub mn: f64,

    /// Embedded integrity block, absent until the watcher baselines the
    /// record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<ProofBlock>,
}

/// Anchoring state of a proof block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProofStatus {
    /// Baseline exists but the digest is not (yet) validated on-ledger.
    Pending,
    /// The anchoring transaction was validated by the ledger.
    OnLedger,
    /// The last anchoring attempt failed; see [`ProofBlock::error`].
    Failed,
}

impl ProofStatus {
    /// Wire representation (`pending`, `on-ledger`, `failed`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::OnLedger => "on-ledger",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger network an anchoring transaction was submitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerNetwork {
    /// XRPL testnet.
    Testnet,
    /// XRPL mainnet.
    Mainnet,
}

impl LedgerNetwork {
    /// Public explorer URL for a transaction on this network.
    pub fn explorer_url(&self, tx_hash: &str) -> String {
        match self {
            Self::Mainnet => format!("https://livenet.xrpl.org/transactions/{tx_hash}"),
            Self::Testnet => format!("https://testnet.xrpl.org/transactions/{tx_hash}"),
        }
    }
}

impl Default for LedgerNetwork {
    fn default() -> Self {
        Self::Testnet
    }
}

/// The integrity block embedded in a [`SignalRecord`].
///
/// `hash` and `canon` hold the write-once baseline. After tampering is
/// detected, the current fingerprint is tracked in `last_rehash` /
/// `last_canon` while the baseline stays untouched; each divergence is
/// recorded as one [`TamperEvent`] in the append-only `history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofBlock {
    /// Anchoring state for the most recently submitted digest.
    pub status: ProofStatus,

    /// Baseline digest, lowercase hex. Immutable after creation.
    pub hash: String,

    /// Canonical string that produced `hash`. Immutable after creation.
    pub canon: String,

    /// Monotonic tamper flag: once `true`, never reset by this engine.
    pub tampered: bool,

    /// Network the anchoring transaction targets.
    pub network: LedgerNetwork,

    /// Anchoring account, if configured.
    #[serde(default)]
    pub account: Option<String>,

    /// Hash of the anchoring transaction, once known.
    #[serde(default)]
    pub tx_hash: Option<String>,

    /// Ledger index the transaction validated in.
    #[serde(default)]
    pub ledger_index: Option<u32>,

    /// Digest as embedded in the transaction memo.
    #[serde(default)]
    pub memo_hex: Option<String>,

    /// Public explorer link for `tx_hash`.
    #[serde(default)]
    pub explorer_url: Option<String>,

    /// Id of the protected record, kept for forensic context.
    pub signal_id: String,

    /// Proof-block schema version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Free-form annotation set at creation (`baseline created`).
    #[serde(default)]
    pub note: Option<String>,

    /// Last anchoring error, if any.
    #[serde(default)]
    pub error: Option<String>,

    /// When the baseline was created.
    pub created_at: DateTime<Utc>,

    /// When the current digest was validated on-ledger, if it was.
    #[serde(default)]
    pub validated_at: Option<DateTime<Utc>>,

    /// When the watcher last evaluated this record.
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,

    /// Most recent recomputed digest after tampering.
    #[serde(default)]
    pub last_rehash: Option<String>,

    /// Canonical string matching `last_rehash`.
    #[serde(default)]
    pub last_canon: Option<String>,

    /// Transaction that anchored the previous digest, kept when
    /// re-anchoring replaces `tx_hash`.
    #[serde(default)]
    pub prev_tx_hash: Option<String>,

    /// Whether the previous anchor was checked against the ledger when
    /// tampering was recorded.
    #[serde(default)]
    pub onchain_checked: bool,

    /// Result of that check (`None` when inconclusive).
    #[serde(default)]
    pub onchain_memo_match: Option<bool>,

    /// Transaction found to carry the previous digest, if any.
    #[serde(default)]
    pub onchain_prev_tx_hash: Option<String>,

    /// Append-only tamper history.
    #[serde(default)]
    pub history: Vec<TamperEvent>,
}

fn default_version() -> u32 {
    1
}

impl ProofBlock {
    /// The last-known digest for this record: the baseline until the first
    /// tamper event, then the most recent rehash.
    ///
    /// The watcher compares freshly computed digests against this value, so
    /// redelivering an unchanged (or already-recorded) state is a no-op.
    pub fn current_hash(&self) -> &str {
        self.last_rehash.as_deref().unwrap_or(&self.hash)
    }

    /// Canonical string matching [`current_hash`](Self::current_hash).
    pub fn current_canon(&self) -> &str {
        self.last_canon.as_deref().unwrap_or(&self.canon)
    }
}

/// A recorded divergence between a record's fingerprint and its last-known
/// state. Created only by the watcher; never mutated or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TamperEvent {
    /// When the divergence was observed.
    pub at: DateTime<Utc>,

    /// Reason string, e.g. `tampered: update detected`.
    pub note: String,

    /// Digest the record was last known to have.
    #[serde(default)]
    pub prev_hash: Option<String>,

    /// Digest recomputed from the record's current fields.
    pub new_hash: String,

    /// Canonical form behind `prev_hash`.
    #[serde(default)]
    pub prev_canon: Option<String>,

    /// Canonical form behind `new_hash`.
    pub new_canon: String,

    /// Changed canonical fields, old vs new.
    #[serde(default)]
    pub details: Map<String, Value>,
}
