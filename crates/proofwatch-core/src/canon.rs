//! Deterministic canonical encoding of signal records.
//!
//! The canonical form is a compact JSON string with sorted object keys,
//! minimal number representation and minimal string escaping, in the spirit
//! of RFC 8785 (JCS). Two records that agree on every whitelisted field
//! produce the byte-identical string; two records that differ in any of
//! them do not.
//!
//! Only the whitelisted target built by [`canon_target`] is ever encoded,
//! never a full record, so storage ids, the proof block and other
//! bookkeeping cannot leak into the fingerprint.

use crate::model::SignalRecord;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Number, Value};

/// Discriminates the two monitored record shapes.
///
/// The shapes differ only in which RSI field carries meaning: coin signals
/// use the 5-period RSI, stock signals the 240-period one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Coin strategy signals (`RSI_5`).
    Coin,
    /// Stock strategy signals (`RSI_240`).
    Stock,
}

impl RecordKind {
    /// Collection label (`coin` / `stock`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coin => "coin",
            Self::Stock => "stock",
        }
    }

    /// The RSI value that carries meaning for this shape.
    fn rsi_of(&self, record: &SignalRecord) -> Option<f64> {
        match self {
            Self::Coin => record.rsi_5,
            Self::Stock => record.rsi_240,
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rounds to `decimals` places, half away from zero.
///
/// Applied before encoding so that floating-point representation noise
/// (e.g. a price that re-serializes as `97282.70000000001`) never changes
/// the canonical string. Rounding an already-rounded value is a no-op.
fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn rounded(value: f64, decimals: u32) -> Value {
    match Number::from_f64(round_to(value, decimals)) {
        Some(n) => Value::Number(n),
        // NaN/inf are not representable in JSON; encode as null rather
        // than silently dropping the key.
        None => Value::Null,
    }
}

/// Normalizes a timestamp to the single canonical UTC instant string,
/// millisecond precision with a `Z` suffix (`2024-05-01T12:00:00.000Z`).
pub fn canon_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Builds the whitelisted canonical target for a record.
///
/// The target is `{type, symbol, ts, payload: {close, rsi, mn}}` with
/// price-like fields rounded to 4 decimals and the oscillator to 2. An RSI
/// missing for the record's shape encodes as `null`.
pub fn canon_target(record: &SignalRecord, kind: RecordKind) -> Value {
    json!({
        "type": record.strategy,
        "symbol": record.ticker,
        "ts": canon_timestamp(record.date_added),
        "payload": {
            "close": rounded(record.close, 4),
            "rsi": kind.rsi_of(record).map(|v| rounded(v, 2)).unwrap_or(Value::Null),
            "mn": rounded(record.mn, 4),
        },
    })
}

/// Canonical string for a record: [`canon_target`] passed through
/// [`canonicalize`]. This is the hashing input everywhere in the system.
pub fn canonical_string(record: &SignalRecord, kind: RecordKind) -> String {
    canonicalize(&canon_target(record, kind))
}

/// Serializes a JSON value canonically: sorted object keys, no whitespace,
/// minimal numbers, minimal escaping.
///
/// Keys sort by byte order, which for the ASCII keys used throughout this
/// system coincides with the RFC 8785 UTF-16 code unit order.
///
/// ```rust
/// use proofwatch_core::canonicalize;
/// use serde_json::json;
///
/// assert_eq!(
///     canonicalize(&json!({"b": 1, "a": 2})),
///     canonicalize(&json!({"a": 2, "b": 1})),
/// );
/// assert_eq!(canonicalize(&json!({"a": 2, "b": 1})), r#"{"a":2,"b":1}"#);
/// ```
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => write_object(out, map),
    }
}

/// Minimal number representation: whole values print as integers, anything
/// else uses Rust's shortest-roundtrip float formatting.
fn write_number(out: &mut String, n: &Number) {
    if let Some(i) = n.as_i64() {
        out.push_str(&i.to_string());
    } else if let Some(u) = n.as_u64() {
        out.push_str(&u.to_string());
    } else if let Some(f) = n.as_f64() {
        if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
            out.push_str(&(f as i64).to_string());
        } else {
            out.push_str(&f.to_string());
        }
    } else {
        out.push_str(&n.to_string());
    }
}

/// Minimal escaping: only `"`, `\` and control characters.
fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\x08' => out.push_str("\\b"),
            '\x0C' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c < '\x20' => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

fn write_object(out: &mut String, map: &Map<String, Value>) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    out.push('{');
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(out, key);
        out.push(':');
        write_value(out, &map[key.as_str()]);
    }
    out.push('}');
}
