//! SHA-256 hashing of canonical strings.
//!
//! Correctness-critical, not performance-critical: digests rendered here
//! become baselines, ledger memos and verification inputs, so the two rules
//! are fixed once and never vary — lowercase hex, no prefix.

use sha2::{Digest, Sha256};

/// Computes the SHA-256 digest of a canonical string as lowercase hex.
///
/// ```rust
/// use proofwatch_core::sha256_hex;
///
/// let digest = sha256_hex("abc");
/// assert_eq!(
///     digest,
///     "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
/// );
/// ```
pub fn sha256_hex(canon: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canon.as_bytes());
    hex::encode(hasher.finalize())
}

/// Normalizes externally supplied hex for comparison: lowercases and strips
/// an optional `0x` prefix. Stored digests and caller-provided digests
/// compare equal regardless of formatting.
pub fn normalize_hex(s: &str) -> String {
    let trimmed = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    trimmed.to_ascii_lowercase()
}
