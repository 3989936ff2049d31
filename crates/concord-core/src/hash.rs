//! Content hashing for divergence detection.
//!
//! `serde_json::Map` is ordered by key (the `preserve_order` feature is not
//! enabled), so serializing a value yields a canonical byte string.

use sha2::{Digest, Sha256};

/// SHA-256 of the canonical JSON encoding of `value`, lowercase hex.
#[must_use]
pub fn json_digest(value: &serde_json::Value) -> String {
    let canonical = value.to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
