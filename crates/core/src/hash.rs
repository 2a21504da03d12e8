//! Content addressing primitives.
//!
//! Three fixed encodings anchor the wire protocol:
//! - asset `hash` fields are SHA-256 in URL-safe unpadded base64,
//! - asset `key` fields are MD5 in lowercase hex,
//! - update identifiers are derived from a digest string by keeping its
//!   first 32 characters and inserting dashes in 8-4-4-4-12 groups.
//!
//! MD5 is brought in via the `md-5` crate: the key field is not
//! security-sensitive, but the algorithm is fixed by the client protocol.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use md5::Md5;
use sha2::{Digest, Sha256};

/// SHA-256 digest of `data`, URL-safe base64 without padding.
pub fn sha256_b64url(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    URL_SAFE_NO_PAD.encode(digest)
}

/// MD5 digest of `data`, lowercase hex.
pub fn md5_hex(data: &[u8]) -> String {
    let digest = Md5::digest(data);
    hex::encode(digest)
}

/// Derive a UUID-shaped update identifier from a digest string.
///
/// Keeps the first 32 characters of `hash` (right-padded with `0` when
/// shorter) and inserts dashes as 8-4-4-4-12. The input may be hex or
/// base64url, so the result is only UUID-shaped, not a validated UUID;
/// callers treat it as an opaque string.
pub fn hash_to_update_id(hash: &str) -> String {
    let mut chars: Vec<char> = hash.chars().take(32).collect();
    while chars.len() < 32 {
        chars.push('0');
    }
    let s: String = chars.into_iter().collect();
    format!(
        "{}-{}-{}-{}-{}",
        &s[..8],
        &s[8..12],
        &s[12..16],
        &s[16..20],
        &s[20..32]
    )
}
