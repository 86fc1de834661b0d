//! Content hashing for backup payloads
//!
//! Digests are plain lowercase hex (no algorithm prefix) so they can be
//! stored and compared as-is in the metadata namespace.

use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA256 digest
pub const HASH_HEX_LEN: usize = 64;

/// Compute the SHA256 hash of data as 64 lowercase hex characters
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Check that a string has the shape of a stored content hash
pub fn is_content_hash(value: &str) -> bool {
    value.len() == HASH_HEX_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
