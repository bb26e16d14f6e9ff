//! SHA-256 digests used for content-addressed identifier suffixes.

use sha2::{Digest, Sha256};

/// Number of hex characters kept by [`short_digest`].
pub const SHORT_DIGEST_LEN: usize = 8;

/// Compute the SHA-256 checksum of a string as lowercase hex.
pub fn compute_checksum(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)
}

/// First [`SHORT_DIGEST_LEN`] hex characters of the SHA-256 of `s`.
pub fn short_digest(s: &str) -> String {
    let mut digest = compute_checksum(s);
    digest.truncate(SHORT_DIGEST_LEN);
    digest
}
