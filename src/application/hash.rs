//! Content hashing for change detection
//!
//! Unit files are always overwritten on install; the hash tells the operator
//! whether the overwrite actually changed anything.

use sha2::{Digest, Sha256};

/// Compute the full lowercase hex SHA-256 of `content`.
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Short form used in log lines (first 8 hex characters).
pub fn short_hash(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_same_content_when_hashing_then_hashes_match() {
        assert_eq!(content_hash(b"[Unit]\n"), content_hash(b"[Unit]\n"));
        assert_ne!(content_hash(b"[Unit]\n"), content_hash(b"[Unit]\n\n"));
    }

    #[test]
    fn given_hash_when_shortening_then_returns_prefix() {
        let hash = content_hash(b"hello");
        assert_eq!(hash.len(), 64);
        assert_eq!(short_hash(&hash), &hash[..8]);
        assert_eq!(short_hash("abc"), "abc");
    }
}
