//! SHA-256 content digests in `sha256:<hex>` form

use sha2::{Digest, Sha256};

const PREFIX: &str = "sha256:";

/// Digest helper for clients that do not supply their own content hash
pub struct ContentDigest;

impl ContentDigest {
    /// Digest of `content`, e.g. "sha256:2cf24d..."
    pub fn compute(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        format!("{}{:x}", PREFIX, hasher.finalize())
    }

    /// Whether `hash` claims to be a digest in this format
    pub fn is_digest(hash: &str) -> bool {
        hash.starts_with(PREFIX)
    }

    pub fn is_valid(digest: &str) -> bool {
        match digest.strip_prefix(PREFIX) {
            Some(hex) => hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => false,
        }
    }

    pub fn verify(content: &[u8], expected: &str) -> bool {
        Self::compute(content) == expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_value() {
        assert_eq!(
            ContentDigest::compute(b"hello"),
            "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_validation() {
        assert!(ContentDigest::is_valid(&ContentDigest::compute(b"weights")));
        assert!(!ContentDigest::is_valid(&"a".repeat(64)));
        assert!(!ContentDigest::is_valid("sha256:abc123"));
        assert!(!ContentDigest::is_valid(&format!("sha256:{}", "g".repeat(64))));
    }

    #[test]
    fn test_verify() {
        let digest = ContentDigest::compute(b"weights");
        assert!(ContentDigest::is_digest(&digest));
        assert!(!ContentDigest::is_digest("h1"));
        assert!(ContentDigest::verify(b"weights", &digest));
        assert!(!ContentDigest::verify(b"other", &digest));
    }
}
