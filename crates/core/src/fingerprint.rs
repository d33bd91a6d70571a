use sha2::{Digest, Sha256};

/// Computes the cache key for a (model, text) pair.
///
/// The key is the hex-encoded SHA-256 digest of `model || ":" || text`.
/// No normalization is performed: two texts differing only by trailing
/// whitespace produce distinct keys.
pub fn fingerprint(model: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update(b":");
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_input() {
        assert_eq!(fingerprint("liang", "hello"), fingerprint("liang", "hello"));
    }

    #[test]
    fn distinguishes_model_and_text() {
        assert_ne!(fingerprint("liang", "hello"), fingerprint("other", "hello"));
        assert_ne!(fingerprint("liang", "hello"), fingerprint("liang", "world"));
    }

    #[test]
    fn no_normalization_of_trailing_whitespace() {
        assert_ne!(fingerprint("liang", "hello"), fingerprint("liang", "hello\n"));
    }

    #[test]
    fn is_64_hex_chars() {
        let key = fingerprint("liang", "hello world");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
