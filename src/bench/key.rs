//! Correlation key generation
//!
//! Each request is tagged with a key derived only from its URL, so the
//! response can be matched back without keeping any in-flight table.
//! Distinct URLs hashing to the same key would have their results merged;
//! at 128 bits this is not guarded against.

use md5::{Digest, Md5};

/// Length of a correlation key in hex characters
pub const KEY_LENGTH: usize = 32;

/// Derives the correlation key for a URL
///
/// The key is the MD5 digest of the raw URL rendered as lowercase hex, so
/// stored results line up with those of other links benchmark tools.
///
/// # Example
///
/// ```
/// use links_benchmark::generate_key;
///
/// let key = generate_key("http://example.com/");
/// assert_eq!(key.len(), 32);
/// assert_eq!(key, generate_key("http://example.com/"));
/// ```
pub fn generate_key(url: &str) -> String {
    hex::encode(Md5::digest(url.as_bytes()))
}

/// Returns true if `candidate` has the shape of a correlation key
pub fn is_valid_key(candidate: &str) -> bool {
    candidate.len() == KEY_LENGTH && candidate.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_deterministic() {
        assert_eq!(generate_key("http://a.test"), generate_key("http://a.test"));
    }

    #[test]
    fn test_key_shape() {
        let key = generate_key("http://a.test");
        assert_eq!(key.len(), KEY_LENGTH);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(is_valid_key(&key));
    }

    #[test]
    fn test_distinct_urls_distinct_keys() {
        let urls = [
            "http://a.test",
            "http://b.test",
            "http://a.test/",
            "https://a.test",
            "",
        ];
        let keys: std::collections::HashSet<_> = urls.iter().map(|u| generate_key(u)).collect();
        assert_eq!(keys.len(), urls.len());
    }

    #[test]
    fn test_key_is_md5_hex() {
        assert_eq!(generate_key("abc"), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(generate_key(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_is_valid_key() {
        assert!(!is_valid_key("short"));
        assert!(!is_valid_key(&"g".repeat(KEY_LENGTH)));
    }
}
