/// API key utilities
///
/// API keys are the programmatic trust path: a key resolves directly to the
/// user owning its hash, with no session object, no expiry, and no
/// password-change check.
///
/// # Key Format
///
/// `cb_{32_chars}` (prefix + 32 random base62 chars). Keys are hashed with
/// SHA-256 before storage; only the hash ever touches the database.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of the random part of the API key (characters)
const KEY_RANDOM_LENGTH: usize = 32;

/// API key prefix
const KEY_PREFIX: &str = "cb_";

/// Total length of an API key (prefix + random)
pub const API_KEY_LENGTH: usize = KEY_PREFIX.len() + KEY_RANDOM_LENGTH;

/// Generates a new API key
///
/// # Returns
///
/// Tuple of (plaintext_key, sha256_hash). The plaintext is shown to the
/// user once; the hash is what gets stored on the `users` row.
pub fn generate_api_key() -> (String, String) {
    let random_part = generate_random_string(KEY_RANDOM_LENGTH);
    let key = format!("{}{}", KEY_PREFIX, random_part);
    let hash = hash_api_key(&key);

    (key, hash)
}

/// Generates a random alphanumeric string
///
/// Base62 (A-Z, a-z, 0-9) keeps keys URL-safe.
fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Hashes an API key using SHA-256
///
/// # Returns
///
/// Hex-encoded SHA-256 hash (64 characters)
pub fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Validates API key format
///
/// Checks the prefix, the total length, and that the random part is
/// alphanumeric. Avoids a database lookup for garbage input.
pub fn validate_api_key_format(key: &str) -> bool {
    if key.len() != API_KEY_LENGTH {
        return false;
    }

    let Some(random_part) = key.strip_prefix(KEY_PREFIX) else {
        return false;
    };

    random_part.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_api_key() {
        let (key, hash) = generate_api_key();

        assert!(key.starts_with("cb_"));
        assert_eq!(key.len(), API_KEY_LENGTH);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_api_key(&key));
    }

    #[test]
    fn test_keys_are_unique() {
        let (key1, _) = generate_api_key();
        let (key2, _) = generate_api_key();
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_api_key("cb_test123"), hash_api_key("cb_test123"));
    }

    #[test]
    fn test_validate_format() {
        let (key, _) = generate_api_key();
        assert!(validate_api_key_format(&key));

        assert!(!validate_api_key_format("cb_short"));
        assert!(!validate_api_key_format(
            "xx_abcdefghijklmnopqrstuvwxyz123456"
        ));
        assert!(!validate_api_key_format(
            "cb_abcdefghijklmnopqrstuvwxyz12345!"
        ));
    }
}
