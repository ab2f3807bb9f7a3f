/// API key generation and verification
///
/// Works together with `models::api_key` for storage. Keys have the format
/// `sk_{32 chars}`: the `sk_` prefix plus 32 random base62 characters.
/// Only the SHA-256 hash is ever persisted, and hash comparison is
/// constant-time.
///
/// # Example
///
/// ```
/// use bouwdesk_shared::auth::api_key::{generate_api_key, hash_api_key, validate_api_key_format};
///
/// let (key, hash) = generate_api_key();
/// assert!(key.starts_with("sk_"));
/// assert_eq!(key.len(), 35);
/// assert!(validate_api_key_format(&key));
/// assert_eq!(hash, hash_api_key(&key));
/// ```
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of the random part of the API key (characters)
const KEY_RANDOM_LENGTH: usize = 32;

/// API key prefix
const KEY_PREFIX: &str = "sk_";

/// Total length of an API key (prefix + random)
pub const API_KEY_LENGTH: usize = KEY_PREFIX.len() + KEY_RANDOM_LENGTH;

/// Generates a new API key
///
/// Returns the plaintext key and its SHA-256 hash. The plaintext is shown
/// to the caller once; only the hash goes to the database. Key space is
/// 62^32, roughly 2^190.
pub fn generate_api_key() -> (String, String) {
    let random_part = generate_random_string(KEY_RANDOM_LENGTH);
    let key = format!("{}{}", KEY_PREFIX, random_part);
    let hash = hash_api_key(&key);

    (key, hash)
}

/// Generates a random base62 string (A-Z, a-z, 0-9)
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

/// Hashes an API key with SHA-256, returning 64 hex characters
pub fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Checks the `sk_{32 alphanumeric}` format without touching the database
///
/// Lets the middleware reject junk before doing a hash lookup.
pub fn validate_api_key_format(key: &str) -> bool {
    if key.len() != API_KEY_LENGTH {
        return false;
    }

    if !key.starts_with(KEY_PREFIX) {
        return false;
    }

    let random_part = &key[KEY_PREFIX.len()..];
    random_part.chars().all(|c| c.is_alphanumeric())
}

/// Verifies a plaintext key against a stored hash in constant time
pub fn verify_api_key(key: &str, stored_hash: &str) -> bool {
    let computed_hash = hash_api_key(key);
    constant_time_compare(&computed_hash, stored_hash)
}

/// Constant-time string comparison
///
/// Accumulates differences with bitwise OR instead of short-circuiting, so
/// comparison time does not depend on where the strings diverge.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut result = 0u8;
    for i in 0..a_bytes.len() {
        result |= a_bytes[i] ^ b_bytes[i];
    }

    result == 0
}

/// Parses scopes from a comma-separated string
pub fn parse_scopes(scopes_str: &str) -> Vec<String> {
    scopes_str
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Checks if a scope list grants a required scope
///
/// Supports wildcards: `projects:*` matches `projects:read`, and a bare
/// `*` matches everything.
///
/// # Example
///
/// ```
/// use bouwdesk_shared::auth::api_key::has_scope;
///
/// let scopes = vec!["projects:read".to_string(), "documents:*".to_string()];
///
/// assert!(has_scope(&scopes, "projects:read"));
/// assert!(has_scope(&scopes, "documents:write"));
/// assert!(!has_scope(&scopes, "projects:write"));
/// ```
pub fn has_scope(scopes: &[String], required: &str) -> bool {
    for scope in scopes {
        if scope == "*" {
            return true;
        }

        if scope == required {
            return true;
        }

        if scope.ends_with(":*") {
            let prefix = &scope[..scope.len() - 1];
            if required.starts_with(prefix) {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_api_key() {
        let (key1, hash1) = generate_api_key();
        let (key2, hash2) = generate_api_key();

        assert!(key1.starts_with("sk_"));
        assert_eq!(key1.len(), 35);

        assert_ne!(key1, key2);
        assert_ne!(hash1, hash2);

        // SHA-256 hex
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_hash_api_key_deterministic() {
        let hash = hash_api_key("sk_test123");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_api_key("sk_test123"));
        assert_ne!(hash, hash_api_key("sk_different"));
    }

    #[test]
    fn test_validate_api_key_format() {
        assert!(validate_api_key_format("sk_abcdefghijklmnopqrstuvwxyz123456"));
        assert!(validate_api_key_format("sk_ABCDEFGHIJKLMNOPQRSTUVWXYZ123456"));

        // Wrong prefix
        assert!(!validate_api_key_format("ak_abcdefghijklmnopqrstuvwxyz123456"));

        // Wrong length
        assert!(!validate_api_key_format("sk_short"));
        assert!(!validate_api_key_format("sk_abcdefghijklmnopqrstuvwxyz1234567890"));

        // Non-alphanumeric payload
        assert!(!validate_api_key_format("sk_abc!@#defghijklmnopqrstuvwxy1234"));
    }

    #[test]
    fn test_verify_api_key() {
        let (key, hash) = generate_api_key();

        assert!(verify_api_key(&key, &hash));
        assert!(!verify_api_key("sk_wrongkey123456789012345678901aa", &hash));
        assert!(!verify_api_key("", &hash));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(constant_time_compare("", ""));

        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hello2"));
        assert!(!constant_time_compare("short", "longer string"));
    }

    #[test]
    fn test_parse_scopes() {
        assert_eq!(
            parse_scopes("projects:read, documents:write, billing:manage"),
            vec!["projects:read", "documents:write", "billing:manage"]
        );
        assert_eq!(parse_scopes(""), Vec::<String>::new());
        assert_eq!(
            parse_scopes("projects:read,,projects:write,"),
            vec!["projects:read", "projects:write"]
        );
    }

    #[test]
    fn test_has_scope() {
        let scopes = vec![
            "projects:read".to_string(),
            "projects:write".to_string(),
            "documents:*".to_string(),
        ];

        assert!(has_scope(&scopes, "projects:read"));
        assert!(has_scope(&scopes, "documents:upload"));
        assert!(has_scope(&scopes, "documents:delete"));

        assert!(!has_scope(&scopes, "projects:delete"));
        assert!(!has_scope(&scopes, "billing:manage"));

        let admin_scopes = vec!["*".to_string()];
        assert!(has_scope(&admin_scopes, "anything"));

        let empty: Vec<String> = vec![];
        assert!(!has_scope(&empty, "projects:read"));
    }

    #[test]
    fn test_full_api_key_workflow() {
        let (plaintext, hash) = generate_api_key();

        assert!(validate_api_key_format(&plaintext));
        assert!(verify_api_key(&plaintext, &hash));

        let (wrong_key, _) = generate_api_key();
        assert!(!verify_api_key(&wrong_key, &hash));
    }
}
