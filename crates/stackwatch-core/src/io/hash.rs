//! Cache key derivation from target credentials

use crate::config::Credentials;
use sha2::{Digest, Sha256};
use toml::Value;

/// Compute the cache key identifying a target's seed file.
///
/// SHA-256 over every `(key, value)` credential pair, sorted by key so the
/// result does not depend on entry order. Each pair contributes its key,
/// the value's TOML type name and the value text, every part
/// length-prefixed. That keeps `{"ab": "c"}` and `{"a": "bc"}` apart, as
/// well as `retries = 3` and `retries = "3"`.
/// Returns 64 lowercase hex characters.
pub fn cache_key(credentials: &Credentials) -> String {
    let mut pairs: Vec<(&str, &str, String)> = credentials
        .iter()
        .map(|(key, value)| (key.as_str(), value.type_str(), flatten(value)))
        .collect();
    pairs.sort();

    let mut hasher = Sha256::new();
    for (key, kind, value) in &pairs {
        update_prefixed(&mut hasher, key);
        update_prefixed(&mut hasher, kind);
        update_prefixed(&mut hasher, value);
    }
    format!("{:x}", hasher.finalize())
}

/// Plain strings hash as their contents; everything else as TOML text
fn flatten(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn update_prefixed(hasher: &mut Sha256, part: &str) {
    hasher.update((part.len() as u64).to_le_bytes());
    hasher.update(part.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(pairs: &[(&str, &str)]) -> Credentials {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn test_cache_key_is_hex_sha256() {
        let key = cache_key(&creds(&[("provider", "aws")]));
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_cache_key_deterministic() {
        let c = creds(&[("provider", "aws"), ("region", "us-east-1")]);
        assert_eq!(cache_key(&c), cache_key(&c.clone()));
    }

    #[test]
    fn test_cache_key_ignores_entry_order() {
        let a = creds(&[("provider", "aws"), ("region", "us-east-1"), ("profile", "prod")]);
        let b = creds(&[("profile", "prod"), ("region", "us-east-1"), ("provider", "aws")]);
        assert_eq!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn test_cache_key_differs_on_any_value() {
        let a = creds(&[("provider", "aws"), ("region", "us-east-1")]);
        let b = creds(&[("provider", "aws"), ("region", "us-west-2")]);
        assert_ne!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn test_cache_key_differs_on_extra_entry() {
        let a = creds(&[("provider", "aws")]);
        let b = creds(&[("provider", "aws"), ("profile", "")]);
        assert_ne!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn test_cache_key_keeps_keys_and_values_apart() {
        let swapped_a = creds(&[("a", "b")]);
        let swapped_b = creds(&[("b", "a")]);
        assert_ne!(cache_key(&swapped_a), cache_key(&swapped_b));

        let split_a = creds(&[("ab", "c")]);
        let split_b = creds(&[("a", "bc")]);
        assert_ne!(cache_key(&split_a), cache_key(&split_b));
    }

    #[test]
    fn test_cache_key_non_string_values() {
        let mut a = creds(&[("provider", "aws")]);
        a.insert("retries".to_string(), Value::Integer(3));
        let mut b = creds(&[("provider", "aws")]);
        b.insert("retries".to_string(), Value::Integer(4));
        assert_ne!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn test_cache_key_distinguishes_value_types() {
        let mut integer = creds(&[("provider", "aws")]);
        integer.insert("retries".to_string(), Value::Integer(3));
        let text = creds(&[("provider", "aws"), ("retries", "3")]);
        assert_ne!(cache_key(&integer), cache_key(&text));

        let mut boolean = creds(&[("provider", "aws")]);
        boolean.insert("verify".to_string(), Value::Boolean(true));
        let text = creds(&[("provider", "aws"), ("verify", "true")]);
        assert_ne!(cache_key(&boolean), cache_key(&text));
    }
}
