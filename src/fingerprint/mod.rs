//! Fingerprint / key builder (C4): derive a deterministic cache key from an
//! operation name plus a structured input.
//!
//! Grounded on the webpipe example's `FsCache::key_for_fetch_v2` pattern:
//! canonicalise to JSON, hash with SHA-256, hex-encode. This variant sorts
//! only the top-level object keys (per spec §4.4's "top-level" contract)
//! rather than doing a full recursive canonicalisation.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Derive a 24-hex-character cache key from `prefix` and `value`.
///
/// `value` is serialised to JSON, its top-level object keys sorted
/// lexicographically, the result prefixed with `"{prefix}:"`, hashed with
/// SHA-256, and the first 24 hex characters of the digest returned.
#[must_use]
pub fn cache_key<T: Serialize>(prefix: &str, value: &T) -> String {
    let canonical = canonicalize_top_level(value);
    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(b":");
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..24].to_string()
}

/// Serialise `value` to JSON with top-level object keys sorted. Nested
/// objects are left in their serialisation order — only top-level
/// order-insensitivity is a contract (spec §4.4, §8 invariant 3).
fn canonicalize_top_level<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_value(value).unwrap_or(Value::Null);
    match json {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = String::from("{");
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(k).unwrap_or_default());
                out.push(':');
                out.push_str(&serde_json::to_string(v).unwrap_or_default());
            }
            out.push('}');
            out
        }
        other => serde_json::to_string(&other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deterministic_and_order_insensitive_at_top_level() {
        let a = json!({"a": 1, "z": 2});
        let b = json!({"z": 2, "a": 1});
        assert_eq!(cache_key("op", &a), cache_key("op", &b));
    }

    #[test]
    fn different_prefix_yields_different_key() {
        let v = json!({"a": 1});
        assert_ne!(cache_key("scrape", &v), cache_key("search", &v));
    }

    #[test]
    fn different_value_yields_different_key() {
        let a = json!({"a": 1});
        let b = json!({"a": 2});
        assert_ne!(cache_key("op", &a), cache_key("op", &b));
    }

    #[test]
    fn key_matches_expected_shape() {
        let v = json!({"url": "https://example.com"});
        let key = cache_key("scrape", &v);
        assert_eq!(key.len(), 24);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
