use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::configuration::Configuration;

/// Copy of `tree` with every mapping's keys in sorted order.
pub fn canonicalize(tree: &Value) -> Value {
    match tree {
        Value::Object(map) => {
            let mut keys = map.keys().collect::<Vec<_>>();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        scalar => scalar.clone(),
    }
}

/// Compact JSON text with sorted keys.
pub fn canonical_json(tree: &Value) -> String {
    canonicalize(tree).to_string()
}

/// Hex SHA-256 of the canonical JSON text of `tree`.
pub fn content_hash(tree: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(tree).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Identity of a batch of configurations, order-sensitive.
pub fn group_digest<'a>(configs: impl IntoIterator<Item = &'a Configuration>) -> String {
    let mut hasher = Sha256::new();
    for config in configs {
        hasher.update(config.content_hash().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::{canonical_json, content_hash};

    #[test]
    fn key_order_does_not_change_hash() {
        let mut first = Map::new();
        first.insert("b".to_owned(), json!(1));
        first.insert("a".to_owned(), json!({"y": [1, 2], "x": null}));

        let mut second = Map::new();
        second.insert("a".to_owned(), json!({"x": null, "y": [1, 2]}));
        second.insert("b".to_owned(), json!(1));

        assert_eq!(
            content_hash(&Value::Object(first)),
            content_hash(&Value::Object(second))
        );
    }

    #[test]
    fn sequence_order_changes_hash() {
        assert_ne!(content_hash(&json!([1, 2])), content_hash(&json!([2, 1])));
    }

    #[test]
    fn canonical_text_is_compact_and_sorted() {
        assert_eq!(
            canonical_json(&json!({"b": [true, null], "a": {"d": 1, "c": "x"}})),
            r#"{"a":{"c":"x","d":1},"b":[true,null]}"#
        );
    }

    #[test]
    fn hash_is_hex_sha256() {
        let hash = content_hash(&json!({}));
        assert_eq!(hash.len(), 64);
        assert!(hash.bytes().all(|byte| byte.is_ascii_hexdigit()));
    }
}
