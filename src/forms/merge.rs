//! Deep merge of configuration trees.
//!
//! # Responsibilities
//! - Overlay user-supplied configuration onto the default tables
//! - Recurse into nested objects, replace arrays and scalars wholesale
//! - Drop prototype-pollution keys at every depth
//!
//! # Design Decisions
//! - Operates on `serde_json::Value` so overrides can come from TOML, JSON or code
//! - Pure function: inputs are never mutated, the result is a fresh tree
//! - Unsafe keys are skipped with a warning rather than failing the merge

use serde_json::{Map, Value};

/// Keys that are never copied into a merged configuration.
pub const UNSAFE_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Returns true if `key` must be rejected during a merge.
pub fn is_unsafe_key(key: &str) -> bool {
    UNSAFE_KEYS.contains(&key)
}

/// Merge `source` onto a copy of `target`.
///
/// Objects are merged key by key, anything else in `source` replaces the
/// value in `target`. A non-object `source` leaves `target` untouched.
pub fn merge(target: &Value, source: &Value) -> Value {
    let mut merged = match sanitize(target) {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let Value::Object(source) = source else {
        return Value::Object(merged);
    };

    for (key, value) in source {
        if is_unsafe_key(key) {
            tracing::warn!(key = %key, "Skipping unsafe key during configuration merge");
            continue;
        }

        let next = match (merged.get(key), value) {
            (Some(existing @ Value::Object(_)), Value::Object(_)) => merge(existing, value),
            _ => sanitize(value),
        };
        merged.insert(key.clone(), next);
    }

    Value::Object(merged)
}

/// Copy `value`, removing unsafe keys from every nested object and array.
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut clean = Map::with_capacity(map.len());
            for (key, inner) in map {
                if is_unsafe_key(key) {
                    tracing::warn!(key = %key, "Skipping unsafe key during configuration merge");
                    continue;
                }
                clean.insert(key.clone(), sanitize(inner));
            }
            Value::Object(clean)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contains_unsafe_key(value: &Value) -> bool {
        match value {
            Value::Object(map) => map
                .iter()
                .any(|(k, v)| is_unsafe_key(k) || contains_unsafe_key(v)),
            Value::Array(items) => items.iter().any(contains_unsafe_key),
            _ => false,
        }
    }

    #[test]
    fn test_nested_objects_are_merged() {
        let target = json!({"ui": {"theme": "light", "showIcons": true}, "name": "a"});
        let source = json!({"ui": {"theme": "dark"}});

        let merged = merge(&target, &source);
        assert_eq!(merged["ui"]["theme"], "dark");
        assert_eq!(merged["ui"]["showIcons"], true);
        assert_eq!(merged["name"], "a");
    }

    #[test]
    fn test_arrays_are_replaced() {
        let target = json!({"fields": ["name", "email", "message"]});
        let source = json!({"fields": ["phone"]});

        let merged = merge(&target, &source);
        assert_eq!(merged["fields"], json!(["phone"]));
    }

    #[test]
    fn test_non_object_source_is_noop() {
        let target = json!({"a": 1});
        assert_eq!(merge(&target, &json!("oops")), target);
        assert_eq!(merge(&target, &json!([1, 2])), target);
        assert_eq!(merge(&target, &Value::Null), target);
    }

    #[test]
    fn test_target_is_not_mutated() {
        let target = json!({"a": {"b": 1}});
        let _ = merge(&target, &json!({"a": {"b": 2}}));
        assert_eq!(target["a"]["b"], 1);
    }

    #[test]
    fn test_unsafe_keys_rejected_at_top_level() {
        let source = json!({
            "__proto__": {"admin": true},
            "constructor": 1,
            "prototype": 2,
            "ok": 3
        });
        let merged = merge(&json!({}), &source);

        assert!(!contains_unsafe_key(&merged));
        assert_eq!(merged["ok"], 3);
    }

    #[test]
    fn test_unsafe_keys_rejected_at_depth() {
        let target = json!({"ui": {"theme": "light"}});
        let source = json!({
            "ui": {"__proto__": {"polluted": true}, "theme": "dark"},
            "fresh": {"nested": {"constructor": {"prototype": 1}, "keep": 1}},
            "list": [{"prototype": 1}, {"deep": [{"__proto__": 2}]}]
        });

        let merged = merge(&target, &source);
        assert!(!contains_unsafe_key(&merged));
        assert_eq!(merged["ui"]["theme"], "dark");
        assert_eq!(merged["fresh"]["nested"]["keep"], 1);
        assert_eq!(merged["list"][1]["deep"], json!([{}]));
    }

    #[test]
    fn test_unsafe_keys_in_target_are_dropped() {
        let target = json!({"__proto__": 1, "a": {"constructor": 2}});
        let merged = merge(&target, &json!({}));
        assert!(!contains_unsafe_key(&merged));
    }
}
