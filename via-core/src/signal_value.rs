//! Signal value representation and the flatten/nest encoding rule used when
//! moving values on and off the wire (spec.md §4.7, §6).
//!
//! Signal values are `serde_json::Value` under the hood -- every signal the
//! client ever sees round-trips through JSON anyway, and reaching for
//! `serde_json::Value` wherever a payload is loosely typed is exactly what
//! this lineage already does for event payloads. `IndexMap` (not
//! `std::collections::HashMap`) backs the nested-object builder so that key
//! order in `signals` patches is deterministic and matches insertion order.

use indexmap::IndexMap;
use serde_json::Value;

pub type SignalValue = Value;

/// Flatten a nested JSON object into dotted keys: `{"a":{"b":1,"c":2},"x":3}`
/// becomes `{"a.b":1,"a.c":2,"x":3}`. Arrays are left as leaf values -- only
/// object nesting is dotted.
pub fn flatten(value: &Value) -> IndexMap<String, Value> {
    let mut out = IndexMap::new();
    flatten_into(String::new(), value, &mut out);
    out
}

fn flatten_into(prefix: String, value: &Value, out: &mut IndexMap<String, Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let next_prefix = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(next_prefix, child, out);
            }
        }
        other => {
            out.insert(prefix, other.clone());
        }
    }
}

/// Inverse of [`flatten`]: keys containing `.` become nested objects.
/// `{"a.b": 1, "a.c": 2, "x": 3}` -> `{"a": {"b": 1, "c": 2}, "x": 3}`.
pub fn nest(flat: &IndexMap<String, Value>) -> Value {
    let mut root = IndexMap::new();
    for (key, value) in flat {
        insert_nested(&mut root, key, value.clone());
    }
    index_map_to_value(root)
}

fn insert_nested(root: &mut IndexMap<String, Value>, key: &str, value: Value) {
    let mut segments = key.split('.');
    let Some(first) = segments.next() else {
        return;
    };
    let rest: Vec<&str> = segments.collect();
    if rest.is_empty() {
        root.insert(first.to_string(), value);
        return;
    }
    let entry = root
        .entry(first.to_string())
        .or_insert_with(|| Value::Object(Default::default()));
    // Re-enter as an IndexMap-backed nested builder by recursing through a
    // local map, then flattening back into a serde_json::Map for storage.
    let mut nested: IndexMap<String, Value> = match entry.take() {
        Value::Object(map) => map.into_iter().collect(),
        _ => IndexMap::new(),
    };
    insert_nested(&mut nested, &rest.join("."), value);
    *entry = index_map_to_value(nested);
}

fn index_map_to_value(map: IndexMap<String, Value>) -> Value {
    Value::Object(map.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flatten_nests_dotted_keys() {
        let value = json!({"a": {"b": 1, "c": 2}, "x": 3});
        let flat = flatten(&value);
        assert_eq!(flat.get("a.b"), Some(&json!(1)));
        assert_eq!(flat.get("a.c"), Some(&json!(2)));
        assert_eq!(flat.get("x"), Some(&json!(3)));
    }

    #[test]
    fn nest_reverses_flatten() {
        let mut flat = IndexMap::new();
        flat.insert("a.b".to_string(), json!(1));
        flat.insert("a.c".to_string(), json!(2));
        flat.insert("x".to_string(), json!(3));
        let nested = nest(&flat);
        assert_eq!(nested, json!({"a": {"b": 1, "c": 2}, "x": 3}));
    }

    #[test]
    fn round_trip_nest_flatten_is_identity() {
        let original = json!({"a": {"b": 1, "c": {"d": 2}}, "x": 3, "list": [1, 2, 3]});
        let flat = flatten(&original);
        let nested = nest(&flat);
        assert_eq!(nested, original);
    }

    #[test]
    fn arrays_stay_arrays_not_nested_objects() {
        let value = json!({"items": [1, 2, 3]});
        let flat = flatten(&value);
        assert_eq!(flat.get("items"), Some(&json!([1, 2, 3])));
    }
}
