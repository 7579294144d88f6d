//! Recursive removal of empty values from a JSON value tree.

use serde_json::Value;

/// Null, empty string, or a NaN number.
///
/// Text is never reinterpreted: `" "` and `"NaN"` are kept as written.
pub fn is_empty_scalar(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(f64::is_nan),
        _ => false,
    }
}

/// Drop empty scalars from objects and arrays at every depth.
///
/// Returns `None` when `value` itself is an empty scalar. Containers are kept
/// even if pruning empties them.
pub fn prune(value: Value) -> Option<Value> {
    match value {
        Value::Object(map) => Some(Value::Object(
            map.into_iter()
                .filter_map(|(k, v)| prune(v).map(|v| (k, v)))
                .collect(),
        )),
        Value::Array(items) => Some(Value::Array(items.into_iter().filter_map(prune).collect())),
        scalar if is_empty_scalar(&scalar) => None,
        scalar => Some(scalar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prunes_nested_values() {
        let value = json!({
            "id": "100",
            "customer": "",
            "status": null,
            "qty": 0,
            "flag": false,
            "notes": ["a", "", null, "NaN", {"x": null, "y": "kept"}],
            "meta": {"inner": {"empty": " ", "n": 1.5}},
        });

        let pruned = prune(value).unwrap();
        assert_eq!(
            pruned,
            json!({
                "id": "100",
                "qty": 0,
                "flag": false,
                "notes": ["a", "NaN", {"y": "kept"}],
                "meta": {"inner": {"empty": " ", "n": 1.5}},
            })
        );
    }

    #[test]
    fn test_empty_containers_survive() {
        assert_eq!(prune(json!({"attachments": []})).unwrap(), json!({"attachments": []}));
        assert_eq!(prune(json!({"a": {"b": null}})).unwrap(), json!({"a": {}}));
    }

    #[test]
    fn test_top_level_scalars() {
        assert!(prune(Value::Null).is_none());
        assert!(prune(json!("")).is_none());
        assert_eq!(prune(json!("x")), Some(json!("x")));
        assert!(!is_empty_scalar(&json!("nan")));
        assert!(!is_empty_scalar(&json!("Nan")));
        assert!(!is_empty_scalar(&json!(0.0)));
    }
}
