//! Helpers for merging into free-form configuration maps.

use serde_json::{Map, Value};

/// The object stored under `key`, created (or replacing a non-object value) when needed.
pub fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(object) => object,
        _ => unreachable!("slot was just set to an object"),
    }
}

/// The array stored under `key`, created (or replacing a non-array value) when needed.
pub fn array_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Vec<Value> {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    match slot {
        Value::Array(items) => items,
        _ => unreachable!("slot was just set to an array"),
    }
}

/// Fill keys missing from `target` with values from `defaults`, recursing into nested objects.
///
/// Values already present in `target` always win.
pub fn merge_defaults(target: &mut Map<String, Value>, defaults: &Map<String, Value>) {
    for (key, default) in defaults {
        match target.get_mut(key) {
            None => {
                target.insert(key.clone(), default.clone());
            }
            Some(Value::Object(existing)) => {
                if let Value::Object(nested) = default {
                    merge_defaults(existing, nested);
                }
            }
            Some(_) => {}
        }
    }
}

/// `defaults` with each key of `overrides` laid over it (shallow).
pub fn with_defaults(defaults: &Map<String, Value>, overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = defaults.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Append `item` to `items` unless an equal value is already present.
pub fn push_unique(items: &mut Vec<Value>, item: Value) -> bool {
    if items.contains(&item) {
        return false;
    }
    items.push(item);
    true
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn merge_defaults_keeps_existing_values() {
        let mut target = object(json!({
            "runtime": "python3.12",
            "environment": { "STAGE": "prod" }
        }));
        let defaults = object(json!({
            "runtime": "nodejs20.x",
            "region": "us-east-1",
            "environment": { "STAGE": "${sls:stage}", "SERVICE": "${self:service}" }
        }));

        merge_defaults(&mut target, &defaults);

        assert_eq!(
            Value::Object(target),
            json!({
                "runtime": "python3.12",
                "environment": { "STAGE": "prod", "SERVICE": "${self:service}" },
                "region": "us-east-1"
            })
        );
    }

    #[test]
    fn with_defaults_lets_overrides_win() {
        let merged = with_defaults(
            &object(json!({ "timeout": 15, "batchSize": 1 })),
            &object(json!({ "batchSize": 10 })),
        );
        assert_eq!(Value::Object(merged), json!({ "timeout": 15, "batchSize": 10 }));
    }

    #[test]
    fn entries_replace_wrong_shapes() {
        let mut map = object(json!({ "custom": "oops", "list": {} }));
        object_entry(&mut map, "custom").insert("a".into(), json!(1));
        array_entry(&mut map, "list").push(json!(2));
        assert_eq!(Value::Object(map), json!({ "custom": { "a": 1 }, "list": [2] }));
    }

    #[test]
    fn push_unique_skips_duplicates() {
        let mut items = vec![json!({ "Effect": "Allow" })];
        assert!(!push_unique(&mut items, json!({ "Effect": "Allow" })));
        assert!(push_unique(&mut items, json!({ "Effect": "Deny" })));
        assert_eq!(items.len(), 2);
    }
}
