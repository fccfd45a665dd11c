//! `Tags` lists for generated queues and topics.

use serde_json::{Value, json};

/// Tags every generated queue and topic starts with.
pub fn base_tags() -> Vec<(String, Value)> {
    vec![
        ("Service".into(), json!("${self:service}")),
        ("Stage".into(), json!("${sls:stage}")),
    ]
}

pub fn upsert_tag(tags: &mut Vec<(String, Value)>, key: &str, value: Value) {
    match tags.iter_mut().find(|(existing, _)| existing.as_str() == key) {
        Some((_, existing)) => *existing = value,
        None => tags.push((key.to_string(), value)),
    }
}

/// Tag values are strings; other scalars are rendered as JSON text.
pub fn tag_value(value: &Value) -> Value {
    match value {
        Value::String(_) => value.clone(),
        other => Value::String(other.to_string()),
    }
}

pub fn tags_to_value(tags: Vec<(String, Value)>) -> Value {
    Value::Array(
        tags.into_iter()
            .map(|(key, value)| json!({ "Key": key, "Value": value }))
            .collect(),
    )
}
