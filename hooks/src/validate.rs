use serde_json::{Map, Value};
use slshooks_service::{Result, ValidationError};

/// A required, non-empty string parameter.
pub(crate) fn require_str<'a>(
    hook: &'static str,
    field: &str,
    value: Option<&'a str>,
) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ValidationError::missing(hook, field)),
    }
}

/// An optional parameter that must be a (non-array) object when present.
pub(crate) fn optional_object<'a>(
    hook: &'static str,
    field: &str,
    value: Option<&'a Value>,
) -> Result<Option<&'a Map<String, Value>>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(ValidationError::wrong_shape(hook, field, "an object")),
    }
}

/// A required list parameter that must not be empty.
pub(crate) fn require_non_empty<'a, T>(
    hook: &'static str,
    field: &str,
    items: &'a [T],
) -> Result<&'a [T]> {
    if items.is_empty() {
        return Err(ValidationError::missing(hook, field));
    }
    Ok(items)
}

/// A string-valued entry of a free-form section such as `custom`.
pub(crate) fn section_str<'a>(section: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    section.get(key).and_then(Value::as_str)
}
