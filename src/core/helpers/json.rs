#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Decode a component configuration into its typed form.
pub fn decode_configuration<T: DeserializeOwned>(
    component: &str,
    configuration: &Value,
) -> Result<T, AppError> {
    serde_json::from_value(configuration.clone()).map_err(|err| {
        AppError::new(
            ErrorCategory::ValidationError,
            format!("failed to decode {} configuration: {}", component, err),
        )
    })
}

/// Replace a string that holds a JSON object or array with the parsed value.
///
/// Users often paste JSON into text inputs (attributes, overrides, labels); every other value
/// passes through unchanged.
pub fn embed_json(value: &Value) -> Value {
    if let Value::String(text) = value {
        let trimmed = text.trim();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
                if parsed.is_object() || parsed.is_array() {
                    return parsed;
                }
            }
        }
    }
    value.clone()
}

/// Dotted-path lookup in nested JSON objects: `lookup_path(v, "data.issue.status")`.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// First non-empty string found among the candidate paths.
pub fn first_string(value: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|path| {
        lookup_path(value, path).and_then(|found| match found {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
    })
}

/// Coerce an optional object (or JSON text holding one) into a map of attributes.
pub fn object_or_empty(field: &str, value: Option<&Value>) -> Result<Map<String, Value>, AppError> {
    match value.map(embed_json) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(AppError::new(
            ErrorCategory::ValidationError,
            format!("{} must be an object", field),
        )),
    }
}

/// Keep only fields whose value is set, producing compact output payloads.
pub fn compact(map: Map<String, Value>) -> Value {
    Value::Object(
        map.into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect(),
    )
}
