//! Reshape Grafana data frames from columnar form into rows.

use serde_json::{json, Map, Value};

/// `{schema: {name, fields[{name}]}, data: {values[[col]...]}}` to `{name, fields, rows}`.
pub fn frame_to_rows(frame: &Value) -> Value {
    let name = frame
        .pointer("/schema/name")
        .cloned()
        .unwrap_or(Value::Null);
    let fields: Vec<String> = frame
        .pointer("/schema/fields")
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .enumerate()
                .map(|(index, field)| field_name(field, index))
                .collect()
        })
        .unwrap_or_default();
    let columns: Vec<&Vec<Value>> = frame
        .pointer("/data/values")
        .and_then(Value::as_array)
        .map(|columns| columns.iter().filter_map(Value::as_array).collect())
        .unwrap_or_default();

    let row_count = columns.iter().map(|column| column.len()).max().unwrap_or(0);
    let rows: Vec<Value> = (0..row_count)
        .map(|row| {
            let mut object = Map::new();
            for (index, column) in columns.iter().enumerate() {
                let key = fields
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| format!("field{}", index));
                object.insert(key, column.get(row).cloned().unwrap_or(Value::Null));
            }
            Value::Object(object)
        })
        .collect();

    json!({ "name": name, "fields": fields, "rows": rows })
}

/// Prefer the display name, then the series name, then a positional fallback.
fn field_name(field: &Value, index: usize) -> String {
    ["/config/displayNameFromDS", "/name"]
        .iter()
        .find_map(|pointer| {
            field
                .pointer(pointer)
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
        })
        .map(str::to_string)
        .unwrap_or_else(|| format!("field{}", index))
}
