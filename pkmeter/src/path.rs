//! Dotted-path lookups over nested JSON data
//!
//! Used for config lookups at render time and for `pkmeter get` queries
//! against cached widget documents. Lookups are total: a miss of any kind
//! yields `None`, never an error.

use serde_json::Value;

pub const DELIMITER: char = '.';

/// Walk `path` through `data`. Mapping nodes are indexed by key, sequence
/// nodes by a non-negative integer segment.
pub fn resolve<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for segment in path.split(DELIMITER) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Like [`resolve`] but falls back to `default` on a miss.
pub fn resolve_or(data: &Value, path: &str, default: Value) -> Value {
    resolve(data, path).cloned().unwrap_or(default)
}

pub fn resolve_str<'a>(data: &'a Value, path: &str) -> Option<&'a str> {
    resolve(data, path).and_then(Value::as_str)
}

pub fn resolve_i64(data: &Value, path: &str) -> Option<i64> {
    let value = resolve(data, path)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
}
