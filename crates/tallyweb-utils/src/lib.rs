//! Utility functions and helpers

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Number, Value};

/// Current time as an ISO-8601 string with millisecond precision
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time as milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Recursively merge `source` into `target`.
///
/// Nested objects are merged key by key; any other value in `source`
/// replaces the one in `target`, `null` included.
pub fn deep_merge(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, incoming) in source {
        if let (Some(Value::Object(existing)), Value::Object(nested)) = (target.get_mut(key), incoming) {
            deep_merge(existing, nested);
            continue;
        }
        target.insert(key.clone(), incoming.clone());
    }
}

/// Add two JSON numbers, staying integral when both sides are integers
pub fn add_numbers(a: &Number, b: &Number) -> Option<Number> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(sum) = x.checked_add(y) {
            return Some(Number::from(sum));
        }
    }
    Number::from_f64(a.as_f64()? + b.as_f64()?)
}

/// Loose key comparison: a JSON number matches itself or its decimal string
pub fn keys_match(field: &Value, key: &Value) -> bool {
    match (field, key) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Number(a), Value::String(s)) | (Value::String(s), Value::Number(a)) => {
            s.trim().parse::<f64>().ok() == a.as_f64()
        }
        (Value::String(a), Value::String(b)) => a == b,
        _ => false,
    }
}
