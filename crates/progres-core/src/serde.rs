//! Lenient deserializers for upstream payloads.
//!
//! The PROGRES API is not consistent about numeric fields: the same grade
//! can arrive as `12.5`, `"12.5"`, `"12,5"` or `null` depending on the
//! endpoint. These helpers accept all of them.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                s.replace(',', ".").parse().ok()
            }
        }
        _ => None,
    }
}

/// Accepts a number, a numeric string, an empty string or `null`.
pub fn deserialize_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_f64))
}

/// Accepts an integer id given as a number or as a string.
pub fn deserialize_lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Maps `null` to `T::default()`. Pair with `#[serde(default)]` for missing keys.
pub fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
