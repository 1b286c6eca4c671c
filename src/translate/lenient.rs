//! Forgiving deserializers for fields that clients and upstreams fill in inconsistently.
//!
//! A single odd element never takes its well-formed neighbours down with it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A JSON array, dropping each element that does not read as `T` (`null`, untyped
/// parts, mistyped fields). Anything other than an array is still an error.
pub fn skip_unreadable<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    Ok(readable(raw))
}

/// Like [`skip_unreadable`], but a non-array value reads as `None`.
pub fn readable_array<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(raw) => Some(readable(raw)),
        _ => None,
    })
}

/// `None` for `null` or a value of the wrong shape.
pub fn or_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).ok())
}

fn readable<T: DeserializeOwned>(raw: Vec<Value>) -> Vec<T> {
    raw.into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
}
