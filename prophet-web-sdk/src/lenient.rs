//! Forgiving field decoders for agent-produced payloads
//!
//! Tool arguments are written by the model, so optional fields arrive as
//! `null` or with the wrong JSON type. These keep one odd field from
//! invalidating the whole event.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `null` decodes like a missing field
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Board id as a JSON integer or a numeric string; anything else is `None`
pub fn board_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().trim_start_matches('#').parse().ok(),
        _ => None,
    })
}

/// Source id as a string, or a number rendered as text; anything else is `None`
pub fn source_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
