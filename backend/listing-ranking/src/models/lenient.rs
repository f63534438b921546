//! Tolerant field decoders for record-store rows.
//!
//! Rows come from a managed backend that is loose about column types: numbers
//! sometimes arrive as strings, booleans as `"true"`, timestamps in more than
//! one layout. Every decoder here maps anything it cannot read to `None` (or an
//! empty collection) instead of failing the whole row.

use super::OpeningHoursRule;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub(crate) fn number_from_value(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

pub(crate) fn bool_from_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn timestamp_from_str(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // Postgres text form: "2025-01-31 12:00:00.123+00"
    for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(ts) = DateTime::parse_from_str(raw, format) {
            return Some(ts.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value))
}

pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(bool_from_value(&value))
}

/// `null` or garbage reads as `false`
pub(crate) fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_bool(deserializer)?.unwrap_or(false))
}

/// The store's `is_open` column is always filled in and `false` is its
/// resting value, so only `true` forces the open state
pub(crate) fn open_override<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_bool(deserializer)?.filter(|open| *open))
}

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Listing ids are text in the store but some exports emit them as numbers
pub(crate) fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "listing id must be a string or number, got {}",
            other
        ))),
    }
}

pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => timestamp_from_str(&s),
        // Epoch milliseconds
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    })
}

/// Non-array schedules become empty; malformed rows inside are dropped
pub(crate) fn lenient_schedule<'de, D>(deserializer: D) -> Result<Vec<OpeningHoursRule>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(rows) => rows.iter().filter_map(rule_from_value).collect(),
        _ => Vec::new(),
    })
}

fn rule_from_value(value: &Value) -> Option<OpeningHoursRule> {
    let row = value.as_object()?;
    let text = |key: &str| row.get(key).and_then(Value::as_str).map(str::to_string);

    Some(OpeningHoursRule {
        day: row
            .get("day")
            .and_then(number_from_value)
            .filter(|d| d.fract() == 0.0 && (0.0..=6.0).contains(d))
            .map(|d| d as u8),
        open: text("open"),
        close: text("close"),
        closed: row.get("closed").and_then(bool_from_value).unwrap_or(false),
    })
}
