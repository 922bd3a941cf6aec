//! Parse-or-default coercion for every numeric field.
//!
//! Quantities, prices, tax rates and discounts are never rejected. Anything
//! that is not a finite, non-negative number becomes `0.0`. All numeric
//! input (raw edits, persisted JSON, totals inputs) goes through here.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Coerce an already-numeric value. NaN, infinities and negatives become 0.
pub fn coerce(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Parse raw user input. Surrounding whitespace is ignored; empty or
/// unparseable input is 0.
pub fn parse_or_zero(raw: &str) -> f64 {
    raw.trim().parse::<f64>().map(coerce).unwrap_or(0.0)
}

/// Coerce an arbitrary JSON value: numbers and numeric strings are kept,
/// everything else (null, bools, arrays, objects) is 0.
pub fn from_json(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().map(coerce).unwrap_or(0.0),
        Value::String(s) => parse_or_zero(s),
        _ => 0.0,
    }
}

/// `#[serde(deserialize_with = "...")]` adapter for lenient numeric fields.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(from_json(&value))
}
