//! FILENAME: pivot-aggregator/src/value.rs
//! Raw record values, numeric coercion and group-key formatting.
//!
//! Every value a record can hold is a `RawValue`. Two views are derived
//! from it:
//! - `coerce_number`: classifies the value as valid / invalid / empty for
//!   numeric measures
//! - `format_key_part`: the text used to group records by this value

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

// ============================================================================
// RAW VALUE
// ============================================================================

/// A single scalar read from an input record.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Date(DateTime<Utc>),
    /// A value of any other type, carried in its string form.
    Other(String),
}

impl RawValue {
    pub fn text(s: impl Into<String>) -> Self {
        RawValue::Text(s.into())
    }

    /// Absent, blank text, or NaN.
    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Number(n) => n.is_nan(),
            RawValue::Text(s) => s.trim().is_empty(),
            RawValue::Boolean(_) | RawValue::Date(_) | RawValue::Other(_) => false,
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(value as f64)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Boolean(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<DateTime<Utc>> for RawValue {
    fn from(value: DateTime<Utc>) -> Self {
        RawValue::Date(value)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(RawValue::Empty, Into::into)
    }
}

impl From<&JsonValue> for RawValue {
    fn from(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => RawValue::Empty,
            JsonValue::Bool(b) => RawValue::Boolean(*b),
            JsonValue::Number(n) => n.as_f64().map_or(RawValue::Empty, RawValue::Number),
            JsonValue::String(s) => RawValue::Text(s.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => RawValue::Other(value.to_string()),
        }
    }
}

impl From<&RawValue> for JsonValue {
    fn from(value: &RawValue) -> Self {
        match value {
            RawValue::Empty => JsonValue::Null,
            RawValue::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(JsonValue::Null, JsonValue::Number),
            RawValue::Text(s) | RawValue::Other(s) => JsonValue::String(s.clone()),
            RawValue::Boolean(b) => JsonValue::Bool(*b),
            RawValue::Date(d) => JsonValue::String(format_date(d)),
        }
    }
}

impl Serialize for RawValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        JsonValue::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RawValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Ok(RawValue::from(&value))
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// Read access to one input record.
pub trait PivotRecord {
    /// Returns the value of `field`, or `None` when the record lacks it.
    fn field(&self, name: &str) -> Option<Cow<'_, RawValue>>;

    /// Like `field`, reading a missing field as `RawValue::Empty`.
    fn value_of(&self, name: &str) -> Cow<'_, RawValue> {
        self.field(name).unwrap_or(Cow::Owned(RawValue::Empty))
    }
}

/// The default record representation.
pub type Record = BTreeMap<String, RawValue>;

impl<S: BuildHasher> PivotRecord for HashMap<String, RawValue, S> {
    fn field(&self, name: &str) -> Option<Cow<'_, RawValue>> {
        self.get(name).map(Cow::Borrowed)
    }
}

impl PivotRecord for BTreeMap<String, RawValue> {
    fn field(&self, name: &str) -> Option<Cow<'_, RawValue>> {
        self.get(name).map(Cow::Borrowed)
    }
}

impl PivotRecord for serde_json::Map<String, JsonValue> {
    fn field(&self, name: &str) -> Option<Cow<'_, RawValue>> {
        self.get(name).map(|v| Cow::Owned(RawValue::from(v)))
    }
}

impl<R: PivotRecord + ?Sized> PivotRecord for &R {
    fn field(&self, name: &str) -> Option<Cow<'_, RawValue>> {
        (**self).field(name)
    }
}

// ============================================================================
// NUMERIC COERCION
// ============================================================================

/// Outcome of reading a raw value as a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coerced {
    Valid(f64),
    Invalid,
    Empty,
}

/// Parses trimmed text, accepting a decimal comma. Only finite results count.
fn parse_numeric_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized: Cow<'_, str> = if trimmed.contains(',') {
        Cow::Owned(trimmed.replacen(',', ".", 1))
    } else {
        Cow::Borrowed(trimmed)
    };
    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Classifies `value` for numeric measures.
pub fn coerce_number(value: &RawValue) -> Coerced {
    if value.is_empty() {
        return Coerced::Empty;
    }
    let number = match value {
        RawValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
        RawValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        RawValue::Date(d) => Some(d.timestamp_millis() as f64),
        RawValue::Text(s) | RawValue::Other(s) => parse_numeric_text(s),
        RawValue::Empty => None,
    };
    number.map_or(Coerced::Invalid, Coerced::Valid)
}

// ============================================================================
// KEY FORMATTING
// ============================================================================

/// ISO-8601 instant, millisecond precision, `Z` suffix.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Default textual form of a number: no trailing ".0", no negative zero,
/// exponent notation below 1e-6 and from 1e21 up ("1e-7", "1.5e+21").
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let label = if n > 0.0 { "Infinity" } else { "-Infinity" };
        label.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let formatted = format!("{:e}", n);
        match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        }
    } else {
        format!("{}", n)
    }
}

/// Formats a value as one part of a group key.
pub fn format_key_part(value: &RawValue, empty_placeholder: &str) -> String {
    match value {
        RawValue::Empty => empty_placeholder.to_string(),
        RawValue::Number(n) => format_number(*n),
        RawValue::Date(d) => format_date(d),
        RawValue::Boolean(b) => b.to_string(),
        RawValue::Text(s) | RawValue::Other(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                empty_placeholder.to_string()
            } else {
                trimmed.to_string()
            }
        }
    }
}
