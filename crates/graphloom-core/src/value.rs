//! Property values and field coercion
//!
//! Every mapped field goes through a [`Coercion`]. Absent or blank fields map to
//! "no value" for every coercion; only non-empty text that fails to parse is a
//! record-level error.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::RecordError;

/// Declared conversion from raw source text to a typed property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Coercion {
    String,
    Integer,
    Float,
    /// `M/D/YYYY`, with blank fields mapped to no value
    DateOrNull,
}

impl fmt::Display for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::DateOrNull => "date",
        };
        f.write_str(name)
    }
}

impl Coercion {
    /// Whether values of this coercion can serve as node identity
    pub fn is_keyable(&self) -> bool {
        matches!(self, Self::String | Self::Integer)
    }

    /// Convert one raw field
    ///
    /// Returns `Ok(None)` for absent or blank input.
    pub fn coerce(&self, field: &str, raw: Option<&str>) -> Result<Option<PropertyValue>, RecordError> {
        let text = match raw.map(str::trim) {
            Some(text) if !text.is_empty() => text,
            _ => return Ok(None),
        };

        let fail = |reason: &str| RecordError::Coercion {
            field: field.to_string(),
            coercion: *self,
            value: text.to_string(),
            reason: reason.to_string(),
        };

        let value = match self {
            Self::String => PropertyValue::String(text.to_string()),
            Self::Integer => PropertyValue::Integer(parse_integer(text).ok_or_else(|| fail("not a number"))?),
            Self::Float => {
                let parsed: f64 = text.parse().map_err(|_| fail("not a number"))?;
                if !parsed.is_finite() {
                    return Err(fail("not a finite number"));
                }
                PropertyValue::Float(parsed)
            }
            Self::DateOrNull => PropertyValue::Date(parse_month_day_year(text).map_err(|reason| fail(reason))?),
        };

        Ok(Some(value))
    }
}

/// Integer parsing that also accepts decimal literals, truncating toward zero
fn parse_integer(text: &str) -> Option<i64> {
    if let Ok(value) = text.parse::<i64>() {
        return Some(value);
    }

    let float: f64 = text.parse().ok()?;
    if !float.is_finite() {
        return None;
    }
    let truncated = float.trunc();
    if truncated < i64::MIN as f64 || truncated > i64::MAX as f64 {
        return None;
    }
    Some(truncated as i64)
}

/// Parse `M/D/YYYY` (one or two digit month and day)
fn parse_month_day_year(text: &str) -> Result<NaiveDate, &'static str> {
    let parts: Vec<&str> = text.split('/').collect();
    let [month, day, year] = parts.as_slice() else {
        return Err("expected month/day/year");
    };
    let (month, day, year) = (*month, *day, *year);

    let numeric = |part: &str, max_len: usize| -> Option<u32> {
        if part.is_empty() || part.len() > max_len || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        part.parse().ok()
    };

    let month = numeric(month, 2).ok_or("month must be one or two digits")?;
    let day = numeric(day, 2).ok_or("day must be one or two digits")?;
    if year.len() != 4 {
        return Err("year must be four digits");
    }
    let year = numeric(year, 4).ok_or("year must be four digits")?;

    NaiveDate::from_ymd_opt(year as i32, month, day).ok_or("no such calendar date")
}

/// A typed property stored on a node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
}

impl PropertyValue {
    /// JSON form used by backends that bind parameters as JSON
    ///
    /// Dates become `YYYY-MM-DD` strings; backends that have a native date type
    /// cast them on write.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Mapped properties of one node, identity excluded
pub type Properties = BTreeMap<String, PropertyValue>;

/// Identity value of a node; unique within its node type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum NodeKey {
    String(String),
    Integer(i64),
}

impl NodeKey {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Integer(i) => serde_json::Value::from(*i),
        }
    }
}

impl TryFrom<PropertyValue> for NodeKey {
    type Error = PropertyValue;

    fn try_from(value: PropertyValue) -> Result<Self, Self::Error> {
        match value {
            PropertyValue::String(s) => Ok(Self::String(s)),
            PropertyValue::Integer(i) => Ok(Self::Integer(i)),
            other => Err(other),
        }
    }
}

impl From<&str> for NodeKey {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for NodeKey {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{}", i),
        }
    }
}
