//! Conversions between graph property values and SurrealQL parameters

use chrono::DateTime;
use graphloom_core::{NodeKey, Properties, PropertyValue, StoreError, StoreResult};
use serde_json::{Map, Value};

/// Build the `CONTENT` object literal for a node upsert
///
/// Returns the SurrealQL text and the parameters it references. Property
/// names are schema identifiers and safe to splice; values are always bound.
/// Dates are cast to `datetime` so they stay typed in the store.
pub(crate) fn content_object(properties: &Properties) -> (String, Vec<(String, Value)>) {
    let mut fields = vec!["key: $key".to_string()];
    let mut params = Vec::with_capacity(properties.len());

    for (index, (name, value)) in properties.iter().enumerate() {
        let param = format!("p{}", index);
        let (bound, cast) = match value {
            PropertyValue::Date(date) => (
                Value::String(format!("{}T00:00:00Z", date.format("%Y-%m-%d"))),
                "<datetime>",
            ),
            other => (other.to_json(), ""),
        };
        fields.push(format!("{}: {}${}", name, cast, param));
        params.push((param, bound));
    }

    (format!("{{ {} }}", fields.join(", ")), params)
}

/// Properties of every row in a `SELECT` result
///
/// `result` is a `surrealdb::Value` serialised to JSON, which keeps SurrealDB's
/// own type tags: `{"Array": [{"Object": {"name": {"Strand": ".."}}}]}`.
/// Property types are read from those tags, never guessed from the text.
pub(crate) fn rows_from_tagged(result: Value) -> StoreResult<Vec<Properties>> {
    let rows = match untag(result)? {
        (tag, Value::Array(rows)) if tag == "Array" => rows,
        (tag, _) if tag == "None" || tag == "Null" => Vec::new(),
        (tag, _) => return Err(unexpected("an array of rows", &tag)),
    };

    rows.into_iter().map(properties_from_tagged).collect()
}

fn properties_from_tagged(row: Value) -> StoreResult<Properties> {
    let fields = match untag(row)? {
        (tag, Value::Object(fields)) if tag == "Object" => fields,
        (tag, _) => return Err(unexpected("an object", &tag)),
    };

    let mut properties = Properties::new();
    for (name, value) in fields {
        if let Some(value) = property_from_tagged(value)? {
            properties.insert(name, value);
        }
    }
    Ok(properties)
}

fn property_from_tagged(value: Value) -> StoreResult<Option<PropertyValue>> {
    let (tag, inner) = untag(value)?;
    Ok(match (tag.as_str(), inner) {
        ("None" | "Null", _) => None,
        ("Strand", Value::String(text)) => Some(PropertyValue::String(text)),
        ("Datetime", Value::String(text)) => Some(PropertyValue::Date(
            DateTime::parse_from_rfc3339(&text)
                .map_err(|e| StoreError::Serialization(format!("invalid datetime {:?}: {}", text, e)))?
                .naive_utc()
                .date(),
        )),
        ("Number", number) => Some(number_from_tagged(number)?),
        (tag, _) => return Err(unexpected("a string, number or datetime", tag)),
    })
}

fn number_from_tagged(number: Value) -> StoreResult<PropertyValue> {
    let (kind, inner) = untag(number)?;
    let invalid = || StoreError::Serialization(format!("invalid {} number {}", kind, inner));
    match kind.as_str() {
        "Int" => inner.as_i64().map(PropertyValue::Integer).ok_or_else(invalid),
        "Float" => inner.as_f64().map(PropertyValue::Float).ok_or_else(invalid),
        // Decimals serialise as text
        "Decimal" => match &inner {
            Value::String(text) => text.parse().map(PropertyValue::Float).map_err(|_| invalid()),
            other => other.as_f64().map(PropertyValue::Float).ok_or_else(invalid),
        },
        other => Err(unexpected("an Int, Float or Decimal", other)),
    }
}

/// Split an externally tagged value into its tag and payload; unit variants
/// such as `"None"` arrive as a bare string
fn untag(value: Value) -> StoreResult<(String, Value)> {
    match value {
        Value::String(tag) => Ok((tag, Value::Null)),
        Value::Object(fields) if fields.len() == 1 => match fields.into_iter().next() {
            Some(entry) => Ok(entry),
            None => Err(StoreError::Serialization("empty tagged value".to_string())),
        },
        other => Err(StoreError::Serialization(format!("expected a tagged value, got {}", other))),
    }
}

fn unexpected(expected: &str, tag: &str) -> StoreError {
    StoreError::Serialization(format!("expected {}, got {}", expected, tag))
}

/// Identity value as a bind parameter
pub(crate) fn key_param(key: &NodeKey) -> Value {
    key.to_json()
}

/// Wrap parameters for a single `bind` call
pub(crate) fn bindings(params: Vec<(String, Value)>) -> Map<String, Value> {
    params.into_iter().collect()
}
