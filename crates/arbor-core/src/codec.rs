//! Stored value decoding
//!
//! Values cross the backend boundary as strings. Reading one back goes
//! through two steps:
//!
//! 1. [`parse_stored`] turns the raw string into a JSON value. Legacy data
//!    may hold bare scalars that are not valid JSON; those pass through as
//!    a JSON string instead of failing.
//! 2. A per-attribute decoder maps the JSON value onto the canonical type.
//!    Attributes whose on-disk shape changed over time are modelled as a
//!    two-variant union (`Current | Legacy`) with a pure normalization into
//!    the current shape.
//!
//! Nothing here returns an error. A value that fits no known shape decodes
//! to `None` and the caller substitutes its default.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::types::{line_from_str, Line, Row};

/// Parse a raw backend string, passing non-JSON through untouched
pub fn parse_stored(raw: String) -> Value {
    match serde_json::from_str::<Value>(&raw) {
        Ok(value) => value,
        Err(_) => Value::String(raw),
    }
}

/// Serialize a value for the backend
pub fn encode_stored(value: &Value) -> String {
    value.to_string()
}

/// One character as found in a stored line
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StoredChar {
    /// A bare character
    Plain(String),
    /// Older encoding: every character wrapped in a record
    Legacy(LegacyChar),
}

/// A character record from the older line encoding
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegacyChar {
    #[serde(rename = "char")]
    pub ch: String,
    /// Formatting flags (`strikethrough`, `bold`, ...); values are truthy-tested
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

impl LegacyChar {
    /// Whether the record carries a truthy property with this name
    pub fn has_property(&self, name: &str) -> bool {
        self.properties
            .as_ref()
            .and_then(|props| props.get(name))
            .is_some_and(is_truthy)
    }
}

/// The shapes a stored line may take
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StoredLine {
    Current(Line),
    Legacy(Vec<StoredChar>),
}

impl StoredLine {
    /// Normalize into the canonical line, dropping legacy properties
    pub fn into_current(self) -> Line {
        match self {
            StoredLine::Current(line) => line,
            StoredLine::Legacy(chars) => chars
                .into_iter()
                .map(|c| match c {
                    StoredChar::Plain(ch) => ch,
                    StoredChar::Legacy(record) => record.ch,
                })
                .collect(),
        }
    }
}

/// The shapes a stored parent list may take
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StoredParents {
    Current(Vec<Row>),
    /// Rows used to have exactly one parent, stored as a bare integer
    Legacy(Row),
}

impl StoredParents {
    pub fn into_current(self) -> Vec<Row> {
        match self {
            StoredParents::Current(parents) => parents,
            StoredParents::Legacy(parent) => vec![parent],
        }
    }
}

/// Decode a stored line
///
/// A bare string (very old data) is split into characters.
pub fn decode_line(value: Value) -> Option<Line> {
    if let Value::String(text) = &value {
        return Some(line_from_str(text));
    }
    serde_json::from_value::<StoredLine>(value)
        .ok()
        .map(StoredLine::into_current)
}

/// Decode a stored parent list
pub fn decode_parents(value: Value) -> Option<Vec<Row>> {
    serde_json::from_value::<StoredParents>(value)
        .ok()
        .map(StoredParents::into_current)
}

/// Whether a raw stored line uses the old per-character record format
/// with its first character struck through
pub fn is_struck_through_old_format(value: &Value) -> bool {
    let Some(first) = value.as_array().and_then(|chars| chars.first()) else {
        return false;
    };
    match serde_json::from_value::<LegacyChar>(first.clone()) {
        Ok(record) => record.has_property("strikethrough"),
        Err(_) => false,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
