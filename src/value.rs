//! Bind values
//!
//! This module provides the scalar value type that named parameters resolve to
//! and that generated-key rows are made of.

use serde_json::Value as JsonValue;

/// A single scalar value bound to a statement placeholder
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Double/float value
    Double(f64),
    /// Text value
    Text(String),
    /// Binary data
    Binary(Vec<u8>),
}

impl BindValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, BindValue::Null)
    }

    /// Read the value as an integer, if it is one
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            BindValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Read the value as text, if it is text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            BindValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON node into a bind value
    ///
    /// Objects and arrays are bound as their JSON text, since a placeholder
    /// takes exactly one scalar.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => BindValue::Null,
            JsonValue::Bool(b) => BindValue::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::Integer(i)
                } else if n.is_u64() {
                    // Beyond i64::MAX; SQLite integers cannot hold it exactly
                    BindValue::Text(n.to_string())
                } else {
                    BindValue::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(s) => BindValue::Text(s.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => BindValue::Text(value.to_string()),
        }
    }

    /// Convert to a serde_json Value for the HTTP API
    #[cfg(feature = "http")]
    pub fn to_json_value(&self) -> JsonValue {
        use base64::{engine::general_purpose::STANDARD, Engine as _};

        match self {
            BindValue::Null => JsonValue::Null,
            // D1 stores booleans as 0/1 integers
            BindValue::Bool(b) => JsonValue::Number(i64::from(*b).into()),
            BindValue::Integer(i) => JsonValue::Number((*i).into()),
            BindValue::Double(d) => serde_json::Number::from_f64(*d)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            BindValue::Text(s) => JsonValue::String(s.clone()),
            BindValue::Binary(b) => JsonValue::String(STANDARD.encode(b)),
        }
    }
}

impl std::fmt::Display for BindValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindValue::Null => write!(f, "NULL"),
            BindValue::Bool(b) => write!(f, "{}", b),
            BindValue::Integer(i) => write!(f, "{}", i),
            BindValue::Double(d) => write!(f, "{}", d),
            BindValue::Text(s) => write!(f, "{}", s),
            BindValue::Binary(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<bool> for BindValue {
    fn from(v: bool) -> Self {
        BindValue::Bool(v)
    }
}

impl From<i64> for BindValue {
    fn from(v: i64) -> Self {
        BindValue::Integer(v)
    }
}

impl From<i32> for BindValue {
    fn from(v: i32) -> Self {
        BindValue::Integer(v as i64)
    }
}

impl From<f64> for BindValue {
    fn from(v: f64) -> Self {
        BindValue::Double(v)
    }
}

impl From<String> for BindValue {
    fn from(v: String) -> Self {
        BindValue::Text(v)
    }
}

impl From<&str> for BindValue {
    fn from(v: &str) -> Self {
        BindValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for BindValue {
    fn from(v: Vec<u8>) -> Self {
        BindValue::Binary(v)
    }
}

impl<T: Into<BindValue>> From<Option<T>> for BindValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => BindValue::Null,
        }
    }
}
