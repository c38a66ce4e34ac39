//! Field value model
//!
//! Record fields hold a closed set of shapes: a scalar (string or number)
//! or a homogeneous array of either. Booleans, nulls, and nested objects
//! are not representable. The untagged serde form keeps the on-disk
//! encoding plain JSON.

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// A single record field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// UTF-8 string
    Str(String),
    /// JSON number, kept in its original representation
    Num(Number),
    /// Array of strings
    StrList(Vec<String>),
    /// Array of numbers
    NumList(Vec<Number>),
}

impl FieldValue {
    /// Numeric view of this value; `None` for anything but a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Num(n) => n.as_f64(),
            _ => None,
        }
    }

    /// String view of this value; `None` for anything but a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Num(Number::from(n))
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Num(Number::from(n))
    }
}

impl From<u64> for FieldValue {
    fn from(n: u64) -> Self {
        FieldValue::Num(Number::from(n))
    }
}

impl From<Number> for FieldValue {
    fn from(n: Number) -> Self {
        FieldValue::Num(n)
    }
}
