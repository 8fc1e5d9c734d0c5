// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single attribute carried by a flat event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum AttributeValue {
    String(String),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    #[default]
    Null,
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integral view; `Int` widens, floating values do not truncate.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i as i64),
            AttributeValue::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Numeric view with widening from every numeric variant.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Long(l) => Some(*l as f64),
            AttributeValue::Float(f) => Some(*f as f64),
            AttributeValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => write!(f, "{s}"),
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Long(l) => write!(f, "{l}"),
            AttributeValue::Float(fl) => write!(f, "{fl}"),
            AttributeValue::Double(d) => write!(f, "{d}"),
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Long(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_widening() {
        assert_eq!(AttributeValue::Int(7).as_long(), Some(7));
        assert_eq!(AttributeValue::Float(1.5).as_double(), Some(1.5));
        assert_eq!(AttributeValue::Double(2.0).as_long(), None);
        assert_eq!(AttributeValue::from("x").as_double(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(AttributeValue::Null.to_string(), "null");
        assert_eq!(AttributeValue::from("IBM").to_string(), "IBM");
        assert_eq!(AttributeValue::Long(-3).to_string(), "-3");
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&AttributeValue::Long(5)).unwrap();
        assert_eq!(json, r#"{"Long":5}"#);
        let back: AttributeValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AttributeValue::Long(5));
    }
}
