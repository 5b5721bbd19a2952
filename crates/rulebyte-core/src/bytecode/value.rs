//! Typed scalar values shared by rule definitions, facts, and operands

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// A typed scalar value
///
/// Rule sources deliver untyped literals; the concrete representation is
/// chosen once, when the literal is first read, and carried unchanged
/// afterwards. Comparison opcodes are selected from this representation at
/// compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// 32-bit signed integer
    Int(i32),
    /// 32-bit float
    Float(f32),
    /// Boolean
    Bool(bool),
    /// UTF-8 string
    String(String),
}

/// The comparison family a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Integers and floats, compared as f32
    Number,
    /// Strings
    String,
    /// Booleans
    Bool,
}

impl ValueType {
    /// Returns the name used in diagnostics
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Bool => "bool",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ScalarValue {
    /// Create a string value
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        ScalarValue::String(s.into())
    }

    /// Returns the comparison family of this value
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            ScalarValue::Int(_) | ScalarValue::Float(_) => ValueType::Number,
            ScalarValue::Bool(_) => ValueType::Bool,
            ScalarValue::String(_) => ValueType::String,
        }
    }

    /// Returns the numeric value widened to f32, if this is a number
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            ScalarValue::Int(n) => Some(*n as f32),
            ScalarValue::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a bool
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the string contents, if this is a string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Infer a value from a bare command-line literal
    ///
    /// `true`/`false` become booleans, anything that parses as an `i32`
    /// becomes an integer, then `f32`, and everything else is a string.
    #[must_use]
    pub fn parse_literal(text: &str) -> Self {
        match text {
            "true" => ScalarValue::Bool(true),
            "false" => ScalarValue::Bool(false),
            _ => {
                if let Ok(n) = text.parse::<i32>() {
                    ScalarValue::Int(n)
                } else if let Ok(x) = text.parse::<f32>() {
                    ScalarValue::Float(x)
                } else {
                    ScalarValue::String(text.to_string())
                }
            }
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Int(n) => write!(f, "{n}"),
            ScalarValue::Float(x) => write!(f, "{x}"),
            ScalarValue::Bool(b) => write!(f, "{b}"),
            ScalarValue::String(s) => f.write_str(s),
        }
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Int(value)
    }
}

impl From<f32> for ScalarValue {
    fn from(value: f32) -> Self {
        ScalarValue::Float(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::String(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::String(value)
    }
}

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ScalarValue::Int(n) => serializer.serialize_i32(*n),
            ScalarValue::Float(x) => serializer.serialize_f32(*x),
            ScalarValue::Bool(b) => serializer.serialize_bool(*b),
            ScalarValue::String(s) => serializer.serialize_str(s),
        }
    }
}

struct ScalarVisitor;

impl Visitor<'_> for ScalarVisitor {
    type Value = ScalarValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number, boolean, or string")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<ScalarValue, E> {
        Ok(ScalarValue::Bool(v))
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ScalarValue, E> {
        Ok(i32::try_from(v).map_or(ScalarValue::Float(v as f32), ScalarValue::Int))
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ScalarValue, E> {
        Ok(i32::try_from(v).map_or(ScalarValue::Float(v as f32), ScalarValue::Int))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<ScalarValue, E> {
        Ok(ScalarValue::Float(v as f32))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ScalarValue, E> {
        Ok(ScalarValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<ScalarValue, E> {
        Ok(ScalarValue::String(v))
    }
}

impl<'de> Deserialize<'de> for ScalarValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_integers_commit_to_int() {
        let value: ScalarValue = serde_json::from_str("-5").unwrap();
        assert_eq!(value, ScalarValue::Int(-5));
        assert_eq!(value.value_type(), ValueType::Number);
    }

    #[test]
    fn oversized_integers_fall_back_to_float() {
        let value: ScalarValue = serde_json::from_str("4294967296").unwrap();
        assert_eq!(value, ScalarValue::Float(4_294_967_296.0));
    }

    #[test]
    fn json_scalars() {
        let value: ScalarValue = serde_json::from_str("2.5").unwrap();
        assert_eq!(value, ScalarValue::Float(2.5));

        let value: ScalarValue = serde_json::from_str("true").unwrap();
        assert_eq!(value, ScalarValue::Bool(true));

        let value: ScalarValue = serde_json::from_str("\"hot\"").unwrap();
        assert_eq!(value, ScalarValue::string("hot"));
    }

    #[test]
    fn rejects_compound_values() {
        assert!(serde_json::from_str::<ScalarValue>("[1, 2]").is_err());
        assert!(serde_json::from_str::<ScalarValue>("{\"a\": 1}").is_err());
    }

    #[test]
    fn parse_literal_inference() {
        assert_eq!(ScalarValue::parse_literal("10"), ScalarValue::Int(10));
        assert_eq!(ScalarValue::parse_literal("-0.5"), ScalarValue::Float(-0.5));
        assert_eq!(ScalarValue::parse_literal("false"), ScalarValue::Bool(false));
        assert_eq!(ScalarValue::parse_literal("north"), ScalarValue::string("north"));
    }

    #[test]
    fn int_widens_to_f32() {
        assert_eq!(ScalarValue::Int(-5).as_f32(), Some(-5.0));
        assert_eq!(ScalarValue::string("x").as_f32(), None);
    }
}
