//! Parameter values produced by patterns.

use alloc::string::String;
use core::fmt;

/// A single value emitted by a pattern for one event parameter.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Absence of a value (a rest when used as a note)
    None,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Value as a 7-bit MIDI-style byte (clamped to 0-127).
    pub fn as_u7(&self) -> Option<u8> {
        self.as_f64().map(|v| v.clamp(0.0, 127.0) as u8)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.into())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::None, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "-"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_views() {
        assert_eq!(Value::Int(60).as_f64(), Some(60.0));
        assert_eq!(Value::Float(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::from("x").as_f64(), None);
        assert_eq!(Value::None.as_u7(), None);
    }

    #[test]
    fn u7_clamps() {
        assert_eq!(Value::Int(200).as_u7(), Some(127));
        assert_eq!(Value::Int(-3).as_u7(), Some(0));
        assert_eq!(Value::Float(64.9).as_u7(), Some(64));
    }

    #[test]
    fn option_maps_to_none() {
        assert_eq!(Value::from(None::<i64>), Value::None);
        assert_eq!(Value::from(Some(62)), Value::Int(62));
    }
}
