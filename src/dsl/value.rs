//! Typed scalar values shared by filter literals and record fields.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// A field value or comparison literal.
///
/// Ordering is total: values of the same kind compare naturally (integers
/// numerically, text byte-wise), and every integer orders before every text
/// value. Mixed kinds are never equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Text(String),
}

/// Returned by [`Value::compare_strict`] when the operands differ in kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot compare {} {left} with {} {right}", .left.kind(), .right.kind())]
pub struct TypeMismatch {
    pub left: Value,
    pub right: Value,
}

impl Value {
    /// Classify raw text: all-ASCII-digit strings become integers, anything
    /// else (including the empty string, signs and decimals) stays text.
    /// Digit strings too large for `i64` are kept as text.
    pub fn from_text(raw: &str) -> Self {
        if !raw.is_empty()
            && raw.bytes().all(|b| b.is_ascii_digit())
            && let Ok(n) = raw.parse::<i64>()
        {
            return Value::Int(n);
        }
        Value::Text(raw.to_string())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Value::Text(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Int(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Text(_) => "text",
        }
    }

    /// Compare two values of the same kind, refusing mixed kinds.
    pub fn compare_strict(&self, other: &Value) -> Result<Ordering, TypeMismatch> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
            _ => Err(TypeMismatch {
                left: self.clone(),
                right: other.clone(),
            }),
        }
    }
}

impl From<&str> for Value {
    fn from(raw: &str) -> Self {
        Value::from_text(raw)
    }
}

impl From<String> for Value {
    fn from(raw: String) -> Self {
        Value::from_text(&raw)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "'{}'", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_become_integers() {
        assert_eq!(Value::from_text("120"), Value::Int(120));
        assert_eq!(Value::from_text("007"), Value::Int(7));
    }

    #[test]
    fn test_everything_else_is_text() {
        for raw in ["", "-5", "+5", "1.5", "12a", " 12", "French"] {
            assert!(Value::from_text(raw).is_text(), "{raw:?} should be text");
        }
    }

    #[test]
    fn test_overflow_falls_back_to_text() {
        let raw = "99999999999999999999";
        assert_eq!(Value::from_text(raw), Value::Text(raw.into()));
    }

    #[test]
    fn test_mixed_kinds_are_ordered_and_unequal() {
        let int = Value::Int(12);
        let text = Value::from_text("12a");
        assert_ne!(int, text);
        assert!(int < text);
        assert!(Value::Int(i64::MAX) < Value::Text(String::new()));
    }

    #[test]
    fn test_strict_compare_rejects_mixed_kinds() {
        let err = Value::Int(1).compare_strict(&Value::from("x")).unwrap_err();
        assert_eq!(err.to_string(), "cannot compare integer 1 with text 'x'");
        assert_eq!(
            Value::from("b").compare_strict(&Value::from("a")),
            Ok(Ordering::Greater)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(150).to_string(), "150");
        assert_eq!(Value::from("French").to_string(), "'French'");
    }
}
