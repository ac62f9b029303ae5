//! Parse and evaluation errors for the filter language.

use super::value::TypeMismatch;
use std::fmt;
use thiserror::Error;

/// Which token a quoting error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Name,
    Value,
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Part::Name => write!(f, "name"),
            Part::Value => write!(f, "value"),
        }
    }
}

/// The step of an expression that failed, recorded as errors propagate out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FirstOperand,
    Operator,
    Operand,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::FirstOperand => write!(f, "first operand"),
            Stage::Operator => write!(f, "operator"),
            Stage::Operand => write!(f, "operand"),
        }
    }
}

/// First failure encountered while parsing a filter string.
///
/// Fragments hold the remaining input at the point of failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty filter expression")]
    Empty,

    #[error("missing name in '{fragment}'")]
    MissingName { fragment: String },

    #[error("{part} has no closing quote in '{fragment}'")]
    UnterminatedQuote { part: Part, fragment: String },

    #[error("empty value in '{fragment}'")]
    EmptyValue { fragment: String },

    #[error("invalid comparison operator in '{fragment}'")]
    InvalidComparison { fragment: String },

    #[error("invalid logical operator in '{fragment}', expected AND or OR")]
    InvalidLogical { fragment: String },

    #[error("missing closing ')' in '{fragment}'")]
    UnclosedGroup { fragment: String },

    #[error("empty sub-expression in '{fragment}'")]
    EmptyGroup { fragment: String },

    #[error("IN operator expects a parenthesized list, found '{fragment}'")]
    InExpectedList { fragment: String },

    #[error("IN list has no closing ')' in '{fragment}'")]
    UnclosedInList { fragment: String },

    #[error("empty IN list in '{fragment}'")]
    EmptyInList { fragment: String },

    #[error("malformed IN list around '{fragment}'")]
    MalformedInList { fragment: String },

    #[error("expression nesting exceeds {limit} levels")]
    TooDeep { limit: usize },

    #[error("level {depth}: failed to parse {stage}, {inner}")]
    Nested {
        depth: usize,
        stage: Stage,
        inner: Box<ParseError>,
    },
}

impl ParseError {
    pub(crate) fn nested(self, depth: usize, stage: Stage) -> Self {
        ParseError::Nested {
            depth,
            stage,
            inner: Box::new(self),
        }
    }

    /// The innermost error, without nesting context.
    pub fn root_cause(&self) -> &ParseError {
        match self {
            ParseError::Nested { inner, .. } => inner.root_cause(),
            other => other,
        }
    }
}

/// Failure to decide a record against a filter.
///
/// Distinct from a `false` result: the filter could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("no parsed filter to evaluate")]
    NotParsed,

    #[error("record has no value for field '{name}'")]
    MissingField { name: String },

    #[error("field '{name}': {mismatch}")]
    TypeMismatch { name: String, mismatch: TypeMismatch },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_message_and_root_cause() {
        let err = ParseError::EmptyValue {
            fragment: "(".into(),
        }
        .nested(2, Stage::FirstOperand)
        .nested(1, Stage::Operand);

        assert_eq!(
            err.to_string(),
            "level 1: failed to parse operand, level 2: failed to parse first operand, empty value in '('"
        );
        assert!(matches!(err.root_cause(), ParseError::EmptyValue { .. }));
    }
}
