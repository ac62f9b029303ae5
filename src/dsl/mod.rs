//! Boolean filter language for key/value records.
//!
//! Syntax:
//!   Name == Value              - equality (also !=, <, <=, >, >=)
//!   "Some Name" == "a value"   - quoted names/values may hold any char but `"`
//!   Name IN (v1, v2, ...)      - shorthand for Name == v1 OR Name == v2 ...
//!   expr AND expr              - AND (case-insensitive)
//!   expr OR expr               - OR (case-insensitive)
//!   (expr)                     - grouping
//!
//! AND and OR have equal precedence and fold left to right.
//! Values made only of ASCII digits are integers, everything else is text.

mod ast;
mod constraints;
mod error;
mod eval;
mod lexer;
mod parser;
mod value;

pub use ast::*;
pub use constraints::Constraints;
pub use error::{EvalError, ParseError, Part, Stage};
pub use eval::{Record, TypePolicy, evaluate, evaluate_with};
pub use parser::{DEFAULT_MAX_DEPTH, ParseOptions, parse_filter, parse_filter_with};
pub use value::{TypeMismatch, Value};
