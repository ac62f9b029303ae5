//! Parser for the filter language.
//!
//! Grammar (in rough EBNF):
//!
//! expr      = operand (logical operand)*
//! operand   = "(" expr ")"
//!           | name "IN" "(" value ("," value)* ")"
//!           | name compare value
//! compare   = "==" | "!=" | "<=" | ">=" | "<" | ">"
//! logical   = "AND" | "OR"                  (case-insensitive)
//!
//! There is no precedence between AND and OR: operands are folded strictly
//! left to right, so `A AND B OR C` means `(A AND B) OR C` and
//! `A OR B AND C` means `(A OR B) AND C`. Use parentheses to group.

use super::ast::{CompareOp, Element, LogicalOp, Node};
use super::error::{ParseError, Stage};
use super::lexer::{self, is_space, skip_space};
use super::value::Value;

/// Default limit on parenthesis nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Parser limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Deepest parenthesis nesting accepted; the top level counts as 1.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Parser state.
struct Parser {
    max_depth: usize,
}

impl Parser {
    /// Parse `text` as a complete expression at nesting level `depth`.
    fn parse_expr(&self, text: &str, depth: usize) -> Result<Node, ParseError> {
        if depth > self.max_depth {
            return Err(ParseError::TooDeep {
                limit: self.max_depth,
            });
        }
        tracing::debug!(depth, expr = text, "parsing expression");

        let mut input = text;
        skip_space(&mut input);
        if input.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut left = self
            .parse_operand(&mut input, depth)
            .map_err(|e| e.nested(depth, Stage::FirstOperand))?;

        // Each completed group becomes the left operand of the next one.
        while !input.is_empty() {
            let op = lexer::logical_op(&mut input).map_err(|e| e.nested(depth, Stage::Operator))?;
            let right = self
                .parse_operand(&mut input, depth)
                .map_err(|e| e.nested(depth, Stage::Operand))?;
            left = Node::group(op, left, right);
        }

        tracing::debug!(depth, "expression complete");
        Ok(left)
    }

    /// Parse one operand: a parenthesized sub-expression, an IN list or a
    /// single comparison. Trailing whitespace is consumed.
    fn parse_operand(&self, input: &mut &str, depth: usize) -> Result<Node, ParseError> {
        skip_space(input);
        let start = *input;

        let node = if let Some(rest) = input.strip_prefix('(') {
            *input = rest;
            let body = lexer::matching_paren(input).ok_or_else(|| ParseError::UnclosedGroup {
                fragment: start.to_string(),
            })?;
            if body.trim_matches(is_space).is_empty() {
                return Err(ParseError::EmptyGroup {
                    fragment: start.to_string(),
                });
            }
            self.parse_expr(body, depth + 1)?
        } else {
            let name = lexer::name(input)?;
            if lexer::in_keyword(input) {
                self.parse_in_list(input, name)?
            } else {
                let op = lexer::compare_op(input)?;
                let value = lexer::value(input, &[])?;
                let consumed = &start[..start.len() - input.len()];
                tracing::debug!(depth, name, %op, value, "parsed comparison");
                Node::Element(Element::new(
                    name,
                    op,
                    Value::from_text(value),
                    consumed.trim_end_matches(is_space),
                ))
            }
        };

        skip_space(input);
        Ok(node)
    }

    /// Expand `name IN (v1, v2, ...)` into `name == v1 OR name == v2 OR ...`,
    /// folded left like any other chain.
    fn parse_in_list(&self, input: &mut &str, name: &str) -> Result<Node, ParseError> {
        skip_space(input);
        let start = *input;

        let Some(rest) = input.strip_prefix('(') else {
            return Err(ParseError::InExpectedList {
                fragment: start.to_string(),
            });
        };
        *input = rest;

        let mut list = lexer::matching_paren(input).ok_or_else(|| ParseError::UnclosedInList {
            fragment: start.to_string(),
        })?;
        if list.trim_matches(is_space).is_empty() {
            return Err(ParseError::EmptyInList {
                fragment: start.to_string(),
            });
        }

        let mut node = Node::Element(in_element(&mut list, name)?);
        while !list.is_empty() {
            let Some(rest) = list.strip_prefix(',') else {
                return Err(ParseError::MalformedInList {
                    fragment: list.to_string(),
                });
            };
            list = rest;
            let element = in_element(&mut list, name)?;
            node = Node::group(LogicalOp::Or, node, Node::Element(element));
        }

        tracing::debug!(name, members = node.node_count().div_ceil(2), "expanded IN list");
        Ok(node)
    }
}

/// One IN-list member as an equality element.
fn in_element(list: &mut &str, name: &str) -> Result<Element, ParseError> {
    let value = lexer::value(list, &[','])?;
    Ok(Element::new(
        name,
        CompareOp::Eq,
        Value::from_text(value),
        format!("\"{}\" == \"{}\"", name, value),
    ))
}

/// Parse a filter string into an AST with default options.
pub fn parse_filter(input: &str) -> Result<Node, ParseError> {
    parse_filter_with(input, &ParseOptions::default())
}

/// Parse a filter string into an AST.
pub fn parse_filter_with(input: &str, options: &ParseOptions) -> Result<Node, ParseError> {
    let parser = Parser {
        max_depth: options.max_depth,
    };
    parser.parse_expr(input, 1)
}
