//! Token-level scanning for the filter language.
//!
//! Every function takes the remaining input as `&mut &str` and advances it
//! past what it consumed, skipping whitespace on both sides of a token.

use super::ast::{CompareOp, LogicalOp};
use super::error::{ParseError, Part};
use winnow::combinator::alt;
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

// Manually define PResult for resilience against winnow version changes
type PResult<T> = Result<T, winnow::error::ErrMode<winnow::error::ContextError>>;

/// Characters that end an unquoted name.
const NAME_STOP: &[char] = &['=', '!', '<', '>', '(', ')'];

/// Characters that always end an unquoted value.
const VALUE_STOP: &[char] = &['(', ')'];

/// Space, tab, newline, vertical tab, form feed, carriage return.
pub(crate) fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

pub(crate) fn skip_space(input: &mut &str) {
    let skipped: PResult<&str> = take_while(0.., is_space).parse_next(input);
    debug_assert!(skipped.is_ok());
}

/// Unquoted run up to whitespace or any character rejected by `stop`.
fn bare<'a>(input: &mut &'a str, stop: impl Fn(char) -> bool) -> &'a str {
    let run: PResult<&str> =
        take_while(0.., |c: char| !is_space(c) && !stop(c)).parse_next(input);
    run.unwrap_or_default()
}

/// Body of a quoted token; `input` starts just after the opening quote.
fn quoted<'a>(input: &mut &'a str) -> Option<&'a str> {
    let body: PResult<&str> = take_till(0.., '"').parse_next(input);
    let close: PResult<char> = '"'.parse_next(input);
    match (body, close) {
        (Ok(body), Ok(_)) => Some(body),
        _ => None,
    }
}

/// Quoted or unquoted token, shared by names and values.
fn token<'a>(
    input: &mut &'a str,
    part: Part,
    stop: impl Fn(char) -> bool,
) -> Result<&'a str, ParseError> {
    skip_space(input);
    let start = *input;

    let text = match input.strip_prefix('"') {
        Some(rest) => {
            *input = rest;
            quoted(input).ok_or_else(|| ParseError::UnterminatedQuote {
                part,
                fragment: start.to_string(),
            })?
        }
        None => bare(input, stop),
    };

    if text.is_empty() {
        return Err(match part {
            Part::Name => ParseError::MissingName {
                fragment: start.to_string(),
            },
            Part::Value => ParseError::EmptyValue {
                fragment: start.to_string(),
            },
        });
    }

    skip_space(input);
    Ok(text)
}

/// Field name: quoted, or unquoted up to a comparison character, a
/// parenthesis or whitespace.
pub(crate) fn name<'a>(input: &mut &'a str) -> Result<&'a str, ParseError> {
    token(input, Part::Name, |c| NAME_STOP.contains(&c))
}

/// Literal value: quoted, or unquoted up to whitespace, a parenthesis or
/// any of `terminators`.
pub(crate) fn value<'a>(input: &mut &'a str, terminators: &[char]) -> Result<&'a str, ParseError> {
    token(input, Part::Value, |c| {
        VALUE_STOP.contains(&c) || terminators.contains(&c)
    })
}

fn lex_compare_op(input: &mut &str) -> PResult<CompareOp> {
    alt((
        // Multi-char operators first
        "==".value(CompareOp::Eq),
        "!=".value(CompareOp::Ne),
        "<=".value(CompareOp::Le),
        ">=".value(CompareOp::Ge),
        "<".value(CompareOp::Lt),
        ">".value(CompareOp::Gt),
    ))
    .parse_next(input)
}

pub(crate) fn compare_op(input: &mut &str) -> Result<CompareOp, ParseError> {
    skip_space(input);
    let start = *input;
    let op = lex_compare_op(input).map_err(|_| ParseError::InvalidComparison {
        fragment: start.to_string(),
    })?;
    skip_space(input);
    Ok(op)
}

/// Case-insensitive keyword that must be followed by whitespace, end of
/// input, or one of `followers`. Consumes nothing unless it matches.
fn keyword(input: &mut &str, word: &str, followers: &[char]) -> bool {
    let mut probe = *input;
    let found: PResult<&str> =
        take_while(1.., |c: char| c.is_ascii_alphabetic()).parse_next(&mut probe);
    let Ok(found) = found else {
        return false;
    };
    let boundary = match probe.chars().next() {
        None => true,
        Some(c) => is_space(c) || followers.contains(&c),
    };
    if boundary && found.eq_ignore_ascii_case(word) {
        *input = probe;
        skip_space(input);
        true
    } else {
        false
    }
}

pub(crate) fn logical_op(input: &mut &str) -> Result<LogicalOp, ParseError> {
    skip_space(input);
    if keyword(input, "AND", &[]) {
        Ok(LogicalOp::And)
    } else if keyword(input, "OR", &[]) {
        Ok(LogicalOp::Or)
    } else {
        Err(ParseError::InvalidLogical {
            fragment: input.to_string(),
        })
    }
}

/// `IN` keyword, which may be followed directly by its list.
pub(crate) fn in_keyword(input: &mut &str) -> bool {
    keyword(input, "IN", &['('])
}

/// Splits off the text between an already-consumed `(` and its matching
/// `)`, leaving `input` after the closing paren. Parentheses inside quotes
/// do not count.
pub(crate) fn matching_paren<'a>(input: &mut &'a str) -> Option<&'a str> {
    let text: &'a str = *input;
    let mut depth = 0usize;
    let mut in_quotes = false;

    for (i, c) in text.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => {
                if depth == 0 {
                    *input = &text[i + 1..];
                    return Some(&text[..i]);
                }
                depth -= 1;
            }
            _ => {}
        }
    }

    None
}
