//! Record ingestion: one `Name=Value, Name2=Value2` record per line.

use crate::dsl::{Record, Value};
use anyhow::{Context, Result};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use winnow::combinator::{opt, separated_pair, terminated};
use winnow::prelude::*;
use winnow::token::{rest, take_till};

type PResult<T> = Result<T, winnow::error::ErrMode<winnow::error::ContextError>>;

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

/// A record read from text, fields sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Object {
    fields: BTreeMap<String, Value>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` from raw text, classifying it as integer or text.
    pub fn set(&mut self, name: impl Into<String>, raw: &str) {
        self.fields.insert(name.into(), Value::from_text(raw));
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

impl Record for Object {
    fn lookup(&self, name: &str) -> Option<Cow<'_, Value>> {
        self.fields.get(name).map(Cow::Borrowed)
    }
}

impl FromIterator<(String, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// `'Name'='text', 'Count'=3`
impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "'{}'={}", name, value)?;
        }
        Ok(())
    }
}

/// One comma-separated token, consuming its trailing comma.
fn lex_token<'a>(input: &mut &'a str) -> PResult<&'a str> {
    terminated(take_till(0.., ','), opt(',')).parse_next(input)
}

/// `name=value`, split at the first `=`.
fn lex_pair<'a>(input: &mut &'a str) -> PResult<(&'a str, &'a str)> {
    separated_pair(take_till(0.., '='), '=', rest).parse_next(input)
}

/// Build a record from one line of text.
///
/// Tokens without `=` or with an empty name are ignored. Names and values
/// are trimmed; a repeated name keeps its last value.
pub fn parse_line(line: &str) -> Object {
    let mut object = Object::new();
    let mut input = line;

    while !input.is_empty() {
        let Ok(mut token) = lex_token(&mut input) else {
            break;
        };
        let Ok((name, value)) = lex_pair(&mut token) else {
            continue;
        };
        let name = name.trim_matches(is_space);
        if name.is_empty() {
            continue;
        }
        object.set(name, value.trim_matches(is_space));
    }

    object
}

/// Iterator over the records of a line-oriented source.
///
/// Blank lines and lines starting with `#` are skipped. Items carry the
/// 1-based line number.
pub struct RecordReader<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl RecordReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Input: Cannot open input file {:?}", path))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<(usize, Object)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    let err = anyhow::Error::new(err)
                        .context(format!("Input: Failed reading line {}", self.line_no));
                    return Some(Err(err));
                }
            };

            let trimmed = line.trim_matches(is_space);
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return Some(Ok((self.line_no, parse_line(trimmed))));
        }
    }
}
