//! Evaluator for the filter AST.

use super::ast::{Element, Group, LogicalOp, Node};
use super::error::EvalError;
use super::value::Value;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

/// Anything a filter can be evaluated against.
pub trait Record {
    /// Typed value of field `name`, or `None` when the record lacks it.
    fn lookup(&self, name: &str) -> Option<Cow<'_, Value>>;
}

impl Record for HashMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<Cow<'_, Value>> {
        self.get(name).map(Cow::Borrowed)
    }
}

impl Record for BTreeMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<Cow<'_, Value>> {
        self.get(name).map(Cow::Borrowed)
    }
}

/// Raw text fields, classified on each lookup.
impl Record for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<Cow<'_, Value>> {
        self.get(name).map(|raw| Cow::Owned(Value::from_text(raw)))
    }
}

impl<R: Record + ?Sized> Record for &R {
    fn lookup(&self, name: &str) -> Option<Cow<'_, Value>> {
        (**self).lookup(name)
    }
}

/// How comparisons between an integer and a text value are decided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypePolicy {
    /// Integers order before text and never equal it.
    #[default]
    Ordered,
    /// Mixed comparisons are evaluation errors.
    Strict,
}

/// Evaluate a filter AST against a record.
pub fn evaluate<R: Record + ?Sized>(node: &Node, record: &R) -> Result<bool, EvalError> {
    evaluate_with(node, record, TypePolicy::default())
}

/// Evaluate a filter AST against a record under an explicit type policy.
///
/// The left operand of a group is always evaluated first; the right one is
/// skipped when the left already decides the result, so errors it would
/// raise are never seen.
pub fn evaluate_with<R: Record + ?Sized>(
    node: &Node,
    record: &R,
    policy: TypePolicy,
) -> Result<bool, EvalError> {
    // Groups whose left operand is being evaluated. When the left operand
    // does not decide a group, the group's result is its right operand's.
    let mut pending: Vec<&Group> = Vec::new();
    let mut next = node;

    loop {
        let value = loop {
            match next {
                Node::Group(group) => {
                    pending.push(group);
                    next = group.left();
                }
                Node::Element(element) => break evaluate_element(element, record, policy)?,
            }
        };

        loop {
            let Some(group) = pending.pop() else {
                return Ok(value);
            };
            match (group.op(), value) {
                (LogicalOp::Or, true) | (LogicalOp::And, false) => {
                    tracing::trace!("short-circuit {}: {}", group.op(), group.label());
                }
                _ => {
                    next = group.right();
                    break;
                }
            }
        }
    }
}

fn evaluate_element<R: Record + ?Sized>(
    element: &Element,
    record: &R,
    policy: TypePolicy,
) -> Result<bool, EvalError> {
    // A missing field is a query error rather than a non-match.
    let actual = record
        .lookup(element.name())
        .ok_or_else(|| EvalError::MissingField {
            name: element.name().to_string(),
        })?;

    let ordering = match policy {
        TypePolicy::Ordered => (*actual).cmp(element.value()),
        TypePolicy::Strict => actual
            .compare_strict(element.value())
            .map_err(|mismatch| EvalError::TypeMismatch {
                name: element.name().to_string(),
                mismatch,
            })?,
    };

    Ok(element.op().holds(ordering))
}
