//! Owner of a parsed filter: parse once, evaluate many records.

use super::ast::Node;
use super::error::{EvalError, ParseError};
use super::eval::{Record, TypePolicy, evaluate_with};
use super::parser::{ParseOptions, parse_filter_with};

/// A parsed filter plus the state needed to report on it.
///
/// Evaluation only borrows the tree, so one instance can be shared across
/// threads once parsed.
#[derive(Debug, Default)]
pub struct Constraints {
    tree: Option<Node>,
    source: String,
    error: Option<String>,
    options: ParseOptions,
    policy: TypePolicy,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ParseOptions, policy: TypePolicy) -> Self {
        Self {
            options,
            policy,
            ..Self::default()
        }
    }

    /// Replace the current filter. On failure no tree is kept and the
    /// message is available from [`Constraints::last_error`].
    pub fn parse(&mut self, text: &str) -> Result<(), ParseError> {
        self.tree = None;
        self.error = None;
        self.source = text.to_string();

        match parse_filter_with(text, &self.options) {
            Ok(tree) => {
                tracing::debug!(nodes = tree.node_count(), "parsed filter '{}'", text);
                self.tree = Some(tree);
                Ok(())
            }
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Decide whether `record` matches the current filter.
    pub fn evaluate<R: Record + ?Sized>(&self, record: &R) -> Result<bool, EvalError> {
        let tree = self.tree.as_ref().ok_or(EvalError::NotParsed)?;
        evaluate_with(tree, record, self.policy)
    }

    pub fn is_valid(&self) -> bool {
        self.tree.is_some()
    }

    pub fn tree(&self) -> Option<&Node> {
        self.tree.as_ref()
    }

    /// Text passed to the last `parse` call.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Message of the last failed `parse`, cleared by the next one.
    ///
    /// Evaluation failures are not recorded here: `evaluate` returns them
    /// and leaves this untouched, so a parsed filter can be shared read-only.
    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn policy(&self) -> TypePolicy {
        self.policy
    }

    /// Human-readable pre-order listing of the tree.
    pub fn dump(&self) -> String {
        let mut out = format!("Constraints: '{}'\n", self.source);
        match &self.tree {
            Some(tree) => out.push_str(&tree.dump().to_string()),
            None => out.push_str("(no parsed tree)\n"),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::Value;
    use std::collections::BTreeMap;

    fn book(language: &str, number: i64) -> BTreeMap<String, Value> {
        let mut rec = BTreeMap::new();
        rec.insert("Language".to_string(), Value::from(language));
        rec.insert("BookNumber".to_string(), Value::Int(number));
        rec
    }

    #[test]
    fn test_evaluate_before_parse_fails() {
        let constraints = Constraints::new();
        assert_eq!(
            constraints.evaluate(&book("French", 1)),
            Err(EvalError::NotParsed)
        );
        assert!(!constraints.is_valid());
    }

    #[test]
    fn test_failed_parse_drops_previous_tree() {
        let mut constraints = Constraints::new();
        constraints.parse("Language == French").unwrap();
        assert!(constraints.evaluate(&book("French", 1)).unwrap());

        assert!(constraints.parse("Genre == (").is_err());
        assert!(!constraints.is_valid());
        assert!(constraints.last_error().unwrap().contains("empty value"));
        assert_eq!(
            constraints.evaluate(&book("French", 1)),
            Err(EvalError::NotParsed)
        );
    }

    #[test]
    fn test_successful_parse_clears_error() {
        let mut constraints = Constraints::new();
        assert!(constraints.parse("A ==").is_err());
        assert!(constraints.last_error().is_some());

        constraints.parse("A == 1").unwrap();
        assert_eq!(constraints.last_error(), None);
        assert_eq!(constraints.source(), "A == 1");
    }

    #[test]
    fn test_dump_is_stable() {
        let mut constraints = Constraints::new();
        constraints
            .parse("(Language == French OR Language == Spanish) AND BookNumber >= 120")
            .unwrap();
        let first = constraints.dump();
        assert_eq!(first, constraints.dump());

        let lines: Vec<&str> = first.lines().collect();
        assert_eq!(
            lines[0],
            "Constraints: '(Language == French OR Language == Spanish) AND BookNumber >= 120'"
        );
        assert!(lines[1].starts_with("[1] Group AND: "));
        assert!(lines[2].starts_with("[2] ...Group OR: "));
        assert_eq!(
            lines[3],
            "[3] ......Element: 'Language' == 'French' {Language == French}"
        );
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_shared_across_threads() {
        let mut constraints = Constraints::new();
        constraints.parse("BookNumber >= 120").unwrap();
        let constraints = std::sync::Arc::new(constraints);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let constraints = constraints.clone();
                std::thread::spawn(move || constraints.evaluate(&book("French", 100 + i * 10)))
            })
            .collect();

        let results: Vec<bool> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        assert_eq!(results, vec![false, false, true, true]);
    }

    #[test]
    fn test_evaluation_error_leaves_last_error_alone() {
        let mut constraints = Constraints::new();
        constraints.parse("Genre == Detective").unwrap();

        let err = constraints.evaluate(&book("French", 1)).unwrap_err();
        assert_eq!(
            err,
            EvalError::MissingField {
                name: "Genre".into()
            }
        );
        assert_eq!(constraints.last_error(), None);
        assert!(constraints.is_valid());
    }
}
