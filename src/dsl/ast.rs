//! AST types for the filter language.

use super::value::Value;
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator of an [`Element`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq, // ==
    Ne, // !=
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=
}

impl CompareOp {
    /// Whether `actual <op> literal` holds, given `actual.cmp(literal)`.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Ne => write!(f, "!="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Le => write!(f, "<="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Ge => write!(f, ">="),
        }
    }
}

/// Logical operator of a [`Group`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => write!(f, "AND"),
            LogicalOp::Or => write!(f, "OR"),
        }
    }
}

/// A single comparison: `name <op> value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    op: CompareOp,
    value: Value,
    source: String,
}

impl Element {
    pub fn new(
        name: impl Into<String>,
        op: CompareOp,
        value: Value,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            op,
            value,
            source: source.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Text this element was parsed from. Diagnostic only.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Two sub-expressions joined by AND/OR. Owns both children.
///
/// Chains fold to the left, so a long `A OR B OR ...` is as deep as it is
/// long. Every walk over the tree (including drop) uses an explicit stack.
pub struct Group {
    op: LogicalOp,
    left: Box<Node>,
    right: Box<Node>,
}

impl Group {
    pub fn new(op: LogicalOp, left: Node, right: Node) -> Self {
        Self {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn op(&self) -> LogicalOp {
        self.op
    }

    pub fn left(&self) -> &Node {
        &self.left
    }

    pub fn right(&self) -> &Node {
        &self.right
    }

    /// Bracketed rendering of the children's sources. Diagnostic only.
    pub fn label(&self) -> Label<'_> {
        Label(Piece::Group(self))
    }

    /// Move group children onto `stack`, leaving empty leaves behind.
    fn detach_children(&mut self, stack: &mut Vec<Node>) {
        for child in [&mut self.left, &mut self.right] {
            if matches!(**child, Node::Group(_)) {
                stack.push(std::mem::replace(&mut **child, Node::placeholder()));
            }
        }
    }
}

impl Drop for Group {
    fn drop(&mut self) {
        let mut stack = Vec::new();
        self.detach_children(&mut stack);
        while let Some(mut node) = stack.pop() {
            if let Node::Group(group) = &mut node {
                group.detach_children(&mut stack);
            }
        }
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("op", &self.op)
            .field("label", &self.label().to_string())
            .finish()
    }
}

/// Root filter expression.
#[derive(Debug)]
pub enum Node {
    Element(Element),
    Group(Group),
}

impl Node {
    pub fn element(name: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        let source = format!("{} {} {}", name, op, value);
        Node::Element(Element::new(name, op, value, source))
    }

    pub fn group(op: LogicalOp, left: Node, right: Node) -> Self {
        Node::Group(Group::new(op, left, right))
    }

    fn placeholder() -> Self {
        Node::Element(Element::new(String::new(), CompareOp::Eq, Value::Int(0), String::new()))
    }

    /// Source text wrapped the way dumps show it: `{...}` for elements,
    /// `[...]` for groups.
    pub fn label(&self) -> Label<'_> {
        Label(Piece::Node(self))
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            if let Node::Group(group) = node {
                stack.push(group.left());
                stack.push(group.right());
            }
        }
        count
    }

    /// Levels from this node to its deepest leaf, counting both ends.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, level)) = stack.pop() {
            deepest = deepest.max(level);
            if let Node::Group(group) = node {
                stack.push((group.left(), level + 1));
                stack.push((group.right(), level + 1));
            }
        }
        deepest
    }

    /// Pre-order rendering of the tree, one node per line.
    pub fn dump(&self) -> Dump<'_> {
        Dump(self)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some(pair) = pending.pop() {
            match pair {
                (Node::Element(a), Node::Element(b)) => {
                    if a != b {
                        return false;
                    }
                }
                (Node::Group(a), Node::Group(b)) => {
                    if a.op() != b.op() {
                        return false;
                    }
                    pending.push((a.left(), b.left()));
                    pending.push((a.right(), b.right()));
                }
                _ => return false,
            }
        }
        true
    }
}

impl Eq for Node {}

#[derive(Clone, Copy)]
enum Piece<'a> {
    Node(&'a Node),
    Group(&'a Group),
    Op(LogicalOp),
    Close,
}

/// Display adapter returned by [`Node::label`] and [`Group::label`].
pub struct Label<'a>(Piece<'a>);

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![self.0];
        while let Some(piece) = stack.pop() {
            match piece {
                Piece::Node(Node::Element(element)) => write!(f, "{{{}}}", element.source())?,
                Piece::Node(Node::Group(group)) | Piece::Group(group) => {
                    f.write_str("[")?;
                    stack.push(Piece::Close);
                    stack.push(Piece::Node(group.right()));
                    stack.push(Piece::Op(group.op()));
                    stack.push(Piece::Node(group.left()));
                }
                Piece::Op(op) => write!(f, " {} ", op)?,
                Piece::Close => f.write_str("]")?,
            }
        }
        Ok(())
    }
}

/// Display adapter returned by [`Node::dump`].
pub struct Dump<'a>(&'a Node);

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![(self.0, 1usize)];
        while let Some((node, depth)) = stack.pop() {
            write!(f, "[{}] {}", depth, ".".repeat((depth - 1) * 3))?;
            match node {
                Node::Group(group) => {
                    writeln!(f, "Group {}: {}", group.op(), group.label())?;
                    stack.push((group.right(), depth + 1));
                    stack.push((group.left(), depth + 1));
                }
                Node::Element(element) => writeln!(
                    f,
                    "Element: '{}' {} {} {{{}}}",
                    element.name(),
                    element.op(),
                    element.value(),
                    element.source()
                )?,
            }
        }
        Ok(())
    }
}
