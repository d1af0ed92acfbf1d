//! The plan: the tree of operation invocations the evaluator walks.
//!
//! Plans are built by the front end (out of this workspace) or loaded from a
//! plan file. Once built they are immutable and shared behind `Arc` by code
//! values and worker threads. The fold cache on [`CallNode`] is the only
//! interior-mutable part and is written at most once.

use std::sync::OnceLock;

use kite_ir::Name;

use crate::Value;

/// A plan node.
#[derive(Debug)]
pub enum Node {
    /// A constant. Evaluates to a fresh copy each time.
    Literal(Value),
    /// A name reference. Evaluates to an alias of the bound slot.
    Ident(Name),
    /// An operation invocation.
    Call(CallNode),
}

/// An operation name and its unevaluated argument nodes.
#[derive(Debug)]
pub struct CallNode {
    pub op: Name,
    pub args: Vec<Node>,
    folded: OnceLock<Value>,
}

impl CallNode {
    pub fn new(op: Name, args: Vec<Node>) -> Self {
        CallNode {
            op,
            args,
            folded: OnceLock::new(),
        }
    }

    /// Arguments as literal values, if every argument is a literal.
    pub fn literal_args(&self) -> Option<Vec<&Value>> {
        self.args.iter().map(Node::as_literal).collect()
    }

    /// The memoized result of constant folding, if folding already ran.
    #[inline]
    pub fn folded(&self) -> Option<&Value> {
        self.folded.get()
    }

    /// Memoize a folded result. A second call keeps the first result.
    pub fn set_folded(&self, value: Value) -> &Value {
        self.folded.get_or_init(|| value)
    }
}

impl Node {
    #[inline]
    pub fn literal(value: Value) -> Self {
        Node::Literal(value)
    }

    #[inline]
    pub fn ident(name: &str) -> Self {
        Node::Ident(Name::intern(name))
    }

    #[inline]
    pub fn call(op: &str, args: Vec<Node>) -> Self {
        Node::Call(CallNode::new(Name::intern(op), args))
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Node::Literal(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_ident(&self) -> Option<Name> {
        match self {
            Node::Ident(name) => Some(*name),
            _ => None,
        }
    }

    /// Equal shape, names and literal values. Fold caches are ignored.
    pub fn structural_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Literal(a), Node::Literal(b)) => a.structural_eq(b),
            (Node::Ident(a), Node::Ident(b)) => a == b,
            (Node::Call(a), Node::Call(b)) => {
                a.op == b.op
                    && a.args.len() == b.args.len()
                    && a.args.iter().zip(&b.args).all(|(x, y)| x.structural_eq(y))
            }
            _ => false,
        }
    }

    /// A deep copy of this node with an empty fold cache.
    #[must_use]
    pub fn duplicate(&self) -> Node {
        match self {
            Node::Literal(value) => Node::Literal(value.deep_copy()),
            Node::Ident(name) => Node::Ident(*name),
            Node::Call(call) => Node::Call(CallNode::new(
                call.op,
                call.args.iter().map(Node::duplicate).collect(),
            )),
        }
    }
}
