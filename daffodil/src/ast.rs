//! Immutable parse tree produced by [`grammar`](crate::grammar).
//!
//! The tree only keeps the node kinds that carry meaning: ALL/ANY groups and conditions.
//! Wrapper rules of the grammar (`program`, `expr`, `key`, `value`) are folded away while
//! parsing, and literal rules are stored as native [`Literal`] values.
//!
//! Spans are byte ranges into the source handed to [`Daffodil::new`](crate::Daffodil::new).
use std::fmt;
use std::ops::Range;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Byte range into the user's source text.
pub type Span = Range<usize>;

/// A value paired with the span it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub inner: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(inner: T, span: Span) -> Self {
        Self { inner, span }
    }
}

/// Kind of a group node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum GroupKind {
    /// `{ ... }`: every child must hold. Vacuously true.
    All,
    /// `[ ... ]`: at least one child must hold. Vacuously false.
    Any,
}

impl GroupKind {
    #[inline]
    pub fn opener(self) -> &'static str {
        match self {
            GroupKind::All => "{",
            GroupKind::Any => "[",
        }
    }

    #[inline]
    pub fn closer(self) -> &'static str {
        match self {
            GroupKind::All => "}",
            GroupKind::Any => "]",
        }
    }
}

/// Comparison operator of a condition.
///
/// `Display` and `FromStr` both use the token as written in the language.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter,
)]
pub enum Operator {
    #[strum(serialize = "=")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">=")]
    Ge,
    /// Approximate match. Each backend decides what "approximately" means.
    #[strum(serialize = "?=")]
    Approx,
}

impl Operator {
    /// Token text of this operator.
    #[inline]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// `true` for `<`, `>`, `<=` and `>=`.
    #[inline]
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge
        )
    }
}

/// A literal on the right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Literal {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Literal {
    /// Numeric view of the literal, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Integer(i) => Some(*i as f64),
            Literal::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Literal::Integer(_) | Literal::Float(_))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Boolean(b) => write!(f, "{b}"),
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::Float(x) => write!(f, "{x}"),
            Literal::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// A leaf comparison `key operator value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub key: Spanned<String>,
    pub operator: Spanned<Operator>,
    pub value: Spanned<Literal>,
    pub span: Span,
}

/// An ALL or ANY group.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub kind: GroupKind,
    pub children: Vec<Node>,
    pub span: Span,
}

/// A node of the parse tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Group(Group),
    Condition(Condition),
}

impl Node {
    /// Grammar rule that produced this node.
    pub fn rule(&self) -> crate::grammar::Rule {
        use crate::grammar::Rule;

        match self {
            Node::Group(Group {
                kind: GroupKind::All,
                ..
            }) => Rule::GroupAll,
            Node::Group(Group {
                kind: GroupKind::Any,
                ..
            }) => Rule::GroupAny,
            Node::Condition(_) => Rule::Condition,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Node::Group(group) => group.span.clone(),
            Node::Condition(condition) => condition.span.clone(),
        }
    }

    /// Children of a group; conditions have none.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Group(group) => &group.children,
            Node::Condition(_) => &[],
        }
    }

    /// Total number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(Node::node_count).sum::<usize>()
    }
}
