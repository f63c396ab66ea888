//! Grammar of the filter language, written with chumsky combinators.
//!
//! ```text
//! program    = expr*                                  (implicit ALL group)
//! group_all  = "{" expr* _ "}"
//! group_any  = "[" expr* _ "]"
//! expr       = _ (group_all | group_any | condition) _ separator? _
//! separator  = newline | ","
//! condition  = key _ operator _ value
//! key        = string | bare_key
//! bare_key   = [A-Za-z0-9_-]+
//! operator   = "!=" | "?=" | "<=" | ">=" | "=" | "<" | ">"
//! value      = float | string | boolean | integer
//! string     = '"' ... '"' | "'" ... "'"
//! boolean    = "true" | "false"                       (case-insensitive)
//! integer    = [0-9]+
//! float      = [0-9]* "." [0-9]+
//! ```
//!
//! Groups may nest at most [`MAX_DEPTH`] levels deep; deeper sources are a syntax error.
//!
//! The program is the body of an ALL group, exactly as if the source had been written between
//! `{` and `}`. Alternatives are ordered: multi-character operators are tried before their
//! one-character prefixes, and floats before integers.
use chumsky::prelude::*;
use strum::{Display, EnumIter, IntoStaticStr};

use crate::ast::{Condition, Group, GroupKind, Literal, Node, Operator, Span, Spanned};
use crate::error::{Error, Result, SyntaxError};

type Extra<'src> = extra::Err<Rich<'src, char>>;

/// Deepest nesting of explicit groups accepted by [`parse`].
pub const MAX_DEPTH: usize = 256;

/// Named rules of the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Rule {
    Program,
    GroupAll,
    GroupAny,
    Expr,
    Separator,
    Condition,
    Key,
    BareKey,
    Operator,
    Value,
    #[strum(serialize = "string")]
    QuotedString,
    Boolean,
    Integer,
    Float,
}

impl Rule {
    /// Label used in "expected ..." parts of syntax errors.
    pub fn describe(self) -> &'static str {
        match self {
            Rule::Program => "filter",
            Rule::GroupAll => "ALL group `{ ... }`",
            Rule::GroupAny => "ANY group `[ ... ]`",
            Rule::Expr => "expression",
            Rule::Separator => "separator",
            Rule::Condition => "condition",
            Rule::Key => "key",
            Rule::BareKey => "bare key",
            Rule::Operator => "operator",
            Rule::Value => "value",
            Rule::QuotedString => "quoted string",
            Rule::Boolean => "boolean",
            Rule::Integer => "integer",
            Rule::Float => "float",
        }
    }
}

#[inline]
fn range(span: SimpleSpan) -> Span {
    span.start..span.end
}

/// Optional run of whitespace, newlines included.
pub fn whitespace<'src>() -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    any()
        .filter(|c: &char| c.is_whitespace())
        .repeated()
        .ignored()
}

fn digit<'src>() -> impl Parser<'src, &'src str, char, Extra<'src>> + Clone {
    any().filter(char::is_ascii_digit)
}

pub fn bare_key<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .repeated()
        .at_least(1)
        .to_slice()
        .map(ToString::to_string)
        .labelled(Rule::BareKey.describe())
}

/// String delimited by `delim`. Inside, only `\<delim>` is an escape sequence; every other
/// backslash is kept as is.
fn delimited_string<'src>(delim: char) -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    let escaped = just('\\').ignore_then(just(delim));
    let plain = any().filter(move |c: &char| *c != delim);

    escaped
        .or(plain)
        .repeated()
        .collect::<String>()
        .delimited_by(just(delim), just(delim))
}

pub fn quoted_string<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    choice((delimited_string('"'), delimited_string('\'')))
        .labelled(Rule::QuotedString.describe())
}

pub fn key<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    choice((quoted_string(), bare_key())).labelled(Rule::Key.describe())
}

pub fn operator<'src>() -> impl Parser<'src, &'src str, Operator, Extra<'src>> + Clone {
    // Multi-char operators first to avoid prefix capture
    choice((
        just("!=").to(Operator::Ne),
        just("?=").to(Operator::Approx),
        just("<=").to(Operator::Le),
        just(">=").to(Operator::Ge),
        just("=").to(Operator::Eq),
        just("<").to(Operator::Lt),
        just(">").to(Operator::Gt),
    ))
    .labelled(Rule::Operator.describe())
}

pub fn integer<'src>() -> impl Parser<'src, &'src str, i64, Extra<'src>> + Clone {
    digit()
        .repeated()
        .at_least(1)
        .to_slice()
        .try_map(|digits: &str, span| {
            digits
                .parse::<i64>()
                .map_err(|err| Rich::custom(span, format!("invalid integer `{digits}`: {err}")))
        })
        .labelled(Rule::Integer.describe())
}

pub fn float<'src>() -> impl Parser<'src, &'src str, f64, Extra<'src>> + Clone {
    digit()
        .repeated()
        .then(just('.'))
        .then(digit().repeated().at_least(1))
        .to_slice()
        .try_map(|text: &str, span| match text.parse::<f64>() {
            Ok(x) if x.is_finite() => Ok(x),
            Ok(_) => Err(Rich::custom(span, format!("float `{text}` is out of range"))),
            Err(err) => Err(Rich::custom(span, format!("invalid float `{text}`: {err}"))),
        })
        .labelled(Rule::Float.describe())
}

/// Case-insensitive `word`, matched by length alone so that `trueb=1` reads as `true` then
/// `b=1`.
fn keyword<'src>(word: &'static str) -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    any()
        .filter(char::is_ascii_alphabetic)
        .repeated()
        .exactly(word.len())
        .to_slice()
        .try_map(move |text: &str, span| {
            if text.eq_ignore_ascii_case(word) {
                Ok(())
            } else {
                Err(Rich::custom(span, format!("expected `{word}`, found `{text}`")))
            }
        })
}

pub fn boolean<'src>() -> impl Parser<'src, &'src str, bool, Extra<'src>> + Clone {
    choice((keyword("true").to(true), keyword("false").to(false)))
        .labelled(Rule::Boolean.describe())
}

pub fn value<'src>() -> impl Parser<'src, &'src str, Literal, Extra<'src>> + Clone {
    choice((
        float().map(Literal::Float),
        quoted_string().map(Literal::String),
        boolean().map(Literal::Boolean),
        integer().map(Literal::Integer),
    ))
    .labelled(Rule::Value.describe())
}

pub fn condition<'src>() -> impl Parser<'src, &'src str, Condition, Extra<'src>> + Clone {
    let key = key().map_with(|key, e| Spanned::new(key, range(e.span())));
    let operator = operator().map_with(|op, e| Spanned::new(op, range(e.span())));
    let value = value().map_with(|value, e| Spanned::new(value, range(e.span())));

    key.then_ignore(whitespace())
        .then(operator)
        .then_ignore(whitespace())
        .then(value)
        .map_with(|((key, operator), value), e| Condition {
            key,
            operator,
            value,
            span: range(e.span()),
        })
        .labelled(Rule::Condition.describe())
}

/// One expression followed by its trailing whitespace and optional separator.
pub fn expr<'src>() -> impl Parser<'src, &'src str, Node, Extra<'src>> + Clone {
    recursive(|expr| {
        let body = expr.repeated().collect::<Vec<_>>().then_ignore(whitespace());

        let group_all = body
            .clone()
            .delimited_by(just('{'), just('}'))
            .map_with(|children, e| {
                Node::Group(Group {
                    kind: GroupKind::All,
                    children,
                    span: range(e.span()),
                })
            })
            .labelled(Rule::GroupAll.describe());

        let group_any = body
            .delimited_by(just('['), just(']'))
            .map_with(|children, e| {
                Node::Group(Group {
                    kind: GroupKind::Any,
                    children,
                    span: range(e.span()),
                })
            })
            .labelled(Rule::GroupAny.describe());

        whitespace()
            .ignore_then(choice((
                group_all,
                group_any,
                condition().map(Node::Condition),
            )))
            .then_ignore(whitespace())
            .then_ignore(just(',').labelled(Rule::Separator.describe()).or_not())
            .then_ignore(whitespace())
    })
}

/// Whole program: a sequence of expressions forming the implicit top-level ALL group.
pub fn program<'src>() -> impl Parser<'src, &'src str, Node, Extra<'src>> {
    expr()
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(whitespace())
        .then_ignore(end())
        .map_with(|children, e| {
            Node::Group(Group {
                kind: GroupKind::All,
                children,
                span: range(e.span()),
            })
        })
        .labelled(Rule::Program.describe())
}

impl SyntaxError {
    fn from_rich(error: Rich<'_, char>) -> Self {
        let span = error.span();
        SyntaxError {
            span: span.start..span.end,
            message: error.to_string(),
            expected: error.expected().map(ToString::to_string).collect(),
            found: error.found().copied(),
        }
    }
}

/// Reject sources nesting groups deeper than [`MAX_DEPTH`], before the recursive parser runs.
///
/// Brackets inside quoted strings do not count. Strings are skipped with the same escape rule
/// as [`quoted_string`]; unbalanced closers are left for the parser to report.
fn check_depth(source: &str) -> Result<(), SyntaxError> {
    let mut depth = 0usize;
    let mut quote = None;
    let mut chars = source.char_indices().peekable();

    while let Some((at, c)) = chars.next() {
        match quote {
            Some(delim) => {
                if c == '\\' && chars.peek().is_some_and(|&(_, next)| next == delim) {
                    chars.next();
                } else if c == delim {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '{' | '[' => {
                    depth += 1;
                    if depth > MAX_DEPTH {
                        return Err(SyntaxError {
                            span: at..at + c.len_utf8(),
                            message: format!("groups nested deeper than {MAX_DEPTH} levels"),
                            expected: vec![],
                            found: Some(c),
                        });
                    }
                }
                '}' | ']' => depth = depth.saturating_sub(1),
                _ => {}
            },
        }
    }
    Ok(())
}

/// Parse `source` into the tree of its implicit top-level ALL group.
///
/// ```
/// use daffodil::ast::{GroupKind, Node};
/// use daffodil::grammar::parse;
///
/// let tree = parse("a = 1, [b = 2 c = 3]").unwrap();
/// let Node::Group(root) = &tree else { panic!("root is a group") };
/// assert_eq!(root.kind, GroupKind::All);
/// assert_eq!(root.children.len(), 2);
/// ```
pub fn parse(source: &str) -> Result<Node> {
    check_depth(source).map_err(|error| Error::Syntax {
        errors: vec![error],
    })?;
    program()
        .parse(source)
        .into_result()
        .map_err(|errors| Error::Syntax {
            errors: errors.into_iter().map(SyntaxError::from_rich).collect(),
        })
}
