//! Canonical pretty-printing backend.
//!
//! Role
//! - Turn a parsed filter back into text that re-parses to an equivalent filter.
//! - Make the text canonical: filters built from the same sub-expressions in a different
//!   order print the same way, and printing is a fixpoint of parse-then-print.
//!
//! Canonical form
//! - Keys and string values are always double-quoted; `"` inside is backslash-escaped.
//! - Booleans print lowercase; floats always carry a fractional part.
//! - A group whose only child is a group prints as that child.
//! - Children are sorted: conditions, then ANY groups, then ALL groups; ties are broken by
//!   comparing their printed text.
//!
//! Layout is either dense (`{"age"<34,"age">18}`) or indented, one child per line with two
//! spaces per nesting level. Documents are built with `pretty::RcDoc` and can be rendered in
//! color to any `termcolor` writer.
use std::fmt;
use std::io::{self, Write};

use pretty::{FmtWrite, RcDoc, RenderAnnotated};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::ast::{GroupKind, Literal, Operator};
use crate::error::Result;
use crate::eval::Backend;

const WIDTH: usize = 80;

/// Layout options of the pretty-printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PrettyOptions {
    /// Single line, comma separated, no spaces around operators.
    pub dense: bool,
}

impl PrettyOptions {
    pub const DENSE: Self = Self { dense: true };
    pub const INDENTED: Self = Self { dense: false };
}

impl Default for PrettyOptions {
    fn default() -> Self {
        Self::DENSE
    }
}

/// Styles used to annotate parts of the pretty-printed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Punct, // braces, brackets, commas
    Key,
    Operator,
    Literal,
}

impl Style {
    fn to_color_spec(self) -> ColorSpec {
        let mut s = ColorSpec::new();
        match self {
            Style::Punct => {
                s.set_dimmed(true);
            }
            Style::Key => {
                s.set_fg(Some(Color::Green)).set_bold(true);
            }
            Style::Operator => {
                s.set_fg(Some(Color::Yellow)).set_bold(true);
            }
            Style::Literal => {
                s.set_fg(Some(Color::Magenta));
            }
        }
        s
    }
}

/// Filter in the shape it is printed: single-child wrapper groups removed, children in
/// canonical order.
#[derive(Debug, Clone, PartialEq)]
pub enum PrettyNode {
    Condition {
        key: String,
        operator: Operator,
        value: Literal,
    },
    Group {
        kind: GroupKind,
        children: Vec<PrettyNode>,
    },
}

impl PrettyNode {
    /// Sort class: conditions first, then ANY groups, then ALL groups.
    fn class(&self) -> u8 {
        match self {
            PrettyNode::Condition { .. } => 0,
            PrettyNode::Group {
                kind: GroupKind::Any,
                ..
            } => 1,
            PrettyNode::Group {
                kind: GroupKind::All,
                ..
            } => 2,
        }
    }
}

/// Quote `s` with double quotes, escaping the double quotes it contains.
pub fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\\\""))
}

/// Decimal text of a float that re-parses as a float.
fn format_float(x: f64) -> String {
    let text = x.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

fn format_literal(value: &Literal) -> String {
    match value {
        Literal::Boolean(b) => b.to_string(),
        Literal::Integer(i) => i.to_string(),
        Literal::Float(x) => format_float(*x),
        Literal::String(s) => quote(s),
    }
}

fn punct(s: &'static str) -> RcDoc<'static, Style> {
    RcDoc::as_string(s).annotate(Style::Punct)
}

fn to_doc(node: &PrettyNode, options: PrettyOptions) -> RcDoc<'static, Style> {
    match node {
        PrettyNode::Condition {
            key,
            operator,
            value,
        } => {
            let gap = if options.dense {
                RcDoc::nil()
            } else {
                RcDoc::space()
            };
            RcDoc::as_string(quote(key))
                .annotate(Style::Key)
                .append(gap.clone())
                .append(RcDoc::as_string(operator.as_str()).annotate(Style::Operator))
                .append(gap)
                .append(RcDoc::as_string(format_literal(value)).annotate(Style::Literal))
        }
        PrettyNode::Group { kind, children } if children.is_empty() => {
            punct(kind.opener()).append(punct(kind.closer()))
        }
        PrettyNode::Group { kind, children } => {
            let docs = children.iter().map(|child| to_doc(child, options));
            if options.dense {
                punct(kind.opener())
                    .append(RcDoc::intersperse(docs, punct(",")))
                    .append(punct(kind.closer()))
            } else {
                punct(kind.opener())
                    .append(
                        RcDoc::hardline()
                            .append(RcDoc::intersperse(docs, RcDoc::hardline()))
                            .nest(2),
                    )
                    .append(RcDoc::hardline())
                    .append(punct(kind.closer()))
            }
        }
    }
}

/// Borrowed plain-text view of a node, shared by [`PrettyDoc`] and [`PrettyPrinter::render`].
struct Plain<'a> {
    node: &'a PrettyNode,
    options: PrettyOptions,
}

impl fmt::Display for Plain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut w = FmtWrite::new(f);
        to_doc(self.node, self.options).render_raw(WIDTH, &mut w)
    }
}

/// A printable filter together with its layout options.
#[derive(Debug, Clone, PartialEq)]
pub struct PrettyDoc {
    pub node: PrettyNode,
    pub options: PrettyOptions,
}

impl PrettyDoc {
    /// Build an RcDoc representation with style annotations.
    pub fn doc(&self) -> RcDoc<'static, Style> {
        to_doc(&self.node, self.options)
    }

    /// Render with colors to any termcolor writer.
    pub fn render_to<W: WriteColor + Write>(&self, out: &mut W) -> io::Result<()> {
        let mut cw = ColorWriter { out };
        self.doc().render_raw(WIDTH, &mut cw)
    }

    /// Print to stdout with colors when the terminal supports them.
    pub fn print(&self) -> io::Result<()> {
        let stdout = StandardStream::stdout(ColorChoice::Auto);
        let mut stdout = stdout.lock();
        self.render_to(&mut stdout)
    }
}

impl fmt::Display for PrettyDoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plain = Plain {
            node: &self.node,
            options: self.options,
        };
        fmt::Display::fmt(&plain, f)
    }
}

// Maps Style annotations to termcolor ColorSpec on a WriteColor sink.
struct ColorWriter<'w, W: WriteColor + Write> {
    out: &'w mut W,
}

impl<'a, 'w, W: WriteColor + Write> RenderAnnotated<'a, Style> for ColorWriter<'w, W> {
    fn push_annotation(&mut self, ann: &'a Style) -> io::Result<()> {
        self.out.set_color(&ann.to_color_spec())
    }
    fn pop_annotation(&mut self) -> io::Result<()> {
        self.out.reset()
    }
}

impl<'w, W: WriteColor + Write> pretty::Render for ColorWriter<'w, W> {
    type Error = io::Error;
    fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.out.write_all(s.as_bytes())?;
        Ok(s.len())
    }
    fn write_str_all(&mut self, s: &str) -> io::Result<()> {
        self.out.write_all(s.as_bytes())
    }
    fn fail_doc(&self) -> Self::Error {
        io::Error::other("render failed")
    }
}

/// Backend producing [`PrettyNode`]s in canonical form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrettyPrinter {
    pub options: PrettyOptions,
}

impl PrettyPrinter {
    pub fn new(options: PrettyOptions) -> Self {
        Self { options }
    }

    pub fn dense() -> Self {
        Self::new(PrettyOptions::DENSE)
    }

    pub fn indented() -> Self {
        Self::new(PrettyOptions::INDENTED)
    }

    /// Attach this printer's options to a node built by it.
    pub fn document(&self, node: PrettyNode) -> PrettyDoc {
        PrettyDoc {
            node,
            options: self.options,
        }
    }

    /// Plain-text rendering of `node`.
    pub fn render(&self, node: &PrettyNode) -> String {
        Plain {
            node,
            options: self.options,
        }
        .to_string()
    }

    fn group(&self, kind: GroupKind, mut children: Vec<PrettyNode>) -> PrettyNode {
        if matches!(children.as_slice(), [PrettyNode::Group { .. }]) {
            return children.remove(0);
        }

        let mut keyed: Vec<(u8, String, PrettyNode)> = children
            .into_iter()
            .map(|child| (child.class(), self.render(&child), child))
            .collect();
        keyed.sort_by(|(class_a, text_a, _), (class_b, text_b, _)| {
            class_a.cmp(class_b).then_with(|| text_a.cmp(text_b))
        });

        PrettyNode::Group {
            kind,
            children: keyed.into_iter().map(|(_, _, child)| child).collect(),
        }
    }
}

impl Backend for PrettyPrinter {
    type Output = PrettyNode;
    type Test = Operator;

    fn mk_all(&self, children: Vec<PrettyNode>) -> Result<PrettyNode> {
        Ok(self.group(GroupKind::All, children))
    }

    fn mk_any(&self, children: Vec<PrettyNode>) -> Result<PrettyNode> {
        Ok(self.group(GroupKind::Any, children))
    }

    fn mk_test(&self, operator: Operator) -> Result<Operator> {
        Ok(operator)
    }

    fn mk_cmp(&self, key: &str, value: &Literal, operator: Operator) -> Result<PrettyNode> {
        Ok(PrettyNode::Condition {
            key: key.to_owned(),
            operator,
            value: value.clone(),
        })
    }
}
