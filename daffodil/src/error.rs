use std::fmt;
use std::ops::Range;

use strum::{EnumIs, EnumTryAs};
use thiserror::Error;

use crate::ast::Operator;

/// A single syntax error reported by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Byte range in the user's source.
    pub span: Range<usize>,
    pub message: String,
    /// Human-readable descriptions of what the parser expected at `span`.
    pub expected: Vec<String>,
    /// Character found at `span`, `None` at end of input.
    pub found: Option<char>,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}..{}",
            self.message, self.span.start, self.span.end
        )
    }
}

#[derive(Debug, Clone, PartialEq, EnumIs, EnumTryAs, Error)]
pub enum Error {
    /// The source text does not conform to the grammar.
    #[error("invalid filter syntax: {}", display_syntax_errors(.errors))]
    Syntax { errors: Vec<SyntaxError> },

    /// A backend cannot express the requested comparison.
    #[error("operator `{operator}` is not supported here: {reason}")]
    UnsupportedOperator { operator: Operator, reason: String },
}

fn display_syntax_errors(errors: &[SyntaxError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    pub fn unsupported(operator: Operator, reason: impl Into<String>) -> Self {
        Error::UnsupportedOperator {
            operator,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
