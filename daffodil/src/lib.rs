//! Daffodil: a tiny data-filtering language.
//!
//! A filter is written once as text, parsed into an immutable tree of ALL (`{ }`) and ANY
//! (`[ ]`) groups over leaf conditions, and then turned into whatever representation a
//! [`Backend`](eval::Backend) wants to build from it.
//!
//! Built-in backends
//!  - [`predicate::PredicateBackend`]: an in-memory test over any [`Record`](record::Record).
//!  - [`pretty::PrettyPrinter`]: canonical text that re-parses to an equivalent filter.
//!
//! Example
//! ```
//! use daffodil::prelude::*;
//!
//! let filter = Daffodil::new(
//!     r#"
//!     gender = "female"
//!     age > 18
//!     age < 34
//!     "#,
//! )
//! .unwrap();
//!
//! let alice = record([("gender", Value::from("female")), ("age", Value::from(25))]);
//! let bob = record([("gender", Value::from("male")), ("age", Value::from(25))]);
//! assert!(filter.matches(&alice).unwrap());
//! assert!(!filter.matches(&bob).unwrap());
//!
//! assert_eq!(
//!     filter.pretty(true).unwrap(),
//!     r#"{"age"<34,"age">18,"gender"="female"}"#
//! );
//! ```

/// Parse tree: groups, conditions, literals and operators.
pub mod ast;
/// Error type shared by the parser and the backends.
pub mod error;
/// Backend protocol and the tree-walking dispatcher.
pub mod eval;
/// The `Daffodil` facade owning a parsed filter and its memoized results.
pub mod filter;
/// Grammar rules and the chumsky parser built from them.
pub mod grammar;
/// In-memory predicate backend.
pub mod predicate;
/// Canonical pretty-printing backend.
pub mod pretty;
/// Records and the values they hold.
pub mod record;

pub use error::{Error, Result, SyntaxError};
pub use filter::Daffodil;

pub mod prelude {
    //! Convenient re-exports for end users.
    //!
    //! - The [`Daffodil`] facade and the crate [`Error`]
    //! - The [`Backend`] trait for custom targets
    //! - Records and values
    pub use crate::ast::{Condition, Group, GroupKind, Literal, Node, Operator};
    pub use crate::error::{Error, Result};
    pub use crate::eval::{Backend, evaluate};
    pub use crate::filter::Daffodil;
    pub use crate::predicate::{Predicate, PredicateBackend};
    pub use crate::pretty::{PrettyDoc, PrettyOptions, PrettyPrinter};
    pub use crate::record::{Record, Value, record};
}
