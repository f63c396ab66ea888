use std::fmt;

use log::debug;
use once_cell::sync::OnceCell;

use crate::ast::Node;
use crate::error::Result;
use crate::eval::{Backend, evaluate};
use crate::grammar;
use crate::predicate::{Predicate, PredicateBackend};
use crate::pretty::{PrettyDoc, PrettyOptions, PrettyPrinter};
use crate::record::Record;

/// A parsed filter.
///
/// ```text
/// {}  all
/// []  any
///
/// women between 18 and 34:
///   {
///     gender = "female"
///     age > 18
///     age < 34
///   }
///
/// men between 18 and 34 and women between 25 and 34:
///   [
///     { gender = "female" age > 25 age < 34 }
///     { gender = "male" age > 18 age < 34 }
///   ]
/// ```
///
/// The source is parsed once, when the filter is created, as the body of an implicit ALL
/// group: a bare list of conditions means "all of them". Backend results are computed on first
/// use and memoized for the lifetime of the filter; concurrent first uses compute once.
pub struct Daffodil {
    source: String,
    ast: Node,
    predicate: OnceCell<Predicate>,
    dense: OnceCell<PrettyDoc>,
    indented: OnceCell<PrettyDoc>,
}

impl Daffodil {
    /// Parse `source`. Syntax errors are reported here and nowhere else.
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let ast = grammar::parse(&source)?;
        debug!(
            "parsed filter of {} byte(s) into {} node(s)",
            source.len(),
            ast.node_count()
        );
        Ok(Self {
            source,
            ast,
            predicate: OnceCell::new(),
            dense: OnceCell::new(),
            indented: OnceCell::new(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Root of the parse tree: always an ALL group.
    pub fn ast(&self) -> &Node {
        &self.ast
    }

    /// Run any backend over the parse tree. The result is not memoized.
    pub fn evaluate_with<B: Backend + ?Sized>(&self, backend: &B) -> Result<B::Output> {
        evaluate(&self.ast, backend)
    }

    /// In-memory predicate, built on first use.
    pub fn predicate(&self) -> Result<&Predicate> {
        self.predicate.get_or_try_init(|| {
            debug!("building predicate for `{}`", self.source);
            self.evaluate_with(&PredicateBackend)
        })
    }

    /// Canonical form with the given layout, built on first use.
    pub fn pretty_doc(&self, options: PrettyOptions) -> Result<&PrettyDoc> {
        let cell = if options.dense {
            &self.dense
        } else {
            &self.indented
        };
        cell.get_or_try_init(|| {
            debug!(
                "pretty-printing `{}` ({})",
                self.source,
                if options.dense { "dense" } else { "indented" }
            );
            let printer = PrettyPrinter::new(options);
            let node = self.evaluate_with(&printer)?;
            Ok(printer.document(node))
        })
    }

    /// Canonical text of the filter: dense (single line) or indented.
    pub fn pretty(&self, dense: bool) -> Result<String> {
        Ok(self.pretty_doc(PrettyOptions { dense })?.to_string())
    }

    /// Whether `record` satisfies the filter.
    ///
    /// Fails if the predicate cannot be built, or if a reached comparison orders a field of an
    /// incompatible type. Missing fields are never an error.
    pub fn matches<R: Record>(&self, record: &R) -> Result<bool> {
        self.predicate()?.test(record)
    }

    /// Lazily yield the records satisfying the filter, in input order.
    ///
    /// Fails up front if the predicate cannot be built. Afterwards every record whose test
    /// fails yields its error in place and filtering carries on with the next record.
    pub fn filter<I>(&self, records: I) -> Result<impl Iterator<Item = Result<I::Item>>>
    where
        I: IntoIterator,
        I::Item: Record,
    {
        let predicate = self.predicate()?.clone();
        Ok(records
            .into_iter()
            .filter_map(move |record| match predicate.test(&record) {
                Ok(true) => Some(Ok(record)),
                Ok(false) => None,
                Err(err) => Some(Err(err)),
            }))
    }
}

impl fmt::Debug for Daffodil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Daffodil")
            .field("source", &self.source)
            .field("ast", &self.ast)
            .finish_non_exhaustive()
    }
}

impl std::str::FromStr for Daffodil {
    type Err = crate::error::Error;

    fn from_str(source: &str) -> Result<Self> {
        Self::new(source)
    }
}
