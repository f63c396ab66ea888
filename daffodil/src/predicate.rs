//! In-memory predicate backend.
//!
//! Every group and condition becomes a [`Predicate`]: a shareable closure over a
//! [`Record`]. A record missing the key simply fails the condition. Ordering a field whose
//! value has an incompatible type is an [`Error::UnsupportedOperator`] raised while testing.
//!
//! Operator semantics
//! - `=` / `!=`: value equality, integers and floats compare numerically.
//! - `<`, `>`, `<=`, `>=`: number against number or string against string (code point order).
//!   Ordering against a boolean literal is rejected when the predicate is built.
//! - `?=`: containment. Case-insensitive substring for strings, membership for lists.
//!
//! Groups short-circuit left to right, so a failing comparison is only reported when it is
//! actually reached.
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::ast::{Literal, Operator};
use crate::error::{Error, Result};
use crate::eval::Backend;
use crate::record::{Record, Value};

type TestFn = dyn Fn(&dyn Record) -> Result<bool> + Send + Sync;

/// A compiled boolean test over records.
#[derive(Clone)]
pub struct Predicate(Arc<TestFn>);

impl Predicate {
    pub fn new(test: impl Fn(&dyn Record) -> Result<bool> + Send + Sync + 'static) -> Self {
        Self(Arc::new(test))
    }

    /// Predicate accepting every record.
    pub fn always() -> Self {
        Self::new(|_| Ok(true))
    }

    /// Predicate rejecting every record.
    pub fn never() -> Self {
        Self::new(|_| Ok(false))
    }

    #[inline]
    pub fn test<R: Record>(&self, record: &R) -> Result<bool> {
        (self.0)(record)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").finish_non_exhaustive()
    }
}

/// Operator resolved by [`PredicateBackend::mk_test`].
///
/// `apply` yields `None` when the field's type cannot be compared with the literal.
#[derive(Clone, Copy)]
pub struct Comparison {
    pub operator: Operator,
    apply: fn(&Value, &Literal) -> Option<bool>,
}

impl fmt::Debug for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Comparison").field(&self.operator).finish()
    }
}

fn ordered(value: &Value, literal: &Literal, accept: fn(Ordering) -> bool) -> Option<bool> {
    if !value.orders_with(literal) {
        return None;
    }
    // NaN has no ordering with anything
    Some(value.compare(literal).is_some_and(accept))
}

/// Builds [`Predicate`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredicateBackend;

impl Backend for PredicateBackend {
    type Output = Predicate;
    type Test = Comparison;

    fn mk_all(&self, children: Vec<Predicate>) -> Result<Predicate> {
        if children.is_empty() {
            return Ok(Predicate::always());
        }
        Ok(Predicate::new(move |record| {
            for child in &children {
                if !child.test(&record)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }))
    }

    fn mk_any(&self, children: Vec<Predicate>) -> Result<Predicate> {
        if children.is_empty() {
            return Ok(Predicate::never());
        }
        Ok(Predicate::new(move |record| {
            for child in &children {
                if child.test(&record)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }))
    }

    fn mk_test(&self, operator: Operator) -> Result<Comparison> {
        let apply: fn(&Value, &Literal) -> Option<bool> = match operator {
            Operator::Eq => |v, l| Some(v.equals(l)),
            Operator::Ne => |v, l| Some(!v.equals(l)),
            Operator::Lt => |v, l| ordered(v, l, Ordering::is_lt),
            Operator::Gt => |v, l| ordered(v, l, Ordering::is_gt),
            Operator::Le => |v, l| ordered(v, l, Ordering::is_le),
            Operator::Ge => |v, l| ordered(v, l, Ordering::is_ge),
            Operator::Approx => |v, l| Some(v.contains(l)),
        };
        Ok(Comparison { operator, apply })
    }

    fn mk_cmp(&self, key: &str, value: &Literal, test: Comparison) -> Result<Predicate> {
        if test.operator.is_ordering() && matches!(value, Literal::Boolean(_)) {
            return Err(Error::unsupported(
                test.operator,
                format!("booleans have no ordering (key `{key}`)"),
            ));
        }

        let key = key.to_owned();
        let literal = value.clone();
        let Comparison { operator, apply } = test;
        Ok(Predicate::new(move |record| {
            let Some(field) = record.get(&key) else {
                return Ok(false);
            };
            apply(field, &literal).ok_or_else(|| {
                Error::unsupported(
                    operator,
                    format!(
                        "cannot order {} field `{key}` against {literal}",
                        field.kind()
                    ),
                )
            })
        }))
    }
}
