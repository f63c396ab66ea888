//! Backend protocol and the post-order dispatcher that drives it.
//!
//! Role
//! - [`Backend`] is the single extension point: a new target representation is added by
//!   implementing its four operations, never by touching the grammar or the dispatcher.
//! - [`evaluate`] walks a parsed tree bottom-up and routes every node to the backend.
//!
//! Traversal strategy
//! - Iteration over an explicit work stack, children first, left to right. The walk itself
//!   does not recurse; parsed trees are at most [`MAX_DEPTH`](crate::grammar::MAX_DEPTH)
//!   groups deep.
//! - The tree is only borrowed; the same tree can be evaluated by many backends, concurrently
//!   if needed.
//!
//! Example: count the conditions of a filter
//! ```
//! use daffodil::prelude::*;
//!
//! struct Count;
//!
//! impl Backend for Count {
//!     type Output = usize;
//!     type Test = ();
//!
//!     fn mk_all(&self, children: Vec<usize>) -> daffodil::Result<usize> {
//!         Ok(children.into_iter().sum())
//!     }
//!     fn mk_any(&self, children: Vec<usize>) -> daffodil::Result<usize> {
//!         Ok(children.into_iter().sum())
//!     }
//!     fn mk_test(&self, _: Operator) -> daffodil::Result<()> {
//!         Ok(())
//!     }
//!     fn mk_cmp(&self, _: &str, _: &Literal, _: ()) -> daffodil::Result<usize> {
//!         Ok(1)
//!     }
//! }
//!
//! let filter = Daffodil::new("a = 1 [b = 2 c = 3] {}").unwrap();
//! assert_eq!(filter.evaluate_with(&Count).unwrap(), 3);
//! ```
use log::trace;

use crate::ast::{Condition, Group, GroupKind, Literal, Node, Operator};
use crate::error::Result;

/// Target representation built from a parsed filter.
pub trait Backend {
    /// Value produced for every group and condition.
    type Output;

    /// Backend-specific form of an operator, produced by [`Backend::mk_test`] and consumed by
    /// [`Backend::mk_cmp`].
    type Test;

    /// Combine children with logical AND. An empty group is vacuously true.
    fn mk_all(&self, children: Vec<Self::Output>) -> Result<Self::Output>;

    /// Combine children with logical OR. An empty group is vacuously false.
    fn mk_any(&self, children: Vec<Self::Output>) -> Result<Self::Output>;

    /// Translate an operator. Backends reject operators they cannot express here.
    fn mk_test(&self, operator: Operator) -> Result<Self::Test>;

    /// Build the comparison of the field `key` against `value`.
    fn mk_cmp(&self, key: &str, value: &Literal, test: Self::Test) -> Result<Self::Output>;
}

impl<B: Backend + ?Sized> Backend for &B {
    type Output = B::Output;
    type Test = B::Test;

    fn mk_all(&self, children: Vec<Self::Output>) -> Result<Self::Output> {
        (**self).mk_all(children)
    }

    fn mk_any(&self, children: Vec<Self::Output>) -> Result<Self::Output> {
        (**self).mk_any(children)
    }

    fn mk_test(&self, operator: Operator) -> Result<Self::Test> {
        (**self).mk_test(operator)
    }

    fn mk_cmp(&self, key: &str, value: &Literal, test: Self::Test) -> Result<Self::Output> {
        (**self).mk_cmp(key, value, test)
    }
}

enum Frame<'t> {
    /// Visit a node: conditions are dispatched immediately, groups schedule their children.
    Enter(&'t Node),
    /// All children of the group have been evaluated and sit on top of the value stack.
    Exit(&'t Group),
}

fn dispatch_condition<B: Backend + ?Sized>(
    condition: &Condition,
    backend: &B,
) -> Result<B::Output> {
    trace!(
        "dispatch condition `{} {} ...`",
        condition.key.inner, condition.operator.inner
    );
    let test = backend.mk_test(condition.operator.inner)?;
    backend.mk_cmp(&condition.key.inner, &condition.value.inner, test)
}

fn dispatch_group<B: Backend + ?Sized>(
    group: &Group,
    children: Vec<B::Output>,
    backend: &B,
) -> Result<B::Output> {
    trace!(
        "dispatch {} group with {} child(ren)",
        group.kind,
        children.len()
    );
    match group.kind {
        GroupKind::All => backend.mk_all(children),
        GroupKind::Any => backend.mk_any(children),
    }
}

/// Evaluate `root` with `backend`, children before parents.
///
/// The first backend error aborts the walk and is returned as is.
pub fn evaluate<B: Backend + ?Sized>(root: &Node, backend: &B) -> Result<B::Output> {
    let root = match root {
        Node::Condition(condition) => return dispatch_condition(condition, backend),
        Node::Group(group) => group,
    };

    // Once the stack drains, `values` holds exactly the root's children
    let mut work: Vec<Frame> = root.children.iter().rev().map(Frame::Enter).collect();
    let mut values: Vec<B::Output> = Vec::with_capacity(root.children.len());

    while let Some(frame) = work.pop() {
        match frame {
            Frame::Enter(Node::Condition(condition)) => {
                values.push(dispatch_condition(condition, backend)?);
            }
            Frame::Enter(Node::Group(group)) => {
                work.push(Frame::Exit(group));
                // Reversed so that the leftmost child is popped first
                work.extend(group.children.iter().rev().map(Frame::Enter));
            }
            Frame::Exit(group) => {
                let children = values.split_off(values.len() - group.children.len());
                values.push(dispatch_group(group, children, backend)?);
            }
        }
    }

    dispatch_group(root, values, backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::grammar::parse;

    /// Records every protocol call in order.
    struct Trace;

    impl Backend for Trace {
        type Output = String;
        type Test = &'static str;

        fn mk_all(&self, children: Vec<String>) -> Result<String> {
            Ok(format!("all({})", children.join(" ")))
        }

        fn mk_any(&self, children: Vec<String>) -> Result<String> {
            Ok(format!("any({})", children.join(" ")))
        }

        fn mk_test(&self, operator: Operator) -> Result<&'static str> {
            Ok(operator.as_str())
        }

        fn mk_cmp(&self, key: &str, value: &Literal, test: &'static str) -> Result<String> {
            Ok(format!("{key}{test}{value}"))
        }
    }

    #[test]
    fn children_are_evaluated_in_source_order() {
        let tree = parse("a = 1 [b = 2, {c = 3 d = 'x'}] e != true").unwrap();
        assert_eq!(
            evaluate(&tree, &Trace).unwrap(),
            r#"all(a=1 any(b=2 all(c=3 d="x")) e!=true)"#
        );
    }

    #[test]
    fn any_node_can_be_the_root() {
        let Node::Group(tree) = parse("[b = 2 c = 3] a != 'x'").unwrap() else {
            panic!("root is a group")
        };
        assert_eq!(evaluate(&tree.children[0], &Trace).unwrap(), "any(b=2 c=3)");
        assert_eq!(evaluate(&tree.children[1], &Trace).unwrap(), r#"a!="x""#);
    }

    #[test]
    fn empty_groups_reach_the_backend() {
        let tree = parse("{} []").unwrap();
        assert_eq!(evaluate(&tree, &Trace).unwrap(), "all(all() any())");
    }

    #[test]
    fn backend_errors_abort_the_walk() {
        struct NoApprox;

        impl Backend for NoApprox {
            type Output = ();
            type Test = ();

            fn mk_all(&self, _: Vec<()>) -> Result<()> {
                Ok(())
            }

            fn mk_any(&self, _: Vec<()>) -> Result<()> {
                Ok(())
            }

            fn mk_test(&self, operator: Operator) -> Result<()> {
                match operator {
                    Operator::Approx => Err(Error::unsupported(operator, "no fuzzy matching")),
                    _ => Ok(()),
                }
            }

            fn mk_cmp(&self, _: &str, _: &Literal, _: ()) -> Result<()> {
                Ok(())
            }
        }

        let tree = parse("a = 1 [b ?= 'x']").unwrap();
        assert!(matches!(
            evaluate(&tree, &NoApprox),
            Err(Error::UnsupportedOperator {
                operator: Operator::Approx,
                ..
            })
        ));
    }

    #[test]
    fn deeply_nested_groups() {
        let depth = 1_000;
        let mut node = parse("a = 1").unwrap();
        for _ in 0..depth {
            node = Node::Group(Group {
                kind: GroupKind::Any,
                children: vec![node],
                span: 0..0,
            });
        }
        let out = evaluate(&node, &Trace).unwrap();
        assert!(out.starts_with("any(any("));
        assert!(out.contains("a=1"));
    }
}
