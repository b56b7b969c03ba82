//! Typed intermediate tree for the Ember compiler frontend.
//!
//! A function body arrives at the frontend as a tree of typed nodes, each
//! addressable by a stable [`NodeOffset`] within the function's serialized
//! representation. This crate defines the node kinds, the per-function
//! [`FunctionTree`] container, the [`TreeReader`] that hands the frontend
//! one typed node at a time, and a [`TreeBuilder`] used by tests and
//! embedders to assemble bodies directly.
//!
//! Decoding of the on-disk serialized format into these nodes happens
//! upstream; this crate only models the decoded form.

#![warn(missing_docs)]

pub mod build;
pub mod node;
pub mod reader;

pub use build::TreeBuilder;
pub use node::{
    CatchClause, ExprKind, FunctionTree, MemberKind, Node, NodeKind, NodeOffset, Selectors,
    StmtKind, SwitchCase,
};
pub use reader::TreeReader;
