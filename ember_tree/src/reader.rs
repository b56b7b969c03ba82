//! Typed access to a decoded function tree.
//!
//! The reader hands the frontend one typed node at a time. Asking for a
//! statement at an expression offset (or vice versa) is an upstream
//! decoding defect and surfaces as a malformed-tree error, not a panic.

use crate::node::{ExprKind, FunctionTree, Node, NodeOffset, StmtKind};
use ember_core::{EmberError, EmberResult, NameId, Pos};

/// A borrowed view over one function's tree.
#[derive(Clone, Copy)]
pub struct TreeReader<'a> {
    tree: &'a FunctionTree,
}

impl<'a> TreeReader<'a> {
    /// Create a reader over a decoded tree.
    #[must_use]
    pub fn new(tree: &'a FunctionTree) -> Self {
        Self { tree }
    }

    /// The underlying function tree.
    #[must_use]
    pub fn tree(&self) -> &'a FunctionTree {
        self.tree
    }

    /// Resolve an interned name to its content.
    #[must_use]
    pub fn name(&self, id: NameId) -> &'a str {
        self.tree.names.resolve(id)
    }

    /// The node at `offset`.
    pub fn node(&self, offset: NodeOffset) -> EmberResult<&'a Node> {
        self.tree.nodes.get(offset.index()).ok_or_else(|| {
            EmberError::malformed_tree("node offset out of bounds", offset.raw())
        })
    }

    /// Source position of the node at `offset`, or [`Pos::NONE`] when the
    /// offset is bad (position lookups never fail translation on their own).
    #[must_use]
    pub fn pos(&self, offset: NodeOffset) -> Pos {
        self.tree
            .nodes
            .get(offset.index())
            .map_or(Pos::NONE, |node| node.pos)
    }

    /// The statement at `offset`.
    pub fn stmt(&self, offset: NodeOffset) -> EmberResult<&'a StmtKind> {
        match &self.node(offset)?.kind {
            crate::node::NodeKind::Stmt(stmt) => Ok(stmt),
            crate::node::NodeKind::Expr(_) => Err(EmberError::malformed_tree(
                "expected a statement, found an expression",
                offset.raw(),
            )),
        }
    }

    /// The expression at `offset`.
    pub fn expr(&self, offset: NodeOffset) -> EmberResult<&'a ExprKind> {
        match &self.node(offset)?.kind {
            crate::node::NodeKind::Expr(expr) => Ok(expr),
            crate::node::NodeKind::Stmt(_) => Err(EmberError::malformed_tree(
                "expected an expression, found a statement",
                offset.raw(),
            )),
        }
    }
}
