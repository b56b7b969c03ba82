//! Tree node definitions.
//!
//! Nodes are stored in a per-function arena; a [`NodeOffset`] is the stable
//! index of a node within it. Statement and expression kinds mirror the
//! constructs the frontend knows how to linearize; anything richer is
//! desugared before it reaches this tree.

use ember_core::{NameId, NameTable, Pos};
use std::fmt;
use std::sync::Arc;

/// The stable offset of a node within one function's serialized tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeOffset(pub u32);

impl NodeOffset {
    /// Create an offset from a raw index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        NodeOffset(index)
    }

    /// Get the raw index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Get the raw index as the u32 used in diagnostics.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// One typed tree node.
#[derive(Debug, Clone)]
pub struct Node {
    /// The node kind.
    pub kind: NodeKind,
    /// Source position.
    pub pos: Pos,
}

/// Statement or expression.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A statement node.
    Stmt(StmtKind),
    /// An expression node.
    Expr(ExprKind),
}

/// One arm of a switch statement.
#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// Case expressions compared against the dispatch value.
    pub exprs: Vec<NodeOffset>,
    /// Whether this is the default arm.
    pub is_default: bool,
    /// The arm body.
    pub body: NodeOffset,
}

/// One catch clause of a try/catch statement.
#[derive(Debug, Clone)]
pub struct CatchClause {
    /// The handler body.
    pub body: NodeOffset,
    /// Whether the handler observes the stack trace object.
    pub needs_stacktrace: bool,
}

/// Statement kinds.
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// No-op.
    Empty,
    /// Evaluate an expression and discard its value.
    Expression {
        /// The evaluated expression.
        expr: NodeOffset,
    },
    /// A brace-scoped statement list; may own a lexical scope.
    Block {
        /// Statements in order.
        body: Vec<NodeOffset>,
    },
    /// Declare (and optionally initialize) a local variable. The offset of
    /// this node keys the local's binding in the scope result.
    VariableDecl {
        /// Initializer, if present.
        init: Option<NodeOffset>,
    },
    /// Two-way conditional.
    If {
        /// Condition expression.
        condition: NodeOffset,
        /// Then branch.
        then_branch: NodeOffset,
        /// Else branch, if present.
        else_branch: Option<NodeOffset>,
    },
    /// Condition-first loop.
    While {
        /// Loop condition.
        condition: NodeOffset,
        /// Loop body.
        body: NodeOffset,
    },
    /// Iterate a container; the declared variable holds each element.
    ForIn {
        /// The element variable declaration.
        var_decl: NodeOffset,
        /// The iterated expression.
        iterable: NodeOffset,
        /// Loop body.
        body: NodeOffset,
    },
    /// A labeled, breakable region.
    Labeled {
        /// The labeled body.
        body: NodeOffset,
    },
    /// Jump past the end of the breakable region with the given label
    /// index (0 is the outermost labeled region in the function).
    Break {
        /// Label index of the target region.
        label: u32,
    },
    /// Multi-way dispatch over case expressions.
    Switch {
        /// The dispatch value.
        scrutinee: NodeOffset,
        /// Case arms in order.
        cases: Vec<SwitchCase>,
    },
    /// Jump to a case arm by function-relative absolute case number;
    /// the target may belong to an enclosing switch.
    ContinueSwitch {
        /// Absolute case number.
        target_case: u32,
    },
    /// A protected body with exception handlers.
    TryCatch {
        /// The protected body.
        body: NodeOffset,
        /// Handlers in order; the last handler that matches re-throws.
        catches: Vec<CatchClause>,
    },
    /// A body whose finalizer runs on every exit, normal or not.
    TryFinally {
        /// The protected body.
        body: NodeOffset,
        /// The finalizer statement.
        finalizer: NodeOffset,
    },
    /// Return to the caller.
    Return {
        /// Returned value; `None` returns null.
        value: Option<NodeOffset>,
    },
    /// Suspend a generator/async body, yielding a value.
    Yield {
        /// The yielded value.
        value: NodeOffset,
    },
}

/// Expression kinds.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// The null literal.
    Null,
    /// A boolean literal.
    Bool(bool),
    /// An integer literal.
    Int(i64),
    /// A string literal.
    Str(Arc<str>),
    /// The receiver of an instance member.
    This,
    /// Read a local variable declared at `decl`.
    VariableGet {
        /// Offset of the declaring [`StmtKind::VariableDecl`].
        decl: NodeOffset,
    },
    /// Write a local variable declared at `decl`; yields the stored value.
    VariableSet {
        /// Offset of the declaring [`StmtKind::VariableDecl`].
        decl: NodeOffset,
        /// The stored value.
        value: NodeOffset,
    },
    /// Read a property through a selector.
    PropertyGet {
        /// Receiver expression.
        receiver: NodeOffset,
        /// Property name.
        name: NameId,
    },
    /// Indexed read from a container whose element layout is already
    /// resolved.
    IndexGet {
        /// Receiver expression.
        receiver: NodeOffset,
        /// Index expression.
        index: NodeOffset,
    },
    /// Indexed write; yields the stored value.
    IndexSet {
        /// Receiver expression.
        receiver: NodeOffset,
        /// Index expression.
        index: NodeOffset,
        /// The stored value.
        value: NodeOffset,
    },
    /// Write a property through a selector; yields the stored value.
    PropertySet {
        /// Receiver expression.
        receiver: NodeOffset,
        /// Property name.
        name: NameId,
        /// The stored value.
        value: NodeOffset,
    },
    /// Call a top-level or static member by name.
    StaticCall {
        /// Target name, resolved through the helper.
        name: NameId,
        /// Arguments in order.
        args: Vec<NodeOffset>,
    },
    /// Dynamically dispatched instance call.
    MethodCall {
        /// Receiver expression.
        receiver: NodeOffset,
        /// Selector.
        name: NameId,
        /// Arguments in order.
        args: Vec<NodeOffset>,
    },
    /// Allocate an instance and run its constructor.
    New {
        /// Class name, resolved through the helper.
        class: NameId,
        /// Constructor arguments.
        args: Vec<NodeOffset>,
    },
    /// Language-level (in)equality.
    Equals {
        /// Left operand.
        left: NodeOffset,
        /// Right operand.
        right: NodeOffset,
        /// Negate the result.
        negated: bool,
    },
    /// Identity (in)equality.
    StrictEquals {
        /// Left operand.
        left: NodeOffset,
        /// Right operand.
        right: NodeOffset,
        /// Negate the result.
        negated: bool,
    },
    /// Boolean negation.
    Not {
        /// Negated operand.
        operand: NodeOffset,
    },
    /// Value-producing two-way conditional.
    Conditional {
        /// Condition expression.
        condition: NodeOffset,
        /// Value when true.
        then_expr: NodeOffset,
        /// Value when false.
        else_expr: NodeOffset,
    },
    /// Throw an exception object.
    Throw {
        /// The thrown value.
        value: NodeOffset,
    },
    /// Re-throw the exception of the enclosing catch clause.
    Rethrow,
}

/// What kind of member a function tree belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// An ordinary function or method with a source body.
    Regular,
    /// A getter with a source body.
    Getter,
    /// A setter with a source body; its value parameter is the setter
    /// value temp in the scope result.
    Setter,
    /// Synthetic: closurize an instance method (no source body).
    MethodExtractor {
        /// Name of the extracted method.
        method: NameId,
    },
    /// Synthetic: trampoline into `noSuchMethod` (no source body).
    NoSuchMethodDispatcher,
    /// Synthetic: load a closure-valued field and call it (no source body).
    InvokeFieldDispatcher {
        /// Name of the invoked field.
        field: NameId,
    },
}

/// Selectors every translated function may need, interned up front so the
/// tree's name table stays read-only during translation.
#[derive(Debug, Clone, Copy)]
pub struct Selectors {
    /// The `iterator` getter used by for-in lowering.
    pub iterator: NameId,
    /// The `moveNext` method used by for-in lowering.
    pub move_next: NameId,
    /// The `current` getter used by for-in lowering.
    pub current: NameId,
    /// The `noSuchMethod` trampoline selector.
    pub no_such_method: NameId,
}

/// One function's decoded tree plus its member descriptor.
#[derive(Debug)]
pub struct FunctionTree {
    /// Function name.
    pub name: NameId,
    /// Member kind; synthetic kinds have no body.
    pub kind: MemberKind,
    /// Parameter declarations in order (receiver excluded); each is a
    /// [`StmtKind::VariableDecl`] node.
    pub params: Vec<NodeOffset>,
    /// Number of generic type parameters in scope.
    pub type_param_count: u16,
    /// Whether the member binds a receiver.
    pub is_instance: bool,
    /// Whether checked-mode argument assertions are emitted.
    pub checked_mode: bool,
    /// The node arena.
    pub nodes: Vec<Node>,
    /// Interned names referenced by the nodes.
    pub names: NameTable,
    /// Pre-interned well-known selectors.
    pub selectors: Selectors,
    /// The body statement, absent for synthetic member kinds.
    pub body: Option<NodeOffset>,
}

impl FunctionTree {
    /// Declared parameter count (receiver excluded).
    #[must_use]
    pub fn arg_count(&self) -> u16 {
        self.params.len() as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_offset_display() {
        assert_eq!(NodeOffset::new(12).to_string(), "n12");
    }

    #[test]
    fn test_member_kind_equality() {
        assert_eq!(MemberKind::Regular, MemberKind::Regular);
        assert_ne!(MemberKind::Regular, MemberKind::NoSuchMethodDispatcher);
    }
}
