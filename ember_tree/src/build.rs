//! Programmatic tree construction.
//!
//! `TreeBuilder` appends nodes to a fresh arena and hands back their
//! offsets, in the same spirit as the bytecode builders elsewhere in the
//! stack: build leaves first, then the constructs that reference them.
//! Integration tests and embedders without a serialized tree use this.

use crate::node::{
    CatchClause, ExprKind, FunctionTree, MemberKind, Node, NodeKind, NodeOffset, Selectors,
    StmtKind, SwitchCase,
};
use ember_core::{NameId, NameTable, Pos};
use std::sync::Arc;

/// Builder for a [`FunctionTree`].
#[derive(Debug)]
pub struct TreeBuilder {
    name: NameId,
    names: NameTable,
    selectors: Selectors,
    nodes: Vec<Node>,
    params: Vec<NodeOffset>,
    type_param_count: u16,
    is_instance: bool,
    checked_mode: bool,
}

impl TreeBuilder {
    /// Start a tree for a function with the given name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut names = NameTable::new();
        let name = names.intern(name);
        let selectors = Selectors {
            iterator: names.intern("iterator"),
            move_next: names.intern("moveNext"),
            current: names.intern("current"),
            no_such_method: names.intern("noSuchMethod"),
        };
        Self {
            name,
            names,
            selectors,
            nodes: Vec::new(),
            params: Vec::new(),
            type_param_count: 0,
            is_instance: false,
            checked_mode: false,
        }
    }

    /// Declare the next parameter; returns its declaration offset for use
    /// in `var_get`/`var_set`.
    pub fn param(&mut self, pos: u32) -> NodeOffset {
        let decl = self.var_decl(None, pos);
        self.params.push(decl);
        decl
    }

    /// Set the generic type parameter count.
    pub fn type_params(&mut self, count: u16) -> &mut Self {
        self.type_param_count = count;
        self
    }

    /// Mark the function as an instance member (binds a receiver).
    pub fn instance(&mut self) -> &mut Self {
        self.is_instance = true;
        self
    }

    /// Enable checked-mode argument assertions.
    pub fn checked(&mut self) -> &mut Self {
        self.checked_mode = true;
        self
    }

    /// Intern a name for use in selectors and lookups.
    pub fn name(&mut self, name: &str) -> NameId {
        self.names.intern(name)
    }

    fn push(&mut self, kind: NodeKind, pos: u32) -> NodeOffset {
        let offset = NodeOffset::new(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            pos: Pos::new(pos),
        });
        offset
    }

    fn expr(&mut self, kind: ExprKind, pos: u32) -> NodeOffset {
        self.push(NodeKind::Expr(kind), pos)
    }

    fn stmt(&mut self, kind: StmtKind, pos: u32) -> NodeOffset {
        self.push(NodeKind::Stmt(kind), pos)
    }

    // --- Expressions ---

    /// Null literal.
    pub fn null(&mut self, pos: u32) -> NodeOffset {
        self.expr(ExprKind::Null, pos)
    }

    /// Boolean literal.
    pub fn bool_lit(&mut self, value: bool, pos: u32) -> NodeOffset {
        self.expr(ExprKind::Bool(value), pos)
    }

    /// Integer literal.
    pub fn int(&mut self, value: i64, pos: u32) -> NodeOffset {
        self.expr(ExprKind::Int(value), pos)
    }

    /// String literal.
    pub fn str_lit(&mut self, value: &str, pos: u32) -> NodeOffset {
        self.expr(ExprKind::Str(Arc::from(value)), pos)
    }

    /// The receiver.
    pub fn this(&mut self, pos: u32) -> NodeOffset {
        self.expr(ExprKind::This, pos)
    }

    /// Read a local variable.
    pub fn var_get(&mut self, decl: NodeOffset, pos: u32) -> NodeOffset {
        self.expr(ExprKind::VariableGet { decl }, pos)
    }

    /// Write a local variable.
    pub fn var_set(&mut self, decl: NodeOffset, value: NodeOffset, pos: u32) -> NodeOffset {
        self.expr(ExprKind::VariableSet { decl, value }, pos)
    }

    /// Property read.
    pub fn property_get(&mut self, receiver: NodeOffset, name: NameId, pos: u32) -> NodeOffset {
        self.expr(ExprKind::PropertyGet { receiver, name }, pos)
    }

    /// Indexed read.
    pub fn index_get(&mut self, receiver: NodeOffset, index: NodeOffset, pos: u32) -> NodeOffset {
        self.expr(ExprKind::IndexGet { receiver, index }, pos)
    }

    /// Indexed write.
    pub fn index_set(
        &mut self,
        receiver: NodeOffset,
        index: NodeOffset,
        value: NodeOffset,
        pos: u32,
    ) -> NodeOffset {
        self.expr(
            ExprKind::IndexSet {
                receiver,
                index,
                value,
            },
            pos,
        )
    }

    /// Property write.
    pub fn property_set(
        &mut self,
        receiver: NodeOffset,
        name: NameId,
        value: NodeOffset,
        pos: u32,
    ) -> NodeOffset {
        self.expr(
            ExprKind::PropertySet {
                receiver,
                name,
                value,
            },
            pos,
        )
    }

    /// Static/top-level call by name.
    pub fn static_call(&mut self, name: NameId, args: Vec<NodeOffset>, pos: u32) -> NodeOffset {
        self.expr(ExprKind::StaticCall { name, args }, pos)
    }

    /// Instance method call.
    pub fn method_call(
        &mut self,
        receiver: NodeOffset,
        name: NameId,
        args: Vec<NodeOffset>,
        pos: u32,
    ) -> NodeOffset {
        self.expr(
            ExprKind::MethodCall {
                receiver,
                name,
                args,
            },
            pos,
        )
    }

    /// Instance allocation plus constructor call.
    pub fn new_instance(&mut self, class: NameId, args: Vec<NodeOffset>, pos: u32) -> NodeOffset {
        self.expr(ExprKind::New { class, args }, pos)
    }

    /// Language-level equality.
    pub fn equals(&mut self, left: NodeOffset, right: NodeOffset, pos: u32) -> NodeOffset {
        self.expr(
            ExprKind::Equals {
                left,
                right,
                negated: false,
            },
            pos,
        )
    }

    /// Identity equality, optionally negated.
    pub fn strict_equals(
        &mut self,
        left: NodeOffset,
        right: NodeOffset,
        negated: bool,
        pos: u32,
    ) -> NodeOffset {
        self.expr(
            ExprKind::StrictEquals {
                left,
                right,
                negated,
            },
            pos,
        )
    }

    /// Boolean negation.
    pub fn not(&mut self, operand: NodeOffset, pos: u32) -> NodeOffset {
        self.expr(ExprKind::Not { operand }, pos)
    }

    /// Value-producing conditional.
    pub fn conditional(
        &mut self,
        condition: NodeOffset,
        then_expr: NodeOffset,
        else_expr: NodeOffset,
        pos: u32,
    ) -> NodeOffset {
        self.expr(
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            },
            pos,
        )
    }

    /// Throw expression.
    pub fn throw(&mut self, value: NodeOffset, pos: u32) -> NodeOffset {
        self.expr(ExprKind::Throw { value }, pos)
    }

    /// Re-throw the enclosing catch clause's exception.
    pub fn rethrow(&mut self, pos: u32) -> NodeOffset {
        self.expr(ExprKind::Rethrow, pos)
    }

    // --- Statements ---

    /// Empty statement.
    pub fn empty(&mut self, pos: u32) -> NodeOffset {
        self.stmt(StmtKind::Empty, pos)
    }

    /// Expression statement.
    pub fn expr_stmt(&mut self, expr: NodeOffset, pos: u32) -> NodeOffset {
        self.stmt(StmtKind::Expression { expr }, pos)
    }

    /// Statement block.
    pub fn block(&mut self, body: Vec<NodeOffset>, pos: u32) -> NodeOffset {
        self.stmt(StmtKind::Block { body }, pos)
    }

    /// Local variable declaration.
    pub fn var_decl(&mut self, init: Option<NodeOffset>, pos: u32) -> NodeOffset {
        self.stmt(StmtKind::VariableDecl { init }, pos)
    }

    /// Two-way conditional statement.
    pub fn if_stmt(
        &mut self,
        condition: NodeOffset,
        then_branch: NodeOffset,
        else_branch: Option<NodeOffset>,
        pos: u32,
    ) -> NodeOffset {
        self.stmt(
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
            pos,
        )
    }

    /// Condition-first loop.
    pub fn while_stmt(&mut self, condition: NodeOffset, body: NodeOffset, pos: u32) -> NodeOffset {
        self.stmt(StmtKind::While { condition, body }, pos)
    }

    /// For-in loop.
    pub fn for_in(
        &mut self,
        var_decl: NodeOffset,
        iterable: NodeOffset,
        body: NodeOffset,
        pos: u32,
    ) -> NodeOffset {
        self.stmt(
            StmtKind::ForIn {
                var_decl,
                iterable,
                body,
            },
            pos,
        )
    }

    /// Labeled breakable region.
    pub fn labeled(&mut self, body: NodeOffset, pos: u32) -> NodeOffset {
        self.stmt(StmtKind::Labeled { body }, pos)
    }

    /// Break to the labeled region with the given label index.
    pub fn brk(&mut self, label: u32, pos: u32) -> NodeOffset {
        self.stmt(StmtKind::Break { label }, pos)
    }

    /// Switch statement.
    pub fn switch(
        &mut self,
        scrutinee: NodeOffset,
        cases: Vec<SwitchCase>,
        pos: u32,
    ) -> NodeOffset {
        self.stmt(StmtKind::Switch { scrutinee, cases }, pos)
    }

    /// Jump to an absolute case number, possibly in an enclosing switch.
    pub fn continue_switch(&mut self, target_case: u32, pos: u32) -> NodeOffset {
        self.stmt(StmtKind::ContinueSwitch { target_case }, pos)
    }

    /// Try/catch statement.
    pub fn try_catch(
        &mut self,
        body: NodeOffset,
        catches: Vec<CatchClause>,
        pos: u32,
    ) -> NodeOffset {
        self.stmt(StmtKind::TryCatch { body, catches }, pos)
    }

    /// Try/finally statement.
    pub fn try_finally(&mut self, body: NodeOffset, finalizer: NodeOffset, pos: u32) -> NodeOffset {
        self.stmt(StmtKind::TryFinally { body, finalizer }, pos)
    }

    /// Return statement.
    pub fn ret(&mut self, value: Option<NodeOffset>, pos: u32) -> NodeOffset {
        self.stmt(StmtKind::Return { value }, pos)
    }

    /// Yield statement (suspension point).
    pub fn yield_stmt(&mut self, value: NodeOffset, pos: u32) -> NodeOffset {
        self.stmt(StmtKind::Yield { value }, pos)
    }

    // --- Finishing ---

    /// Finish a regular function with the given body.
    #[must_use]
    pub fn finish_with_body(self, body: NodeOffset) -> FunctionTree {
        self.finish(MemberKind::Regular, Some(body))
    }

    /// Finish a function of the given kind; synthetic kinds have no body.
    #[must_use]
    pub fn finish(self, kind: MemberKind, body: Option<NodeOffset>) -> FunctionTree {
        FunctionTree {
            name: self.name,
            kind,
            params: self.params,
            type_param_count: self.type_param_count,
            is_instance: self.is_instance,
            checked_mode: self.checked_mode,
            nodes: self.nodes,
            names: self.names,
            selectors: self.selectors,
            body,
        }
    }
}
