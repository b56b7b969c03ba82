//! Precomputed variable and scope bindings.
//!
//! Translation never decides storage: which source variables become which
//! slots is computed once, before translation begins, and consumed here as
//! the immutable [`ScopeBindings`] result. The frontend also ships a
//! reference computation ([`ScopeBindings::compute`]) that walks a
//! function tree and produces consistent bindings; pipelines with their
//! own storage policy build the result directly through
//! [`ScopeBindingsBuilder`].

use ember_ir::LocalId;
use ember_tree::{ExprKind, FunctionTree, MemberKind, NodeKind, NodeOffset, StmtKind};
use rustc_hash::FxHashMap;

/// Per-lexical-scope information.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeInfo {
    /// Number of captured-variable slots this scope allocates; a nonzero
    /// count makes scope entry push a context.
    pub context_slots: u16,
}

/// The immutable per-function binding result.
#[derive(Debug, Default)]
pub struct ScopeBindings {
    locals: FxHashMap<u32, LocalId>,
    scopes: FxHashMap<u32, ScopeInfo>,
    local_count: u16,

    /// Receiver slot, for instance members.
    pub this_variable: Option<LocalId>,
    /// Type-argument vector slot, for generic members.
    pub type_arguments_variable: Option<LocalId>,
    /// Switch dispatch temp, when the function contains a switch.
    pub switch_variable: Option<LocalId>,
    /// Return-value temp for returns that cross a finally region.
    pub finally_return_variable: Option<LocalId>,
    /// The setter's value parameter slot.
    pub setter_value: Option<LocalId>,
    /// Scratch slot for value-producing merges.
    pub expression_temp: Option<LocalId>,
    /// Generator resume-state temp.
    pub resume_state_variable: Option<LocalId>,
    /// Generator resume-context temp.
    pub resume_context_variable: Option<LocalId>,

    /// Exception slots, one per catch nesting level.
    pub exception_variables: Vec<LocalId>,
    /// Stack-trace slots, one per catch nesting level.
    pub stack_trace_variables: Vec<LocalId>,
    /// Saved-context slots, one per try nesting level.
    pub catch_context_variables: Vec<LocalId>,
    /// Iterator slots, one per for-in nesting level.
    pub iterator_variables: Vec<LocalId>,
}

impl ScopeBindings {
    /// The local bound at a declaration offset.
    #[must_use]
    pub fn local(&self, offset: NodeOffset) -> Option<LocalId> {
        self.locals.get(&offset.raw()).copied()
    }

    /// The lexical scope opened at a node offset, if one is recorded.
    #[must_use]
    pub fn scope_info(&self, offset: NodeOffset) -> Option<ScopeInfo> {
        self.scopes.get(&offset.raw()).copied()
    }

    /// Total number of slots allocated.
    #[must_use]
    pub fn local_count(&self) -> u16 {
        self.local_count
    }

    /// Reference scope computation: walk `tree` and bind every declared
    /// variable plus the synthesized locals its constructs need.
    #[must_use]
    pub fn compute(tree: &FunctionTree) -> ScopeBindings {
        let mut b = ScopeBindingsBuilder::new();
        if tree.is_instance {
            b.bind_this();
        }
        if tree.type_param_count > 0 {
            b.bind_type_arguments();
        }
        for &param in &tree.params {
            let slot = b.bind_local(param);
            if tree.kind == MemberKind::Setter && b.result.setter_value.is_none() {
                b.result.setter_value = Some(slot);
            }
        }

        let mut walk = Walk {
            b: &mut b,
            tree,
            try_depth: 0,
            catch_depth: 0,
            for_in_depth: 0,
            max_try: 0,
            max_catch: 0,
            max_for_in: 0,
            has_switch: false,
            has_finally: false,
            has_yield: false,
        };
        if let Some(body) = tree.body {
            walk.visit(body);
        }
        let Walk {
            max_try,
            max_catch,
            max_for_in,
            has_switch,
            has_finally,
            has_yield,
            ..
        } = walk;

        b.bind_expression_temp();
        if has_switch {
            b.bind_switch_variable();
        }
        if has_finally {
            b.bind_finally_return_variable();
        }
        if has_yield {
            b.bind_resume_variables();
        }
        b.bind_handler_levels(max_catch);
        b.bind_context_levels(max_try);
        b.bind_iterator_levels(max_for_in);
        b.finish()
    }
}

/// Builder for a [`ScopeBindings`] result.
#[derive(Debug, Default)]
pub struct ScopeBindingsBuilder {
    result: ScopeBindings,
}

impl ScopeBindingsBuilder {
    /// Start an empty binding result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> LocalId {
        let slot = LocalId::new(self.result.local_count);
        self.result.local_count += 1;
        slot
    }

    /// Bind a declaration offset to a fresh slot.
    pub fn bind_local(&mut self, offset: NodeOffset) -> LocalId {
        let slot = self.allocate();
        self.result.locals.insert(offset.raw(), slot);
        slot
    }

    /// Record a lexical scope opened at `offset`.
    pub fn bind_scope(&mut self, offset: NodeOffset, info: ScopeInfo) {
        self.result.scopes.insert(offset.raw(), info);
    }

    /// Bind the receiver slot.
    pub fn bind_this(&mut self) -> LocalId {
        let slot = self.allocate();
        self.result.this_variable = Some(slot);
        slot
    }

    /// Bind the type-argument vector slot.
    pub fn bind_type_arguments(&mut self) -> LocalId {
        let slot = self.allocate();
        self.result.type_arguments_variable = Some(slot);
        slot
    }

    /// Bind the switch dispatch temp.
    pub fn bind_switch_variable(&mut self) -> LocalId {
        let slot = self.allocate();
        self.result.switch_variable = Some(slot);
        slot
    }

    /// Bind the finally-return temp.
    pub fn bind_finally_return_variable(&mut self) -> LocalId {
        let slot = self.allocate();
        self.result.finally_return_variable = Some(slot);
        slot
    }

    /// Bind the setter value slot.
    pub fn bind_setter_value(&mut self) -> LocalId {
        let slot = self.allocate();
        self.result.setter_value = Some(slot);
        slot
    }

    /// Bind the expression scratch temp.
    pub fn bind_expression_temp(&mut self) -> LocalId {
        let slot = self.allocate();
        self.result.expression_temp = Some(slot);
        slot
    }

    /// Bind the generator resume-state and resume-context temps.
    pub fn bind_resume_variables(&mut self) -> (LocalId, LocalId) {
        let state = self.allocate();
        let context = self.allocate();
        self.result.resume_state_variable = Some(state);
        self.result.resume_context_variable = Some(context);
        (state, context)
    }

    /// Bind exception and stack-trace slots for `levels` catch depths.
    pub fn bind_handler_levels(&mut self, levels: usize) {
        for _ in 0..levels {
            let exception = self.allocate();
            let trace = self.allocate();
            self.result.exception_variables.push(exception);
            self.result.stack_trace_variables.push(trace);
        }
    }

    /// Bind saved-context slots for `levels` try depths.
    pub fn bind_context_levels(&mut self, levels: usize) {
        for _ in 0..levels {
            let slot = self.allocate();
            self.result.catch_context_variables.push(slot);
        }
    }

    /// Bind iterator slots for `levels` for-in depths.
    pub fn bind_iterator_levels(&mut self, levels: usize) {
        for _ in 0..levels {
            let slot = self.allocate();
            self.result.iterator_variables.push(slot);
        }
    }

    /// Seal the result; it is read-only from here on.
    #[must_use]
    pub fn finish(self) -> ScopeBindings {
        self.result
    }
}

struct Walk<'a> {
    b: &'a mut ScopeBindingsBuilder,
    tree: &'a FunctionTree,
    try_depth: usize,
    catch_depth: usize,
    for_in_depth: usize,
    max_try: usize,
    max_catch: usize,
    max_for_in: usize,
    has_switch: bool,
    has_finally: bool,
    has_yield: bool,
}

impl Walk<'_> {
    fn visit(&mut self, offset: NodeOffset) {
        let Some(node) = self.tree.nodes.get(offset.index()) else {
            return;
        };
        match &node.kind {
            NodeKind::Stmt(stmt) => self.visit_stmt(offset, stmt),
            NodeKind::Expr(expr) => self.visit_expr(expr),
        }
    }

    fn visit_stmt(&mut self, offset: NodeOffset, stmt: &StmtKind) {
        match stmt {
            StmtKind::Empty | StmtKind::Break { .. } | StmtKind::ContinueSwitch { .. } => {}
            StmtKind::Expression { expr } => self.visit(*expr),
            StmtKind::Block { body } => {
                for &stmt in body {
                    self.visit(stmt);
                }
            }
            StmtKind::VariableDecl { init } => {
                if self.b.result.locals.get(&offset.raw()).is_none() {
                    self.b.bind_local(offset);
                }
                if let Some(init) = init {
                    self.visit(*init);
                }
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.visit(*condition);
                self.visit(*then_branch);
                if let Some(else_branch) = else_branch {
                    self.visit(*else_branch);
                }
            }
            StmtKind::While { condition, body } => {
                self.visit(*condition);
                self.visit(*body);
            }
            StmtKind::ForIn {
                var_decl,
                iterable,
                body,
            } => {
                self.visit(*iterable);
                self.visit(*var_decl);
                self.for_in_depth += 1;
                self.max_for_in = self.max_for_in.max(self.for_in_depth);
                self.visit(*body);
                self.for_in_depth -= 1;
            }
            StmtKind::Labeled { body } => self.visit(*body),
            StmtKind::Switch { scrutinee, cases } => {
                self.has_switch = true;
                self.visit(*scrutinee);
                for case in cases {
                    for &expr in &case.exprs {
                        self.visit(expr);
                    }
                    self.visit(case.body);
                }
            }
            StmtKind::TryCatch { body, catches } => {
                self.try_depth += 1;
                self.max_try = self.max_try.max(self.try_depth);
                self.visit(*body);
                self.try_depth -= 1;
                self.catch_depth += 1;
                self.max_catch = self.max_catch.max(self.catch_depth);
                for clause in catches {
                    self.visit(clause.body);
                }
                self.catch_depth -= 1;
            }
            StmtKind::TryFinally { body, finalizer } => {
                self.has_finally = true;
                self.try_depth += 1;
                self.max_try = self.max_try.max(self.try_depth);
                self.visit(*body);
                self.try_depth -= 1;
                // The catch-all handler binds exception state one catch
                // level deeper.
                self.max_catch = self.max_catch.max(self.catch_depth + 1);
                self.visit(*finalizer);
            }
            StmtKind::Return { value } => {
                if let Some(value) = value {
                    self.visit(*value);
                }
            }
            StmtKind::Yield { value } => {
                self.has_yield = true;
                self.visit(*value);
            }
        }
    }

    fn visit_expr(&mut self, expr: &ExprKind) {
        match expr {
            ExprKind::Null
            | ExprKind::Bool(_)
            | ExprKind::Int(_)
            | ExprKind::Str(_)
            | ExprKind::This
            | ExprKind::VariableGet { .. }
            | ExprKind::Rethrow => {}
            ExprKind::VariableSet { value, .. } => self.visit(*value),
            ExprKind::PropertyGet { receiver, .. } => self.visit(*receiver),
            ExprKind::IndexGet { receiver, index } => {
                self.visit(*receiver);
                self.visit(*index);
            }
            ExprKind::IndexSet {
                receiver,
                index,
                value,
            } => {
                self.visit(*receiver);
                self.visit(*index);
                self.visit(*value);
            }
            ExprKind::PropertySet {
                receiver, value, ..
            } => {
                self.visit(*receiver);
                self.visit(*value);
            }
            ExprKind::StaticCall { args, .. } => {
                for &arg in args {
                    self.visit(arg);
                }
            }
            ExprKind::MethodCall { receiver, args, .. } => {
                self.visit(*receiver);
                for &arg in args {
                    self.visit(arg);
                }
            }
            ExprKind::New { args, .. } => {
                for &arg in args {
                    self.visit(arg);
                }
            }
            ExprKind::Equals { left, right, .. }
            | ExprKind::StrictEquals { left, right, .. } => {
                self.visit(*left);
                self.visit(*right);
            }
            ExprKind::Not { operand } => self.visit(*operand),
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                self.visit(*condition);
                self.visit(*then_expr);
                self.visit(*else_expr);
            }
            ExprKind::Throw { value } => self.visit(*value),
        }
    }
}
