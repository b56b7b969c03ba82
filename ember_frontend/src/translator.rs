//! The translator orchestrator.
//!
//! `FlowGraphTranslator` walks one function body by recursive structural
//! descent, opening and closing region trackers as it crosses constructs,
//! and assembles the finished graph: prologue, body, generator resume
//! dispatch, or a synthetic template body for the special member kinds.
//!
//! Error split: structurally inconsistent input aborts the function with
//! an [`EmberError`]; source-level errors are reported through the helper
//! and replaced by a throwing fragment so translation continues.

use crate::builder::GraphBuilder;
use crate::context::ActiveClass;
use crate::fragment::Fragment;
use crate::helper::Helper;
use crate::region::{
    resolve_switch_target, BreakableRegion, CatchRegion, FinallyRegion, SwitchRegion,
};
use crate::scope::ScopeBindings;
use ember_core::{EmberError, EmberResult, NameId, Pos};
use ember_ir::{CompareOp, FlowGraph, InstrId, Literal, LocalId, TryIndex};
use ember_tree::{
    CatchClause, ExprKind, FunctionTree, MemberKind, NodeOffset, StmtKind, SwitchCase, TreeReader,
};
use ember_ir::{ClassId, MemberId};
use smallvec::SmallVec;

/// One generator suspension point: where to resume, and which protected
/// region encloses the resumption.
#[derive(Debug, Clone, Copy)]
pub struct Continuation {
    /// The resume join entry.
    pub resume: InstrId,
    /// Protected region enclosing the suspension point.
    pub try_index: TryIndex,
}

/// Translator from one typed function tree to a [`FlowGraph`].
pub struct FlowGraphTranslator<'a, H: Helper> {
    reader: TreeReader<'a>,
    scopes: &'a ScopeBindings,
    helper: &'a mut H,
    builder: GraphBuilder,

    finally_stack: SmallVec<[FinallyRegion; 4]>,
    switch_stack: Vec<SwitchRegion>,
    breakable_stack: SmallVec<[BreakableRegion; 4]>,
    catch_stack: SmallVec<[CatchRegion; 2]>,

    try_depth: usize,
    catch_depth: usize,
    for_in_depth: usize,

    continuations: Vec<Continuation>,
    active_class: ActiveClass,
    class: Option<ClassId>,
    member: Option<MemberId>,
}

impl<'a, H: Helper> FlowGraphTranslator<'a, H> {
    /// Create a translator for one function.
    pub fn new(tree: &'a FunctionTree, scopes: &'a ScopeBindings, helper: &'a mut H) -> Self {
        Self {
            reader: TreeReader::new(tree),
            scopes,
            helper,
            builder: GraphBuilder::new(),
            finally_stack: SmallVec::new(),
            switch_stack: Vec::new(),
            breakable_stack: SmallVec::new(),
            catch_stack: SmallVec::new(),
            try_depth: 0,
            catch_depth: 0,
            for_in_depth: 0,
            continuations: Vec::new(),
            active_class: ActiveClass::new(),
            class: None,
            member: None,
        }
    }

    /// Set the enclosing class/member context for this translation.
    #[must_use]
    pub fn with_enclosing(mut self, class: Option<ClassId>, member: Option<MemberId>) -> Self {
        self.class = class;
        self.member = member;
        self
    }

    /// Translate the function, producing its finished flow graph.
    pub fn build_graph(mut self) -> EmberResult<FlowGraph> {
        let class_scope = self.active_class.enter_class(self.class);
        let member_scope = self.active_class.enter_member(self.member);
        let type_scope = self
            .active_class
            .enter_type_parameters(self.member, self.reader.tree().type_param_count as usize);
        let root = self.build_root();
        self.active_class.restore(type_scope);
        self.active_class.restore(member_scope);
        self.active_class.restore(class_scope);
        let root = root?;
        debug_assert_eq!(
            self.builder.stack_depth(),
            0,
            "evaluation stack not drained at end of translation"
        );
        Ok(self.builder.finish(root))
    }

    fn build_root(&mut self) -> EmberResult<InstrId> {
        match self.reader.tree().kind {
            MemberKind::MethodExtractor { method } => self.build_graph_of_method_extractor(method),
            MemberKind::NoSuchMethodDispatcher => self.build_graph_of_no_such_method_dispatcher(),
            MemberKind::InvokeFieldDispatcher { field } => {
                self.build_graph_of_invoke_field_dispatcher(field)
            }
            MemberKind::Regular | MemberKind::Getter | MemberKind::Setter => {
                self.build_graph_of_function()
            }
        }
    }

    fn cat(&mut self, a: Fragment, b: Fragment) -> Fragment {
        self.builder.concat(a, b)
    }

    fn lookup_variable(&self, offset: NodeOffset) -> EmberResult<LocalId> {
        self.scopes
            .local(offset)
            .ok_or_else(|| EmberError::missing_binding("local variable", offset.raw()))
    }

    // --- Graph assembly ---

    fn build_graph_of_function(&mut self) -> EmberResult<InstrId> {
        let tree = self.reader.tree();
        let body_offset = tree
            .body
            .ok_or_else(|| EmberError::malformed_tree("function has no body", 0))?;

        let graph_entry = self.builder.build_graph_entry();
        let normal_entry = self.builder.build_target_entry();

        let mut prologue = Fragment::single(normal_entry);
        let overflow = self.builder.check_stack_overflow(Pos::NONE);
        prologue = self.cat(prologue, overflow);
        let args = self.build_prologue()?;
        prologue = self.cat(prologue, args);

        let mut body = self.translate_stmt(body_offset)?;
        if body.is_open() {
            let null = self.builder.null_constant();
            body = self.cat(body, null);
            let ret = self.builder.ret(Pos::NONE);
            body = self.cat(body, ret);
        }

        let whole = if self.continuations.is_empty() {
            self.cat(prologue, body)
        } else {
            let dispatch = self.build_resume_dispatch(body)?;
            self.cat(prologue, dispatch)
        };
        debug_assert!(whole.is_closed(), "function body must end closed");

        let _ = self.cat(Fragment::single(graph_entry), Fragment::single(normal_entry));
        Ok(graph_entry)
    }

    /// Argument binding plus checked-mode argument assertions.
    fn build_prologue(&mut self) -> EmberResult<Fragment> {
        let tree = self.reader.tree();
        let mut frag = Fragment::empty();
        let mut index: u16 = 0;

        if tree.is_instance {
            let this_var = self
                .scopes
                .this_variable
                .ok_or_else(|| EmberError::missing_binding("receiver slot", 0))?;
            frag = self.bind_argument(frag, index, this_var);
            index += 1;
        }
        for &param in &tree.params {
            let slot = self.lookup_variable(param)?;
            frag = self.bind_argument(frag, index, slot);
            index += 1;
        }
        if tree.type_param_count > 0 {
            let slot = self
                .scopes
                .type_arguments_variable
                .ok_or_else(|| EmberError::missing_binding("type-argument slot", 0))?;
            frag = self.bind_argument(frag, index, slot);
        }

        if tree.checked_mode {
            for &param in &tree.params {
                let slot = self.lookup_variable(param)?;
                let pos = self.reader.pos(param);
                let load = self.builder.load_local(slot);
                frag = self.cat(frag, load);
                let check = self.builder.assert_assignable(pos, true);
                frag = self.cat(frag, check);
                let drop = self.builder.drop_value();
                frag = self.cat(frag, drop);
            }
        }
        Ok(frag)
    }

    fn bind_argument(&mut self, frag: Fragment, index: u16, slot: LocalId) -> Fragment {
        let param = self.builder.parameter(index);
        let frag = self.cat(frag, param);
        let store = self.builder.store_local(slot);
        let frag = self.cat(frag, store);
        let drop = self.builder.drop_value();
        self.cat(frag, drop)
    }

    /// Synthesize the resume dispatch: compare the resume-state temp
    /// against each continuation index; state 0 is the initial entry.
    fn build_resume_dispatch(&mut self, body: Fragment) -> EmberResult<Fragment> {
        let state_var = self
            .scopes
            .resume_state_variable
            .ok_or_else(|| EmberError::missing_binding("resume-state temp", 0))?;
        let body_join = self.builder.build_join_entry(TryIndex::INVALID);
        let _ = self.cat(Fragment::single(body_join), body);

        let mut dispatch = Fragment::empty();
        for index in 0..self.continuations.len() {
            let load = self.builder.load_local(state_var);
            dispatch = self.cat(dispatch, load);
            let state = self.builder.int_constant(index as i64 + 1);
            dispatch = self.cat(dispatch, state);
            let cmp = self.builder.compare(CompareOp::StrictEq);
            dispatch = self.cat(dispatch, cmp);
            let (branch, match_entry, next_entry) = self.builder.branch_if_true();
            dispatch = self.cat(dispatch, branch);
            let resume = self.continuations[index].resume;
            let jump = self.builder.goto_join(resume);
            let _ = self.cat(Fragment::single(match_entry), jump);
            dispatch = Fragment::spanning(
                dispatch.entry.expect("dispatch chain starts with a load"),
                Some(next_entry),
            );
        }
        let enter_body = self.builder.goto_join(body_join);
        Ok(self.cat(dispatch, enter_body))
    }

    // --- Synthetic member bodies ---

    fn build_graph_of_method_extractor(&mut self, method: NameId) -> EmberResult<InstrId> {
        let graph_entry = self.builder.build_graph_entry();
        let normal_entry = self.builder.build_target_entry();
        let mut frag = Fragment::single(normal_entry);

        match self.helper.lookup_method(method) {
            Some(target) => {
                let receiver = self.builder.parameter(0);
                frag = self.cat(frag, receiver);
                let closure = self.builder.allocate_closure(target);
                frag = self.cat(frag, closure);
                let ret = self.builder.ret(Pos::NONE);
                frag = self.cat(frag, ret);
            }
            None => {
                let name = self.reader.name(method).to_string();
                self.helper
                    .report_error(Pos::NONE, &format!("method '{name}' cannot be extracted"));
                let throw = self.builder.throw_no_such_method(Pos::NONE, method);
                frag = self.cat(frag, throw);
            }
        }
        let _ = self.cat(Fragment::single(graph_entry), Fragment::single(normal_entry));
        Ok(graph_entry)
    }

    fn build_graph_of_no_such_method_dispatcher(&mut self) -> EmberResult<InstrId> {
        let tree = self.reader.tree();
        let arg_count = tree.arg_count();
        let selector = tree.selectors.no_such_method;

        let graph_entry = self.builder.build_graph_entry();
        let normal_entry = self.builder.build_target_entry();
        let mut frag = Fragment::single(normal_entry);
        for index in 0..=arg_count {
            let param = self.builder.parameter(index);
            frag = self.cat(frag, param);
        }
        let call = self.builder.instance_call(Pos::NONE, selector, arg_count + 1);
        frag = self.cat(frag, call);
        let ret = self.builder.ret(Pos::NONE);
        frag = self.cat(frag, ret);

        let _ = self.cat(Fragment::single(graph_entry), Fragment::single(normal_entry));
        Ok(graph_entry)
    }

    fn build_graph_of_invoke_field_dispatcher(&mut self, field: NameId) -> EmberResult<InstrId> {
        let tree = self.reader.tree();
        let arg_count = tree.arg_count();

        let graph_entry = self.builder.build_graph_entry();
        let normal_entry = self.builder.build_target_entry();
        let mut frag = Fragment::single(normal_entry);

        let receiver = self.builder.parameter(0);
        frag = self.cat(frag, receiver);
        let load = match self.helper.lookup_field_offset(field) {
            Some(offset) => self.builder.load_field(offset),
            None => self.builder.instance_call(Pos::NONE, field, 1),
        };
        frag = self.cat(frag, load);
        for index in 1..=arg_count {
            let param = self.builder.parameter(index);
            frag = self.cat(frag, param);
        }
        let call = self.builder.closure_call(Pos::NONE, arg_count + 1);
        frag = self.cat(frag, call);
        let ret = self.builder.ret(Pos::NONE);
        frag = self.cat(frag, ret);

        let _ = self.cat(Fragment::single(graph_entry), Fragment::single(normal_entry));
        Ok(graph_entry)
    }

    // --- Statements ---

    fn translate_stmt(&mut self, offset: NodeOffset) -> EmberResult<Fragment> {
        let stmt = self.reader.stmt(offset)?;
        let pos = self.reader.pos(offset);
        match stmt {
            StmtKind::Empty => Ok(Fragment::empty()),
            StmtKind::Expression { expr } => {
                let mut frag = self.translate_expr(*expr)?;
                let drop = self.builder.drop_value();
                frag = self.cat(frag, drop);
                Ok(frag)
            }
            StmtKind::Block { body } => self.translate_block(offset, body),
            StmtKind::VariableDecl { init } => {
                let slot = self.lookup_variable(offset)?;
                let mut frag = match init {
                    Some(init) => self.translate_expr(*init)?,
                    None => self.builder.null_constant(),
                };
                let store = self.builder.store_local(slot);
                frag = self.cat(frag, store);
                let drop = self.builder.drop_value();
                Ok(self.cat(frag, drop))
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => self.translate_if(*condition, *then_branch, *else_branch),
            StmtKind::While { condition, body } => self.translate_while(pos, *condition, *body),
            StmtKind::ForIn {
                var_decl,
                iterable,
                body,
            } => self.translate_for_in(offset, pos, *var_decl, *iterable, *body),
            StmtKind::Labeled { body } => self.translate_labeled(*body),
            StmtKind::Break { label } => self.translate_break(offset, *label),
            StmtKind::Switch { scrutinee, cases } => {
                self.translate_switch(offset, *scrutinee, cases)
            }
            StmtKind::ContinueSwitch { target_case } => {
                self.translate_continue_switch(offset, *target_case)
            }
            StmtKind::TryCatch { body, catches } => {
                self.translate_try_catch(offset, *body, catches)
            }
            StmtKind::TryFinally { body, finalizer } => {
                self.translate_try_finally(offset, pos, *body, *finalizer)
            }
            StmtKind::Return { value } => self.translate_return(offset, pos, *value),
            StmtKind::Yield { value } => self.translate_yield(pos, *value),
        }
    }

    fn translate_block(&mut self, offset: NodeOffset, body: &[NodeOffset]) -> EmberResult<Fragment> {
        let context_slots = self
            .scopes
            .scope_info(offset)
            .map_or(0, |info| info.context_slots);
        let mut frag = if context_slots > 0 {
            self.builder.push_context(context_slots)
        } else {
            Fragment::empty()
        };
        for &stmt in body {
            let piece = self.translate_stmt(stmt)?;
            frag = self.cat(frag, piece);
        }
        if context_slots > 0 {
            if frag.is_open() {
                let pop = self.builder.pop_context();
                frag = self.cat(frag, pop);
            } else {
                // Control left through a non-local exit that already
                // unwound the context; only the counter needs fixing.
                let depth = self.builder.context_depth();
                self.builder.set_context_depth(depth - 1);
            }
        }
        Ok(frag)
    }

    fn translate_if(
        &mut self,
        condition: NodeOffset,
        then_branch: NodeOffset,
        else_branch: Option<NodeOffset>,
    ) -> EmberResult<Fragment> {
        let mut instructions = self.translate_expr(condition)?;
        let (branch, then_entry, otherwise_entry) = self.builder.branch_if_true();
        let condition_closed = instructions.is_closed();
        instructions = self.cat(instructions, branch);

        let then_body = self.translate_stmt(then_branch)?;
        let then_frag = self.cat(Fragment::single(then_entry), then_body);

        let otherwise_frag = match else_branch {
            Some(else_branch) => {
                let else_body = self.translate_stmt(else_branch)?;
                self.cat(Fragment::single(otherwise_entry), else_body)
            }
            None => Fragment::single(otherwise_entry),
        };

        if condition_closed {
            return Ok(instructions);
        }
        let entry = instructions.entry.expect("condition emits instructions");
        match (then_frag.is_open(), otherwise_frag.is_open()) {
            (true, true) => {
                let join = self.builder.build_join_entry(self.builder.current_try_index());
                let jump = self.builder.goto_join(join);
                let _ = self.cat(then_frag, jump);
                let jump = self.builder.goto_join(join);
                let _ = self.cat(otherwise_frag, jump);
                Ok(Fragment::spanning(entry, Some(join)))
            }
            (true, false) => Ok(Fragment::spanning(entry, then_frag.current)),
            (false, true) => Ok(Fragment::spanning(entry, otherwise_frag.current)),
            (false, false) => Ok(Fragment::spanning(entry, None)),
        }
    }

    fn translate_while(
        &mut self,
        pos: Pos,
        condition: NodeOffset,
        body: NodeOffset,
    ) -> EmberResult<Fragment> {
        let loop_join = self.builder.build_join_entry(self.builder.current_try_index());
        let mut head = Fragment::single(loop_join);
        let overflow = self.builder.check_stack_overflow(pos);
        head = self.cat(head, overflow);
        let cond = self.translate_expr(condition)?;
        head = self.cat(head, cond);
        let (branch, body_entry, exit_entry) = self.builder.branch_if_true();
        let _ = self.cat(head, branch);

        let body_frag = self.translate_stmt(body)?;
        let mut body_frag = self.cat(Fragment::single(body_entry), body_frag);
        if body_frag.is_open() {
            let back_edge = self.builder.goto_join(loop_join);
            body_frag = self.cat(body_frag, back_edge);
        }
        debug_assert!(body_frag.is_closed());

        let jump = self.builder.goto_join(loop_join);
        Ok(Fragment::spanning(
            jump.entry.expect("goto emits an instruction"),
            Some(exit_entry),
        ))
    }

    fn translate_for_in(
        &mut self,
        offset: NodeOffset,
        pos: Pos,
        var_decl: NodeOffset,
        iterable: NodeOffset,
        body: NodeOffset,
    ) -> EmberResult<Fragment> {
        let iterator_slot = self
            .scopes
            .iterator_variables
            .get(self.for_in_depth)
            .copied()
            .ok_or_else(|| EmberError::missing_binding("for-in iterator slot", offset.raw()))?;
        let selectors = self.reader.tree().selectors;
        let var_slot = self.lookup_variable(var_decl)?;

        let mut frag = self.translate_expr(iterable)?;
        let get_iterator = self.builder.instance_call(pos, selectors.iterator, 1);
        frag = self.cat(frag, get_iterator);
        let store = self.builder.store_local(iterator_slot);
        frag = self.cat(frag, store);
        let drop = self.builder.drop_value();
        frag = self.cat(frag, drop);

        let loop_join = self.builder.build_join_entry(self.builder.current_try_index());
        let mut head = Fragment::single(loop_join);
        let overflow = self.builder.check_stack_overflow(pos);
        head = self.cat(head, overflow);
        let load_iter = self.builder.load_local(iterator_slot);
        head = self.cat(head, load_iter);
        let advance = self.builder.instance_call(pos, selectors.move_next, 1);
        head = self.cat(head, advance);
        let (branch, body_entry, exit_entry) = self.builder.branch_if_true();
        let _ = self.cat(head, branch);

        let mut body_frag = Fragment::single(body_entry);
        let load_iter = self.builder.load_local(iterator_slot);
        body_frag = self.cat(body_frag, load_iter);
        let element = self.builder.instance_call(pos, selectors.current, 1);
        body_frag = self.cat(body_frag, element);
        let store = self.builder.store_local(var_slot);
        body_frag = self.cat(body_frag, store);
        let drop = self.builder.drop_value();
        body_frag = self.cat(body_frag, drop);

        self.for_in_depth += 1;
        let inner = self.translate_stmt(body);
        self.for_in_depth -= 1;
        body_frag = self.cat(body_frag, inner?);
        if body_frag.is_open() {
            let back_edge = self.builder.goto_join(loop_join);
            let _ = self.cat(body_frag, back_edge);
        }

        let jump = self.builder.goto_join(loop_join);
        frag = self.cat(frag, jump);
        Ok(Fragment::spanning(
            frag.entry.expect("iterable emits instructions"),
            Some(exit_entry),
        ))
    }

    fn translate_labeled(&mut self, body: NodeOffset) -> EmberResult<Fragment> {
        let region = BreakableRegion::new(
            self.builder.context_depth(),
            self.finally_stack.len(),
            self.builder.current_try_index(),
        );
        self.breakable_stack.push(region);
        let result = self.translate_stmt(body);
        let region = self
            .breakable_stack
            .pop()
            .expect("breakable region stack underflow");
        let mut instructions = result?;

        match region.destination {
            Some(join) => {
                if instructions.is_open() {
                    let jump = self.builder.goto_join(join);
                    instructions = self.cat(instructions, jump);
                }
                match instructions.entry {
                    Some(entry) => Ok(Fragment::spanning(entry, Some(join))),
                    None => Ok(Fragment::single(join)),
                }
            }
            None => Ok(instructions),
        }
    }

    fn translate_break(&mut self, offset: NodeOffset, label: u32) -> EmberResult<Fragment> {
        let index = label as usize;
        let region = *self.breakable_stack.get(index).ok_or_else(|| {
            EmberError::unresolved_target(format!("break label {label}"), offset.raw())
        })?;

        let join = match region.destination {
            Some(join) => join,
            None => {
                let join = self.builder.build_join_entry(region.try_index);
                self.breakable_stack[index].destination = Some(join);
                join
            }
        };

        let mut frag =
            self.translate_finally_finalizers(region.finally_depth, Some(region.context_depth))?;
        if frag.is_open() {
            let jump = self.builder.goto_join(join);
            frag = self.cat(frag, jump);
        }
        Ok(frag)
    }

    fn translate_switch(
        &mut self,
        offset: NodeOffset,
        scrutinee: NodeOffset,
        cases: &[SwitchCase],
    ) -> EmberResult<Fragment> {
        let region = SwitchRegion::new(
            cases.len(),
            self.switch_stack.last(),
            self.builder.context_depth(),
            self.finally_stack.len(),
            self.builder.current_try_index(),
        );
        self.switch_stack.push(region);
        let result = self.translate_switch_inner(offset, scrutinee, cases);
        self.switch_stack.pop();
        result
    }

    fn translate_switch_inner(
        &mut self,
        offset: NodeOffset,
        scrutinee: NodeOffset,
        cases: &[SwitchCase],
    ) -> EmberResult<Fragment> {
        let switch_var = self
            .scopes
            .switch_variable
            .ok_or_else(|| EmberError::missing_binding("switch dispatch temp", offset.raw()))?;
        let region_index = self.switch_stack.len() - 1;
        let outer_try_index = self.builder.current_try_index();

        let mut head = self.translate_expr(scrutinee)?;
        let store = self.builder.store_local(switch_var);
        head = self.cat(head, store);
        let drop = self.builder.drop_value();
        head = self.cat(head, drop);

        // Bodies first: jumps inside them materialize destinations the
        // dispatch chain below will reuse.
        let mut body_frags = Vec::with_capacity(cases.len());
        for case in cases {
            body_frags.push(self.translate_stmt(case.body)?);
        }

        let mut default_index = None;
        for (index, case) in cases.iter().enumerate() {
            if case.is_default {
                default_index = Some(index);
                continue;
            }
            for &expr in &case.exprs {
                let load = self.builder.load_local(switch_var);
                head = self.cat(head, load);
                let value = self.translate_expr(expr)?;
                head = self.cat(head, value);
                let cmp = self.builder.compare(CompareOp::Eq);
                head = self.cat(head, cmp);
                let (branch, match_entry, next_entry) = self.builder.branch_if_true();
                head = self.cat(head, branch);
                let join = self.ensure_switch_destination(region_index, index);
                let jump = self.builder.goto_join(join);
                let _ = self.cat(Fragment::single(match_entry), jump);
                head = Fragment::spanning(
                    head.entry.expect("dispatch head emits instructions"),
                    Some(next_entry),
                );
            }
        }
        if let Some(default_index) = default_index {
            let join = self.ensure_switch_destination(region_index, default_index);
            let jump = self.builder.goto_join(join);
            head = self.cat(head, jump);
        }

        let needs_exit = head.is_open() || body_frags.iter().any(|frag| frag.is_open());
        let exit_join = if needs_exit {
            Some(self.builder.build_join_entry(outer_try_index))
        } else {
            None
        };
        if head.is_open() {
            let join = exit_join.expect("exit join exists when the head is open");
            let jump = self.builder.goto_join(join);
            head = self.cat(head, jump);
        }

        for (index, body) in body_frags.into_iter().enumerate() {
            let join = self.ensure_switch_destination(region_index, index);
            let mut body = self.cat(Fragment::single(join), body);
            if body.is_open() {
                let join = exit_join.expect("exit join exists when a body is open");
                let jump = self.builder.goto_join(join);
                body = self.cat(body, jump);
            }
            debug_assert!(body.is_closed());
        }

        let entry = head.entry.expect("scrutinee emits instructions");
        match exit_join {
            Some(join) => Ok(Fragment::spanning(entry, Some(join))),
            None => Ok(Fragment::spanning(entry, None)),
        }
    }

    fn ensure_switch_destination(&mut self, region_index: usize, case_num: usize) -> InstrId {
        if let Some(join) = self.switch_stack[region_index].destination(case_num) {
            return join;
        }
        let try_index = self.switch_stack[region_index].try_index;
        let join = self.builder.build_join_entry(try_index);
        self.switch_stack[region_index].record_destination(case_num, join);
        join
    }

    fn translate_continue_switch(
        &mut self,
        offset: NodeOffset,
        target_case: u32,
    ) -> EmberResult<Fragment> {
        let (region_index, relative) =
            resolve_switch_target(&self.switch_stack, target_case as usize).ok_or_else(|| {
                EmberError::unresolved_target(
                    format!("switch case {target_case}"),
                    offset.raw(),
                )
            })?;
        let finally_depth = self.switch_stack[region_index].finally_depth;
        let context_depth = self.switch_stack[region_index].context_depth;
        let join = self.ensure_switch_destination(region_index, relative);

        let mut frag = self.translate_finally_finalizers(finally_depth, Some(context_depth))?;
        if frag.is_open() {
            let jump = self.builder.goto_join(join);
            frag = self.cat(frag, jump);
        }
        Ok(frag)
    }

    // --- Exception constructs ---

    fn translate_try_catch(
        &mut self,
        offset: NodeOffset,
        body: NodeOffset,
        catches: &[CatchClause],
    ) -> EmberResult<Fragment> {
        let try_index = self.builder.allocate_try_index();
        let after = self.builder.build_join_entry(self.builder.current_try_index());
        let context_slot = self.save_try_context(offset)?;

        let mut frag = self.builder.load_context();
        let store = self.builder.store_local(context_slot);
        frag = self.cat(frag, store);
        let drop = self.builder.drop_value();
        frag = self.cat(frag, drop);

        self.try_depth += 1;
        self.builder.push_try_catch(try_index);
        let body_result = self.translate_stmt(body);
        self.builder.pop_try_catch();
        self.try_depth -= 1;
        let mut body_frag = body_result?;
        if body_frag.is_open() {
            let jump = self.builder.goto_join(after);
            body_frag = self.cat(body_frag, jump);
        }
        frag = self.cat(frag, body_frag);

        self.catch_depth += 1;
        let handlers = self.translate_catch_clauses(offset, catches, try_index, context_slot, after);
        self.catch_depth -= 1;
        handlers?;

        Ok(Fragment::spanning(
            frag.entry.expect("context save emits instructions"),
            Some(after),
        ))
    }

    fn translate_catch_clauses(
        &mut self,
        offset: NodeOffset,
        catches: &[CatchClause],
        try_index: TryIndex,
        context_slot: LocalId,
        after: InstrId,
    ) -> EmberResult<()> {
        let (exception_var, stack_trace_var) = self.handler_variables(offset)?;
        for clause in catches {
            let entry = self.builder.build_catch_entry(try_index, clause.needs_stacktrace);
            let mut handler = self.bind_caught_exception(
                entry,
                exception_var,
                stack_trace_var,
                context_slot,
            );

            self.catch_stack.push(CatchRegion {
                exception_var,
                stack_trace_var,
                catch_try_index: try_index,
            });
            let body = self.translate_stmt(clause.body);
            self.catch_stack.pop();
            handler = self.cat(handler, body?);

            if handler.is_open() {
                let jump = self.builder.goto_join(after);
                let _ = self.cat(handler, jump);
            }
        }
        Ok(())
    }

    fn translate_try_finally(
        &mut self,
        offset: NodeOffset,
        pos: Pos,
        body: NodeOffset,
        finalizer: NodeOffset,
    ) -> EmberResult<Fragment> {
        let try_index = self.builder.allocate_try_index();
        let context_slot = self.save_try_context(offset)?;

        let mut frag = self.builder.load_context();
        let store = self.builder.store_local(context_slot);
        frag = self.cat(frag, store);
        let drop = self.builder.drop_value();
        frag = self.cat(frag, drop);

        // The finally region records the state outside the new protected
        // region: non-local exits from the body resolve against it.
        self.finally_stack.push(FinallyRegion {
            finalizer,
            context_depth: self.builder.context_depth(),
            try_depth: self.try_depth,
            try_index: self.builder.current_try_index(),
        });
        self.try_depth += 1;
        self.builder.push_try_catch(try_index);
        let body_result = self.translate_stmt(body);
        self.builder.pop_try_catch();
        self.try_depth -= 1;
        self.finally_stack.pop();
        let mut body_frag = body_result?;

        // Normal completion runs the finalizer once, inline.
        if body_frag.is_open() {
            let fin = self.translate_stmt(finalizer)?;
            body_frag = self.cat(body_frag, fin);
        }
        frag = self.cat(frag, body_frag);

        // Catch-all unwind path: finalizer, then re-raise.
        self.catch_depth += 1;
        let handler = self.translate_finally_handler(offset, pos, finalizer, try_index, context_slot);
        self.catch_depth -= 1;
        handler?;

        Ok(frag)
    }

    fn translate_finally_handler(
        &mut self,
        offset: NodeOffset,
        pos: Pos,
        finalizer: NodeOffset,
        try_index: TryIndex,
        context_slot: LocalId,
    ) -> EmberResult<()> {
        let (exception_var, stack_trace_var) = self.handler_variables(offset)?;
        let entry = self.builder.build_catch_entry(try_index, true);
        let mut handler =
            self.bind_caught_exception(entry, exception_var, stack_trace_var, context_slot);

        let fin = self.translate_stmt(finalizer)?;
        handler = self.cat(handler, fin);
        if handler.is_open() {
            let load = self.builder.load_local(exception_var);
            handler = self.cat(handler, load);
            let load = self.builder.load_local(stack_trace_var);
            handler = self.cat(handler, load);
            let rethrow = self.builder.rethrow(pos, try_index);
            let _ = self.cat(handler, rethrow);
        }
        Ok(())
    }

    fn handler_variables(&self, offset: NodeOffset) -> EmberResult<(LocalId, LocalId)> {
        let exception_var = self
            .scopes
            .exception_variables
            .get(self.catch_depth - 1)
            .copied()
            .ok_or_else(|| EmberError::missing_binding("exception slot", offset.raw()))?;
        let stack_trace_var = self
            .scopes
            .stack_trace_variables
            .get(self.catch_depth - 1)
            .copied()
            .ok_or_else(|| EmberError::missing_binding("stack-trace slot", offset.raw()))?;
        Ok((exception_var, stack_trace_var))
    }

    fn save_try_context(&self, offset: NodeOffset) -> EmberResult<LocalId> {
        self.scopes
            .catch_context_variables
            .get(self.try_depth)
            .copied()
            .ok_or_else(|| EmberError::missing_binding("saved-context slot", offset.raw()))
    }

    /// Handler prologue: bind the caught pair and restore the context that
    /// was live at try entry.
    fn bind_caught_exception(
        &mut self,
        entry: InstrId,
        exception_var: LocalId,
        stack_trace_var: LocalId,
        context_slot: LocalId,
    ) -> Fragment {
        let mut handler = Fragment::single(entry);
        let store = self.builder.store_local(stack_trace_var);
        handler = self.cat(handler, store);
        let drop = self.builder.drop_value();
        handler = self.cat(handler, drop);
        let store = self.builder.store_local(exception_var);
        handler = self.cat(handler, store);
        let drop = self.builder.drop_value();
        handler = self.cat(handler, drop);
        let load = self.builder.load_local(context_slot);
        handler = self.cat(handler, load);
        let restore = self.builder.store_context();
        self.cat(handler, restore)
    }

    // --- Non-local exits ---

    fn translate_return(
        &mut self,
        offset: NodeOffset,
        pos: Pos,
        value: Option<NodeOffset>,
    ) -> EmberResult<Fragment> {
        let mut frag = match value {
            Some(value) => self.translate_expr(value)?,
            None => self.builder.null_constant(),
        };
        if self.finally_stack.is_empty() {
            let ret = self.builder.ret(pos);
            return Ok(self.cat(frag, ret));
        }

        let temp = self
            .scopes
            .finally_return_variable
            .ok_or_else(|| EmberError::missing_binding("finally-return temp", offset.raw()))?;
        let store = self.builder.store_local(temp);
        frag = self.cat(frag, store);
        let drop = self.builder.drop_value();
        frag = self.cat(frag, drop);

        let finalizers = self.translate_finally_finalizers(0, None)?;
        frag = self.cat(frag, finalizers);
        if frag.is_open() {
            let load = self.builder.load_local(temp);
            frag = self.cat(frag, load);
            let ret = self.builder.ret(pos);
            frag = self.cat(frag, ret);
        }
        Ok(frag)
    }

    /// Re-emit the finalizer of every finally region between the current
    /// point and `target_depth`, innermost first, restoring context depth
    /// to each region's recorded depth on the way out.
    fn translate_finally_finalizers(
        &mut self,
        target_depth: usize,
        target_context_depth: Option<usize>,
    ) -> EmberResult<Fragment> {
        let saved_finally = self.finally_stack.clone();
        let saved_try_catch = self.builder.save_try_catch_stack();
        let saved_context_depth = self.builder.context_depth();
        let saved_try_depth = self.try_depth;

        let result = self.translate_finally_finalizers_inner(target_depth, target_context_depth);

        self.finally_stack = saved_finally;
        self.builder.restore_try_catch_stack(saved_try_catch);
        self.builder.set_context_depth(saved_context_depth);
        self.try_depth = saved_try_depth;
        result
    }

    fn translate_finally_finalizers_inner(
        &mut self,
        target_depth: usize,
        target_context_depth: Option<usize>,
    ) -> EmberResult<Fragment> {
        let mut instructions = Fragment::empty();
        while self.finally_stack.len() > target_depth {
            let region = self.finally_stack.pop().expect("checked non-empty");
            let adjust = self.builder.adjust_context_to(region.context_depth);
            instructions = self.cat(instructions, adjust);
            self.try_depth = region.try_depth;
            self.builder.truncate_try_catch_to(region.try_index);
            let finalizer = self.translate_stmt(region.finalizer)?;
            instructions = self.cat(instructions, finalizer);
            if instructions.is_closed() {
                // The finalizer itself left non-locally; anything further
                // out is its responsibility.
                return Ok(instructions);
            }
        }
        if let Some(depth) = target_context_depth {
            let adjust = self.builder.adjust_context_to(depth);
            instructions = self.cat(instructions, adjust);
        }
        Ok(instructions)
    }

    fn translate_yield(&mut self, pos: Pos, value: NodeOffset) -> EmberResult<Fragment> {
        let state_var = self
            .scopes
            .resume_state_variable
            .ok_or_else(|| EmberError::missing_binding("resume-state temp", value.raw()))?;
        let context_var = self
            .scopes
            .resume_context_variable
            .ok_or_else(|| EmberError::missing_binding("resume-context temp", value.raw()))?;

        let index = self.continuations.len();
        let mut frag = self.translate_expr(value)?;
        let state = self.builder.int_constant(index as i64 + 1);
        frag = self.cat(frag, state);
        let store = self.builder.store_local(state_var);
        frag = self.cat(frag, store);
        let drop = self.builder.drop_value();
        frag = self.cat(frag, drop);
        let save_context = self.builder.load_context();
        frag = self.cat(frag, save_context);
        let store = self.builder.store_local(context_var);
        frag = self.cat(frag, store);
        let drop = self.builder.drop_value();
        frag = self.cat(frag, drop);
        let suspend = self.builder.suspend(pos);
        frag = self.cat(frag, suspend);

        let try_index = self.builder.current_try_index();
        let resume = self.builder.build_join_entry(try_index);
        self.continuations.push(Continuation { resume, try_index });

        let mut resumed = Fragment::spanning(
            frag.entry.expect("yield emits instructions"),
            Some(resume),
        );
        let load = self.builder.load_local(context_var);
        resumed = self.cat(resumed, load);
        let restore = self.builder.store_context();
        Ok(self.cat(resumed, restore))
    }

    // --- Expressions ---

    fn translate_expr(&mut self, offset: NodeOffset) -> EmberResult<Fragment> {
        let expr = self.reader.expr(offset)?;
        let pos = self.reader.pos(offset);
        match expr {
            ExprKind::Null => Ok(self.emit_literal(Literal::Null)),
            ExprKind::Bool(value) => Ok(self.emit_literal(Literal::Bool(*value))),
            ExprKind::Int(value) => Ok(self.emit_literal(Literal::Int(*value))),
            ExprKind::Str(value) => Ok(self.emit_literal(Literal::Str(value.clone()))),
            ExprKind::This => {
                let slot = self.scopes.this_variable.ok_or_else(|| {
                    EmberError::malformed_tree("receiver used outside an instance member", offset.raw())
                })?;
                Ok(self.builder.load_local(slot))
            }
            ExprKind::VariableGet { decl } => {
                let slot = self.lookup_variable(*decl)?;
                Ok(self.builder.load_local(slot))
            }
            ExprKind::VariableSet { decl, value } => {
                let slot = self.lookup_variable(*decl)?;
                let frag = self.translate_expr(*value)?;
                let store = self.builder.store_local(slot);
                Ok(self.cat(frag, store))
            }
            ExprKind::PropertyGet { receiver, name } => {
                let frag = self.translate_expr(*receiver)?;
                let call = self.builder.instance_call(pos, *name, 1);
                Ok(self.cat(frag, call))
            }
            ExprKind::IndexGet { receiver, index } => {
                let mut frag = self.translate_expr(*receiver)?;
                let index = self.translate_expr(*index)?;
                frag = self.cat(frag, index);
                let load = self.builder.load_indexed(1);
                Ok(self.cat(frag, load))
            }
            ExprKind::IndexSet {
                receiver,
                index,
                value,
            } => {
                let mut frag = self.translate_expr(*receiver)?;
                let index = self.translate_expr(*index)?;
                frag = self.cat(frag, index);
                let value = self.translate_expr(*value)?;
                frag = self.cat(frag, value);
                let store = self.builder.store_indexed(1);
                Ok(self.cat(frag, store))
            }
            ExprKind::PropertySet {
                receiver,
                name,
                value,
            } => {
                let mut frag = self.translate_expr(*receiver)?;
                let value = self.translate_expr(*value)?;
                frag = self.cat(frag, value);
                let call = self.builder.instance_call(pos, *name, 2);
                Ok(self.cat(frag, call))
            }
            ExprKind::StaticCall { name, args } => self.translate_static_call(pos, *name, args),
            ExprKind::MethodCall {
                receiver,
                name,
                args,
            } => {
                let mut frag = self.translate_expr(*receiver)?;
                for &arg in args {
                    let arg = self.translate_expr(arg)?;
                    frag = self.cat(frag, arg);
                }
                let call = self.builder.instance_call(pos, *name, args.len() as u16 + 1);
                Ok(self.cat(frag, call))
            }
            ExprKind::New { class, args } => self.translate_new(pos, *class, args),
            ExprKind::Equals {
                left,
                right,
                negated,
            } => {
                let op = if *negated { CompareOp::Neq } else { CompareOp::Eq };
                self.translate_comparison(*left, *right, op)
            }
            ExprKind::StrictEquals {
                left,
                right,
                negated,
            } => {
                let op = if *negated {
                    CompareOp::StrictNeq
                } else {
                    CompareOp::StrictEq
                };
                self.translate_comparison(*left, *right, op)
            }
            ExprKind::Not { operand } => {
                let mut frag = self.translate_expr(*operand)?;
                if self.reader.tree().checked_mode {
                    let check = self.builder.assert_boolean(pos);
                    frag = self.cat(frag, check);
                }
                let negate = self.builder.boolean_negate();
                Ok(self.cat(frag, negate))
            }
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => self.translate_conditional(offset, *condition, *then_expr, *else_expr),
            ExprKind::Throw { value } => {
                let frag = self.translate_expr(*value)?;
                let throw = self.builder.throw_exception(pos);
                let frag = self.cat(frag, throw);
                Ok(self.push_dead_value(frag))
            }
            ExprKind::Rethrow => self.translate_rethrow(offset, pos),
        }
    }

    fn emit_literal(&mut self, literal: Literal) -> Fragment {
        let canonical = self.helper.canonicalize(literal);
        self.builder.constant(canonical)
    }

    /// Keep the evaluation stack balanced past a closed expression: the
    /// enclosing expression still expects a pending value, so materialize
    /// one that the closed fragment absorbs as dead code.
    fn push_dead_value(&mut self, frag: Fragment) -> Fragment {
        debug_assert!(frag.is_closed());
        let dummy = self.builder.null_constant();
        self.cat(frag, dummy)
    }

    fn translate_comparison(
        &mut self,
        left: NodeOffset,
        right: NodeOffset,
        op: CompareOp,
    ) -> EmberResult<Fragment> {
        let mut frag = self.translate_expr(left)?;
        let right = self.translate_expr(right)?;
        frag = self.cat(frag, right);
        let cmp = self.builder.compare(op);
        Ok(self.cat(frag, cmp))
    }

    fn translate_static_call(
        &mut self,
        pos: Pos,
        name: NameId,
        args: &[NodeOffset],
    ) -> EmberResult<Fragment> {
        let mut frag = Fragment::empty();
        for &arg in args {
            let arg = self.translate_expr(arg)?;
            frag = self.cat(frag, arg);
        }
        match self.helper.lookup_static_member(name) {
            Some(target) => {
                let call = self.builder.static_call(pos, target, args.len() as u16);
                Ok(self.cat(frag, call))
            }
            None => {
                let message = format!("method '{}' not found", self.reader.name(name));
                self.helper.report_error(pos, &message);
                for _ in args {
                    let drop = self.builder.drop_value();
                    frag = self.cat(frag, drop);
                }
                let throw = self.builder.throw_no_such_method(pos, name);
                frag = self.cat(frag, throw);
                Ok(self.push_dead_value(frag))
            }
        }
    }

    fn translate_new(
        &mut self,
        pos: Pos,
        class: NameId,
        args: &[NodeOffset],
    ) -> EmberResult<Fragment> {
        let Some(class_id) = self.helper.lookup_class(class) else {
            let message = format!("class '{}' not found", self.reader.name(class));
            self.helper.report_error(pos, &message);
            let mut frag = Fragment::empty();
            for &arg in args {
                let arg = self.translate_expr(arg)?;
                frag = self.cat(frag, arg);
            }
            for _ in args {
                let drop = self.builder.drop_value();
                frag = self.cat(frag, drop);
            }
            let throw = self.builder.throw_no_such_method(pos, class);
            frag = self.cat(frag, throw);
            return Ok(self.push_dead_value(frag));
        };

        let mut frag = self.builder.allocate_object(pos, class_id);
        for &arg in args {
            let arg = self.translate_expr(arg)?;
            frag = self.cat(frag, arg);
        }
        match self.helper.lookup_constructor(class_id) {
            Some(ctor) => {
                let call = self.builder.static_call(pos, ctor, args.len() as u16 + 1);
                Ok(self.cat(frag, call))
            }
            None => {
                let message = format!("class '{}' has no constructor", self.reader.name(class));
                self.helper.report_error(pos, &message);
                for _ in 0..=args.len() {
                    let drop = self.builder.drop_value();
                    frag = self.cat(frag, drop);
                }
                let throw = self.builder.throw_no_such_method(pos, class);
                frag = self.cat(frag, throw);
                Ok(self.push_dead_value(frag))
            }
        }
    }

    fn translate_conditional(
        &mut self,
        offset: NodeOffset,
        condition: NodeOffset,
        then_expr: NodeOffset,
        else_expr: NodeOffset,
    ) -> EmberResult<Fragment> {
        let temp = self
            .scopes
            .expression_temp
            .ok_or_else(|| EmberError::missing_binding("expression temp", offset.raw()))?;

        let mut instructions = self.translate_expr(condition)?;
        let (branch, then_entry, otherwise_entry) = self.builder.branch_if_true();
        let condition_closed = instructions.is_closed();
        instructions = self.cat(instructions, branch);

        let mut then_frag = Fragment::single(then_entry);
        let value = self.translate_expr(then_expr)?;
        then_frag = self.cat(then_frag, value);
        let store = self.builder.store_local(temp);
        then_frag = self.cat(then_frag, store);
        let drop = self.builder.drop_value();
        then_frag = self.cat(then_frag, drop);

        let mut otherwise_frag = Fragment::single(otherwise_entry);
        let value = self.translate_expr(else_expr)?;
        otherwise_frag = self.cat(otherwise_frag, value);
        let store = self.builder.store_local(temp);
        otherwise_frag = self.cat(otherwise_frag, store);
        let drop = self.builder.drop_value();
        otherwise_frag = self.cat(otherwise_frag, drop);

        if condition_closed {
            return Ok(self.push_dead_value(instructions));
        }
        let entry = instructions.entry.expect("condition emits instructions");
        if then_frag.is_closed() && otherwise_frag.is_closed() {
            return Ok(self.push_dead_value(Fragment::spanning(entry, None)));
        }

        let join = self.builder.build_join_entry(self.builder.current_try_index());
        if then_frag.is_open() {
            let jump = self.builder.goto_join(join);
            let _ = self.cat(then_frag, jump);
        }
        if otherwise_frag.is_open() {
            let jump = self.builder.goto_join(join);
            let _ = self.cat(otherwise_frag, jump);
        }
        let mut frag = Fragment::spanning(entry, Some(join));
        let load = self.builder.load_local(temp);
        frag = self.cat(frag, load);
        Ok(frag)
    }

    fn translate_rethrow(&mut self, offset: NodeOffset, pos: Pos) -> EmberResult<Fragment> {
        let region = self.catch_stack.last().copied().ok_or_else(|| {
            EmberError::malformed_tree("rethrow outside a catch clause", offset.raw())
        })?;
        let mut frag = self.builder.load_local(region.exception_var);
        let load = self.builder.load_local(region.stack_trace_var);
        frag = self.cat(frag, load);
        let rethrow = self.builder.rethrow(pos, region.catch_try_index);
        frag = self.cat(frag, rethrow);
        Ok(self.push_dead_value(frag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::TableHelper;
    use ember_ir::Instr;
    use ember_tree::TreeBuilder;

    fn translate(tree: &FunctionTree) -> EmberResult<FlowGraph> {
        let scopes = ScopeBindings::compute(tree);
        let mut helper = TableHelper::new();
        FlowGraphTranslator::new(tree, &scopes, &mut helper).build_graph()
    }

    #[test]
    fn test_translate_simple_return_is_ok() {
        let mut t = TreeBuilder::new("f");
        let value = t.int(42, 0);
        let body = t.ret(Some(value), 1);
        let tree = t.finish_with_body(body);

        let graph = translate(&tree).expect("translation should succeed");
        assert!(graph.entry().is_some());
        assert!(graph
            .iter()
            .any(|(_, node)| matches!(node.instr, Instr::Return { .. })));
    }

    #[test]
    fn test_translate_rejects_missing_body() {
        let t = TreeBuilder::new("f");
        let tree = t.finish(MemberKind::Regular, None);
        let err = translate(&tree).unwrap_err();
        assert!(err.to_string().contains("no body"));
    }

    #[test]
    fn test_translate_rejects_unresolved_break() {
        let mut t = TreeBuilder::new("f");
        let body = t.brk(4, 0);
        let tree = t.finish_with_body(body);
        let err = translate(&tree).unwrap_err();
        assert!(err.to_string().contains("unresolved jump target"));
        assert!(err.to_string().contains("break label 4"));
    }

    #[test]
    fn test_translate_rejects_goto_case_outside_switch() {
        let mut t = TreeBuilder::new("f");
        let body = t.continue_switch(0, 0);
        let tree = t.finish_with_body(body);
        let err = translate(&tree).unwrap_err();
        assert!(err.to_string().contains("unresolved jump target"));
    }

    #[test]
    fn test_translate_rejects_rethrow_outside_catch() {
        let mut t = TreeBuilder::new("f");
        let re = t.rethrow(0);
        let body = t.expr_stmt(re, 1);
        let tree = t.finish_with_body(body);
        let err = translate(&tree).unwrap_err();
        assert!(err.to_string().contains("rethrow outside a catch clause"));
    }

    #[test]
    fn test_implicit_return_closes_open_body() {
        let mut t = TreeBuilder::new("f");
        let body = t.empty(0);
        let tree = t.finish_with_body(body);

        let graph = translate(&tree).expect("translation should succeed");
        let returns = graph
            .iter()
            .filter(|(_, node)| matches!(node.instr, Instr::Return { .. }))
            .count();
        assert_eq!(returns, 1);
    }

    #[test]
    fn test_instance_function_binds_receiver() {
        let mut t = TreeBuilder::new("m");
        t.instance();
        let this = t.this(0);
        let body = t.ret(Some(this), 1);
        let tree = t.finish_with_body(body);

        let graph = translate(&tree).expect("translation should succeed");
        assert!(graph
            .iter()
            .any(|(_, node)| matches!(node.instr, Instr::Parameter { index: 0 })));
    }

    #[test]
    fn test_this_outside_instance_member_is_malformed() {
        let mut t = TreeBuilder::new("f");
        let this = t.this(0);
        let body = t.ret(Some(this), 1);
        let tree = t.finish_with_body(body);
        let err = translate(&tree).unwrap_err();
        assert!(err.to_string().contains("receiver"));
    }
}
