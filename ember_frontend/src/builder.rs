//! Construct-agnostic graph emission primitives.
//!
//! `GraphBuilder` owns the [`FlowGraph`] under construction plus every
//! per-translation counter: block ids, try indices, the evaluation stack
//! of pending values, and the captured-context depth. Higher-level
//! translation composes these primitives; nothing here knows about any
//! specific control construct.
//!
//! The evaluation stack tracks which instruction produced each pending
//! value. Instructions are stack-shaped, so the stack here exists to pass
//! intermediate results between sub-fragments without naming every
//! temporary; imbalance is a translator defect and asserts.

use crate::fragment::{emit, Fragment};
use crate::region::TryCatchRegion;
use ember_core::{NameId, Pos};
use ember_ir::{
    ClassId, CompareOp, FlowGraph, Instr, InstrId, Literal, LocalId, MemberId, TryIndex,
};
use smallvec::SmallVec;

/// Saved copy of the protected-region stack, for unwind re-emission.
pub type SavedTryCatchStack = SmallVec<[TryCatchRegion; 4]>;

/// The base flow-graph builder.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: FlowGraph,
    next_block_id: u32,
    next_try_index: i32,
    try_catch_stack: SmallVec<[TryCatchRegion; 4]>,
    stack: SmallVec<[InstrId; 8]>,
    context_depth: usize,
}

impl GraphBuilder {
    /// Create a builder with fresh counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The graph under construction.
    #[must_use]
    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    /// Finish construction, designating the graph's root entry.
    #[must_use]
    pub fn finish(mut self, entry: InstrId) -> FlowGraph {
        self.graph.set_entry(entry);
        self.graph
    }

    /// Concatenate two fragments within this builder's graph.
    #[must_use]
    pub fn concat(&mut self, a: Fragment, b: Fragment) -> Fragment {
        a.concat(&mut self.graph, b)
    }

    // --- Counters and region bookkeeping ---

    /// Allocate the next basic-block id.
    pub fn allocate_block_id(&mut self) -> u32 {
        let id = self.next_block_id;
        self.next_block_id += 1;
        id
    }

    /// Allocate the next try-index.
    pub fn allocate_try_index(&mut self) -> TryIndex {
        let index = TryIndex::new(self.next_try_index);
        self.next_try_index += 1;
        index
    }

    /// The innermost live exception-protected region, if any.
    #[must_use]
    pub fn current_try_index(&self) -> TryIndex {
        self.try_catch_stack
            .last()
            .map_or(TryIndex::INVALID, |region| region.try_index)
    }

    /// Enter an exception-protected region.
    pub fn push_try_catch(&mut self, try_index: TryIndex) {
        self.try_catch_stack.push(TryCatchRegion { try_index });
    }

    /// Leave the innermost exception-protected region.
    pub fn pop_try_catch(&mut self) {
        assert!(
            self.try_catch_stack.pop().is_some(),
            "try-catch region stack underflow"
        );
    }

    /// Snapshot the protected-region stack before finalizer re-emission.
    #[must_use]
    pub fn save_try_catch_stack(&self) -> SavedTryCatchStack {
        self.try_catch_stack.clone()
    }

    /// Restore a snapshot taken with [`Self::save_try_catch_stack`].
    pub fn restore_try_catch_stack(&mut self, saved: SavedTryCatchStack) {
        self.try_catch_stack = saved;
    }

    /// Pop protected regions until the innermost matches `target`.
    ///
    /// Used while re-emitting finalizers, which execute under the regions
    /// that were live when their finally region opened.
    pub fn truncate_try_catch_to(&mut self, target: TryIndex) {
        while self.current_try_index() != target {
            assert!(
                !self.try_catch_stack.is_empty(),
                "cannot unwind protected regions to {target}"
            );
            self.try_catch_stack.pop();
        }
    }

    /// The current captured-context nesting depth.
    #[must_use]
    pub fn context_depth(&self) -> usize {
        self.context_depth
    }

    /// Reset the context-depth counter after finalizer re-emission.
    pub fn set_context_depth(&mut self, depth: usize) {
        self.context_depth = depth;
    }

    // --- Evaluation stack ---

    fn push(&mut self, id: InstrId) {
        self.stack.push(id);
    }

    fn pop(&mut self) -> InstrId {
        self.stack.pop().expect("evaluation stack underflow")
    }

    /// Number of pending values on the evaluation stack.
    #[must_use]
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    // --- Block entries ---

    /// Build the unique root entry of the function's graph.
    pub fn build_graph_entry(&mut self) -> InstrId {
        let block_id = self.allocate_block_id();
        self.graph.add(Instr::GraphEntry {
            block_id: ember_ir::BlockId::new(block_id),
        })
    }

    /// Build a single-predecessor entry under the current try-index.
    pub fn build_target_entry(&mut self) -> InstrId {
        let block_id = self.allocate_block_id();
        let try_index = self.current_try_index();
        self.graph.add(Instr::TargetEntry {
            block_id: ember_ir::BlockId::new(block_id),
            try_index,
        })
    }

    /// Build a join entry tagged with the given try-index.
    pub fn build_join_entry(&mut self, try_index: TryIndex) -> InstrId {
        let block_id = self.allocate_block_id();
        self.graph.add(Instr::JoinEntry {
            block_id: ember_ir::BlockId::new(block_id),
            try_index,
        })
    }

    /// Build a catch-handler entry guarding `guarded_try_index`.
    ///
    /// At runtime the handler receives the exception and stack-trace
    /// objects; both become pending values for the handler prologue to
    /// store into their per-depth locals.
    pub fn build_catch_entry(&mut self, guarded_try_index: TryIndex, needs_stacktrace: bool) -> InstrId {
        let block_id = self.allocate_block_id();
        let entry = self.graph.add(Instr::CatchEntry {
            block_id: ember_ir::BlockId::new(block_id),
            guarded_try_index,
            needs_stacktrace,
        });
        self.graph.add_catch_entry(entry);
        self.push(entry);
        self.push(entry);
        entry
    }

    // --- Values ---

    /// Materialize a canonicalized literal.
    pub fn constant(&mut self, literal: Literal) -> Fragment {
        let frag = emit(&mut self.graph, Instr::Constant(literal));
        self.push(frag.entry.unwrap());
        frag
    }

    /// Materialize an integer constant.
    pub fn int_constant(&mut self, value: i64) -> Fragment {
        self.constant(Literal::Int(value))
    }

    /// Materialize the null constant.
    pub fn null_constant(&mut self) -> Fragment {
        self.constant(Literal::Null)
    }

    /// Bind the caller-supplied argument at `index`.
    pub fn parameter(&mut self, index: u16) -> Fragment {
        let frag = emit(&mut self.graph, Instr::Parameter { index });
        self.push(frag.entry.unwrap());
        frag
    }

    /// Load a local slot.
    pub fn load_local(&mut self, local: LocalId) -> Fragment {
        let frag = emit(&mut self.graph, Instr::LoadLocal(local));
        self.push(frag.entry.unwrap());
        frag
    }

    /// Store the pending value into a local slot; the value stays pending.
    pub fn store_local(&mut self, local: LocalId) -> Fragment {
        self.pop();
        let frag = emit(&mut self.graph, Instr::StoreLocal(local));
        self.push(frag.entry.unwrap());
        frag
    }

    /// Discard the pending value.
    pub fn drop_value(&mut self) -> Fragment {
        self.pop();
        emit(&mut self.graph, Instr::Drop)
    }

    /// Load a field of the pending receiver.
    pub fn load_field(&mut self, offset: u32) -> Fragment {
        self.pop();
        let frag = emit(&mut self.graph, Instr::LoadField { offset });
        self.push(frag.entry.unwrap());
        frag
    }

    /// Store the pending value into a field of the pending receiver; the
    /// stored value stays pending.
    pub fn store_field(&mut self, offset: u32) -> Fragment {
        self.pop();
        self.pop();
        let frag = emit(&mut self.graph, Instr::StoreField { offset });
        self.push(frag.entry.unwrap());
        frag
    }

    /// Indexed load from the pending (receiver, index) pair.
    pub fn load_indexed(&mut self, scale: u8) -> Fragment {
        self.pop();
        self.pop();
        let frag = emit(&mut self.graph, Instr::LoadIndexed { scale });
        self.push(frag.entry.unwrap());
        frag
    }

    /// Indexed store of the pending (receiver, index, value) triple; the
    /// stored value stays pending.
    pub fn store_indexed(&mut self, scale: u8) -> Fragment {
        self.pop();
        self.pop();
        self.pop();
        let frag = emit(&mut self.graph, Instr::StoreIndexed { scale });
        self.push(frag.entry.unwrap());
        frag
    }

    // --- Captured-variable contexts ---

    /// Push the current context object as a pending value.
    pub fn load_context(&mut self) -> Fragment {
        let frag = emit(&mut self.graph, Instr::LoadContext);
        self.push(frag.entry.unwrap());
        frag
    }

    /// Install the pending value as the current context object.
    pub fn store_context(&mut self) -> Fragment {
        self.pop();
        emit(&mut self.graph, Instr::StoreContext)
    }

    /// Allocate and chain a captured-variable context.
    pub fn push_context(&mut self, slots: u16) -> Fragment {
        self.context_depth += 1;
        emit(&mut self.graph, Instr::PushContext { slots })
    }

    /// Unchain the innermost captured-variable context.
    pub fn pop_context(&mut self) -> Fragment {
        assert!(self.context_depth > 0, "context depth underflow");
        self.context_depth -= 1;
        emit(&mut self.graph, Instr::PopContext)
    }

    /// Emit pops until the context depth matches `depth`.
    pub fn adjust_context_to(&mut self, depth: usize) -> Fragment {
        assert!(
            depth <= self.context_depth,
            "cannot adjust context depth upward ({} -> {depth})",
            self.context_depth
        );
        let mut frag = Fragment::empty();
        while self.context_depth > depth {
            let pop = self.pop_context();
            frag = frag.concat(&mut self.graph, pop);
        }
        frag
    }

    // --- Comparisons and checks ---

    /// Compare the two pending operands.
    pub fn compare(&mut self, op: CompareOp) -> Fragment {
        self.pop();
        self.pop();
        let frag = emit(&mut self.graph, Instr::Compare { op });
        self.push(frag.entry.unwrap());
        frag
    }

    /// Negate the pending boolean.
    pub fn boolean_negate(&mut self) -> Fragment {
        self.pop();
        let frag = emit(&mut self.graph, Instr::BooleanNegate);
        self.push(frag.entry.unwrap());
        frag
    }

    /// Assignability check on the pending value, which stays pending.
    pub fn assert_assignable(&mut self, pos: Pos, strict: bool) -> Fragment {
        self.pop();
        let frag = emit(&mut self.graph, Instr::AssertAssignable { pos, strict });
        self.push(frag.entry.unwrap());
        frag
    }

    /// Boolean check on the pending value, which stays pending.
    pub fn assert_boolean(&mut self, pos: Pos) -> Fragment {
        self.pop();
        let frag = emit(&mut self.graph, Instr::AssertBoolean { pos });
        self.push(frag.entry.unwrap());
        frag
    }

    /// Null check on the pending receiver, which stays pending.
    pub fn check_null(&mut self, pos: Pos) -> Fragment {
        self.pop();
        let frag = emit(&mut self.graph, Instr::CheckNull { pos });
        self.push(frag.entry.unwrap());
        frag
    }

    /// Stack-overflow probe.
    pub fn check_stack_overflow(&mut self, pos: Pos) -> Fragment {
        emit(&mut self.graph, Instr::CheckStackOverflow { pos })
    }

    // --- Control transfer ---

    /// Two-way branch on the pending boolean condition.
    ///
    /// Returns the closed branch fragment plus fresh target entries for
    /// the true and false successors.
    pub fn branch_if_true(&mut self) -> (Fragment, InstrId, InstrId) {
        self.pop();
        let then_entry = self.build_target_entry();
        let otherwise_entry = self.build_target_entry();
        let frag = emit(
            &mut self.graph,
            Instr::Branch {
                true_target: then_entry.0,
                false_target: otherwise_entry.0,
            },
        )
        .closed();
        (frag, then_entry, otherwise_entry)
    }

    /// Branch on whether the pending value is null.
    pub fn branch_if_null(&mut self) -> (Fragment, InstrId, InstrId) {
        let null = self.null_constant();
        let cmp = self.compare(CompareOp::StrictEq);
        let (branch, then_entry, otherwise_entry) = self.branch_if_true();
        let mut frag = null.concat(&mut self.graph, cmp);
        frag = frag.concat(&mut self.graph, branch);
        (frag, then_entry, otherwise_entry)
    }

    /// Branch on identity equality of the two pending operands.
    pub fn branch_if_strict_equal(&mut self) -> (Fragment, InstrId, InstrId) {
        let cmp = self.compare(CompareOp::StrictEq);
        let (branch, then_entry, otherwise_entry) = self.branch_if_true();
        (cmp.concat(&mut self.graph, branch), then_entry, otherwise_entry)
    }

    /// Unconditional jump to a join block.
    pub fn goto_join(&mut self, join: InstrId) -> Fragment {
        debug_assert!(matches!(
            self.graph.instr(join),
            Instr::JoinEntry { .. }
        ));
        emit(&mut self.graph, Instr::Goto { target: join.0 }).closed()
    }

    /// Return the pending value to the caller.
    pub fn ret(&mut self, pos: Pos) -> Fragment {
        self.pop();
        emit(&mut self.graph, Instr::Return { pos }).closed()
    }

    /// Throw the pending exception object.
    pub fn throw_exception(&mut self, pos: Pos) -> Fragment {
        self.pop();
        emit(&mut self.graph, Instr::Throw { pos }).closed()
    }

    /// Re-throw the pending (exception, stack trace) pair.
    pub fn rethrow(&mut self, pos: Pos, catch_try_index: TryIndex) -> Fragment {
        self.pop();
        self.pop();
        emit(
            &mut self.graph,
            Instr::Rethrow {
                pos,
                catch_try_index,
            },
        )
        .closed()
    }

    /// Suspend with the pending value; control later re-enters at the
    /// paired continuation entry.
    pub fn suspend(&mut self, pos: Pos) -> Fragment {
        self.pop();
        emit(&mut self.graph, Instr::Suspend { pos }).closed()
    }

    // --- Calls, allocation, error sites ---

    /// Call a statically resolved member with `arg_count` pending args.
    pub fn static_call(&mut self, pos: Pos, target: MemberId, arg_count: u16) -> Fragment {
        for _ in 0..arg_count {
            self.pop();
        }
        let frag = emit(
            &mut self.graph,
            Instr::StaticCall {
                pos,
                target,
                arg_count,
            },
        );
        self.push(frag.entry.unwrap());
        frag
    }

    /// Dynamically dispatched call with `arg_count` pending args
    /// (receiver included).
    pub fn instance_call(&mut self, pos: Pos, selector: NameId, arg_count: u16) -> Fragment {
        for _ in 0..arg_count {
            self.pop();
        }
        let frag = emit(
            &mut self.graph,
            Instr::InstanceCall {
                pos,
                selector,
                arg_count,
            },
        );
        self.push(frag.entry.unwrap());
        frag
    }

    /// Call the pending closure with `arg_count` pending args
    /// (closure included).
    pub fn closure_call(&mut self, pos: Pos, arg_count: u16) -> Fragment {
        for _ in 0..arg_count {
            self.pop();
        }
        let frag = emit(&mut self.graph, Instr::ClosureCall { pos, arg_count });
        self.push(frag.entry.unwrap());
        frag
    }

    /// Allocate an instance of a resolved class.
    pub fn allocate_object(&mut self, pos: Pos, class: ClassId) -> Fragment {
        let frag = emit(&mut self.graph, Instr::AllocateObject { pos, class });
        self.push(frag.entry.unwrap());
        frag
    }

    /// Allocate a closure binding `target` to the pending receiver.
    pub fn allocate_closure(&mut self, target: MemberId) -> Fragment {
        self.pop();
        let frag = emit(&mut self.graph, Instr::AllocateClosure { target });
        self.push(frag.entry.unwrap());
        frag
    }

    /// Raise a no-such-method error at a failed resolution site.
    pub fn throw_no_such_method(&mut self, pos: Pos, selector: NameId) -> Fragment {
        emit(&mut self.graph, Instr::ThrowNoSuchMethod { pos, selector }).closed()
    }

    /// Raise a type error at a statically invalid operation site.
    pub fn throw_type_error(&mut self, pos: Pos) -> Fragment {
        emit(&mut self.graph, Instr::ThrowTypeError { pos }).closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_ids_are_monotonic() {
        let mut b = GraphBuilder::new();
        assert_eq!(b.allocate_block_id(), 0);
        assert_eq!(b.allocate_block_id(), 1);
        assert_eq!(b.allocate_block_id(), 2);
    }

    #[test]
    fn test_try_indices_are_monotonic() {
        let mut b = GraphBuilder::new();
        assert_eq!(b.allocate_try_index(), TryIndex::new(0));
        assert_eq!(b.allocate_try_index(), TryIndex::new(1));
    }

    #[test]
    fn test_current_try_index_tracks_stack() {
        let mut b = GraphBuilder::new();
        assert_eq!(b.current_try_index(), TryIndex::INVALID);
        let outer = b.allocate_try_index();
        b.push_try_catch(outer);
        assert_eq!(b.current_try_index(), outer);
        let inner = b.allocate_try_index();
        b.push_try_catch(inner);
        assert_eq!(b.current_try_index(), inner);
        b.pop_try_catch();
        assert_eq!(b.current_try_index(), outer);
        b.pop_try_catch();
        assert_eq!(b.current_try_index(), TryIndex::INVALID);
    }

    #[test]
    fn test_truncate_try_catch_to_outer_region() {
        let mut b = GraphBuilder::new();
        let outer = b.allocate_try_index();
        let inner = b.allocate_try_index();
        b.push_try_catch(outer);
        b.push_try_catch(inner);
        b.truncate_try_catch_to(outer);
        assert_eq!(b.current_try_index(), outer);
        b.truncate_try_catch_to(TryIndex::INVALID);
        assert_eq!(b.current_try_index(), TryIndex::INVALID);
    }

    #[test]
    fn test_join_entry_carries_try_index() {
        let mut b = GraphBuilder::new();
        let ti = b.allocate_try_index();
        let join = b.build_join_entry(ti);
        assert!(matches!(
            b.graph().instr(join),
            Instr::JoinEntry { try_index, .. } if *try_index == ti
        ));
    }

    #[test]
    fn test_target_entry_inherits_current_try_index() {
        let mut b = GraphBuilder::new();
        let ti = b.allocate_try_index();
        b.push_try_catch(ti);
        let entry = b.build_target_entry();
        assert!(matches!(
            b.graph().instr(entry),
            Instr::TargetEntry { try_index, .. } if *try_index == ti
        ));
    }

    #[test]
    fn test_eval_stack_balance_through_compare() {
        let mut b = GraphBuilder::new();
        let _ = b.int_constant(1);
        let _ = b.int_constant(2);
        assert_eq!(b.stack_depth(), 2);
        let _ = b.compare(CompareOp::Eq);
        assert_eq!(b.stack_depth(), 1);
        let _ = b.drop_value();
        assert_eq!(b.stack_depth(), 0);
    }

    #[test]
    #[should_panic(expected = "evaluation stack underflow")]
    fn test_eval_stack_underflow_asserts() {
        let mut b = GraphBuilder::new();
        let _ = b.drop_value();
    }

    #[test]
    fn test_branch_if_true_creates_two_targets() {
        let mut b = GraphBuilder::new();
        let _ = b.constant(Literal::Bool(true));
        let (frag, then_entry, otherwise_entry) = b.branch_if_true();
        assert!(frag.is_closed());
        assert_ne!(then_entry, otherwise_entry);
        let succs = b.graph().successors(frag.entry.unwrap());
        assert_eq!(succs.as_slice(), &[then_entry, otherwise_entry]);
    }

    #[test]
    fn test_context_depth_adjustment() {
        let mut b = GraphBuilder::new();
        let _ = b.push_context(2);
        let _ = b.push_context(1);
        assert_eq!(b.context_depth(), 2);
        let frag = b.adjust_context_to(0);
        assert_eq!(b.context_depth(), 0);
        // Two PopContext instructions were emitted and chained.
        let entry = frag.entry.unwrap();
        assert!(matches!(b.graph().instr(entry), Instr::PopContext));
        let next = b.graph().node(entry).next.unwrap();
        assert!(matches!(b.graph().instr(next), Instr::PopContext));
    }

    #[test]
    fn test_branch_if_null_lowers_through_strict_compare() {
        let mut b = GraphBuilder::new();
        let value = b.null_constant();
        let (frag, _, _) = b.branch_if_null();
        assert!(frag.is_closed());
        assert_eq!(b.stack_depth(), 0);
        // null constant, strict compare, then the branch.
        let chain_start = frag.entry.unwrap();
        assert!(matches!(
            b.graph().instr(chain_start),
            Instr::Constant(Literal::Null)
        ));
        let cmp = b.graph().node(chain_start).next.unwrap();
        assert!(matches!(
            b.graph().instr(cmp),
            Instr::Compare {
                op: CompareOp::StrictEq
            }
        ));
        let _ = value;
    }

    #[test]
    fn test_branch_if_strict_equal_consumes_both_operands() {
        let mut b = GraphBuilder::new();
        let _ = b.int_constant(1);
        let _ = b.int_constant(2);
        let (frag, then_entry, otherwise_entry) = b.branch_if_strict_equal();
        assert!(frag.is_closed());
        assert_ne!(then_entry, otherwise_entry);
        assert_eq!(b.stack_depth(), 0);
    }

    #[test]
    fn test_field_and_indexed_ops_keep_stored_value_pending() {
        let mut b = GraphBuilder::new();
        let _ = b.null_constant(); // receiver
        let _ = b.int_constant(7); // value
        let _ = b.store_field(2);
        assert_eq!(b.stack_depth(), 1);
        let _ = b.drop_value();

        let _ = b.null_constant(); // receiver
        let _ = b.int_constant(0); // index
        let _ = b.load_indexed(1);
        assert_eq!(b.stack_depth(), 1);
        let _ = b.check_null(Pos::NONE);
        assert_eq!(b.stack_depth(), 1);
        let _ = b.drop_value();
        assert_eq!(b.stack_depth(), 0);
    }

    #[test]
    fn test_catch_entry_registers_and_pushes_pair() {
        let mut b = GraphBuilder::new();
        let ti = b.allocate_try_index();
        let entry = b.build_catch_entry(ti, true);
        assert_eq!(b.graph().catch_entries(), &[entry]);
        assert_eq!(b.stack_depth(), 2);
    }
}
