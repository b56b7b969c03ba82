//! Generator/async suspension translation tests.
//!
//! A suspension point closes the current fragment and records a resume
//! continuation; functions with suspensions get exactly one synthesized
//! dispatch chain, and functions without them get none.

use ember_frontend::{FlowGraphTranslator, ScopeBindings, TableHelper};
use ember_ir::{CompareOp, FlowGraph, Instr, TryIndex};
use ember_tree::{CatchClause, FunctionTree, TreeBuilder};

// =============================================================================
// Test Helpers
// =============================================================================

fn translate(tree: &FunctionTree) -> FlowGraph {
    let scopes = ScopeBindings::compute(tree);
    let mut helper = TableHelper::new();
    FlowGraphTranslator::new(tree, &scopes, &mut helper)
        .build_graph()
        .expect("translation should succeed")
}

fn count_instrs(graph: &FlowGraph, pred: fn(&Instr) -> bool) -> usize {
    graph.iter().filter(|(_, node)| pred(&node.instr)).count()
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_function_without_suspensions_has_no_dispatch() {
    let mut t = TreeBuilder::new("f");
    let value = t.int(1, 0);
    let body = t.ret(Some(value), 1);
    let tree = t.finish_with_body(body);

    let graph = translate(&tree);
    assert_eq!(count_instrs(&graph, |i| matches!(i, Instr::Suspend { .. })), 0);
    // No dispatch chain: no comparisons, no joins at all in this body.
    assert_eq!(count_instrs(&graph, |i| matches!(i, Instr::Compare { .. })), 0);
    assert_eq!(count_instrs(&graph, |i| matches!(i, Instr::JoinEntry { .. })), 0);
}

#[test]
fn test_two_suspensions_build_two_resume_edges_plus_initial_entry() {
    // yield 1; yield 2;
    let mut t = TreeBuilder::new("g");
    let one = t.int(1, 0);
    let y1 = t.yield_stmt(one, 1);
    let two = t.int(2, 2);
    let y2 = t.yield_stmt(two, 3);
    let body = t.block(vec![y1, y2], 4);
    let tree = t.finish_with_body(body);

    let graph = translate(&tree);

    assert_eq!(count_instrs(&graph, |i| matches!(i, Instr::Suspend { .. })), 2);
    // The dispatch chain compares the resume state once per continuation.
    assert_eq!(
        count_instrs(&graph, |i| matches!(
            i,
            Instr::Compare {
                op: CompareOp::StrictEq
            }
        )),
        2
    );
    // Two resume edges plus the initial-entry edge into the body join.
    assert_eq!(count_instrs(&graph, |i| matches!(i, Instr::Goto { .. })), 3);
    // Three joins: two resume points and the initial body entry.
    assert_eq!(count_instrs(&graph, |i| matches!(i, Instr::JoinEntry { .. })), 3);
}

#[test]
fn test_suspension_stores_resume_state_before_suspend() {
    let mut t = TreeBuilder::new("g");
    let v = t.int(7, 0);
    let y = t.yield_stmt(v, 1);
    let tree = t.finish_with_body(y);

    let scopes = ScopeBindings::compute(&tree);
    let state = scopes.resume_state_variable.expect("resume state bound");
    let context = scopes.resume_context_variable.expect("resume context bound");
    let mut helper = TableHelper::new();
    let graph = FlowGraphTranslator::new(&tree, &scopes, &mut helper)
        .build_graph()
        .expect("translation should succeed");

    assert!(graph
        .iter()
        .any(|(_, node)| matches!(node.instr, Instr::StoreLocal(slot) if slot == state)));
    assert!(graph
        .iter()
        .any(|(_, node)| matches!(node.instr, Instr::StoreLocal(slot) if slot == context)));
    // The dispatch reloads the state temp to pick a resume point.
    assert!(graph
        .iter()
        .any(|(_, node)| matches!(node.instr, Instr::LoadLocal(slot) if slot == state)));
}

#[test]
fn test_suspension_inside_try_records_enclosing_try_index() {
    // try { yield 1; } catch { }
    let mut t = TreeBuilder::new("g");
    let v = t.int(1, 0);
    let y = t.yield_stmt(v, 1);
    let handler_body = t.empty(2);
    let body = t.try_catch(
        y,
        vec![CatchClause {
            body: handler_body,
            needs_stacktrace: false,
        }],
        3,
    );
    let tree = t.finish_with_body(body);

    let graph = translate(&tree);
    // The resume point is a join tagged with the protected region's index,
    // so unwinding after resumption still finds the handler.
    assert!(graph.iter().any(|(_, node)| matches!(
        node.instr,
        Instr::JoinEntry {
            try_index: TryIndex(0),
            ..
        }
    )));
}
