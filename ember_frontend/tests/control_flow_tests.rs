//! Structured control-flow translation tests.
//!
//! Covers conditionals, loops, labeled breaks, and switch dispatch,
//! including the join-free shape of fully-returning conditionals and the
//! idempotent lazy materialization of switch-case destinations.

use ember_frontend::{FlowGraphTranslator, ScopeBindings, TableHelper};
use ember_ir::{FlowGraph, Instr, InstrId};
use ember_tree::{FunctionTree, SwitchCase, TreeBuilder};

// =============================================================================
// Test Helpers
// =============================================================================

/// Translate a tree with a fresh table helper, expecting success.
fn translate(tree: &FunctionTree) -> FlowGraph {
    let mut helper = TableHelper::new();
    translate_with(tree, &mut helper)
}

/// Translate a tree with the given helper, expecting success.
fn translate_with(tree: &FunctionTree, helper: &mut TableHelper) -> FlowGraph {
    let scopes = ScopeBindings::compute(tree);
    FlowGraphTranslator::new(tree, &scopes, helper)
        .build_graph()
        .expect("translation should succeed")
}

/// Count instructions matching a predicate over the whole graph.
fn count_instrs(graph: &FlowGraph, pred: fn(&Instr) -> bool) -> usize {
    graph.iter().filter(|(_, node)| pred(&node.instr)).count()
}

/// Ids of all Goto instructions targeting `join`.
fn gotos_to(graph: &FlowGraph, join: InstrId) -> Vec<InstrId> {
    graph
        .iter()
        .filter(|(_, node)| matches!(node.instr, Instr::Goto { target } if target == join.0))
        .map(|(id, _)| id)
        .collect()
}

/// Follow straight-line `next` links from `start` until the chain ends,
/// returning every visited id (branch/goto edges are not followed).
fn linear_chain(graph: &FlowGraph, start: InstrId) -> Vec<InstrId> {
    let mut chain = vec![start];
    let mut current = start;
    while let Some(next) = graph.node(current).next {
        chain.push(next);
        current = next;
    }
    chain
}

// =============================================================================
// A. Conditionals
// =============================================================================

#[test]
fn test_if_with_both_branches_returning_has_no_join() {
    // if (x == null) return a; else return b;
    let mut t = TreeBuilder::new("f");
    let x = t.param(0);
    let a = t.param(1);
    let b = t.param(2);
    let x_get = t.var_get(x, 10);
    let null = t.null(11);
    let cond = t.equals(x_get, null, 12);
    let a_get = t.var_get(a, 13);
    let ret_a = t.ret(Some(a_get), 14);
    let b_get = t.var_get(b, 15);
    let ret_b = t.ret(Some(b_get), 16);
    let body = t.if_stmt(cond, ret_a, Some(ret_b), 17);
    let tree = t.finish_with_body(body);

    let graph = translate(&tree);

    assert_eq!(count_instrs(&graph, |i| matches!(i, Instr::Branch { .. })), 1);
    assert_eq!(count_instrs(&graph, |i| matches!(i, Instr::JoinEntry { .. })), 0);
    assert_eq!(count_instrs(&graph, |i| matches!(i, Instr::Return { .. })), 2);

    // Each branch successor is a target block whose chain ends in a return.
    let (branch_id, _) = graph
        .iter()
        .find(|(_, node)| matches!(node.instr, Instr::Branch { .. }))
        .expect("branch exists");
    let successors = graph.successors(branch_id);
    assert_eq!(successors.len(), 2);
    for target in successors {
        assert!(matches!(graph.instr(target), Instr::TargetEntry { .. }));
        let chain = linear_chain(&graph, target);
        let last = *chain.last().unwrap();
        assert!(matches!(graph.instr(last), Instr::Return { .. }));
    }
}

#[test]
fn test_if_without_else_merges_through_join() {
    let mut t = TreeBuilder::new("f");
    let cond = t.bool_lit(true, 0);
    let then_branch = t.empty(1);
    let body_if = t.if_stmt(cond, then_branch, None, 2);
    let ret = t.ret(None, 3);
    let body = t.block(vec![body_if, ret], 4);
    let tree = t.finish_with_body(body);

    let graph = translate(&tree);
    assert_eq!(count_instrs(&graph, |i| matches!(i, Instr::JoinEntry { .. })), 1);
    assert_eq!(count_instrs(&graph, |i| matches!(i, Instr::Return { .. })), 1);
}

#[test]
fn test_conditional_expression_merges_through_temp() {
    // var r = c ? a : b; return r;
    let mut t = TreeBuilder::new("f");
    let c = t.param(0);
    let a = t.param(1);
    let b = t.param(2);
    let c_get = t.var_get(c, 10);
    let a_get = t.var_get(a, 11);
    let b_get = t.var_get(b, 12);
    let pick = t.conditional(c_get, a_get, b_get, 13);
    let r = t.var_decl(Some(pick), 14);
    let r_get = t.var_get(r, 15);
    let ret = t.ret(Some(r_get), 16);
    let body = t.block(vec![r, ret], 17);
    let tree = t.finish_with_body(body);

    let graph = translate(&tree);
    assert_eq!(count_instrs(&graph, |i| matches!(i, Instr::JoinEntry { .. })), 1);
    // Both arms store into the expression temp; the merge reloads it.
    let (join_id, _) = graph
        .iter()
        .find(|(_, node)| matches!(node.instr, Instr::JoinEntry { .. }))
        .unwrap();
    assert_eq!(gotos_to(&graph, join_id).len(), 2);
    let after_join = graph.node(join_id).next.expect("join continues");
    assert!(matches!(graph.instr(after_join), Instr::LoadLocal(_)));
}

// =============================================================================
// B. Loops
// =============================================================================

#[test]
fn test_while_loop_has_back_edge_and_overflow_check() {
    let mut t = TreeBuilder::new("f");
    let cond = t.bool_lit(true, 0);
    let inner = t.empty(1);
    let body = t.while_stmt(cond, inner, 2);
    let tree = t.finish_with_body(body);

    let graph = translate(&tree);
    let (loop_join, _) = graph
        .iter()
        .find(|(_, node)| matches!(node.instr, Instr::JoinEntry { .. }))
        .expect("loop join exists");
    // Entry jump plus back edge.
    assert_eq!(gotos_to(&graph, loop_join).len(), 2);
    // The loop head re-checks the stack on every iteration.
    let chain = linear_chain(&graph, loop_join);
    assert!(chain
        .iter()
        .any(|&id| matches!(graph.instr(id), Instr::CheckStackOverflow { .. })));
}

#[test]
fn test_for_in_lowers_through_iterator_protocol() {
    let mut t = TreeBuilder::new("f");
    let items = t.param(0);
    let element = t.var_decl(None, 10);
    let iterable = t.var_get(items, 11);
    let inner = t.empty(12);
    let body = t.for_in(element, iterable, inner, 13);
    let tree = t.finish_with_body(body);

    let graph = translate(&tree);
    let selectors = tree.selectors;
    let count_selector = |name| {
        graph
            .iter()
            .filter(
                |(_, node)| matches!(node.instr, Instr::InstanceCall { selector, .. } if selector == name),
            )
            .count()
    };
    assert_eq!(count_selector(selectors.iterator), 1);
    assert_eq!(count_selector(selectors.move_next), 1);
    assert_eq!(count_selector(selectors.current), 1);
    // The element variable is stored once per iteration.
    assert!(graph
        .iter()
        .any(|(_, node)| matches!(node.instr, Instr::StoreLocal(_))));
}

// =============================================================================
// C. Labeled breaks
// =============================================================================

#[test]
fn test_labeled_break_jumps_to_region_join() {
    // labeled { if (c) break 0; } return;
    let mut t = TreeBuilder::new("f");
    let c = t.param(0);
    let c_get = t.var_get(c, 10);
    let brk = t.brk(0, 11);
    let body_if = t.if_stmt(c_get, brk, None, 12);
    let labeled = t.labeled(body_if, 13);
    let ret = t.ret(None, 14);
    let body = t.block(vec![labeled, ret], 15);
    let tree = t.finish_with_body(body);

    let graph = translate(&tree);
    // Only the labeled region's destination join exists: the if needs no
    // merge when one branch leaves non-locally.
    let joins: Vec<_> = graph
        .iter()
        .filter(|(_, node)| matches!(node.instr, Instr::JoinEntry { .. }))
        .map(|(id, _)| id)
        .collect();
    assert_eq!(joins.len(), 1);
    // The break jump and the fall-through both land on it.
    assert_eq!(gotos_to(&graph, joins[0]).len(), 2);
}

#[test]
fn test_labeled_break_crossing_two_finally_regions() {
    // labeled {
    //   try { try { break 0; } finally { inner(); } } finally { outer(); }
    // }
    let mut t = TreeBuilder::new("f");
    let inner_name = t.name("inner");
    let outer_name = t.name("outer");
    let brk = t.brk(0, 10);
    let inner_call = t.static_call(inner_name, vec![], 11);
    let inner_fin = t.expr_stmt(inner_call, 12);
    let inner_try = t.try_finally(brk, inner_fin, 13);
    let outer_call = t.static_call(outer_name, vec![], 14);
    let outer_fin = t.expr_stmt(outer_call, 15);
    let outer_try = t.try_finally(inner_try, outer_fin, 16);
    let labeled = t.labeled(outer_try, 17);
    let tree = t.finish_with_body(labeled);

    let mut helper = TableHelper::new();
    let inner_id = helper.register_static_member(inner_name);
    let outer_id = helper.register_static_member(outer_name);
    let graph = translate_with(&tree, &mut helper);

    // Walk the straight-line path from the function entry: the break site
    // must run both finalizer copies, innermost first, before its jump.
    let entry = graph.entry().expect("graph has an entry");
    let chain = linear_chain(&graph, entry);
    let calls_on_path: Vec<_> = chain
        .iter()
        .filter_map(|&id| match graph.instr(id) {
            Instr::StaticCall { target, .. } => Some(*target),
            _ => None,
        })
        .collect();
    assert_eq!(calls_on_path, vec![inner_id, outer_id]);
    let last = *chain.last().unwrap();
    assert!(matches!(graph.instr(last), Instr::Goto { .. }));

    // Each finalizer also has an unwind copy in its catch-all handler.
    let count_calls = |target| {
        graph
            .iter()
            .filter(|(_, node)| matches!(node.instr, Instr::StaticCall { target: t, .. } if t == target))
            .count()
    };
    assert_eq!(count_calls(inner_id), 2);
    assert_eq!(count_calls(outer_id), 2);
}

// =============================================================================
// D. Switch dispatch
// =============================================================================

fn case(exprs: Vec<ember_tree::NodeOffset>, body: ember_tree::NodeOffset) -> SwitchCase {
    SwitchCase {
        exprs,
        is_default: false,
        body,
    }
}

#[test]
fn test_switch_goto_case_reuses_dispatch_join() {
    // switch (x) { case 1: continue-to case 0; case 0 (default): ; }
    let mut t = TreeBuilder::new("f");
    let x = t.param(0);
    let scrutinee = t.var_get(x, 10);
    let goto_first = t.continue_switch(0, 11);
    let one = t.int(1, 12);
    let default_body = t.empty(13);
    let cases = vec![
        SwitchCase {
            exprs: vec![],
            is_default: true,
            body: default_body,
        },
        case(vec![one], goto_first),
    ];
    let body = t.switch(scrutinee, cases, 14);
    let tree = t.finish_with_body(body);

    let graph = translate(&tree);

    // The goto-case jump and the dispatch default edge both reach the same
    // join: lazy materialization is idempotent, so exactly one join exists
    // per case (plus the exit join).
    let joins: Vec<_> = graph
        .iter()
        .filter(|(_, node)| matches!(node.instr, Instr::JoinEntry { .. }))
        .map(|(id, _)| id)
        .collect();
    assert_eq!(joins.len(), 3);
    assert!(
        joins.iter().any(|&join| gotos_to(&graph, join).len() == 2),
        "the shared case destination should have two incoming jumps"
    );
}

#[test]
fn test_nested_switch_goto_resolves_to_outer_case() {
    // Outer switch has cases 0..2 (absolute); inner switch occupies 2..3.
    // A goto-case 0 inside the inner switch must target the outer join.
    let mut t = TreeBuilder::new("f");
    let x = t.param(0);
    let outer_scrutinee = t.var_get(x, 10);
    let inner_scrutinee = t.var_get(x, 11);

    let goto_outer = t.continue_switch(0, 12);
    let inner_case_expr = t.int(9, 13);
    let inner_cases = vec![case(vec![inner_case_expr], goto_outer)];
    let inner_switch = t.switch(inner_scrutinee, inner_cases, 14);

    let first_body = t.empty(15);
    let zero = t.int(0, 16);
    let one = t.int(1, 17);
    let outer_cases = vec![
        case(vec![zero], first_body),
        case(vec![one], inner_switch),
    ];
    let body = t.switch(outer_scrutinee, outer_cases, 18);
    let tree = t.finish_with_body(body);

    let graph = translate(&tree);
    // Outer case 0's join receives two jumps: the outer dispatch edge and
    // the inner goto-case.
    let joins: Vec<_> = graph
        .iter()
        .filter(|(_, node)| matches!(node.instr, Instr::JoinEntry { .. }))
        .map(|(id, _)| id)
        .collect();
    assert!(joins.iter().any(|&join| gotos_to(&graph, join).len() >= 2));
}

#[test]
fn test_switch_without_default_falls_through_to_exit() {
    let mut t = TreeBuilder::new("f");
    let x = t.param(0);
    let scrutinee = t.var_get(x, 10);
    let zero = t.int(0, 11);
    let case_body = t.empty(12);
    let body = t.switch(scrutinee, vec![case(vec![zero], case_body)], 13);
    let ret = t.ret(None, 14);
    let block = t.block(vec![body, ret], 15);
    let tree = t.finish_with_body(block);

    let graph = translate(&tree);
    // Dispatch compares the stored scrutinee against the case value.
    assert_eq!(count_instrs(&graph, |i| matches!(i, Instr::Compare { .. })), 1);
    assert_eq!(count_instrs(&graph, |i| matches!(i, Instr::Return { .. })), 1);
}
