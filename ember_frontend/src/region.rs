//! Region trackers for active structured-control constructs.
//!
//! Five record kinds, one per construct family: exception-protected
//! regions, finally regions, switches, breakable (labeled) regions, and
//! catch clauses. Each kind lives in its own vector with the innermost
//! region last; non-local jumps resolve by searching outward from the end.
//! The translator pushes on construct entry and pops on every exit path,
//! so the enclosing state is restored even when translation fails partway.

use ember_ir::{InstrId, LocalId, TryIndex};
use ember_tree::NodeOffset;
use rustc_hash::FxHashMap;

/// An exception-protected region, identified by its try-index.
///
/// Lives on the base builder so join entries created inside the region can
/// be tagged for unwind-target resolution.
#[derive(Debug, Clone, Copy)]
pub struct TryCatchRegion {
    /// The region's allocated try-index.
    pub try_index: TryIndex,
}

/// A finally region: enough state to re-emit its finalizer at every
/// non-local exit that crosses it.
#[derive(Debug, Clone, Copy)]
pub struct FinallyRegion {
    /// Tree offset of the finalizer body.
    pub finalizer: NodeOffset,
    /// Context depth in effect when the region opened.
    pub context_depth: usize,
    /// Try depth of the finalizer itself (one less than the protected
    /// body's, since finalizers run outside their own try).
    pub try_depth: usize,
    /// Try-index in effect when the region opened.
    pub try_index: TryIndex,
}

/// A switch region: absolute case numbering plus lazily materialized case
/// destinations.
#[derive(Debug)]
pub struct SwitchRegion {
    /// Number of cases in this switch.
    pub case_count: usize,
    /// Cumulative case-number offset of this region: outer depth plus
    /// outer case count, so absolute numbering spans nested switches.
    pub depth: usize,
    /// Context depth when the region opened.
    pub context_depth: usize,
    /// Finally-region stack height when the region opened.
    pub finally_depth: usize,
    /// Try-index in effect when the region opened.
    pub try_index: TryIndex,
    destinations: FxHashMap<usize, InstrId>,
}

impl SwitchRegion {
    /// Create a region nested under `outer` (if any).
    #[must_use]
    pub fn new(
        case_count: usize,
        outer: Option<&SwitchRegion>,
        context_depth: usize,
        finally_depth: usize,
        try_index: TryIndex,
    ) -> Self {
        let depth = outer.map_or(0, |o| o.depth + o.case_count);
        Self {
            case_count,
            depth,
            context_depth,
            finally_depth,
            try_index,
            destinations: FxHashMap::default(),
        }
    }

    /// Whether some jump already materialized the given relative case.
    #[must_use]
    pub fn had_jumper(&self, case_num: usize) -> bool {
        self.destinations.contains_key(&case_num)
    }

    /// The already-materialized destination for a relative case, if any.
    #[must_use]
    pub fn destination(&self, case_num: usize) -> Option<InstrId> {
        self.destinations.get(&case_num).copied()
    }

    /// Record the destination join for a relative case. At most one
    /// materialization per case may ever happen.
    pub fn record_destination(&mut self, case_num: usize, join: InstrId) {
        let previous = self.destinations.insert(case_num, join);
        assert!(
            previous.is_none(),
            "case {case_num} destination materialized twice"
        );
    }
}

/// A breakable (labeled) region with at most one lazily materialized
/// destination join. Its label index is its position in the region stack.
#[derive(Debug, Clone, Copy)]
pub struct BreakableRegion {
    /// Destination join, materialized on the first jump to it.
    pub destination: Option<InstrId>,
    /// Context depth when the region opened.
    pub context_depth: usize,
    /// Finally-region stack height when the region opened.
    pub finally_depth: usize,
    /// Try-index in effect when the region opened.
    pub try_index: TryIndex,
}

impl BreakableRegion {
    /// Create a region capturing the state at its opening.
    #[must_use]
    pub fn new(context_depth: usize, finally_depth: usize, try_index: TryIndex) -> Self {
        Self {
            destination: None,
            context_depth,
            finally_depth,
            try_index,
        }
    }

    /// Whether some break already targeted this region.
    #[must_use]
    pub fn had_jumper(&self) -> bool {
        self.destination.is_some()
    }
}

/// An active catch clause: the locals its body reads the exception and
/// stack trace through, and the protected region it guards.
#[derive(Debug, Clone, Copy)]
pub struct CatchRegion {
    /// Local holding the caught exception object.
    pub exception_var: LocalId,
    /// Local holding the caught stack trace object.
    pub stack_trace_var: LocalId,
    /// Try-index of the region this clause handles.
    pub catch_try_index: TryIndex,
}

/// Find the switch region owning an absolute case number.
///
/// Searches outward (innermost last); returns the region's stack index and
/// the case number relative to it.
#[must_use]
pub fn resolve_switch_target(stack: &[SwitchRegion], target_case: usize) -> Option<(usize, usize)> {
    for (index, region) in stack.iter().enumerate().rev() {
        if region.depth <= target_case {
            let relative = target_case - region.depth;
            if relative < region.case_count {
                return Some((index, relative));
            }
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(case_count: usize, outer: Option<&SwitchRegion>) -> SwitchRegion {
        SwitchRegion::new(case_count, outer, 0, 0, TryIndex::INVALID)
    }

    #[test]
    fn test_switch_depth_accumulates_over_nesting() {
        let outer = region(3, None);
        let inner = region(2, Some(&outer));
        assert_eq!(outer.depth, 0);
        assert_eq!(inner.depth, 3);
    }

    #[test]
    fn test_resolve_switch_target_walks_outward() {
        let outer = region(3, None);
        let inner = region(2, Some(&outer));
        let stack = vec![outer, inner];

        // Absolute cases 0..3 belong to the outer region, 3..5 to the inner.
        assert_eq!(resolve_switch_target(&stack, 4), Some((1, 1)));
        assert_eq!(resolve_switch_target(&stack, 3), Some((1, 0)));
        assert_eq!(resolve_switch_target(&stack, 2), Some((0, 2)));
        assert_eq!(resolve_switch_target(&stack, 0), Some((0, 0)));
    }

    #[test]
    fn test_resolve_switch_target_out_of_range() {
        let outer = region(2, None);
        let stack = vec![outer];
        assert_eq!(resolve_switch_target(&stack, 2), None);
        assert_eq!(resolve_switch_target(&stack, 7), None);
    }

    #[test]
    fn test_resolve_switch_target_empty_stack() {
        assert_eq!(resolve_switch_target(&[], 0), None);
    }

    #[test]
    fn test_switch_destination_recording() {
        let mut r = region(2, None);
        assert!(!r.had_jumper(0));
        r.record_destination(0, InstrId::new(7));
        assert!(r.had_jumper(0));
        assert_eq!(r.destination(0), Some(InstrId::new(7)));
        assert_eq!(r.destination(1), None);
    }

    #[test]
    #[should_panic(expected = "materialized twice")]
    fn test_switch_double_materialization_asserts() {
        let mut r = region(1, None);
        r.record_destination(0, InstrId::new(1));
        r.record_destination(0, InstrId::new(2));
    }

    #[test]
    fn test_breakable_region_jumper_tracking() {
        let mut r = BreakableRegion::new(0, 0, TryIndex::INVALID);
        assert!(!r.had_jumper());
        r.destination = Some(InstrId::new(3));
        assert!(r.had_jumper());
    }
}
