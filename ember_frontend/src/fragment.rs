//! The graph-fragment algebra.
//!
//! A [`Fragment`] is the minimal composable unit of flow-graph
//! construction: a transient cursor over a sub-structure, with an `entry`
//! node and a `current` open exit. The [`ember_ir::FlowGraph`] owns every
//! node; fragments only point into it.
//!
//! A fragment is *open* while control can still fall out of its exit and
//! *closed* once control has provably left it (return, throw, goto).
//! Concatenation wires an open exit to the next entry; a closed left
//! operand absorbs everything concatenated after it. Appending a single
//! instruction to a closed fragment is a translator defect and asserts.

use ember_ir::{FlowGraph, Instr, InstrId};

/// A cursor over a flow-graph sub-structure under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fragment {
    /// First node of the sub-structure, if anything was emitted yet.
    pub entry: Option<InstrId>,
    /// The open exit, or `None` once the fragment is closed.
    pub current: Option<InstrId>,
}

impl Fragment {
    /// The empty fragment.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Fragment {
            entry: None,
            current: None,
        }
    }

    /// A fragment spanning a single already-added node.
    #[inline]
    #[must_use]
    pub const fn single(id: InstrId) -> Self {
        Fragment {
            entry: Some(id),
            current: Some(id),
        }
    }

    /// A fragment spanning `entry`..`current`.
    #[inline]
    #[must_use]
    pub const fn spanning(entry: InstrId, current: Option<InstrId>) -> Self {
        Fragment {
            entry: Some(entry),
            current,
        }
    }

    /// Check whether control can still fall out of this fragment.
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        self.entry.is_none() || self.current.is_some()
    }

    /// Check whether control has provably left this fragment.
    #[inline]
    #[must_use]
    pub const fn is_closed(self) -> bool {
        !self.is_open()
    }

    /// The same sub-structure with its exit marked terminal.
    ///
    /// Closing an empty fragment is meaningless and asserts.
    #[must_use]
    pub fn closed(self) -> Self {
        assert!(self.entry.is_some(), "cannot close an empty fragment");
        Fragment {
            entry: self.entry,
            current: None,
        }
    }

    /// Concatenate: wire this fragment's open exit to `other`'s entry.
    ///
    /// A closed left operand absorbs the right one (the result is `self`
    /// unchanged); an empty left operand becomes `other`.
    #[must_use]
    pub fn concat(self, graph: &mut FlowGraph, other: Fragment) -> Fragment {
        if self.entry.is_none() {
            return other;
        }
        match (self.current, other.entry) {
            (Some(current), Some(entry)) => {
                graph.link(current, entry);
                Fragment {
                    entry: self.entry,
                    current: other.current,
                }
            }
            _ => self,
        }
    }

    /// Append one already-added instruction node to this fragment.
    ///
    /// The fragment must be open: extending a fragment after closing it
    /// means an impossible control-flow shape was constructed.
    #[must_use]
    pub fn append(self, graph: &mut FlowGraph, next: InstrId) -> Fragment {
        assert!(
            self.is_open(),
            "cannot append instruction {next} to a closed fragment"
        );
        match self.current {
            Some(current) => {
                graph.link(current, next);
                Fragment {
                    entry: self.entry,
                    current: Some(next),
                }
            }
            None => Fragment::single(next),
        }
    }

}

/// Convenience: add an instruction to the graph and return it as a
/// single-node open fragment.
#[must_use]
pub fn emit(graph: &mut FlowGraph, instr: Instr) -> Fragment {
    Fragment::single(graph.add(instr))
}
