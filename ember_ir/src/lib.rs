//! Flow-graph IR for the Ember compiler.
//!
//! This crate defines the instruction catalogue consumed by the frontend
//! and the graph those instructions live in:
//!
//! - [`Instr`] - The closed set of instruction kinds. The frontend composes
//!   and links these; it never defines new kinds.
//! - [`FlowGraph`] - An arena of instruction nodes with forward links and
//!   explicit branch/goto edges.
//! - [`InstrId`], [`BlockId`], [`TryIndex`], [`LocalId`], [`ClassId`],
//!   [`MemberId`] - Newtype ids used across the workspace.

#![warn(missing_docs)]

pub mod graph;
pub mod instr;

pub use graph::{FlowGraph, InstrId, InstrNode};
pub use instr::{BlockId, ClassId, CompareOp, Instr, Literal, LocalId, MemberId, TryIndex};
