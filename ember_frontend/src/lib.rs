//! Tree-to-flow-graph translator for the Ember compiler.
//!
//! This crate turns one typed function tree into a control-flow graph of
//! [`ember_ir`] instructions:
//!
//! ```text
//! FunctionTree → Scope Bindings → FlowGraphTranslator → FlowGraph
//! ```
//!
//! # Key Types
//!
//! - [`Fragment`] - Open/closed cursor over a graph under construction
//! - [`GraphBuilder`] - Construct-agnostic emission primitives
//! - [`FlowGraphTranslator`] - The orchestrator walking one function body
//! - [`ScopeBindings`] - Precomputed variable/slot binding result
//! - [`Helper`] - Name lookup, literal canonicalization, error reporting

#![warn(missing_docs)]

pub mod builder;
pub mod context;
pub mod fragment;
pub mod helper;
pub mod region;
pub mod scope;
pub mod translator;

pub use builder::GraphBuilder;
pub use context::ActiveClass;
pub use fragment::Fragment;
pub use helper::{Helper, TableHelper};
pub use scope::{ScopeBindings, ScopeBindingsBuilder, ScopeInfo};
pub use translator::{Continuation, FlowGraphTranslator};
