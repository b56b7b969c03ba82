//! Error types and result definitions for Ember.
//!
//! Translation distinguishes two disjoint error classes:
//!
//! - **Internal consistency failures** (unresolved jump target, malformed
//!   region nesting, missing scope binding): a defect in an upstream
//!   invariant, fatal to the current function's compilation.
//! - **Source-program errors** (unresolved name, invalid operator use):
//!   reported through the helper service and replaced by a throwing
//!   fragment; translation of the rest of the function continues.
//!
//! Only the first class surfaces as [`EmberError`]. The second class never
//! becomes an `Err` inside the translator.

use crate::pos::Pos;
use thiserror::Error;

/// The unified result type used throughout Ember.
pub type EmberResult<T> = Result<T, EmberError>;

/// Errors that abort compilation of the current function.
#[derive(Error, Debug, Clone)]
pub enum EmberError {
    /// A non-local jump names a target no enclosing region can resolve.
    #[error("unresolved jump target at tree offset {offset}: {message}")]
    UnresolvedTarget {
        /// What was being resolved.
        message: String,
        /// Tree offset of the jump.
        offset: u32,
    },

    /// A tree offset has no binding in the precomputed scope result.
    #[error("no scope binding for tree offset {offset}: {message}")]
    MissingBinding {
        /// What kind of binding was expected.
        message: String,
        /// The unbound tree offset.
        offset: u32,
    },

    /// The tree handed over a node the translator cannot accept here.
    #[error("malformed tree at offset {offset}: {message}")]
    MalformedTree {
        /// Error description.
        message: String,
        /// Tree offset of the offending node.
        offset: u32,
    },

    /// An invariant of the translator itself was violated.
    #[error("internal error: {message}")]
    Internal {
        /// Error description.
        message: String,
        /// Source position, if one was in scope.
        pos: Pos,
    },
}

impl EmberError {
    /// Create an unresolved-jump-target error.
    #[must_use]
    pub fn unresolved_target(message: impl Into<String>, offset: u32) -> Self {
        Self::UnresolvedTarget {
            message: message.into(),
            offset,
        }
    }

    /// Create a missing-binding error.
    #[must_use]
    pub fn missing_binding(message: impl Into<String>, offset: u32) -> Self {
        Self::MissingBinding {
            message: message.into(),
            offset,
        }
    }

    /// Create a malformed-tree error.
    #[must_use]
    pub fn malformed_tree(message: impl Into<String>, offset: u32) -> Self {
        Self::MalformedTree {
            message: message.into(),
            offset,
        }
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>, pos: Pos) -> Self {
        Self::Internal {
            message: message.into(),
            pos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_target_display() {
        let err = EmberError::unresolved_target("case 3", 17);
        assert_eq!(
            err.to_string(),
            "unresolved jump target at tree offset 17: case 3"
        );
    }

    #[test]
    fn test_missing_binding_display() {
        let err = EmberError::missing_binding("local variable", 9);
        assert!(err.to_string().contains("offset 9"));
        assert!(err.to_string().contains("local variable"));
    }

    #[test]
    fn test_malformed_tree_display() {
        let err = EmberError::malformed_tree("expected a statement", 4);
        assert!(err.to_string().starts_with("malformed tree at offset 4"));
    }

    #[test]
    fn test_internal_display() {
        let err = EmberError::internal("region stack underflow", Pos::NONE);
        assert_eq!(err.to_string(), "internal error: region stack underflow");
    }

    #[test]
    fn test_error_is_clone() {
        let original = EmberError::missing_binding("x", 1);
        let cloned = original.clone();
        assert_eq!(original.to_string(), cloned.to_string());
    }
}
