//! Active class/member context.
//!
//! Tracks the enclosing class, the innermost enclosing member, the
//! innermost enclosing executable, and the number of generic type
//! parameters currently visible. State is mutated only through
//! enter/restore pairs: `enter_*` returns the prior state, and the caller
//! restores it on every exit path, including error unwinding.

use ember_ir::{ClassId, MemberId};

/// The active class/member context of a translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveClass {
    /// The enclosing class, if any.
    pub class: Option<ClassId>,
    /// The innermost enclosing member.
    pub member: Option<MemberId>,
    /// The innermost enclosing executable, used as the parent when
    /// building nested function types.
    pub enclosing: Option<MemberId>,
    /// Number of generic type parameters currently visible.
    pub type_parameter_count: usize,
}

impl ActiveClass {
    /// Fresh, empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a member is active.
    #[must_use]
    pub fn has_member(&self) -> bool {
        self.member.is_some()
    }

    /// Enter a class scope; returns the state to restore on exit.
    #[must_use]
    pub fn enter_class(&mut self, class: Option<ClassId>) -> ActiveClass {
        let saved = self.clone();
        self.class = class;
        saved
    }

    /// Enter a member scope (the class is inherited); returns the state to
    /// restore on exit.
    #[must_use]
    pub fn enter_member(&mut self, member: Option<MemberId>) -> ActiveClass {
        let saved = self.clone();
        self.member = member;
        self.enclosing = member;
        saved
    }

    /// Make `count` additional type parameters visible, with `enclosing`
    /// as the innermost executable; returns the state to restore on exit.
    #[must_use]
    pub fn enter_type_parameters(
        &mut self,
        enclosing: Option<MemberId>,
        count: usize,
    ) -> ActiveClass {
        let saved = self.clone();
        self.enclosing = enclosing;
        self.type_parameter_count += count;
        saved
    }

    /// Restore a state previously returned by an `enter_*` call.
    pub fn restore(&mut self, saved: ActiveClass) {
        *self = saved;
    }
}
