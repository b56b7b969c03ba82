//! The helper/lookup service boundary.
//!
//! Name resolution, literal canonicalization, and source-level error
//! reporting all go through the [`Helper`] trait; the translator never
//! resolves a name itself and never reports a user-facing error any other
//! way. [`TableHelper`] is the table-backed implementation used by tests
//! and simple embeddings.

use ember_core::{NameId, Pos};
use ember_ir::{ClassId, Literal, MemberId};
use rustc_hash::FxHashMap;

/// Name lookup, literal canonicalization, and error reporting.
pub trait Helper {
    /// Resolve a class name to its canonical entity.
    fn lookup_class(&self, name: NameId) -> Option<ClassId>;

    /// Resolve a top-level or static member name.
    fn lookup_static_member(&self, name: NameId) -> Option<MemberId>;

    /// Resolve an instance method name, for method extraction.
    fn lookup_method(&self, name: NameId) -> Option<MemberId>;

    /// Resolve a class's constructor.
    fn lookup_constructor(&self, class: ClassId) -> Option<MemberId>;

    /// Resolve a field name to its word offset within the object.
    fn lookup_field_offset(&self, name: NameId) -> Option<u32>;

    /// Canonicalize a literal value.
    fn canonicalize(&self, literal: Literal) -> Literal {
        literal
    }

    /// Report a source-level translation error. Translation continues; the
    /// offending expression becomes a throwing fragment.
    fn report_error(&mut self, pos: Pos, message: &str);
}

/// A table-backed [`Helper`] that records reported errors.
#[derive(Debug, Default)]
pub struct TableHelper {
    classes: FxHashMap<NameId, ClassId>,
    static_members: FxHashMap<NameId, MemberId>,
    methods: FxHashMap<NameId, MemberId>,
    constructors: FxHashMap<ClassId, MemberId>,
    field_offsets: FxHashMap<NameId, u32>,
    errors: Vec<(Pos, String)>,
    next_class: u32,
    next_member: u32,
}

impl TableHelper {
    /// Create an empty helper.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class, returning its fresh id.
    pub fn register_class(&mut self, name: NameId) -> ClassId {
        let id = ClassId(self.next_class);
        self.next_class += 1;
        self.classes.insert(name, id);
        id
    }

    /// Register a static member, returning its fresh id.
    pub fn register_static_member(&mut self, name: NameId) -> MemberId {
        let id = self.next_member_id();
        self.static_members.insert(name, id);
        id
    }

    /// Register an instance method, returning its fresh id.
    pub fn register_method(&mut self, name: NameId) -> MemberId {
        let id = self.next_member_id();
        self.methods.insert(name, id);
        id
    }

    /// Register a class's constructor, returning its fresh id.
    pub fn register_constructor(&mut self, class: ClassId) -> MemberId {
        let id = self.next_member_id();
        self.constructors.insert(class, id);
        id
    }

    /// Register a field's word offset.
    pub fn register_field(&mut self, name: NameId, offset: u32) {
        self.field_offsets.insert(name, offset);
    }

    /// Errors reported so far, in order.
    #[must_use]
    pub fn errors(&self) -> &[(Pos, String)] {
        &self.errors
    }

    fn next_member_id(&mut self) -> MemberId {
        let id = MemberId(self.next_member);
        self.next_member += 1;
        id
    }
}

impl Helper for TableHelper {
    fn lookup_class(&self, name: NameId) -> Option<ClassId> {
        self.classes.get(&name).copied()
    }

    fn lookup_static_member(&self, name: NameId) -> Option<MemberId> {
        self.static_members.get(&name).copied()
    }

    fn lookup_method(&self, name: NameId) -> Option<MemberId> {
        self.methods.get(&name).copied()
    }

    fn lookup_constructor(&self, class: ClassId) -> Option<MemberId> {
        self.constructors.get(&class).copied()
    }

    fn lookup_field_offset(&self, name: NameId) -> Option<u32> {
        self.field_offsets.get(&name).copied()
    }

    fn report_error(&mut self, pos: Pos, message: &str) {
        self.errors.push((pos, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::NameTable;

    #[test]
    fn test_registration_and_lookup() {
        let mut names = NameTable::new();
        let foo = names.intern("foo");
        let bar = names.intern("bar");

        let mut helper = TableHelper::new();
        let class = helper.register_class(foo);
        let member = helper.register_static_member(bar);
        let ctor = helper.register_constructor(class);

        assert_eq!(helper.lookup_class(foo), Some(class));
        assert_eq!(helper.lookup_static_member(bar), Some(member));
        assert_eq!(helper.lookup_constructor(class), Some(ctor));
        assert_eq!(helper.lookup_class(bar), None);
    }

    #[test]
    fn test_error_recording_preserves_order() {
        let mut helper = TableHelper::new();
        helper.report_error(Pos::new(3), "first");
        helper.report_error(Pos::new(9), "second");
        assert_eq!(helper.errors().len(), 2);
        assert_eq!(helper.errors()[0].1, "first");
        assert_eq!(helper.errors()[1].0, Pos::new(9));
    }

    #[test]
    fn test_default_canonicalize_is_identity() {
        let helper = TableHelper::new();
        assert_eq!(helper.canonicalize(Literal::Int(7)), Literal::Int(7));
    }
}
