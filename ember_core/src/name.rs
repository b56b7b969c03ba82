//! Name interning for O(1) selector and identifier comparison.
//!
//! Every identifier the frontend sees (selectors, class names, member
//! names) is interned once into a [`NameTable`] and referred to by a
//! lightweight [`NameId`]. The table is built while decoding a program and
//! read-only afterwards, so concurrent translations can share it.

use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// A handle to an interned name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct NameId(pub u32);

impl NameId {
    /// Create a name id from a raw index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        NameId(index)
    }

    /// Get the raw index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "name#{}", self.0)
    }
}

/// An interning table mapping names to dense [`NameId`]s.
#[derive(Debug, Default)]
pub struct NameTable {
    names: Vec<Arc<str>>,
    index: FxHashMap<Arc<str>, NameId>,
}

impl NameTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a name, returning the id of the unique copy.
    pub fn intern(&mut self, name: &str) -> NameId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = NameId::new(self.names.len() as u32);
        let owned: Arc<str> = name.into();
        self.names.push(owned.clone());
        self.index.insert(owned, id);
        id
    }

    /// Resolve an id back to its string content.
    #[must_use]
    pub fn resolve(&self, id: NameId) -> &str {
        &self.names[id.index()]
    }

    /// Number of distinct names interned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
