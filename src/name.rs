// Interned identifier names.
//
// Identifiers flow through tokens, AST nodes, and environment keys as u32
// handles; the backing strings are resolved only at the boundaries (pattern
// output, error messages).

use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// An interned identifier. Copy semantics, O(1) equality and hashing.
/// Resolve back to the string through the `StringInterner` that created it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(u32);

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

/// Deduplicating string-to-`Name` table. The same string always maps to the
/// same `Name`.
pub struct StringInterner {
    strings: Vec<Arc<str>>,
    lookup: FxHashMap<Arc<str>, u32>,
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl StringInterner {
    pub fn new() -> Self {
        Self {
            strings: Vec::new(),
            lookup: FxHashMap::default(),
        }
    }

    /// Intern a string, returning the existing `Name` if it was seen before.
    #[inline]
    pub fn intern(&mut self, s: &str) -> Name {
        if let Some(&index) = self.lookup.get(s) {
            return Name(index);
        }
        let index = self.strings.len() as u32;
        let stored: Arc<str> = Arc::from(s);
        self.strings.push(stored.clone());
        self.lookup.insert(stored, index);
        Name(index)
    }

    /// Resolve a `Name` back to its string.
    /// Panics if the `Name` came from a different interner.
    #[inline]
    pub fn resolve(&self, name: Name) -> &str {
        &self.strings[name.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_deduplicates() {
        let mut interner = StringInterner::new();
        let a = interner.intern("header");
        let b = interner.intern("header");
        let c = interner.intern("magic");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn resolve_round_trips() {
        let mut interner = StringInterner::new();
        let name = interner.intern("entry_count");
        assert_eq!(interner.resolve(name), "entry_count");
    }

    #[test]
    fn names_are_copy() {
        let mut interner = StringInterner::new();
        let name = interner.intern("x");
        let copy = name;
        assert_eq!(name, copy);
    }
}
