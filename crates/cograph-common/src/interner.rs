//! String interner for node names and values.
//!
//! Node headers never store string bytes. Names, values and attribute blobs are
//! interned once and referenced by a u32 `Atom`, so equality checks between
//! already-interned strings are integer comparisons.
//!
//! The interner owns its string storage, separate from the node arena.
//! Rolling the node arena back to a checkpoint never invalidates an atom.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An interned string identifier.
///
/// Atoms are cheap to copy (just a u32) and can be compared with == in O(1).
/// To get the actual string, use `Interner::resolve(atom)`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, PartialOrd, Ord,
)]
pub struct Atom(pub u32);

impl Atom {
    /// A sentinel value representing no atom / empty string.
    pub const NONE: Atom = Atom(0);

    /// Check if this is the empty/none atom.
    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Check if this atom refers to a non-empty string.
    #[inline]
    pub fn is_some(self) -> bool {
        self.0 != 0
    }

    /// Get the raw index value.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

const COMMON_STRINGS: &[&str] = &[
    // Structural names most grammars produce
    "program",
    "module",
    "statement",
    "expression",
    "identifier",
    "literal",
    "block",
    "function",
    "parameter",
    "argument",
    "call",
    "assignment",
    "declaration",
    "return",
    "if",
    "else",
    "for",
    "while",
    "type",
    // Operators
    "+",
    "-",
    "*",
    "/",
    "=",
    "==",
    "!=",
    "<",
    ">",
    "&&",
    "||",
    "!",
];

/// String interner that deduplicates strings and returns Atom handles.
///
/// # Example
/// ```
/// use cograph_common::interner::Interner;
/// let mut interner = Interner::new();
/// let a1 = interner.intern("hello");
/// let a2 = interner.intern("hello");
/// assert_eq!(a1, a2); // Same atom for same string
/// assert_eq!(interner.resolve(a1), "hello");
/// ```
#[derive(Debug)]
pub struct Interner {
    /// Map from string to atom index
    map: FxHashMap<Arc<str>, Atom>,
    /// Vector of all interned strings (index 0 is empty string)
    strings: Vec<Arc<str>>,
    /// Total bytes of interned string content
    bytes: usize,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    /// Create a new interner with the empty string pre-interned at index 0.
    pub fn new() -> Self {
        let mut interner = Interner {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(256),
            bytes: 0,
        };
        // Index 0 is reserved for empty/none
        let empty: Arc<str> = Arc::from("");
        interner.strings.push(empty.clone());
        interner.map.insert(empty, Atom::NONE);
        interner
    }

    /// Intern a string, returning its Atom handle.
    /// If the string was already interned, returns the existing Atom.
    #[inline]
    pub fn intern(&mut self, s: &str) -> Atom {
        if let Some(&atom) = self.map.get(s) {
            return atom;
        }
        self.insert_new(Arc::from(s))
    }

    /// Intern an owned String, avoiding a copy when it is new.
    #[inline]
    pub fn intern_owned(&mut self, s: String) -> Atom {
        if let Some(&atom) = self.map.get(s.as_str()) {
            return atom;
        }
        self.insert_new(Arc::from(s.into_boxed_str()))
    }

    fn insert_new(&mut self, owned: Arc<str>) -> Atom {
        let atom = Atom(self.strings.len() as u32);
        self.bytes += owned.len();
        tracing::trace!(atom = atom.0, len = owned.len(), "interned new string");
        self.strings.push(owned.clone());
        self.map.insert(owned, atom);
        atom
    }

    /// Look up the atom of an already-interned string without interning it.
    #[inline]
    pub fn id_of(&self, s: &str) -> Option<Atom> {
        self.map.get(s).copied()
    }

    /// Resolve an Atom back to its string value.
    /// Returns empty string if atom is out of bounds.
    #[inline]
    pub fn resolve(&self, atom: Atom) -> &str {
        self.strings
            .get(atom.0 as usize)
            .map(|s| s.as_ref())
            .unwrap_or("")
    }

    /// Try to resolve an Atom, returning None if invalid.
    #[inline]
    pub fn try_resolve(&self, atom: Atom) -> Option<&str> {
        self.strings.get(atom.0 as usize).map(|s| s.as_ref())
    }

    /// Intern an optional string; `None` maps to `Atom::NONE`.
    #[inline]
    pub fn intern_opt(&mut self, s: Option<&str>) -> Atom {
        match s {
            Some(s) => self.intern(s),
            None => Atom::NONE,
        }
    }

    /// Resolve an atom, returning `None` for `Atom::NONE`.
    #[inline]
    pub fn resolve_opt(&self, atom: Atom) -> Option<&str> {
        if atom.is_none() {
            None
        } else {
            self.try_resolve(atom)
        }
    }

    /// Get the number of interned strings.
    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if the interner is empty (only has the empty string).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.len() <= 1
    }

    /// Total bytes of string content held by the interner.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.bytes
    }

    /// Pre-intern common node names and operators.
    pub fn intern_common(&mut self) {
        for s in COMMON_STRINGS {
            self.intern(s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let mut interner = Interner::new();
        let x1 = interner.intern("x");
        let x2 = interner.intern("x");
        let y = interner.intern("y");
        assert_eq!(x1, x2);
        assert_ne!(x1, y);
        assert_eq!(interner.len(), 3);
    }

    #[test]
    fn test_empty_string_is_none() {
        let mut interner = Interner::new();
        assert_eq!(interner.intern(""), Atom::NONE);
        assert!(interner.is_empty());
        assert_eq!(interner.resolve_opt(Atom::NONE), None);
    }

    #[test]
    fn test_id_of_does_not_intern() {
        let mut interner = Interner::new();
        assert_eq!(interner.id_of("missing"), None);
        assert_eq!(interner.len(), 1);

        let atom = interner.intern_owned("present".to_string());
        assert_eq!(interner.id_of("present"), Some(atom));
        assert_eq!(interner.resolve(atom), "present");
    }

    #[test]
    fn test_resolve_out_of_bounds() {
        let interner = Interner::new();
        assert_eq!(interner.resolve(Atom(99)), "");
        assert_eq!(interner.try_resolve(Atom(99)), None);
    }

    #[test]
    fn test_intern_common_is_stable() {
        let mut interner = Interner::new();
        interner.intern_common();
        let before = interner.len();
        let expr = interner.id_of("expression").unwrap();
        interner.intern_common();
        assert_eq!(interner.len(), before);
        assert_eq!(interner.intern("expression"), expr);
    }

    #[test]
    fn test_byte_len_counts_unique_content() {
        let mut interner = Interner::new();
        interner.intern("abc");
        interner.intern("abc");
        interner.intern("de");
        assert_eq!(interner.byte_len(), 5);
    }
}
