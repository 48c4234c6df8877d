//! String interning for symbol names, attribute names, and FQN parts.
//!
//! Blue dispatch compares symbol names (attribute names, operator names,
//! `op_*` capability names) extremely often — once per operator node visited
//! during redshift. Interning turns those comparisons into `u32` equality
//! instead of `str` comparison, and lets `Sym` be used as a hash map key
//! without re-hashing the underlying bytes on every lookup.
//!
//! Mirrors the `StringId`/interner split in the teacher crate's `intern.rs`,
//! simplified: SPy has no bytecode operand encoding to fit into, so `Sym` is
//! just an index into the session's string table, not a tagged offset space.

use std::fmt;

use ahash::AHashMap;

/// Interned string identifier.
///
/// Two `Sym`s are equal iff the strings they were interned from are equal.
/// Copy + Hash + Eq, so it is free to use as a hash map key or to clone into
/// an `Fqn` part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sym(u32);

/// Owns the string table a `Sym` indexes into.
///
/// One `Interner` per `Vm`; its lifetime equals the compilation job per
/// spec.md §5 ("Memory for wrapped objects is owned by the VM instance").
#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<Box<str>>,
    lookup: AHashMap<Box<str>, Sym>,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `s`, returning the existing `Sym` if already interned.
    pub fn intern(&mut self, s: &str) -> Sym {
        if let Some(&id) = self.lookup.get(s) {
            return id;
        }
        let id = Sym(u32::try_from(self.strings.len()).expect("interner overflowed u32"));
        self.strings.push(Box::from(s));
        self.lookup.insert(Box::from(s), id);
        id
    }

    /// Resolves a `Sym` back to its string.
    ///
    /// # Panics
    /// Panics if `sym` was not produced by this interner.
    #[must_use]
    pub fn resolve(&self, sym: Sym) -> &str {
        &self.strings[sym.0 as usize]
    }
}

impl fmt::Display for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sym({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_string_interns_to_same_sym() {
        let mut i = Interner::new();
        let a = i.intern("hello");
        let b = i.intern("hello");
        assert_eq!(a, b);
        assert_eq!(i.resolve(a), "hello");
    }

    #[test]
    fn different_strings_intern_to_different_syms() {
        let mut i = Interner::new();
        let a = i.intern("foo");
        let b = i.intern("bar");
        assert_ne!(a, b);
    }
}
