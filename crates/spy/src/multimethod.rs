//! The binary-operator multimethod table (spec.md §4.5, rule 4 of the
//! dispatch cascade).
//!
//! Ported directly from `examples/original_source/spy/vm/modules/operator/
//! multimethod.py`'s "poor man's multimethods": a flat table keyed by
//! `(op, Option<ltype>, Option<rtype>)`, with precise lookup tried first and
//! the two partial registrations (left-only, right-only) as fallbacks, in
//! that order. No implicit conversions or supertype search happen here —
//! that's the Type Checker's job upstream (spec.md §4.7).

use indexmap::IndexMap;
use std::rc::Rc;

use crate::{fqn::Fqn, object::TypeObj, opimpl::OpImpl};

type Key = (String, Option<Fqn>, Option<Fqn>);

/// A table of binary-operator implementations keyed by operator symbol and
/// operand types. Consulted after the dynamic-type fast path and the member
/// fast path have both failed (spec.md §4.6 rule 4).
#[derive(Debug, Default)]
pub struct MultiMethodTable {
    impls: IndexMap<Key, Fqn>,
}

impl MultiMethodTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one exact `(op, ltype, rtype)` implementation. Panics on a
    /// duplicate registration, same as the original: this table is built
    /// once at builtin-module load time, so a collision is a programming
    /// error in this crate, never a user-reachable condition.
    pub fn register(
        &mut self,
        op: &str,
        ltype: Option<&Rc<TypeObj>>,
        rtype: Option<&Rc<TypeObj>>,
        callee: Fqn,
    ) {
        let key = (op.to_string(), ltype.map(|t| t.fqn.clone()), rtype.map(|t| t.fqn.clone()));
        let prior = self.impls.insert(key, callee);
        assert!(prior.is_none(), "duplicate multimethod registration for {op}");
    }

    /// Registers `callee` for `op` whenever *either* operand is `atype`,
    /// leaving the other operand unconstrained. Mirrors
    /// `register_partial` in the original: two separate partial entries,
    /// one per side.
    pub fn register_partial(&mut self, op: &str, atype: &Rc<TypeObj>, callee: Fqn) {
        self.register(op, Some(atype), None, callee.clone());
        self.register(op, None, Some(atype), callee);
    }

    /// Looks up an implementation for `op(ltype, rtype)`, trying the precise
    /// key first, then left-only, then right-only, returning `OpImpl::Null`
    /// if none match.
    #[must_use]
    pub fn lookup(&self, op: &str, ltype: &Rc<TypeObj>, rtype: &Rc<TypeObj>) -> OpImpl {
        let candidates = [
            (op.to_string(), Some(ltype.fqn.clone()), Some(rtype.fqn.clone())),
            (op.to_string(), Some(ltype.fqn.clone()), None),
            (op.to_string(), None, Some(rtype.fqn.clone())),
        ];
        for key in candidates {
            if let Some(callee) = self.impls.get(&key) {
                return OpImpl::Simple {
                    callee: callee.clone(),
                    args: Vec::new(),
                };
            }
        }
        OpImpl::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{StorageCategory, TypeKind};
    use std::cell::RefCell;

    fn ty(name: &str, kind: TypeKind) -> Rc<TypeObj> {
        Rc::new(TypeObj {
            fqn: Fqn::module(name),
            base: None,
            metaclass: None,
            storage: StorageCategory::Value,
            kind,
            members: IndexMap::new(),
            capabilities: RefCell::new(IndexMap::new()),
        })
    }

    #[test]
    fn precise_lookup_wins_over_partial() {
        let mut mm = MultiMethodTable::new();
        let i32_t = ty("i32", TypeKind::I32);
        let dyn_t = ty("dynamic", TypeKind::Dynamic);
        let precise_callee = Fqn::module("builtins").join("op_add_i32_i32", vec![]);
        let partial_callee = Fqn::module("builtins").join("op_add_dynamic", vec![]);

        mm.register(
            "+",
            Some(&i32_t),
            Some(&i32_t),
            precise_callee.clone(),
        );
        mm.register_partial("+", &dyn_t, partial_callee);

        let result = mm.lookup("+", &i32_t, &i32_t);
        assert_eq!(result.callee(), Some(&precise_callee));
    }

    #[test]
    fn partial_lookup_matches_either_side() {
        let mut mm = MultiMethodTable::new();
        let i32_t = ty("i32", TypeKind::I32);
        let dyn_t = ty("dynamic", TypeKind::Dynamic);
        let callee = Fqn::module("builtins").join("op_add_dynamic", vec![]);
        mm.register_partial("+", &dyn_t, callee.clone());

        assert_eq!(mm.lookup("+", &dyn_t, &i32_t).callee(), Some(&callee));
        assert_eq!(mm.lookup("+", &i32_t, &dyn_t).callee(), Some(&callee));
    }

    #[test]
    fn unregistered_combination_is_null() {
        let mm = MultiMethodTable::new();
        let i32_t = ty("i32", TypeKind::I32);
        assert!(mm.lookup("+", &i32_t, &i32_t).is_null());
    }
}
