//! The global registry: FQN-keyed storage for every module-level value
//! (types, functions, variables), plus the builtin type table and the
//! specialization memoization cache (spec.md §3, §4.4, §4.1 "type
//! specialization").
//!
//! Grounded on the teacher crate's `modules/mod.rs` `ModuleTable` for the
//! "flat FQN-keyed map, one per compilation unit" shape, and on
//! `examples/original_source/spy/vm/list.py`'s module-level
//! `make_prebuilt_list_type` cache for why specializations must be memoized:
//! `list[i32]` requested twice must yield the *same* `W_Type`, or identity
//! checks elsewhere in the dispatcher would spuriously fail.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    fqn::Fqn,
    object::{TypeObj, Value},
};

/// The handful of always-present builtin types, resolved once at VM
/// construction so `Value::dynamic_type` never has to search a table
/// (spec.md §9 "builtin module surface").
#[derive(Debug, Clone)]
pub struct BuiltinTypes {
    pub type_type: Rc<TypeObj>,
    pub object_type: Rc<TypeObj>,
    pub dynamic_type: Rc<TypeObj>,
    pub none_type: Rc<TypeObj>,
    pub bool_type: Rc<TypeObj>,
    pub i32_type: Rc<TypeObj>,
    pub f64_type: Rc<TypeObj>,
    pub str_type: Rc<TypeObj>,
    pub function_type: Rc<TypeObj>,
    /// The unspecialized `list` template type (its `meta_op_GETITEM`
    /// capability produces specializations on demand).
    pub list_type: Rc<TypeObj>,
}

/// A flat FQN -> value table, one per compiled program (spec.md §4.4).
/// Functions, types, and global variables all live in the same namespace,
/// matching the "any two globals with the same FQN are the same object"
/// invariant (spec.md §3) — there is exactly one table to violate it in.
#[derive(Debug, Default)]
pub struct Registry {
    globals: IndexMap<Fqn, Value>,
    /// Memoized `list[T]`-style specializations, keyed by the template's FQN
    /// and the argument types' FQNs, so repeated requests for the same
    /// instantiation return the identical `W_Type` (spec.md §4.1).
    specializations: IndexMap<(Fqn, Vec<Fqn>), Fqn>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a new global. Redeclaring an existing FQN is a programming
    /// error in this crate (the Scoper is responsible for catching user-level
    /// redeclarations before they reach here), so it panics rather than
    /// silently overwriting — the one invariant the registry itself enforces.
    pub fn define(&mut self, fqn: Fqn, value: Value) {
        let prior = self.globals.insert(fqn.clone(), value);
        assert!(prior.is_none(), "duplicate global definition for {fqn}");
    }

    #[must_use]
    pub fn get(&self, fqn: &Fqn) -> Option<&Value> {
        self.globals.get(fqn)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Fqn, &Value)> {
        self.globals.iter()
    }

    /// Looks up a previously-memoized specialization, e.g. `list[i32]`.
    #[must_use]
    pub fn get_specialization(&self, template: &Fqn, args: &[Fqn]) -> Option<&Fqn> {
        self.specializations.get(&(template.clone(), args.to_vec()))
    }

    /// Records a newly-created specialization so future requests reuse it.
    pub fn set_specialization(&mut self, template: Fqn, args: Vec<Fqn>, result: Fqn) {
        self.specializations.insert((template, args), result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specialization_cache_round_trips() {
        let mut reg = Registry::new();
        let template = Fqn::module("builtins").join("list", vec![]);
        let arg = Fqn::module("builtins").join("i32", vec![]);
        let specialized = Fqn::module("builtins").join("list", vec![arg.clone()]);
        assert!(reg.get_specialization(&template, &[arg.clone()]).is_none());
        reg.set_specialization(template.clone(), vec![arg.clone()], specialized.clone());
        assert_eq!(reg.get_specialization(&template, &[arg]), Some(&specialized));
    }

    #[test]
    #[should_panic(expected = "duplicate global definition")]
    fn duplicate_definition_panics() {
        let mut reg = Registry::new();
        let fqn = Fqn::module("x");
        reg.define(fqn.clone(), Value::None);
        reg.define(fqn, Value::None);
    }
}
