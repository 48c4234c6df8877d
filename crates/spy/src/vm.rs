//! The VM: the object graph root that ties together interning, the global
//! registry, the multimethod and conversion tables, capability functions,
//! the tracer, and the step budget (spec.md §4, overall "Component Design").
//!
//! Grounded on the teacher crate's top-level `Vm`/engine struct (the single
//! object every other component borrows from) and on
//! `examples/original_source/spy/vm/vm.py`'s `SPyVM`, which plays the same
//! "owns every table, builtins included" role for the original
//! implementation.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    fqn::Fqn,
    intern::{Interner, Sym},
    multimethod::MultiMethodTable,
    object::{StorageCategory, TypeKind, TypeObj},
    opimpl::CapabilityFn,
    registry::{BuiltinTypes, Registry},
    resource::StepBudget,
    tracer::{BlueTracer, NoopTracer},
};

/// The compilation-unit-wide VM. Not `Send`/`Sync` — compilation is
/// single-threaded by design (spec.md §5) — so every table here is a plain
/// `Rc`/`RefCell`-free owned structure except where a type needs to be
/// shared by reference (`Rc<TypeObj>`, `Rc<FuncObj>`).
pub struct Vm {
    pub interner: Interner,
    pub registry: Registry,
    pub budget: StepBudget,
    pub tracer: Box<dyn BlueTracer>,
    multimethods: MultiMethodTable,
    builtins: BuiltinTypes,
    capability_fns: IndexMap<Fqn, Rc<CapabilityFn>>,
    dynamic_ops: IndexMap<Sym, Fqn>,
    conversions: IndexMap<(Fqn, Fqn), Fqn>,
    types: IndexMap<Fqn, Rc<TypeObj>>,
    member_read_intrinsic: Fqn,
}

impl Vm {
    /// Builds a VM with the builtin module installed (spec.md §9 "builtin
    /// module surface"). This is the only supported way to obtain a `Vm`:
    /// there is no builtin-free configuration, since the dispatcher's rule
    /// 1 (dynamic fast path) and the type checker both assume `dynamic`,
    /// `object`, and the numeric tower exist.
    #[must_use]
    pub fn new() -> Self {
        let member_read_intrinsic = Fqn::module("core").join("__member_read__", vec![]);
        let mut vm = Self {
            interner: Interner::new(),
            registry: Registry::new(),
            budget: StepBudget::default(),
            tracer: Box::new(NoopTracer),
            multimethods: MultiMethodTable::new(),
            builtins: bootstrap_builtin_types(),
            capability_fns: IndexMap::new(),
            dynamic_ops: IndexMap::new(),
            conversions: IndexMap::new(),
            types: IndexMap::new(),
            member_read_intrinsic,
        };
        for ty in vm.builtins.all() {
            vm.types.insert(ty.fqn.clone(), ty.clone());
        }
        crate::builtins::core::install(&mut vm);
        vm
    }

    #[must_use]
    pub fn builtins(&self) -> &BuiltinTypes {
        &self.builtins
    }

    #[must_use]
    pub fn multimethods(&self) -> &MultiMethodTable {
        &self.multimethods
    }

    pub fn multimethods_mut(&mut self) -> &mut MultiMethodTable {
        &mut self.multimethods
    }

    #[must_use]
    pub fn member_read_intrinsic(&self) -> Fqn {
        self.member_read_intrinsic.clone()
    }

    pub fn register_capability_fn(&mut self, fqn: Fqn, func: Rc<CapabilityFn>) {
        self.capability_fns.insert(fqn, func);
    }

    #[must_use]
    pub fn capability_fn(&self, fqn: &Fqn) -> Option<Rc<CapabilityFn>> {
        self.capability_fns.get(fqn).cloned()
    }

    pub fn register_dynamic_capability(&mut self, op: &str, fqn: Fqn) {
        let sym = self.interner.intern(op);
        self.dynamic_ops.insert(sym, fqn);
    }

    #[must_use]
    pub fn lookup_dynamic_capability(&mut self, op: &str) -> Option<Fqn> {
        let sym = self.interner.intern(op);
        self.dynamic_ops.get(&sym).cloned()
    }

    pub fn register_conversion(&mut self, from: &Rc<TypeObj>, to: &Rc<TypeObj>, fqn: Fqn) {
        self.conversions.insert((from.fqn.clone(), to.fqn.clone()), fqn);
    }

    #[must_use]
    pub fn lookup_conversion(&self, from: &Rc<TypeObj>, to: &Rc<TypeObj>) -> Option<Fqn> {
        self.conversions.get(&(from.fqn.clone(), to.fqn.clone())).cloned()
    }

    /// Looks up a previously-constructed type by FQN, builtins and
    /// specializations alike (spec.md §4.1 "type specialization").
    #[must_use]
    pub fn lookup_type(&self, fqn: &Fqn) -> Option<Rc<TypeObj>> {
        self.types.get(fqn).cloned()
    }

    /// Registers a type directly into the global type table, keyed by its
    /// own FQN. Used for user-defined struct/class types, which (unlike
    /// `list[T]`) have no metaclass-driven specialization path of their own.
    pub fn register_type(&mut self, ty: Rc<TypeObj>) {
        self.types.insert(ty.fqn.clone(), ty);
    }

    /// Returns the memoized `list[item]` specialization, constructing and
    /// caching it on first request (spec.md §4.1, §4.4). Two requests for
    /// `list[i32]` always return the identical `Rc<TypeObj>` — required for
    /// the dispatcher's type-identity checks to behave sanely.
    pub fn specialize_list(&mut self, item: Rc<TypeObj>) -> Rc<TypeObj> {
        let template_fqn = self.builtins.list_type.fqn.clone();
        if let Some(existing) = self.registry.get_specialization(&template_fqn, std::slice::from_ref(&item.fqn)) {
            return self.types.get(existing).expect("memoized specialization missing from type table").clone();
        }
        let specialized_fqn = self
            .builtins
            .list_type
            .fqn
            .join(self.builtins.list_type.fqn.symbol_name(), vec![item.fqn.clone()]);
        let specialized = Rc::new(TypeObj {
            fqn: specialized_fqn.clone(),
            base: Some(self.builtins.object_type.clone()),
            metaclass: Some(self.builtins.type_type.clone()),
            storage: StorageCategory::Reference,
            kind: TypeKind::List { item: Some(item.clone()) },
            members: indexmap::IndexMap::new(),
            capabilities: std::cell::RefCell::new(indexmap::IndexMap::new()),
        });
        self.types.insert(specialized_fqn.clone(), specialized.clone());
        self.registry.set_specialization(template_fqn, vec![item.fqn], specialized_fqn);
        specialized
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

fn new_type(name: &str, base: Option<Rc<TypeObj>>, metaclass: Option<Rc<TypeObj>>, kind: TypeKind) -> Rc<TypeObj> {
    Rc::new(TypeObj {
        fqn: Fqn::module("builtins").join(name, vec![]),
        base,
        metaclass,
        storage: StorageCategory::Value,
        kind,
        members: indexmap::IndexMap::new(),
        capabilities: std::cell::RefCell::new(indexmap::IndexMap::new()),
    })
}

/// Builds the always-present builtin type table (spec.md §9). `type_type`
/// has `metaclass: None`: it is its own metaclass, the one base case the
/// single-inheritance chain's "every type has a metaclass" rule excuses.
fn bootstrap_builtin_types() -> BuiltinTypes {
    let type_type = new_type("type", None, None, TypeKind::Type);
    let object_type = new_type("object", None, Some(type_type.clone()), TypeKind::Object);
    let dynamic_type = new_type("dynamic", Some(object_type.clone()), Some(type_type.clone()), TypeKind::Dynamic);
    let none_type = new_type("NoneType", Some(object_type.clone()), Some(type_type.clone()), TypeKind::NoneType);
    let bool_type = new_type("bool", Some(object_type.clone()), Some(type_type.clone()), TypeKind::Bool);
    let i32_type = new_type("i32", Some(object_type.clone()), Some(type_type.clone()), TypeKind::I32);
    let f64_type = new_type("f64", Some(object_type.clone()), Some(type_type.clone()), TypeKind::F64);
    let str_type = new_type("str", Some(object_type.clone()), Some(type_type.clone()), TypeKind::Str);
    let function_type = new_type("function", Some(object_type.clone()), Some(type_type.clone()), TypeKind::Function);
    // `list` gets its own metaclass rather than sharing `type_type`, so
    // `meta_op_GETITEM` (the capability that realizes `list[i32]`) is
    // registered once, on the one type that needs it, instead of leaking
    // subscript syntax onto every type in the system.
    let list_meta_type = new_type("_ListMeta", Some(type_type.clone()), Some(type_type.clone()), TypeKind::Type);
    let list_type = new_type(
        "list",
        Some(object_type.clone()),
        Some(list_meta_type),
        TypeKind::List { item: None },
    );
    BuiltinTypes {
        type_type,
        object_type,
        dynamic_type,
        none_type,
        bool_type,
        i32_type,
        f64_type,
        str_type,
        function_type,
        list_type,
    }
}

impl BuiltinTypes {
    fn all(&self) -> [&Rc<TypeObj>; 10] {
        [
            &self.type_type,
            &self.object_type,
            &self.dynamic_type,
            &self.none_type,
            &self.bool_type,
            &self.i32_type,
            &self.f64_type,
            &self.str_type,
            &self.function_type,
            &self.list_type,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_types_are_registered_in_the_type_table() {
        let vm = Vm::new();
        assert!(vm.lookup_type(&vm.builtins().i32_type.fqn).is_some());
    }

    #[test]
    fn list_specialization_is_memoized() {
        let mut vm = Vm::new();
        let i32_type = vm.builtins().i32_type.clone();
        let a = vm.specialize_list(i32_type.clone());
        let b = vm.specialize_list(i32_type);
        assert!(Rc::ptr_eq(&a, &b));
    }
}
