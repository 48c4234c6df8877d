//! The object model (spec.md §4.1): wrapped values, the `W_Type` metatype,
//! and member descriptors.
//!
//! Grounded on the teacher crate's `object.rs`/`types/type.rs` for the
//! "tagged enum of concrete kinds, one of them a generic user-instance
//! variant" shape, and on `examples/original_source/spy/vm/builtin.py`'s
//! `builtin_type` decorator / `__spy_members__` for where `Member`
//! descriptors come from and what they drive (attribute dispatch, spec.md
//! §4.6 rule 2 "member fast path").

use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{fqn::Fqn, function::FuncObj, intern::Sym};

/// Compile-time (`Blue`) vs runtime (`Red`) color, applied to both
/// functions and expressions (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Blue,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Red => "red",
            Self::Blue => "blue",
        })
    }
}

/// Where a type's instances live: a flat value-buffer (struct/record types,
/// per spec.md §9's "raw-buffer-backed" resolution of the Open Question) or
/// a conventional heap-allocated reference object (lists, user classes with
/// mutable identity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageCategory {
    Value,
    Reference,
}

/// A `name -> slot` attribute descriptor populated from annotated fields,
/// mirroring `Annotated[W_T, Member("name")]` in the original Python
/// implementation. Consulted by the attribute dispatcher's member fast path
/// (spec.md §4.6 rule 2) before any `op_*` capability lookup.
#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    pub offset: usize,
    pub w_type: Rc<TypeObj>,
}

/// A coarse tag for the handful of concrete representations `Value` can
/// hold, so primitive dispatch doesn't need to downcast through `TypeObj`.
/// Mirrors the role of the teacher crate's `types::Type` enum, trimmed to
/// what this crate's builtin module set actually needs (spec.md §9
/// "builtin module surface").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// The type of `None`.
    NoneType,
    /// The universal dynamic type (spec.md §4.6 rule 1).
    Dynamic,
    /// The root of the single-inheritance chain.
    Object,
    /// The metaclass of every `W_Type`.
    Type,
    Bool,
    I32,
    F64,
    Str,
    Function,
    /// `list` itself (unspecialized) when `item` is `None`, or a
    /// specialization `list[T]` when `item` is `Some(T)`.
    List { item: Option<Rc<TypeObj>> },
    /// A user-defined struct/class type (raw-buffer-backed, spec.md §9).
    Struct,
}

/// A wrapped type: spec.md §3 `W_Type`.
///
/// `capabilities` stores `op_*`/dunder-style blue functions by *FQN*, not by
/// direct `Rc`, per spec.md §9's design note on cyclic type references: a
/// type whose own `op_CALL` produces an `OpImpl` referencing itself would
/// otherwise require a reference cycle. Looking the callee up through the
/// VM's global table each time keeps ownership single-directional: the VM
/// owns the type, the type only remembers a name. The table is keyed by
/// [`Sym`], not `String`: every lookup here happens once per operator node
/// visited during redshift, so the comparison the dispatcher does most often
/// is a `u32` equality rather than a `str` compare.
#[derive(Debug)]
pub struct TypeObj {
    pub fqn: Fqn,
    pub base: Option<Rc<TypeObj>>,
    pub metaclass: Option<Rc<TypeObj>>,
    pub storage: StorageCategory,
    pub kind: TypeKind,
    pub members: IndexMap<String, Member>,
    pub capabilities: RefCell<IndexMap<Sym, Fqn>>,
}

impl TypeObj {
    /// Registers (or replaces) a capability function under its interned
    /// dunder-style name (`op_GETITEM`, `__GETATTR__`, `meta_op_GETITEM`,
    /// ...). Callers intern the name themselves (`Vm::interner` is the only
    /// source of a `Sym`), so this type has no need to borrow the VM.
    pub fn set_capability(&self, sym: Sym, func_fqn: Fqn) {
        self.capabilities.borrow_mut().insert(sym, func_fqn);
    }

    /// Looks up a capability function by interned name, walking the base
    /// chain so subclasses inherit capabilities they don't override — the
    /// same rule CPython's MRO lookup applies to dunder methods.
    #[must_use]
    pub fn lookup_capability(&self, sym: Sym) -> Option<Fqn> {
        if let Some(fqn) = self.capabilities.borrow().get(&sym) {
            return Some(fqn.clone());
        }
        self.base.as_ref().and_then(|base| base.lookup_capability(sym))
    }

    /// Looks up a capability on this type's *metaclass*, used for
    /// metaclass-level generics such as `list[T]` (spec.md §4.6 rule 3,
    /// `meta_op_GETITEM`).
    #[must_use]
    pub fn lookup_meta_capability(&self, sym: Sym) -> Option<Fqn> {
        self.metaclass.as_ref().and_then(|m| m.lookup_capability(sym))
    }

    /// `a ∈ L.members` (spec.md §4.6 rule 2), walking the base chain so
    /// inherited members are visible too.
    #[must_use]
    pub fn lookup_member(&self, name: &str) -> Option<&Member> {
        if let Some(member) = self.members.get(name) {
            return Some(member);
        }
        self.base.as_ref().and_then(|base| base.lookup_member(name))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.fqn.symbol_name()
    }
}

impl PartialEq for TypeObj {
    /// Structural equality by FQN, per spec.md §3's invariant that no two
    /// distinct `W_Type` objects share an FQN — so FQN equality *is* type
    /// identity.
    fn eq(&self, other: &Self) -> bool {
        self.fqn == other.fqn
    }
}
impl Eq for TypeObj {}

impl fmt::Display for TypeObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// `is_subclass(a, b)`: walks `a`'s base chain looking for `b` (spec.md
/// §4.1).
#[must_use]
pub fn is_subclass(a: &Rc<TypeObj>, b: &Rc<TypeObj>) -> bool {
    let mut cur = a.clone();
    loop {
        if cur == *b {
            return true;
        }
        match cur.base.clone() {
            Some(next) => cur = next,
            None => return false,
        }
    }
}

/// A struct/class instance: a flat value buffer addressed by `Member::offset`
/// (spec.md §9, raw-buffer-backed canonical form). `Rc<Instance>` gives
/// reference semantics even though storage is an inline buffer, matching
/// `StorageCategory::Value` types that are nonetheless shared by reference
/// once boxed into a `Value::Instance`.
#[derive(Debug)]
pub struct Instance {
    pub ty: Rc<TypeObj>,
    pub slots: RefCell<Vec<Value>>,
}

/// A wrapped value: spec.md §3 `W`. The unit of exchange between the blue
/// evaluator, the dispatcher, and builtin functions.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Type(Rc<TypeObj>),
    Func(Rc<FuncObj>),
    /// A `list[T]` value together with its concrete specialized type, so
    /// `dynamic_type` doesn't need to re-derive `T` from the elements.
    List(Rc<RefCell<Vec<Value>>>, Rc<TypeObj>),
    Instance(Rc<Instance>),
}

impl Value {
    /// `dynamic_type(v)`: returns the wrapped value's type pointer
    /// (spec.md §4.1). Requires the VM's builtin type table for the
    /// primitive cases, since primitives don't carry a `Rc<TypeObj>` inline.
    #[must_use]
    pub fn dynamic_type(&self, builtins: &crate::registry::BuiltinTypes) -> Rc<TypeObj> {
        match self {
            Self::None => builtins.none_type.clone(),
            Self::Bool(_) => builtins.bool_type.clone(),
            Self::Int(_) => builtins.i32_type.clone(),
            Self::Float(_) => builtins.f64_type.clone(),
            Self::Str(_) => builtins.str_type.clone(),
            Self::Type(_) => builtins.type_type.clone(),
            Self::Func(_) => builtins.function_type.clone(),
            Self::List(_, ty) => ty.clone(),
            Self::Instance(instance) => instance.ty.clone(),
        }
    }

    /// Best-effort unwrap to a blue string, used by attribute-name
    /// resolution (spec.md §4.6's "blue string attribute name").
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_type(&self) -> Option<&Rc<TypeObj>> {
        match self {
            Self::Type(t) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Type(t) => write!(f, "<type '{t}'>"),
            Self::Func(func) => write!(f, "<function {}>", func.fqn),
            Self::List(items, _) => {
                f.write_str("[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Instance(inst) => write!(f, "<{} instance>", inst.ty.name()),
        }
    }
}
