//! Function types and function values (spec.md §4.3 "Functions").
//!
//! Grounded on the teacher crate's `function.rs`/`signature.rs` for the
//! "`FuncType` describes the shape, `Func` carries the body" split, and on
//! `examples/original_source/spy/vm/builtin.py`'s `functype_from_sig` for how
//! a native implementation's parameter/return types become a `FuncType`
//! without re-deriving them from Rust's own type system.

use std::{fmt, rc::Rc};

use crate::{
    ast,
    diagnostics::CompileResult,
    fqn::Fqn,
    object::{Color, TypeObj, Value},
    vm::Vm,
};

/// One formal parameter: a name (for keyword-style diagnostics) and a type.
#[derive(Debug, Clone)]
pub struct FuncParam {
    pub name: String,
    pub w_type: Rc<TypeObj>,
}

/// The type of a function: spec.md §4.3 `W_FuncType`. Two functions with
/// structurally equal `FuncType`s are interchangeable at call sites (this is
/// what the Type Checker compares function-typed arguments against).
#[derive(Debug, Clone)]
pub struct FuncType {
    pub params: Vec<FuncParam>,
    pub ret: Rc<TypeObj>,
    pub color: Color,
}

impl FuncType {
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("def(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", p.name, p.w_type)?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

/// A native implementation callable from the blue evaluator and (when
/// redshifted) from generated code. Takes already-typechecked arguments.
pub type NativeFn = dyn Fn(&mut Vm, &[Value]) -> CompileResult<Value>;

/// The body of a `Func`: either a Rust closure (builtin ops, capability
/// functions) or a parsed AST function body (user-defined `def`s).
pub enum FuncBody {
    Builtin(Rc<NativeFn>),
    Ast(Rc<ast::FuncDef>),
}

impl fmt::Debug for FuncBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(_) => f.write_str("FuncBody::Builtin(..)"),
            Self::Ast(def) => f.debug_tuple("FuncBody::Ast").field(&def.name).finish(),
        }
    }
}

/// A wrapped function: spec.md §4.3 `W_Func`. Every `Func` is itself a
/// global with its own FQN — builtins no less than user-defined `def`s —
/// so the dispatcher can treat `OpImpl::Simple` callees uniformly.
#[derive(Debug)]
pub struct FuncObj {
    pub fqn: Fqn,
    pub functype: FuncType,
    pub body: FuncBody,
}

impl FuncObj {
    #[must_use]
    pub fn new_builtin(
        fqn: Fqn,
        params: Vec<FuncParam>,
        ret: Rc<TypeObj>,
        color: Color,
        body: impl Fn(&mut Vm, &[Value]) -> CompileResult<Value> + 'static,
    ) -> Self {
        Self {
            fqn,
            functype: FuncType { params, ret, color },
            body: FuncBody::Builtin(Rc::new(body)),
        }
    }

    #[must_use]
    pub fn new_ast(fqn: Fqn, functype: FuncType, def: Rc<ast::FuncDef>) -> Self {
        Self {
            fqn,
            functype,
            body: FuncBody::Ast(def),
        }
    }

    #[must_use]
    pub fn color(&self) -> Color {
        self.functype.color
    }
}

impl fmt::Display for FuncObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.fqn, self.functype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fqn::Fqn;

    #[test]
    fn functype_display_matches_signature_shape() {
        let ft = FuncType {
            params: vec![FuncParam {
                name: "x".to_string(),
                w_type: dummy_type("i32"),
            }],
            ret: dummy_type("i32"),
            color: Color::Red,
        };
        assert_eq!(ft.to_string(), "def(x: i32) -> i32");
    }

    fn dummy_type(name: &str) -> Rc<TypeObj> {
        Rc::new(TypeObj {
            fqn: Fqn::module(name),
            base: None,
            metaclass: None,
            storage: crate::object::StorageCategory::Value,
            kind: crate::object::TypeKind::I32,
            members: indexmap::IndexMap::new(),
            capabilities: std::cell::RefCell::new(indexmap::IndexMap::new()),
        })
    }
}
