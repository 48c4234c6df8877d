//! `OpArg` and `OpImpl`: the compile-time operator-dispatch descriptors
//! (spec.md §4.5).
//!
//! Grounded on `examples/original_source/spy/vm/modules/operator/attrop.py`
//! (the `OpArg` shape: a static type plus an optional known-at-compile-time
//! value) and `multimethod.py` (the `OpImpl` result of a dispatch: either
//! nothing, a direct callee substitution, or a fully custom lowering).

use std::rc::Rc;

use crate::{
    fqn::Fqn,
    object::{Color, TypeObj, Value},
    vm::Vm,
};

/// One operand as seen by the dispatcher: its static type, its color, and
/// (for blue operands whose value is already known) the constant itself.
/// `blue_value` lets a capability function fold `"a" + "b"` into `"ab"` at
/// compile time instead of emitting a call (spec.md §4.5). `span` is the
/// operand's source location, threaded through so the Type Checker can
/// point a mismatched-types diagnostic at the actual offending sub-expression
/// rather than the whole call site (spec.md §4.7, seed scenario 4).
#[derive(Debug, Clone)]
pub struct OpArg {
    pub w_type: Rc<TypeObj>,
    pub color: Color,
    pub blue_value: Option<Value>,
    pub span: crate::diagnostics::Span,
}

impl OpArg {
    #[must_use]
    pub fn red(w_type: Rc<TypeObj>) -> Self {
        Self {
            w_type,
            color: Color::Red,
            blue_value: None,
            span: crate::diagnostics::Span::synthesized(),
        }
    }

    #[must_use]
    pub fn blue(w_type: Rc<TypeObj>, value: Value) -> Self {
        Self {
            w_type,
            color: Color::Blue,
            blue_value: Some(value),
            span: crate::diagnostics::Span::synthesized(),
        }
    }

    /// Attaches (or overrides) the source span this operand was synthesized
    /// from, used by redshift as it visits each use site (spec.md §4.9 step 1).
    #[must_use]
    pub fn with_span(mut self, span: crate::diagnostics::Span) -> Self {
        self.span = span;
        self
    }

    #[must_use]
    pub fn is_blue(&self) -> bool {
        matches!(self.color, Color::Blue)
    }
}

/// The result of resolving an operator against a set of `OpArg`s (spec.md
/// §4.5, §4.6).
///
/// * `Null` — no implementation; the dispatcher's cascade continues to the
///   next rule, and if every rule produces `Null` the operator is a
///   `DispatchError`.
/// * `Simple` — redshift replaces the operator node with a direct call to
///   `callee`, passing `args` unchanged. This is the common case: arithmetic,
///   comparisons, plain attribute/item access.
/// * `General` — the capability function wants full control over the
///   lowering (e.g. short-circuiting `and`/`or`, or a getattr that expands
///   into more than one call). `callee` still names the function that
///   performs the custom lowering; how it interprets redshift is up to that
///   function rather than a fixed calling convention.
#[derive(Debug, Clone)]
pub enum OpImpl {
    Null,
    Simple { callee: Fqn, args: Vec<OpArg> },
    General { callee: Fqn },
}

/// A per-type capability function: `op_ADD`, `__GETATTR__`, `op_GETITEM`,
/// `meta_op_GETITEM`, and friends (spec.md §4.6 rule 3). These run *during
/// redshift*, as blue code, deciding how an operator node should be lowered
/// — they are not the operator's runtime implementation, which is whatever
/// `OpImpl` they hand back names as `callee`.
pub type CapabilityFn = dyn Fn(&mut Vm, &[OpArg]) -> OpImpl;

impl OpImpl {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn callee(&self) -> Option<&Fqn> {
        match self {
            Self::Null => None,
            Self::Simple { callee, .. } | Self::General { callee } => Some(callee),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{StorageCategory, TypeKind};
    use indexmap::IndexMap;
    use std::cell::RefCell;

    fn dummy_type() -> Rc<TypeObj> {
        Rc::new(TypeObj {
            fqn: Fqn::module("i32"),
            base: None,
            metaclass: None,
            storage: StorageCategory::Value,
            kind: TypeKind::I32,
            members: IndexMap::new(),
            capabilities: RefCell::new(IndexMap::new()),
        })
    }

    #[test]
    fn null_opimpl_has_no_callee() {
        assert_eq!(OpImpl::Null.callee(), None);
        assert!(OpImpl::Null.is_null());
    }

    #[test]
    fn blue_oparg_carries_its_constant() {
        let arg = OpArg::blue(dummy_type(), Value::Int(3));
        assert!(arg.is_blue());
        assert_eq!(arg.blue_value.unwrap().as_int(), Some(3));
    }
}
