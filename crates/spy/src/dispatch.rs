//! The Operator Dispatcher (spec.md §4.6): the deterministic cascade that
//! turns an operator node's operand types into an `OpImpl`.
//!
//! Grounded on `examples/original_source/spy/vm/modules/operator/attrop.py`
//! for the rule ordering (dynamic fast path, member fast path, per-type
//! capability, multimethod table, NULL) and on the teacher crate's
//! dispatch-cascade functions in `bytecode/vm/binary.rs` for the "one
//! function per cascade, short-circuit on first match" shape. Every rule
//! here returns as soon as it produces a non-`Null` result — determinism
//! falls directly out of that, since none of the steps iterate an unordered
//! container.
//!
//! Capability functions run "as a blue function" (spec.md §4.6 rule 3) and
//! so take `&mut Vm`: resolving `list[i32]` has the side effect of
//! registering (or reusing) a specialized global, which is exactly the kind
//! of blue-evaluation effect spec.md §4.8 requires to be idempotent.

use crate::{
    ast::{BinOp, CompareOp, UnaryOp},
    object::TypeKind,
    opimpl::{OpArg, OpImpl},
    tracer::DispatchEvent,
    vm::Vm,
};

fn is_dynamic(arg: &OpArg) -> bool {
    matches!(arg.w_type.kind, TypeKind::Dynamic)
}

/// Reports the cascade's outcome to the tracer and hands the `OpImpl` back
/// unchanged, so every `dispatch_*` return site is also a trace point
/// (spec.md §4.6: one `DispatchEvent` per operator node visited).
fn trace(vm: &mut Vm, op: &str, rule: u8, result: OpImpl) -> OpImpl {
    vm.tracer.on_dispatch(DispatchEvent {
        op: op.to_string(),
        rule,
        callee: result.callee().cloned(),
    });
    result
}

/// Rule 1 shared by every cascade: if either operand (or the sole operand,
/// for unary) is the dynamic type, dispatch to the generic handler
/// registered for `op` under the `dynamic_*` name.
fn dynamic_fast_path(vm: &mut Vm, op: &str) -> Option<OpImpl> {
    vm.lookup_dynamic_capability(op).map(|callee| OpImpl::Simple { callee, args: Vec::new() })
}

/// Binary arithmetic (spec.md §4.6, rules 1/3/4).
#[must_use]
pub fn dispatch_binary(vm: &mut Vm, op: BinOp, l: &OpArg, r: &OpArg) -> OpImpl {
    let op_name = op.to_string();
    if is_dynamic(l) || is_dynamic(r) {
        if let Some(result) = dynamic_fast_path(vm, &format!("dynamic_{op_name}")) {
            return trace(vm, &op_name, 1, result);
        }
    }
    // Rule 3: per-type capability `op_<Op>` on L.
    let cap_sym = vm.interner.intern(&format!("op_{op_name}"));
    if let Some(fqn) = l.w_type.lookup_capability(cap_sym) {
        if let Some(func) = vm.capability_fn(&fqn) {
            let result = func(vm, &[l.clone(), r.clone()]);
            if !result.is_null() {
                return trace(vm, &op_name, 3, result);
            }
        }
    }
    // Rule 4: multimethod table.
    let result = vm.multimethods().lookup(&op_name, &l.w_type, &r.w_type);
    if !result.is_null() {
        return trace(vm, &op_name, 4, result);
    }
    trace(vm, &op_name, 5, OpImpl::Null)
}

/// Comparisons follow the same cascade as binary arithmetic (spec.md §4.6:
/// "for unary, item, call, and conversion operators, the analogous cascade
/// uses the corresponding capability names" — comparisons are the binary
/// case with a different operator-name namespace).
#[must_use]
pub fn dispatch_compare(vm: &mut Vm, op: CompareOp, l: &OpArg, r: &OpArg) -> OpImpl {
    let op_name = op.to_string();
    if is_dynamic(l) || is_dynamic(r) {
        if let Some(result) = dynamic_fast_path(vm, &format!("dynamic_{op_name}")) {
            return trace(vm, &op_name, 1, result);
        }
    }
    let cap_sym = vm.interner.intern(&format!("op_{op_name}"));
    if let Some(fqn) = l.w_type.lookup_capability(cap_sym) {
        if let Some(func) = vm.capability_fn(&fqn) {
            let result = func(vm, &[l.clone(), r.clone()]);
            if !result.is_null() {
                return trace(vm, &op_name, 3, result);
            }
        }
    }
    let result = vm.multimethods().lookup(&op_name, &l.w_type, &r.w_type);
    if !result.is_null() {
        return trace(vm, &op_name, 4, result);
    }
    trace(vm, &op_name, 5, OpImpl::Null)
}

/// Unary operators: rules 1 and 3 only — there is no second operand for a
/// multimethod table to key on, so the cascade ends at the per-type
/// capability (spec.md §4.6).
#[must_use]
pub fn dispatch_unary(vm: &mut Vm, op: UnaryOp, operand: &OpArg) -> OpImpl {
    let op_name = op.to_string();
    if is_dynamic(operand) {
        if let Some(result) = dynamic_fast_path(vm, &format!("dynamic_{op_name}")) {
            return trace(vm, &op_name, 1, result);
        }
    }
    let cap_sym = vm.interner.intern(&format!("op_{op_name}"));
    if let Some(fqn) = operand.w_type.lookup_capability(cap_sym) {
        if let Some(func) = vm.capability_fn(&fqn) {
            let result = func(vm, &[operand.clone()]);
            if !result.is_null() {
                return trace(vm, &op_name, 3, result);
            }
        }
    }
    trace(vm, &op_name, 5, OpImpl::Null)
}

/// Attribute access (spec.md §4.6 rule 2 "member fast path", then rule 3
/// `__GET_<attr>__` and finally `__GETATTR__`).
#[must_use]
pub fn dispatch_getattr(vm: &mut Vm, base: &OpArg, attr: &str) -> OpImpl {
    if is_dynamic(base) {
        if let Some(result) = dynamic_fast_path(vm, "dynamic_GETATTR") {
            return trace(vm, "GETATTR", 1, result);
        }
    }
    // Rule 2: member fast path. A member access doesn't go through a
    // function call at all — redshift (not this module) synthesizes a
    // direct slot read, so the dispatcher simply reports "handled" via a
    // sentinel `General` naming the member-read intrinsic.
    if base.w_type.lookup_member(attr).is_some() {
        return trace(vm, "GETATTR", 2, OpImpl::General { callee: vm.member_read_intrinsic() });
    }
    let get_attr_sym = vm.interner.intern(&format!("__GET_{attr}__"));
    if let Some(fqn) = base.w_type.lookup_capability(get_attr_sym) {
        if let Some(func) = vm.capability_fn(&fqn) {
            let result = func(vm, std::slice::from_ref(base));
            if !result.is_null() {
                return trace(vm, "GETATTR", 3, result);
            }
        }
    }
    let getattr_sym = vm.interner.intern("__GETATTR__");
    if let Some(fqn) = base.w_type.lookup_capability(getattr_sym) {
        if let Some(func) = vm.capability_fn(&fqn) {
            let result = func(vm, std::slice::from_ref(base));
            if !result.is_null() {
                return trace(vm, "GETATTR", 3, result);
            }
        }
    }
    trace(vm, "GETATTR", 5, OpImpl::Null)
}

/// Item access, e.g. `xs[i]` (spec.md §4.6 rule 3 `op_GETITEM` on `L`).
#[must_use]
pub fn dispatch_getitem(vm: &mut Vm, base: &OpArg, index: &OpArg) -> OpImpl {
    if is_dynamic(base) {
        if let Some(result) = dynamic_fast_path(vm, "dynamic_GETITEM") {
            return trace(vm, "GETITEM", 1, result);
        }
    }
    let sym = vm.interner.intern("op_GETITEM");
    if let Some(fqn) = base.w_type.lookup_capability(sym) {
        if let Some(func) = vm.capability_fn(&fqn) {
            let result = func(vm, &[base.clone(), index.clone()]);
            if !result.is_null() {
                return trace(vm, "GETITEM", 3, result);
            }
        }
    }
    trace(vm, "GETITEM", 5, OpImpl::Null)
}

/// Metaclass-level item access used for type specialization, e.g.
/// `list[i32]` (spec.md §4.6 rule 3 `meta_op_GETITEM` on `L`'s metaclass).
#[must_use]
pub fn dispatch_meta_getitem(vm: &mut Vm, base: &OpArg, index: &OpArg) -> OpImpl {
    let sym = vm.interner.intern("meta_op_GETITEM");
    if let Some(fqn) = base.w_type.lookup_meta_capability(sym) {
        if let Some(func) = vm.capability_fn(&fqn) {
            let result = func(vm, &[base.clone(), index.clone()]);
            return trace(vm, "META_GETITEM", 3, result);
        }
    }
    trace(vm, "META_GETITEM", 5, OpImpl::Null)
}

/// Calls, e.g. `f(x)` (spec.md §4.6 rule 3 `op_CALL` on `L`). A plain
/// function value dispatches straight to a direct call, handled upstream by
/// the redshift pass before this entry point is consulted at all; this is
/// for *callable objects* (instances of a type defining `op_CALL`).
#[must_use]
pub fn dispatch_call(vm: &mut Vm, callee: &OpArg, args: &[OpArg]) -> OpImpl {
    let sym = vm.interner.intern("op_CALL");
    if let Some(fqn) = callee.w_type.lookup_capability(sym) {
        if let Some(func) = vm.capability_fn(&fqn) {
            let mut all = Vec::with_capacity(args.len() + 1);
            all.push(callee.clone());
            all.extend_from_slice(args);
            let result = func(vm, &all);
            return trace(vm, "CALL", 3, result);
        }
    }
    trace(vm, "CALL", 5, OpImpl::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::Vm;
    use std::{cell::RefCell, rc::Rc};

    #[test]
    fn unregistered_binary_op_is_null() {
        let mut vm = Vm::new();
        let i32_arg = OpArg::red(vm.builtins().i32_type.clone());
        // `MatMul` on two ints has no registered builtin implementation.
        let result = dispatch_binary(&mut vm, BinOp::MatMul, &i32_arg, &i32_arg);
        assert!(result.is_null());
    }

    #[test]
    fn int_addition_resolves_through_multimethod_table() {
        let mut vm = Vm::new();
        let i32_arg = OpArg::red(vm.builtins().i32_type.clone());
        let result = dispatch_binary(&mut vm, BinOp::Add, &i32_arg, &i32_arg);
        assert!(!result.is_null());
    }

    /// Shares its buffer behind an `Rc<RefCell<_>>` so a test can keep
    /// reading it after handing the tracer itself off to `vm.tracer`.
    #[derive(Clone, Default)]
    struct SharedRecorder(Rc<RefCell<Vec<DispatchEvent>>>);

    impl crate::tracer::BlueTracer for SharedRecorder {
        fn on_dispatch(&mut self, event: DispatchEvent) {
            self.0.borrow_mut().push(event);
        }
    }

    #[test]
    fn successful_dispatch_reports_one_event_with_the_resolved_callee() {
        let mut vm = Vm::new();
        let recorder = SharedRecorder::default();
        vm.tracer = Box::new(recorder.clone());
        let i32_arg = OpArg::red(vm.builtins().i32_type.clone());

        let result = dispatch_binary(&mut vm, BinOp::Add, &i32_arg, &i32_arg);

        let events = recorder.0.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].op, "Add");
        assert_eq!(events[0].rule, 4);
        assert_eq!(events[0].callee, result.callee().cloned());
    }

    #[test]
    fn failed_dispatch_reports_rule_five_with_no_callee() {
        let mut vm = Vm::new();
        let recorder = SharedRecorder::default();
        vm.tracer = Box::new(recorder.clone());
        let i32_arg = OpArg::red(vm.builtins().i32_type.clone());

        dispatch_binary(&mut vm, BinOp::MatMul, &i32_arg, &i32_arg);

        let events = recorder.0.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].rule, 5);
        assert!(events[0].callee.is_none());
    }
}
