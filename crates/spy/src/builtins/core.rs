//! Installs the primitive numeric tower, `str` concatenation/equality, and
//! `list[T]` specialization into a freshly-constructed [`Vm`].
//!
//! Grounded on `examples/original_source/spy/vm/modules/operator/
//! multimethod.py`'s module-load-time `MM.register(...)` calls for the
//! arithmetic table, and on `examples/original_source/spy/vm/list.py`'s
//! `meta_op_GETITEM`/memoized-specialization pattern for `list[T]`.

use std::rc::Rc;

use crate::{
    diagnostics::{CompileError, ErrorKind},
    fqn::Fqn,
    function::{FuncObj, FuncParam},
    object::{Color, TypeKind, TypeObj, Value},
    opimpl::{OpArg, OpImpl},
    vm::Vm,
};

pub fn install(vm: &mut Vm) {
    install_i32_ops(vm);
    install_f64_ops(vm);
    install_str_ops(vm);
    install_list_ops(vm);
    install_dynamic_ops(vm);
}

fn define_binary(
    vm: &mut Vm,
    name: &str,
    ltype: &Rc<TypeObj>,
    rtype: &Rc<TypeObj>,
    ret: &Rc<TypeObj>,
    op_symbol: &str,
    body: impl Fn(&mut Vm, &[Value]) -> crate::diagnostics::CompileResult<Value> + 'static,
) {
    let fqn = Fqn::module("builtins").join(name, vec![]);
    let func = FuncObj::new_builtin(
        fqn.clone(),
        vec![
            FuncParam { name: "lhs".to_string(), w_type: ltype.clone() },
            FuncParam { name: "rhs".to_string(), w_type: rtype.clone() },
        ],
        ret.clone(),
        Color::Red,
        body,
    );
    vm.registry.define(fqn.clone(), Value::Func(Rc::new(func)));
    vm.multimethods_mut().register(op_symbol, Some(ltype), Some(rtype), fqn);
}

fn install_i32_ops(vm: &mut Vm) {
    let i32_t = vm.builtins().i32_type.clone();
    let bool_t = vm.builtins().bool_type.clone();

    let int = |v: &Value| v.as_int().expect("typechecked as i32");

    define_binary(vm, "i32_add", &i32_t, &i32_t, &i32_t, "Add", move |_, a| Ok(Value::Int(int(&a[0]) + int(&a[1]))));
    define_binary(vm, "i32_sub", &i32_t, &i32_t, &i32_t, "Sub", move |_, a| Ok(Value::Int(int(&a[0]) - int(&a[1]))));
    define_binary(vm, "i32_mul", &i32_t, &i32_t, &i32_t, "Mul", move |_, a| Ok(Value::Int(int(&a[0]) * int(&a[1]))));
    define_binary(vm, "i32_floordiv", &i32_t, &i32_t, &i32_t, "FloorDiv", move |_, a| {
        let rhs = int(&a[1]);
        if rhs == 0 {
            return Err(CompileError::new(ErrorKind::BlueEvalError, "integer division by zero"));
        }
        Ok(Value::Int(int(&a[0]).div_euclid(rhs)))
    });
    define_binary(vm, "i32_mod", &i32_t, &i32_t, &i32_t, "Mod", move |_, a| {
        let rhs = int(&a[1]);
        if rhs == 0 {
            return Err(CompileError::new(ErrorKind::BlueEvalError, "integer division by zero"));
        }
        Ok(Value::Int(int(&a[0]).rem_euclid(rhs)))
    });
    define_binary(vm, "i32_eq", &i32_t, &i32_t, &bool_t, "Eq", move |_, a| Ok(Value::Bool(int(&a[0]) == int(&a[1]))));
    define_binary(vm, "i32_noteq", &i32_t, &i32_t, &bool_t, "NotEq", move |_, a| Ok(Value::Bool(int(&a[0]) != int(&a[1]))));
    define_binary(vm, "i32_lt", &i32_t, &i32_t, &bool_t, "Lt", move |_, a| Ok(Value::Bool(int(&a[0]) < int(&a[1]))));
    define_binary(vm, "i32_lte", &i32_t, &i32_t, &bool_t, "LtE", move |_, a| Ok(Value::Bool(int(&a[0]) <= int(&a[1]))));
    define_binary(vm, "i32_gt", &i32_t, &i32_t, &bool_t, "Gt", move |_, a| Ok(Value::Bool(int(&a[0]) > int(&a[1]))));
    define_binary(vm, "i32_gte", &i32_t, &i32_t, &bool_t, "GtE", move |_, a| Ok(Value::Bool(int(&a[0]) >= int(&a[1]))));
}

fn install_f64_ops(vm: &mut Vm) {
    let f64_t = vm.builtins().f64_type.clone();
    let bool_t = vm.builtins().bool_type.clone();

    let float = |v: &Value| match v {
        Value::Float(x) => *x,
        _ => panic!("typechecked as f64"),
    };

    define_binary(vm, "f64_add", &f64_t, &f64_t, &f64_t, "Add", move |_, a| Ok(Value::Float(float(&a[0]) + float(&a[1]))));
    define_binary(vm, "f64_sub", &f64_t, &f64_t, &f64_t, "Sub", move |_, a| Ok(Value::Float(float(&a[0]) - float(&a[1]))));
    define_binary(vm, "f64_mul", &f64_t, &f64_t, &f64_t, "Mul", move |_, a| Ok(Value::Float(float(&a[0]) * float(&a[1]))));
    define_binary(vm, "f64_div", &f64_t, &f64_t, &f64_t, "Div", move |_, a| Ok(Value::Float(float(&a[0]) / float(&a[1]))));
    define_binary(vm, "f64_eq", &f64_t, &f64_t, &bool_t, "Eq", move |_, a| Ok(Value::Bool((float(&a[0]) - float(&a[1])).abs() == 0.0)));
    define_binary(vm, "f64_lt", &f64_t, &f64_t, &bool_t, "Lt", move |_, a| Ok(Value::Bool(float(&a[0]) < float(&a[1]))));
}

fn install_str_ops(vm: &mut Vm) {
    let str_t = vm.builtins().str_type.clone();
    let bool_t = vm.builtins().bool_type.clone();

    let text = |v: &Value| v.as_str().expect("typechecked as str").to_string();

    define_binary(vm, "str_add", &str_t, &str_t, &str_t, "Add", move |_, a| {
        Ok(Value::Str(Rc::from(format!("{}{}", text(&a[0]), text(&a[1])))))
    });
    define_binary(vm, "str_eq", &str_t, &str_t, &bool_t, "Eq", move |_, a| Ok(Value::Bool(text(&a[0]) == text(&a[1]))));
}

/// Builds (or reuses) the native `__getitem__` for a specific `list[T]`
/// specialization. Memoized by FQN under the specialized type's own
/// namespace, so repeated `op_GETITEM` resolutions for the same `T` return
/// the identical callee rather than re-registering.
fn ensure_list_getitem_func(vm: &mut Vm, list_type: &Rc<TypeObj>, item_type: &Rc<TypeObj>) -> Fqn {
    let fqn = list_type.fqn.join("__getitem__", vec![]);
    if vm.registry.get(&fqn).is_none() {
        let i32_t = vm.builtins().i32_type.clone();
        let func = FuncObj::new_builtin(
            fqn.clone(),
            vec![
                FuncParam { name: "self".to_string(), w_type: list_type.clone() },
                FuncParam { name: "index".to_string(), w_type: i32_t },
            ],
            item_type.clone(),
            Color::Red,
            |_vm, args| {
                let Value::List(items, _) = &args[0] else {
                    panic!("typechecked as list")
                };
                let index = args[1].as_int().expect("typechecked as i32");
                let items = items.borrow();
                let in_range = usize::try_from(index).ok().filter(|i| *i < items.len());
                match in_range {
                    Some(i) => Ok(items[i].clone()),
                    None => Err(CompileError::new(ErrorKind::BlueEvalError, format!("index {index} out of range"))),
                }
            },
        );
        vm.registry.define(fqn.clone(), Value::Func(Rc::new(func)));
    }
    fqn
}

fn install_list_ops(vm: &mut Vm) {
    let getitem_cap_fqn = Fqn::module("builtins").join("list_op_GETITEM", vec![]);
    vm.register_capability_fn(
        getitem_cap_fqn.clone(),
        Rc::new(|vm: &mut Vm, args: &[OpArg]| {
            let list_arg = &args[0];
            let index_arg = &args[1];
            let TypeKind::List { item: Some(item_type) } = list_arg.w_type.kind.clone() else {
                return OpImpl::Null;
            };
            if !matches!(index_arg.w_type.kind, TypeKind::I32) {
                return OpImpl::Null;
            }
            let list_type = list_arg.w_type.clone();
            let callee = ensure_list_getitem_func(vm, &list_type, &item_type);
            OpImpl::Simple { callee, args: Vec::new() }
        }),
    );
    let list_type = vm.builtins().list_type.clone();
    let getitem_sym = vm.interner.intern("op_GETITEM");
    list_type.set_capability(getitem_sym, getitem_cap_fqn);

    // `meta_op_GETITEM`, registered on `list`'s dedicated metaclass, realizes
    // `list[i32]`-style subscripting of the type itself: it specializes
    // (memoized, spec.md §4.1) and hands back a zero-argument thunk that
    // evaluates to the resulting `W_Type` as a blue constant.
    let meta_getitem_cap_fqn = Fqn::module("builtins").join("list_meta_op_GETITEM", vec![]);
    vm.register_capability_fn(
        meta_getitem_cap_fqn.clone(),
        Rc::new(|vm: &mut Vm, args: &[OpArg]| {
            let Some(Value::Type(item_type)) = args[1].blue_value.clone() else {
                return OpImpl::Null;
            };
            let specialized = vm.specialize_list(item_type);
            let thunk_fqn = specialized.fqn.join("__self__", vec![]);
            if vm.registry.get(&thunk_fqn).is_none() {
                let type_t = vm.builtins().type_type.clone();
                let value = Value::Type(specialized.clone());
                let func = FuncObj::new_builtin(thunk_fqn.clone(), Vec::new(), type_t, Color::Blue, move |_, _| {
                    Ok(value.clone())
                });
                vm.registry.define(thunk_fqn.clone(), Value::Func(Rc::new(func)));
            }
            OpImpl::Simple { callee: thunk_fqn, args: Vec::new() }
        }),
    );
    let list_meta = vm.builtins().list_type.metaclass.clone().expect("list has a dedicated metaclass");
    let meta_sym = vm.interner.intern("meta_op_GETITEM");
    list_meta.set_capability(meta_sym, meta_getitem_cap_fqn);
}

/// The generic `dynamic_*` fallbacks consulted by dispatch rule 1 when
/// either operand's static type is `dynamic`: a real runtime type test over
/// the wrapped `Value`, since static types give no information here.
fn install_dynamic_ops(vm: &mut Vm) {
    let add_fqn = Fqn::module("builtins").join("dynamic_add", vec![]);
    let dyn_t = vm.builtins().dynamic_type.clone();
    let func = FuncObj::new_builtin(
        add_fqn.clone(),
        vec![
            FuncParam { name: "lhs".to_string(), w_type: dyn_t.clone() },
            FuncParam { name: "rhs".to_string(), w_type: dyn_t.clone() },
        ],
        dyn_t.clone(),
        Color::Red,
        |_, args| match (&args[0], &args[1]) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(Rc::from(format!("{a}{b}")))),
            _ => Err(CompileError::new(ErrorKind::BlueEvalError, "unsupported operand types for +")),
        },
    );
    vm.registry.define(add_fqn.clone(), Value::Func(Rc::new(func)));
    vm.register_dynamic_capability("dynamic_Add", add_fqn);

    let eq_fqn = Fqn::module("builtins").join("dynamic_eq", vec![]);
    let func = FuncObj::new_builtin(
        eq_fqn.clone(),
        vec![
            FuncParam { name: "lhs".to_string(), w_type: dyn_t.clone() },
            FuncParam { name: "rhs".to_string(), w_type: dyn_t.clone() },
        ],
        vm.builtins().bool_type.clone(),
        Color::Red,
        |_, args| match (&args[0], &args[1]) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a == b)),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Bool(a == b)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a == b)),
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a == b)),
            (Value::None, Value::None) => Ok(Value::Bool(true)),
            _ => Ok(Value::Bool(false)),
        },
    );
    vm.registry.define(eq_fqn.clone(), Value::Func(Rc::new(func)));
    vm.register_dynamic_capability("dynamic_Eq", eq_fqn);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ast::BinOp, dispatch, opimpl::OpArg};

    #[test]
    fn i32_add_is_reachable_through_dispatch() {
        let mut vm = Vm::new();
        let i32_t = vm.builtins().i32_type.clone();
        let arg = OpArg::red(i32_t);
        let opimpl = dispatch::dispatch_binary(&mut vm, BinOp::Add, &arg, &arg);
        let callee = opimpl.callee().cloned().expect("i32 + i32 should resolve");
        let func = vm.registry.get(&callee).cloned().expect("callee should be registered");
        let Value::Func(func) = func else { panic!("expected function value") };
        let crate::function::FuncBody::Builtin(body) = &func.body else {
            panic!("expected builtin body")
        };
        let result = body(&mut vm, &[Value::Int(1), Value::Int(2)]).unwrap();
        assert_eq!(result.as_int(), Some(3));
    }

    #[test]
    fn list_getitem_resolves_and_reads_in_bounds_element() {
        let mut vm = Vm::new();
        let i32_t = vm.builtins().i32_type.clone();
        let list_t = vm.specialize_list(i32_t.clone());
        let list_arg = OpArg::red(list_t.clone());
        let index_arg = OpArg::red(i32_t);
        let opimpl = dispatch::dispatch_getitem(&mut vm, &list_arg, &index_arg);
        assert!(!opimpl.is_null());
    }

    #[test]
    fn dynamic_add_is_reachable_through_the_dynamic_fast_path() {
        let mut vm = Vm::new();
        let dyn_t = vm.builtins().dynamic_type.clone();
        let arg = OpArg::red(dyn_t);
        let opimpl = dispatch::dispatch_binary(&mut vm, BinOp::Add, &arg, &arg);
        let callee = opimpl.callee().cloned().expect("dynamic + dynamic should resolve");
        let func = vm.registry.get(&callee).cloned().expect("callee should be registered");
        let Value::Func(func) = func else { panic!("expected function value") };
        let crate::function::FuncBody::Builtin(body) = &func.body else {
            panic!("expected builtin body")
        };
        let result = body(&mut vm, &[Value::Int(1), Value::Int(2)]).unwrap();
        assert_eq!(result.as_int(), Some(3));
    }
}
