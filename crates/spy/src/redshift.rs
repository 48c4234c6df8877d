//! Redshift (spec.md §4.9): the pass that walks a module's `FuncDef` bodies
//! bottom-up, resolving every operator node to a concrete callee via the
//! Dispatcher (§4.6) and the Type Checker (§4.7), and rewriting the AST in
//! place to carry that resolution.
//!
//! Grounded on the teacher crate's `prepare.rs` (`PrepareResult`/`prepare`
//! for the "one pass over parsed nodes, resolve names, hand back a ready-to-
//! run tree" shape) and `bytecode/builder.rs` for "bottom-up expression
//! lowering, children before parents". Unlike `prepare.rs`, there is no
//! bytecode builder downstream: this module mutates `ast::Expr`'s own
//! `callee: Option<Fqn>` fields directly, since spec.md §6 fixes that as the
//! AST vocabulary the Backend consumes.
//!
//! **Open Question resolution** (recorded in DESIGN.md): whether *blue*
//! `FuncDef`s should be redshifted at all is not pinned down by spec.md.
//! This crate redshifts every top-level `FuncDef` uniformly, red or blue:
//! the Blue Evaluator (`blue_eval.rs`) requires every operator node it walks
//! to already carry a resolved `callee` (it performs no dispatch itself), so
//! a blue function's body must go through the same resolution as a red
//! one before it can ever be called — the distinction is about what
//! *calls* the function (generated code vs. the compiler itself), not
//! whether its body needs an opimpl for every operator node.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    ast::{self, Constant, Expr, Stmt, TypeExpr},
    diagnostics::{CompileError, CompileResult, ErrorKind, Span},
    dispatch,
    fqn::Fqn,
    function::{FuncParam, FuncType},
    object::{TypeObj, Value},
    opimpl::{OpArg, OpImpl},
    typecheck,
    vm::Vm,
};

/// Resolves a surface `TypeExpr` to a concrete `W_Type`, specializing
/// `list[T]`-shaped generics on demand (spec.md §4.1 "type specialization",
/// §6 external AST vocabulary). The only generic base this crate's builtin
/// module surface understands is `list` (spec.md §9 "builtin module
/// surface"); anything else is a `TypeError`.
pub fn resolve_type_expr(vm: &mut Vm, type_expr: &TypeExpr) -> CompileResult<Rc<TypeObj>> {
    match type_expr {
        TypeExpr::Name(name) => {
            // A bare name (`i32`, `dynamic`) resolves against the builtins
            // module; a name already containing `::` (a user type's own
            // FQN) is resolved as-is.
            let fqn = if name.contains("::") {
                Fqn::parse(name).map_err(|e| CompileError::new(ErrorKind::TypeError, e.to_string()))?
            } else {
                Fqn::module("builtins").join(name, vec![])
            };
            vm.lookup_type(&fqn)
                .ok_or_else(|| CompileError::new(ErrorKind::TypeError, format!("'{name}' is not a type")))
        }
        TypeExpr::Generic { base, args } => {
            if base != "list" {
                return Err(CompileError::new(ErrorKind::TypeError, format!("'{base}' is not a generic type")));
            }
            let [item_expr] = args.as_slice() else {
                return Err(CompileError::new(
                    ErrorKind::TypeError,
                    format!("'list' takes exactly one type argument, got {}", args.len()),
                ));
            };
            let item_type = resolve_type_expr(vm, item_expr)?;
            Ok(vm.specialize_list(item_type))
        }
    }
}

/// The name-resolution environment for one function body: its enclosing
/// module (for `load_global`-style `Name` lookups) and the current mapping
/// of local names to their synthesized `OpArg` (spec.md §4.9's minimal
/// stand-in for the out-of-scope SymTable, spec.md §1).
struct Env {
    module: String,
    ret_type: Rc<TypeObj>,
    locals: IndexMap<String, OpArg>,
}

/// Redshifts every function in `module`, in place. Returns one
/// [`CompileError`] per declaration that failed; a failure in one function
/// does not prevent redshift of the others (spec.md §4.9 "Failure
/// semantics", §8 "Error locality").
pub fn redshift_module(vm: &mut Vm, module: &mut ast::Module) -> Vec<CompileError> {
    let mut errors = Vec::new();
    let module_name = module.name.clone();

    for decl in &module.decls {
        if let ast::Decl::GlobalVar(global) = decl {
            if let Err(e) = register_global_var(vm, &module_name, global) {
                errors.push(e);
            }
        }
    }

    // Function signatures are registered before any body is walked so that
    // forward and mutually-recursive calls resolve (spec.md §4.9 requires
    // only that the *body* transformation be bottom-up, not declaration
    // order).
    for decl in &module.decls {
        if let ast::Decl::Func(func_def) = decl {
            if let Err(e) = register_func_signature(vm, &module_name, func_def) {
                errors.push(e);
            }
        }
    }

    for decl in &mut module.decls {
        if let ast::Decl::Func(func_def) = decl {
            match redshift_funcdef(vm, &module_name, func_def) {
                Ok(()) => {
                    let fqn = Fqn::module(&module_name).join(&func_def.name, vec![]);
                    vm.tracer.on_redshift_function(&fqn);
                }
                Err(e) => errors.push(e),
            }
        }
    }

    errors
}

fn register_global_var(vm: &mut Vm, module: &str, global: &ast::GlobalVarDef) -> CompileResult<()> {
    let fqn = Fqn::module(module).join(&global.vardef.name, vec![]);
    if vm.registry.get(&fqn).is_some() {
        return Ok(());
    }
    // Only a literal initializer can be folded to a concrete `Value` without
    // a runtime to execute against; anything else is left as `None` for now
    // — this crate's scope ends at "the opimpl for every AST node is fixed"
    // (spec.md §1), not at actually running the generated binary.
    let value = match &global.vardef.value {
        Some(Expr::Constant { value, .. }) => crate::blue_eval::eval_constant(value),
        _ => Value::None,
    };
    vm.registry.define(fqn, value);
    Ok(())
}

fn register_func_signature(vm: &mut Vm, module: &str, func_def: &ast::FuncDef) -> CompileResult<()> {
    let fqn = Fqn::module(module).join(&func_def.name, vec![]);
    if vm.registry.get(&fqn).is_some() {
        return Ok(());
    }
    let mut params = Vec::with_capacity(func_def.args.len());
    for arg in &func_def.args {
        let w_type = resolve_type_expr(vm, &arg.type_expr)?;
        params.push(FuncParam { name: arg.name.clone(), w_type });
    }
    let ret = resolve_type_expr(vm, &func_def.return_type)?;
    let functype = FuncType { params, ret, color: func_def.color };
    let func = crate::function::FuncObj::new_ast(fqn.clone(), functype, Rc::new(func_def.clone()));
    vm.registry.define(fqn, Value::Func(Rc::new(func)));
    Ok(())
}

fn redshift_funcdef(vm: &mut Vm, module: &str, func_def: &mut ast::FuncDef) -> CompileResult<()> {
    let mut env = Env {
        module: module.to_string(),
        ret_type: resolve_type_expr(vm, &func_def.return_type)?,
        locals: IndexMap::new(),
    };
    for arg in &func_def.args {
        let w_type = resolve_type_expr(vm, &arg.type_expr)?;
        env.locals.insert(arg.name.clone(), OpArg::red(w_type).with_span(arg.span));
    }
    redshift_block(vm, &mut env, &mut func_def.body)
}

fn redshift_block(vm: &mut Vm, env: &mut Env, stmts: &mut [Stmt]) -> CompileResult<()> {
    for stmt in stmts {
        redshift_stmt(vm, env, stmt)?;
    }
    Ok(())
}

fn redshift_stmt(vm: &mut Vm, env: &mut Env, stmt: &mut Stmt) -> CompileResult<()> {
    match stmt {
        Stmt::Return { value, span } => {
            let ty = match value {
                Some(expr) => synth_expr(vm, env, expr)?.w_type,
                None => vm.builtins().none_type.clone(),
            };
            if !typecheck::is_assignable(&ty, &env.ret_type) {
                return Err(CompileError::type_mismatch(env.ret_type.name(), ty.name(), *span));
            }
            Ok(())
        }
        Stmt::Assign { target, value, .. } => {
            let arg = synth_expr(vm, env, value)?;
            env.locals.insert(target.clone(), arg);
            Ok(())
        }
        Stmt::If { test, then_body, else_body, .. } => {
            synth_expr(vm, env, test)?;
            redshift_block(vm, env, then_body)?;
            redshift_block(vm, env, else_body)
        }
        Stmt::While { test, body, .. } => {
            synth_expr(vm, env, test)?;
            redshift_block(vm, env, body)
        }
        Stmt::Pass { .. } => Ok(()),
        Stmt::StmtExpr { expr, .. } => {
            synth_expr(vm, env, expr)?;
            Ok(())
        }
    }
}

/// Assigns (or re-derives) an `OpArg` for one expression node, mutating any
/// operator-shaped node's `callee` field with the dispatcher's resolution
/// (spec.md §4.9 steps 1–2).
fn synth_expr(vm: &mut Vm, env: &mut Env, expr: &mut Expr) -> CompileResult<OpArg> {
    let span = expr.span();
    match expr {
        Expr::Name { name, .. } => resolve_name(vm, env, name, span),
        Expr::Constant { value, .. } => Ok(synth_constant(vm, value).with_span(span)),
        Expr::List { items, .. } => {
            let mut item_type = None;
            for item in items.iter_mut() {
                let arg = synth_expr(vm, env, item)?;
                if item_type.is_none() {
                    item_type = Some(arg.w_type);
                }
            }
            let item_type = item_type.unwrap_or_else(|| vm.builtins().dynamic_type.clone());
            let list_type = vm.specialize_list(item_type);
            Ok(OpArg::red(list_type).with_span(span))
        }
        Expr::GetAttr { value, attr, callee, .. } => {
            let base = synth_expr(vm, env, &mut **value)?;
            let opimpl = dispatch::dispatch_getattr(vm, &base, attr);
            if opimpl.is_null() {
                return Err(CompileError::no_attribute(base.w_type.name(), attr).with_annotation(span, format!("no `{attr}` member or `__GETATTR__` hook on `{}`", base.w_type.name())));
            }
            let resolved = opimpl.callee().expect("non-null opimpl has a callee").clone();
            *callee = Some(resolved.clone());
            if resolved == vm.member_read_intrinsic() {
                let member = base
                    .w_type
                    .lookup_member(attr)
                    .expect("member fast path only fires when the member exists");
                return Ok(OpArg::red(member.w_type.clone()).with_span(span));
            }
            let functype = lookup_functype(vm, &resolved)?;
            let conversions = typecheck::typecheck_call(vm, &functype, &[base], span)?;
            if let Some(conv) = &conversions[0] {
                apply_conversion(&mut **value, conv);
            }
            Ok(OpArg::red(functype.ret).with_span(span))
        }
        Expr::GetItem { value, index, callee, .. } => {
            let base = synth_expr(vm, env, &mut **value)?;
            let idx = synth_expr(vm, env, &mut **index)?;
            let opimpl = dispatch::dispatch_getitem(vm, &base, &idx);
            let (resolved, functype, resolved_args, conversions) =
                finish_operator(vm, opimpl, vec![base.clone(), idx.clone()], span, &format!("{}[...]", base.w_type.name()))?;
            if should_swap(&[base, idx], &resolved_args) {
                std::mem::swap(&mut **value, &mut **index);
            }
            if let Some(conv) = &conversions[0] {
                apply_conversion(&mut **value, conv);
            }
            if let Some(conv) = &conversions[1] {
                apply_conversion(&mut **index, conv);
            }
            *callee = Some(resolved);
            Ok(OpArg::red(functype.ret).with_span(span))
        }
        Expr::Call { func, args, callee, .. } => {
            let direct = match &**func {
                Expr::Name { name, .. } => resolve_direct_function(vm, env, name),
                _ => None,
            };
            let mut arg_vals = Vec::with_capacity(args.len());
            for arg in args.iter_mut() {
                arg_vals.push(synth_expr(vm, env, arg)?);
            }
            if let Some((fqn, functype)) = direct {
                let conversions = typecheck::typecheck_call(vm, &functype, &arg_vals, span)?;
                for (i, conv) in conversions.iter().enumerate() {
                    if let Some(cfqn) = conv {
                        apply_conversion(&mut args[i], cfqn);
                    }
                }
                *callee = Some(fqn);
                return Ok(OpArg::red(functype.ret).with_span(span));
            }
            let func_arg = synth_expr(vm, env, &mut **func)?;
            let opimpl = dispatch::dispatch_call(vm, &func_arg, &arg_vals);
            if opimpl.is_null() {
                return Err(CompileError::new(ErrorKind::TypeError, format!("'{}' is not callable", func_arg.w_type.name()))
                    .with_annotation(span, "no `op_CALL` capability"));
            }
            let resolved = opimpl.callee().expect("non-null opimpl has a callee").clone();
            let functype = lookup_functype(vm, &resolved)?;
            let mut all_args = Vec::with_capacity(arg_vals.len() + 1);
            all_args.push(func_arg);
            all_args.extend(arg_vals);
            let conversions = typecheck::typecheck_call(vm, &functype, &all_args, span)?;
            // Slot 0 is the callable object itself (`op_CALL`'s implicit
            // `self`); a conversion there has no AST slot to land in, so it
            // is skipped — callable objects are exact-type matches in
            // practice since `op_CALL` is resolved from the object's own type.
            for (i, conv) in conversions.iter().enumerate().skip(1) {
                if let Some(cfqn) = conv {
                    apply_conversion(&mut args[i - 1], cfqn);
                }
            }
            *callee = Some(resolved);
            Ok(OpArg::red(functype.ret).with_span(span))
        }
        Expr::BinOp { op, left, right, callee, .. } => {
            let l = synth_expr(vm, env, &mut **left)?;
            let r = synth_expr(vm, env, &mut **right)?;
            let opimpl = dispatch::dispatch_binary(vm, *op, &l, &r);
            let (resolved, functype, resolved_args, conversions) = finish_operator(vm, opimpl, vec![l.clone(), r.clone()], span, &op.to_string())?;
            if should_swap(&[l, r], &resolved_args) {
                std::mem::swap(&mut **left, &mut **right);
            }
            if let Some(conv) = &conversions[0] {
                apply_conversion(&mut **left, conv);
            }
            if let Some(conv) = &conversions[1] {
                apply_conversion(&mut **right, conv);
            }
            *callee = Some(resolved);
            Ok(OpArg::red(functype.ret).with_span(span))
        }
        Expr::UnaryOp { op, operand, callee, .. } => {
            let operand_arg = synth_expr(vm, env, &mut **operand)?;
            let opimpl = dispatch::dispatch_unary(vm, *op, &operand_arg);
            let (resolved, functype, _, conversions) = finish_operator(vm, opimpl, vec![operand_arg], span, &op.to_string())?;
            if let Some(conv) = &conversions[0] {
                apply_conversion(&mut **operand, conv);
            }
            *callee = Some(resolved);
            Ok(OpArg::red(functype.ret).with_span(span))
        }
        Expr::Compare { op, left, right, callee, .. } => {
            let l = synth_expr(vm, env, &mut **left)?;
            let r = synth_expr(vm, env, &mut **right)?;
            let opimpl = dispatch::dispatch_compare(vm, *op, &l, &r);
            let (resolved, functype, resolved_args, conversions) = finish_operator(vm, opimpl, vec![l.clone(), r.clone()], span, &op.to_string())?;
            if should_swap(&[l, r], &resolved_args) {
                std::mem::swap(&mut **left, &mut **right);
            }
            if let Some(conv) = &conversions[0] {
                apply_conversion(&mut **left, conv);
            }
            if let Some(conv) = &conversions[1] {
                apply_conversion(&mut **right, conv);
            }
            *callee = Some(resolved);
            Ok(OpArg::red(functype.ret).with_span(span))
        }
    }
}

/// Wraps `expr` in a call to the conversion function `conv` found by the
/// Type Checker (spec.md §4.7). `func` is never evaluated by the blue
/// evaluator when `callee` is already `Some` (see `blue_eval::eval_expr`),
/// so it only needs to be a readable placeholder, not a real lookup.
fn apply_conversion(expr: &mut Expr, conv: &Fqn) {
    let span = expr.span();
    let inner = std::mem::replace(expr, Expr::Constant { value: Constant::None, span });
    *expr = Expr::Call {
        func: Box::new(Expr::Name { name: conv.symbol_name().to_string(), span }),
        args: vec![inner],
        callee: Some(conv.clone()),
        span,
    };
}

/// Shared tail of every operator-shaped cascade: reject `Null`, look up the
/// winning callee's `FuncType`, let a capability's reordered argument list
/// (spec.md §8 seed scenario 3) override the natural one, then typecheck
/// (spec.md §4.7), returning any per-operand conversions the caller should
/// splice in.
fn finish_operator(
    vm: &Vm,
    opimpl: OpImpl,
    original_args: Vec<OpArg>,
    span: Span,
    op_desc: &str,
) -> CompileResult<(Fqn, FuncType, Vec<OpArg>, Vec<Option<Fqn>>)> {
    if opimpl.is_null() {
        return Err(CompileError::dispatch(
            format!("no implementation found for `{op_desc}`"),
            span,
            "no opimpl resolved by the dispatch cascade",
        ));
    }
    let callee = opimpl.callee().expect("non-null opimpl has a callee").clone();
    let functype = lookup_functype(vm, &callee)?;
    let resolved_args = match &opimpl {
        OpImpl::Simple { args, .. } if args.len() == original_args.len() && !args.is_empty() => args.clone(),
        _ => original_args,
    };
    let conversions = typecheck::typecheck_call(vm, &functype, &resolved_args, span)?;
    Ok((callee, functype, resolved_args, conversions))
}

/// Detects the two-operand swap a capability's `OpImpl::Simple.args` can
/// request (spec.md §8 seed scenario 3: "redshift records the swap, and the
/// emitted call matches the swapped order"). Operand identity is judged by
/// `Rc` pointer equality on the static type, since `OpArg` carries no other
/// stable identity.
fn should_swap(original: &[OpArg; 2], resolved: &[OpArg]) -> bool {
    let [a, b] = original;
    let [ref x, ref y] = resolved[..] else { return false };
    !Rc::ptr_eq(&a.w_type, &x.w_type) && Rc::ptr_eq(&a.w_type, &y.w_type) && Rc::ptr_eq(&b.w_type, &x.w_type)
}

fn lookup_functype(vm: &Vm, fqn: &Fqn) -> CompileResult<FuncType> {
    match vm.registry.get(fqn) {
        Some(Value::Func(func)) => Ok(func.functype.clone()),
        _ => Err(CompileError::new(ErrorKind::ScopeError, format!("unresolved global '{fqn}'"))),
    }
}

/// A direct call to a plain function value bypasses the dispatcher
/// entirely: `op_CALL` (spec.md §4.6 rule 3) exists for *callable objects*,
/// not for ordinary `def`s (spec.md §4.6: "handled upstream by the redshift
/// pass before this entry point is consulted at all").
fn resolve_direct_function(vm: &Vm, env: &Env, name: &str) -> Option<(Fqn, FuncType)> {
    if env.locals.contains_key(name) {
        return None;
    }
    let fqn = Fqn::module(&env.module).join(name, vec![]);
    match vm.registry.get(&fqn) {
        Some(Value::Func(func)) => Some((fqn, func.functype.clone())),
        _ => None,
    }
}

fn resolve_name(vm: &Vm, env: &Env, name: &str, span: Span) -> CompileResult<OpArg> {
    if let Some(local) = env.locals.get(name) {
        return Ok(local.clone().with_span(span));
    }
    let fqn = Fqn::module(&env.module).join(name, vec![]);
    match vm.registry.get(&fqn) {
        Some(Value::Func(func)) => Ok(OpArg::blue(vm.builtins().function_type.clone(), Value::Func(func.clone())).with_span(span)),
        Some(value) => Ok(OpArg::red(value.dynamic_type(vm.builtins())).with_span(span)),
        None => Err(CompileError::new(ErrorKind::ScopeError, format!("name '{name}' is not defined"))
            .with_annotation(span, "not found among locals or this module's globals")),
    }
}

fn synth_constant(vm: &Vm, constant: &Constant) -> OpArg {
    let value = crate::blue_eval::eval_constant(constant);
    OpArg::blue(value.dynamic_type(vm.builtins()), value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{BinOp, CompareOp, Decl, FuncArg, FuncDef, GlobalVarDef, Module, VarDef},
        diagnostics::ErrorKind,
        function::FuncObj,
        object::{Color, StorageCategory, TypeKind},
        opimpl::{OpArg, OpImpl},
    };
    use std::cell::RefCell;

    fn ty_name(name: &str) -> ast::TypeExpr {
        ast::TypeExpr::Name(name.to_string())
    }

    /// Seed scenario 1 (spec.md §8): `def add(x:i32,y:i32)->i32: return x+y`.
    #[test]
    fn seed_scenario_one_redshifts_and_evaluates() {
        let mut vm = Vm::new();
        let mut module = Module {
            name: "scenario1".to_string(),
            decls: vec![Decl::Func(FuncDef {
                color: Color::Red,
                name: "add".to_string(),
                args: vec![
                    FuncArg { name: "x".to_string(), type_expr: ty_name("i32"), span: Span::synthesized() },
                    FuncArg { name: "y".to_string(), type_expr: ty_name("i32"), span: Span::synthesized() },
                ],
                return_type: ty_name("i32"),
                body: vec![Stmt::Return {
                    value: Some(Expr::BinOp {
                        op: BinOp::Add,
                        left: Box::new(Expr::Name { name: "x".to_string(), span: Span::synthesized() }),
                        right: Box::new(Expr::Name { name: "y".to_string(), span: Span::synthesized() }),
                        callee: None,
                        span: Span::synthesized(),
                    }),
                    span: Span::synthesized(),
                }],
                span: Span::synthesized(),
            })],
        };

        let errors = redshift_module(&mut vm, &mut module);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");

        let Decl::Func(add_def) = &module.decls[0] else { unreachable!() };
        let Stmt::Return { value: Some(Expr::BinOp { callee, .. }), .. } = &add_def.body[0] else {
            panic!("expected a redshifted BinOp");
        };
        assert!(callee.is_some(), "+ should have been resolved to a concrete callee");

        let add_fqn = Fqn::module("scenario1").join("add", vec![]);
        let Value::Func(func) = vm.registry.get(&add_fqn).cloned().unwrap() else { panic!("add should be registered") };
        let result = crate::blue_eval::call_function(&mut vm, &func, &[Value::Int(1), Value::Int(2)]).unwrap();
        assert_eq!(result.as_int(), Some(3));
    }

    /// Seed scenario 2 (spec.md §8): `N:i32=100; def get()->i32: return N`.
    #[test]
    fn seed_scenario_two_global_reference_loads_at_runtime() {
        let mut vm = Vm::new();
        let mut module = Module {
            name: "scenario2".to_string(),
            decls: vec![
                Decl::GlobalVar(GlobalVarDef {
                    vardef: VarDef {
                        name: "N".to_string(),
                        type_expr: Some(ty_name("i32")),
                        value: Some(Expr::Constant { value: Constant::Int(100), span: Span::synthesized() }),
                        span: Span::synthesized(),
                    },
                }),
                Decl::Func(FuncDef {
                    color: Color::Red,
                    name: "get".to_string(),
                    args: vec![],
                    return_type: ty_name("i32"),
                    body: vec![Stmt::Return {
                        value: Some(Expr::Name { name: "N".to_string(), span: Span::synthesized() }),
                        span: Span::synthesized(),
                    }],
                    span: Span::synthesized(),
                }),
            ],
        };

        let errors = redshift_module(&mut vm, &mut module);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");

        let n_fqn = Fqn::module("scenario2").join("N", vec![]);
        assert_eq!(vm.registry.get(&n_fqn).unwrap().as_int(), Some(100));

        let get_fqn = Fqn::module("scenario2").join("get", vec![]);
        let Value::Func(func) = vm.registry.get(&get_fqn).cloned().unwrap() else { panic!("get should be registered") };
        let result = crate::blue_eval::call_function(&mut vm, &func, &[]).unwrap();
        assert_eq!(result.as_int(), Some(100));
    }

    fn dummy_type(vm: &Vm, module: &str, name: &str) -> Rc<TypeObj> {
        Rc::new(TypeObj {
            fqn: Fqn::module(module).join(name, vec![]),
            base: Some(vm.builtins().object_type.clone()),
            metaclass: Some(vm.builtins().type_type.clone()),
            storage: StorageCategory::Reference,
            kind: TypeKind::Struct,
            members: IndexMap::new(),
            capabilities: RefCell::new(IndexMap::new()),
        })
    }

    /// Seed scenario 3 (spec.md §8): a user type's `op_GETITEM` swaps
    /// operand order; redshift must record the swap so the emitted call
    /// matches it.
    #[test]
    fn seed_scenario_three_getitem_records_operand_swap() {
        let mut vm = Vm::new();
        let obj_type = dummy_type(&vm, "scenario3", "Obj");
        let idx_type = dummy_type(&vm, "scenario3", "Idx");

        // `callee(idx, obj)`: its own parameter order is already the swap,
        // so a successful typecheck here is only possible if redshift
        // actually swapped the call-site operands to match.
        let callee_fqn = Fqn::module("scenario3").join("swapped_getitem", vec![]);
        let func = FuncObj::new_builtin(
            callee_fqn.clone(),
            vec![
                FuncParam { name: "idx".to_string(), w_type: idx_type.clone() },
                FuncParam { name: "obj".to_string(), w_type: obj_type.clone() },
            ],
            vm.builtins().dynamic_type.clone(),
            Color::Red,
            |_, args| Ok(args[0].clone()),
        );
        vm.registry.define(callee_fqn.clone(), Value::Func(Rc::new(func)));

        let cap_fqn = Fqn::module("scenario3").join("obj_getitem_cap", vec![]);
        vm.register_capability_fn(
            cap_fqn.clone(),
            Rc::new(move |_vm: &mut Vm, args: &[OpArg]| OpImpl::Simple {
                callee: callee_fqn.clone(),
                args: vec![args[1].clone(), args[0].clone()],
            }),
        );
        let getitem_sym = vm.interner.intern("op_GETITEM");
        obj_type.set_capability(getitem_sym, cap_fqn);

        let mut module = Module {
            name: "scenario3".to_string(),
            decls: vec![Decl::Func(FuncDef {
                color: Color::Red,
                name: "run".to_string(),
                args: vec![
                    FuncArg { name: "o".to_string(), type_expr: ty_name("scenario3::Obj"), span: Span::synthesized() },
                    FuncArg { name: "i".to_string(), type_expr: ty_name("scenario3::Idx"), span: Span::synthesized() },
                ],
                return_type: ty_name("dynamic"),
                body: vec![Stmt::Return {
                    value: Some(Expr::GetItem {
                        value: Box::new(Expr::Name { name: "o".to_string(), span: Span::synthesized() }),
                        index: Box::new(Expr::Name { name: "i".to_string(), span: Span::synthesized() }),
                        callee: None,
                        span: Span::synthesized(),
                    }),
                    span: Span::synthesized(),
                }],
                span: Span::synthesized(),
            })],
        };

        // `resolve_type_expr` only understands builtins and `list[T]`;
        // register the user types directly under the FQNs the test uses.
        vm.register_type(obj_type.clone());
        vm.register_type(idx_type.clone());

        let errors = redshift_module(&mut vm, &mut module);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");

        let Decl::Func(run_def) = &module.decls[0] else { unreachable!() };
        let Stmt::Return { value: Some(Expr::GetItem { value, index, .. }), .. } = &run_def.body[0] else {
            panic!("expected a redshifted GetItem");
        };
        // The swap must be physically recorded: `value` now holds what was
        // originally the index sub-expression, and vice versa.
        assert!(matches!(&**value, Expr::Name { name, .. } if name == "i"));
        assert!(matches!(&**index, Expr::Name { name, .. } if name == "o"));
    }

    /// Seed scenario 4 (spec.md §8): wrong-type index produces a mismatched
    /// types error annotated with the expected/actual types.
    #[test]
    fn seed_scenario_four_wrong_type_index_is_mismatched_types() {
        let mut vm = Vm::new();
        let i32_t = vm.builtins().i32_type.clone();
        let my_class = dummy_type(&vm, "scenario4", "MyClass");
        vm.register_type(my_class.clone());

        let callee_fqn = Fqn::module("scenario4").join("getitem_i32_only", vec![]);
        let func = FuncObj::new_builtin(
            callee_fqn.clone(),
            vec![
                FuncParam { name: "self".to_string(), w_type: my_class.clone() },
                FuncParam { name: "index".to_string(), w_type: i32_t },
            ],
            vm.builtins().dynamic_type.clone(),
            Color::Red,
            |_, args| Ok(args[0].clone()),
        );
        vm.registry.define(callee_fqn.clone(), Value::Func(Rc::new(func)));
        let cap_fqn = Fqn::module("scenario4").join("getitem_cap", vec![]);
        vm.register_capability_fn(
            cap_fqn.clone(),
            Rc::new(move |_vm: &mut Vm, args: &[OpArg]| OpImpl::Simple { callee: callee_fqn.clone(), args: args.to_vec() }),
        );
        let getitem_sym = vm.interner.intern("op_GETITEM");
        my_class.set_capability(getitem_sym, cap_fqn);

        let mut module = Module {
            name: "scenario4".to_string(),
            decls: vec![Decl::Func(FuncDef {
                color: Color::Red,
                name: "run".to_string(),
                args: vec![FuncArg { name: "obj".to_string(), type_expr: ty_name("scenario4::MyClass"), span: Span::synthesized() }],
                return_type: ty_name("dynamic"),
                body: vec![Stmt::Return {
                    value: Some(Expr::GetItem {
                        value: Box::new(Expr::Name { name: "obj".to_string(), span: Span::synthesized() }),
                        index: Box::new(Expr::Constant {
                            value: Constant::Str(std::rc::Rc::from("hello")),
                            span: Span::new(crate::diagnostics::CodeLoc::new(3, 4), crate::diagnostics::CodeLoc::new(3, 11)),
                        }),
                        callee: None,
                        span: Span::synthesized(),
                    }),
                    span: Span::synthesized(),
                }],
                span: Span::synthesized(),
            })],
        };

        let errors = redshift_module(&mut vm, &mut module);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::TypeError);
        assert_eq!(errors[0].message, "mismatched types");
        assert_eq!(errors[0].annotations[0].note, "expected `i32`, got `str`");
        assert_eq!(errors[0].annotations[0].span.start.line, 3);
    }

    /// Seed scenario 5 (spec.md §8): wrong arity.
    #[test]
    fn seed_scenario_five_wrong_arity_message() {
        let mut vm = Vm::new();
        let i32_t = vm.builtins().i32_type.clone();

        let mut module = Module {
            name: "scenario5".to_string(),
            decls: vec![Decl::Func(FuncDef {
                color: Color::Red,
                name: "run".to_string(),
                args: vec![],
                return_type: ty_name("i32"),
                body: vec![Stmt::Return {
                    value: Some(Expr::Call {
                        func: Box::new(Expr::Name { name: "takes_one".to_string(), span: Span::synthesized() }),
                        args: vec![
                            Expr::Constant { value: Constant::Int(1), span: Span::synthesized() },
                            Expr::Constant { value: Constant::Int(2), span: Span::synthesized() },
                        ],
                        callee: None,
                        span: Span::synthesized(),
                    }),
                    span: Span::synthesized(),
                }],
                span: Span::synthesized(),
            })],
        };

        let takes_one_fqn = Fqn::module("scenario5").join("takes_one", vec![]);
        let func = FuncObj::new_builtin(
            takes_one_fqn.clone(),
            vec![FuncParam { name: "x".to_string(), w_type: i32_t.clone() }],
            i32_t,
            Color::Red,
            |_, args| Ok(args[0].clone()),
        );
        vm.registry.define(takes_one_fqn, Value::Func(Rc::new(func)));

        let errors = redshift_module(&mut vm, &mut module);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "this function takes 1 argument but 2 arguments were supplied");
    }

    /// Seed scenario 6 (spec.md §8): unknown attribute.
    #[test]
    fn seed_scenario_six_unknown_attribute_message() {
        let mut vm = Vm::new();
        let plain = dummy_type(&vm, "scenario6", "Plain");
        vm.register_type(plain.clone());

        let mut module = Module {
            name: "scenario6".to_string(),
            decls: vec![Decl::Func(FuncDef {
                color: Color::Red,
                name: "run".to_string(),
                args: vec![FuncArg { name: "obj".to_string(), type_expr: ty_name("scenario6::Plain"), span: Span::synthesized() }],
                return_type: ty_name("dynamic"),
                body: vec![Stmt::Return {
                    value: Some(Expr::GetAttr {
                        value: Box::new(Expr::Name { name: "obj".to_string(), span: Span::synthesized() }),
                        attr: "nosuch".to_string(),
                        callee: None,
                        span: Span::synthesized(),
                    }),
                    span: Span::synthesized(),
                }],
                span: Span::synthesized(),
            })],
        };

        let errors = redshift_module(&mut vm, &mut module);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "type 'Plain' has no attribute 'nosuch'");
    }

    /// Error locality (spec.md §8): a TypeError in one function does not
    /// block redshift of an unrelated function in the same module.
    #[test]
    fn error_locality_across_functions() {
        let mut vm = Vm::new();

        let mut module = Module {
            name: "locality".to_string(),
            decls: vec![
                Decl::Func(FuncDef {
                    color: Color::Red,
                    name: "broken".to_string(),
                    args: vec![],
                    return_type: ty_name("i32"),
                    body: vec![Stmt::Return {
                        value: Some(Expr::Name { name: "nosuchname".to_string(), span: Span::synthesized() }),
                        span: Span::synthesized(),
                    }],
                    span: Span::synthesized(),
                }),
                Decl::Func(FuncDef {
                    color: Color::Red,
                    name: "fine".to_string(),
                    args: vec![FuncArg { name: "x".to_string(), type_expr: ty_name("i32"), span: Span::synthesized() }],
                    return_type: ty_name("i32"),
                    body: vec![Stmt::Return {
                        value: Some(Expr::Name { name: "x".to_string(), span: Span::synthesized() }),
                        span: Span::synthesized(),
                    }],
                    span: Span::synthesized(),
                }),
            ],
        };

        let errors = redshift_module(&mut vm, &mut module);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::ScopeError);

        let fine_fqn = Fqn::module("locality").join("fine", vec![]);
        let Value::Func(func) = vm.registry.get(&fine_fqn).cloned().unwrap() else { panic!("fine should still be registered") };
        let result = crate::blue_eval::call_function(&mut vm, &func, &[Value::Int(9)]).unwrap();
        assert_eq!(result.as_int(), Some(9));
    }
}
