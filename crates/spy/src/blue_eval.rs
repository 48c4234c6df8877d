//! The Blue Evaluator (spec.md §4.8): a direct-style tree-walking
//! interpreter over wrapped values.
//!
//! Also doubles as the reference interpreter for already-redshifted red
//! function bodies, since this crate's scope ends at "the opimpl for every
//! AST node is fixed" (spec.md §1) — there is no backend here to hand the
//! resolved tree to. Evaluating a fully-redshifted function and evaluating
//! a blue function are the same walk: every operator node already names its
//! concrete callee, so there is nothing left to dispatch.
//!
//! Grounded on the teacher crate's `bytecode/vm/mod.rs` dispatch loop and
//! `bytecode/vm/call.rs` call-frame handling, simplified from a bytecode
//! loop to a direct tree walk (no bytecode layer exists in this crate's
//! scope) and on `examples/original_source/spy/vm/vm.py`'s `call_function`
//! for the "no blue call without a step-budget tick" discipline (spec.md
//! §5).

use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    ast::{self, BinOp, CompareOp, Constant, Expr, Stmt, UnaryOp},
    diagnostics::{CompileError, CompileResult, ErrorKind},
    fqn::Fqn,
    function::{FuncBody, FuncObj},
    object::Value,
    vm::Vm,
};

/// Execution context for one function activation: the enclosing module
/// (for resolving bare `Name` globals — this crate has no SymTable
/// component, spec.md §1, so name resolution here is a deliberately minimal
/// stand-in) and the current local bindings.
pub struct Scope {
    pub module: String,
    pub locals: IndexMap<String, Value>,
}

impl Scope {
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self { module: module.into(), locals: IndexMap::new() }
    }
}

enum Flow {
    Normal,
    Return(Value),
}

/// Calls a function value with already-evaluated arguments, ticking the
/// step budget once per call (spec.md §5).
pub fn call_function(vm: &mut Vm, func: &Rc<FuncObj>, args: &[Value]) -> CompileResult<Value> {
    vm.budget.tick().map_err(|e| CompileError::new(ErrorKind::BlueEvalError, e.to_string()))?;
    vm.tracer.on_blue_call(&func.fqn);
    let result = match &func.body {
        FuncBody::Builtin(body) => body(vm, args),
        FuncBody::Ast(def) => call_ast_function(vm, &func.fqn, def, args),
    };
    vm.tracer.on_blue_return(&func.fqn);
    result
}

fn call_ast_function(vm: &mut Vm, fqn: &Fqn, def: &ast::FuncDef, args: &[Value]) -> CompileResult<Value> {
    let mut scope = Scope::new(fqn.modname().to_string());
    for (param, value) in def.args.iter().zip(args) {
        scope.locals.insert(param.name.clone(), value.clone());
    }
    match exec_block(vm, &mut scope, &def.body)? {
        Flow::Return(value) => Ok(value),
        Flow::Normal => Ok(Value::None),
    }
}

fn exec_block(vm: &mut Vm, scope: &mut Scope, stmts: &[Stmt]) -> CompileResult<Flow> {
    for stmt in stmts {
        match exec_stmt(vm, scope, stmt)? {
            Flow::Normal => {}
            ret @ Flow::Return(_) => return Ok(ret),
        }
    }
    Ok(Flow::Normal)
}

fn exec_stmt(vm: &mut Vm, scope: &mut Scope, stmt: &Stmt) -> CompileResult<Flow> {
    vm.budget.tick().map_err(|e| CompileError::new(ErrorKind::BlueEvalError, e.to_string()))?;
    match stmt {
        Stmt::Return { value, .. } => {
            let result = match value {
                Some(expr) => eval_expr(vm, scope, expr)?,
                None => Value::None,
            };
            Ok(Flow::Return(result))
        }
        Stmt::Assign { target, value, .. } => {
            let result = eval_expr(vm, scope, value)?;
            scope.locals.insert(target.clone(), result);
            Ok(Flow::Normal)
        }
        Stmt::If { test, then_body, else_body, .. } => {
            if is_truthy(&eval_expr(vm, scope, test)?) {
                exec_block(vm, scope, then_body)
            } else {
                exec_block(vm, scope, else_body)
            }
        }
        Stmt::While { test, body, .. } => {
            while is_truthy(&eval_expr(vm, scope, test)?) {
                match exec_block(vm, scope, body)? {
                    Flow::Normal => {}
                    ret @ Flow::Return(_) => return Ok(ret),
                }
            }
            Ok(Flow::Normal)
        }
        Stmt::Pass { .. } => Ok(Flow::Normal),
        Stmt::StmtExpr { expr, .. } => {
            eval_expr(vm, scope, expr)?;
            Ok(Flow::Normal)
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(x) => *x != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::None => false,
        Value::List(items, _) => !items.borrow().is_empty(),
        Value::Type(_) | Value::Func(_) | Value::Instance(_) => true,
    }
}

/// Evaluates an expression. Operator-shaped nodes must already carry a
/// resolved `callee` (redshift's job, spec.md §4.9); this evaluator does not
/// perform dispatch itself, except for the member-read intrinsic, which
/// redshift leaves as a named sentinel rather than a real callable
/// (spec.md §4.6 rule 2).
pub fn eval_expr(vm: &mut Vm, scope: &mut Scope, expr: &Expr) -> CompileResult<Value> {
    match expr {
        Expr::Name { name, .. } => {
            if let Some(value) = scope.locals.get(name) {
                return Ok(value.clone());
            }
            let fqn = Fqn::module(&scope.module).join(name, vec![]);
            vm.registry
                .get(&fqn)
                .cloned()
                .ok_or_else(|| CompileError::new(ErrorKind::ScopeError, format!("name '{name}' is not defined")))
        }
        Expr::Constant { value, .. } => Ok(eval_constant(value)),
        Expr::List { items, .. } => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval_expr(vm, scope, item)?);
            }
            let item_type = values
                .first()
                .map(|v| v.dynamic_type(vm.builtins()))
                .unwrap_or_else(|| vm.builtins().dynamic_type.clone());
            let list_type = vm.specialize_list(item_type);
            Ok(Value::List(Rc::new(std::cell::RefCell::new(values)), list_type))
        }
        Expr::GetAttr { value, attr, callee, span } => {
            let base = eval_expr(vm, scope, value)?;
            let callee = callee.as_ref().ok_or_else(|| unresolved(*span))?;
            if *callee == vm.member_read_intrinsic() {
                return read_member(&base, attr, *span);
            }
            call_resolved(vm, callee, &[base])
        }
        Expr::GetItem { value, index, callee, span } => {
            let base = eval_expr(vm, scope, value)?;
            let idx = eval_expr(vm, scope, index)?;
            let callee = callee.as_ref().ok_or_else(|| unresolved(*span))?;
            call_resolved(vm, callee, &[base, idx])
        }
        Expr::Call { func, args, callee, span } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(vm, scope, arg)?);
            }
            let callee = match callee {
                Some(fqn) => fqn.clone(),
                None => match eval_expr(vm, scope, func)? {
                    Value::Func(f) => f.fqn.clone(),
                    _ => return Err(unresolved(*span)),
                },
            };
            call_resolved(vm, &callee, &values)
        }
        Expr::BinOp { op, left, right, callee, span } => {
            let l = eval_expr(vm, scope, left)?;
            let r = eval_expr(vm, scope, right)?;
            let callee = callee.as_ref().ok_or_else(|| unresolved(*span))?;
            let _ = op;
            call_resolved(vm, callee, &[l, r])
        }
        Expr::UnaryOp { op, operand, callee, span } => {
            let v = eval_expr(vm, scope, operand)?;
            let callee = callee.as_ref().ok_or_else(|| unresolved(*span))?;
            let _ = op;
            call_resolved(vm, callee, &[v])
        }
        Expr::Compare { op, left, right, callee, span } => {
            let l = eval_expr(vm, scope, left)?;
            let r = eval_expr(vm, scope, right)?;
            let callee = callee.as_ref().ok_or_else(|| unresolved(*span))?;
            let _ = op;
            call_resolved(vm, callee, &[l, r])
        }
    }
}

fn unresolved(span: crate::diagnostics::Span) -> CompileError {
    CompileError::new(ErrorKind::DispatchError, "operator node has not been redshifted")
        .with_annotation(span, "no concrete callee recorded")
}

fn read_member(base: &Value, attr: &str, span: crate::diagnostics::Span) -> CompileResult<Value> {
    let Value::Instance(instance) = base else {
        return Err(CompileError::new(ErrorKind::TypeError, "member access on a non-instance value")
            .with_annotation(span, attr.to_string()));
    };
    let member = instance
        .ty
        .lookup_member(attr)
        .ok_or_else(|| CompileError::no_attribute(instance.ty.name(), attr))?;
    Ok(instance.slots.borrow()[member.offset].clone())
}

fn call_resolved(vm: &mut Vm, callee: &Fqn, args: &[Value]) -> CompileResult<Value> {
    let value = vm
        .registry
        .get(callee)
        .cloned()
        .ok_or_else(|| CompileError::new(ErrorKind::ScopeError, format!("unresolved global '{callee}'")))?;
    let Value::Func(func) = value else {
        return Err(CompileError::new(ErrorKind::TypeError, format!("'{callee}' is not callable")));
    };
    call_function(vm, &func, args)
}

/// Shared with redshift (spec.md §4.9 step 1: "blue value ... if the
/// expression is a constant"), so a literal's `OpArg` carries the same
/// `Value` the evaluator would later produce for it.
pub(crate) fn eval_constant(c: &Constant) -> Value {
    match c {
        Constant::None => Value::None,
        Constant::Bool(b) => Value::Bool(*b),
        Constant::Int(i) => Value::Int(*i),
        Constant::Float(x) => Value::Float(*x),
        Constant::Str(s) => Value::Str(s.clone()),
    }
}

// Silence unused-variant warnings for operator tags kept on `Expr` purely
// for diagnostics/redshift bookkeeping; the evaluator itself only needs the
// resolved callee.
#[allow(dead_code)]
fn _assert_operator_tags_constructible(_: BinOp, _: UnaryOp, _: CompareOp) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{diagnostics::Span, function::FuncParam, object::Color};

    #[test]
    fn calling_a_builtin_with_concrete_args_runs_its_body() {
        let mut vm = Vm::new();
        let i32_t = vm.builtins().i32_type.clone();
        let fqn = Fqn::module("builtins").join("i32_add", vec![]);
        let func = match vm.registry.get(&fqn).cloned() {
            Some(Value::Func(f)) => f,
            _ => panic!("builtin i32_add should be registered"),
        };
        let _ = i32_t;
        let result = call_function(&mut vm, &func, &[Value::Int(1), Value::Int(2)]).unwrap();
        assert_eq!(result.as_int(), Some(3));
    }

    #[test]
    fn seed_scenario_one_add_function_evaluates_to_three() {
        let mut vm = Vm::new();
        let i32_t = vm.builtins().i32_type.clone();
        let add_fqn = Fqn::module("builtins").join("i32_add", vec![]);

        // Stand in for redshift having already resolved `x + y` to the
        // `i32_add` builtin (spec.md §8 seed scenario 1).
        let def = ast::FuncDef {
            color: Color::Red,
            name: "add".to_string(),
            args: vec![
                ast::FuncArg { name: "x".to_string(), type_expr: ast::TypeExpr::Name("i32".to_string()), span: Span::synthesized() },
                ast::FuncArg { name: "y".to_string(), type_expr: ast::TypeExpr::Name("i32".to_string()), span: Span::synthesized() },
            ],
            return_type: ast::TypeExpr::Name("i32".to_string()),
            body: vec![Stmt::Return {
                value: Some(Expr::BinOp {
                    op: BinOp::Add,
                    left: Box::new(Expr::Name { name: "x".to_string(), span: Span::synthesized() }),
                    right: Box::new(Expr::Name { name: "y".to_string(), span: Span::synthesized() }),
                    callee: Some(add_fqn),
                    span: Span::synthesized(),
                }),
                span: Span::synthesized(),
            }],
            span: Span::synthesized(),
        };
        let add_func_fqn = Fqn::module("scenario1").join("add", vec![]);
        let func = Rc::new(FuncObj::new_ast(
            add_func_fqn,
            crate::function::FuncType {
                params: vec![
                    FuncParam { name: "x".to_string(), w_type: i32_t.clone() },
                    FuncParam { name: "y".to_string(), w_type: i32_t.clone() },
                ],
                ret: i32_t,
                color: Color::Red,
            },
            Rc::new(def),
        ));
        let result = call_function(&mut vm, &func, &[Value::Int(1), Value::Int(2)]).unwrap();
        assert_eq!(result.as_int(), Some(3));
    }
}
