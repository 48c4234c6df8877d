use std::{process::ExitCode, time::Instant};

use spy::{
    ast::{BinOp, Decl, Expr, FuncArg, FuncDef, GlobalVarDef, Module, Stmt, TypeExpr, VarDef},
    redshift_module, Color, CompileError, Fqn, Span, Value, Vm,
};

/// A tiny in-process demo program, standing in for what a real Parser would
/// hand the core (spec.md §6): a global, a red function that uses it, and a
/// `main` that calls the function. No surface syntax is parsed here — this
/// crate's scope ends at the `ast::Module` boundary.
fn demo_module() -> Module {
    let i32_ty = || TypeExpr::Name("i32".to_string());

    Module {
        name: "demo".to_string(),
        decls: vec![
            Decl::GlobalVar(GlobalVarDef {
                vardef: VarDef {
                    name: "BASE".to_string(),
                    type_expr: Some(i32_ty()),
                    value: Some(Expr::Constant { value: spy::ast::Constant::Int(10), span: Span::synthesized() }),
                    span: Span::synthesized(),
                },
            }),
            Decl::Func(FuncDef {
                color: Color::Red,
                name: "add_base".to_string(),
                args: vec![FuncArg { name: "x".to_string(), type_expr: i32_ty(), span: Span::synthesized() }],
                return_type: i32_ty(),
                body: vec![Stmt::Return {
                    value: Some(Expr::BinOp {
                        op: BinOp::Add,
                        left: Box::new(Expr::Name { name: "x".to_string(), span: Span::synthesized() }),
                        right: Box::new(Expr::Name { name: "BASE".to_string(), span: Span::synthesized() }),
                        callee: None,
                        span: Span::synthesized(),
                    }),
                    span: Span::synthesized(),
                }],
                span: Span::synthesized(),
            }),
            Decl::Func(FuncDef {
                color: Color::Red,
                name: "main".to_string(),
                args: vec![],
                return_type: i32_ty(),
                body: vec![Stmt::Return {
                    value: Some(Expr::Call {
                        func: Box::new(Expr::Name { name: "add_base".to_string(), span: Span::synthesized() }),
                        args: vec![Expr::Constant { value: spy::ast::Constant::Int(32), span: Span::synthesized() }],
                        callee: None,
                        span: Span::synthesized(),
                    }),
                    span: Span::synthesized(),
                }],
                span: Span::synthesized(),
            }),
        ],
    }
}

fn print_errors(errors: &[CompileError]) {
    for err in errors {
        eprintln!("{err}");
    }
}

fn main() -> ExitCode {
    let mut vm = Vm::new();
    let mut module = demo_module();

    let start = Instant::now();
    let errors = redshift_module(&mut vm, &mut module);
    let elapsed = start.elapsed();
    eprintln!("time taken to redshift: {elapsed:?}");

    if !errors.is_empty() {
        eprintln!("redshift failed with {} error(s):", errors.len());
        print_errors(&errors);
        return ExitCode::FAILURE;
    }
    eprintln!("redshift succeeded");

    let main_fqn = Fqn::module("demo").join("main", vec![]);
    let Some(Value::Func(main_func)) = vm.registry.get(&main_fqn).cloned() else {
        eprintln!("error: demo::main was not registered");
        return ExitCode::FAILURE;
    };

    let start = Instant::now();
    match spy::call_function(&mut vm, &main_func, &[]) {
        Ok(result) => {
            let elapsed = start.elapsed();
            println!("{result}");
            eprintln!("time taken to run: {elapsed:?}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error:\n{err}");
            ExitCode::FAILURE
        }
    }
}
