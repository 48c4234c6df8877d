//! A two-color (red=runtime, blue=compile-time) evaluation engine: object
//! model, operator dispatch, type checking, and the Redshift pass that
//! lowers a parsed AST into one with every operator node resolved to a
//! concrete callee. The Parser, SymTable, native backend, and persisted
//! module format are out of scope (spec.md §1) — callers hand this crate
//! an [`ast::Module`] built however they like and get back a module with
//! every `callee` slot filled in, or the [`diagnostics::CompileError`]s
//! that prevented it.

pub mod ast;
pub mod blue_eval;
pub mod builtins;
pub mod diagnostics;
pub mod dispatch;
pub mod fqn;
pub mod function;
pub mod intern;
pub mod multimethod;
pub mod object;
pub mod opimpl;
pub mod redshift;
pub mod registry;
pub mod resource;
pub mod tracer;
pub mod typecheck;
pub mod vm;

pub use crate::{
    blue_eval::{call_function, eval_expr, Scope},
    diagnostics::{Annotation, CodeLoc, CompileError, CompileResult, ErrorKind, Span},
    fqn::{Fqn, FqnParseError, NsPart},
    function::{FuncBody, FuncObj, FuncParam, FuncType},
    object::{Color, Instance, Member, StorageCategory, TypeKind, TypeObj, Value},
    opimpl::{CapabilityFn, OpArg, OpImpl},
    redshift::redshift_module,
    registry::{BuiltinTypes, Registry},
    resource::{StepBudget, StepBudgetExceeded, DEFAULT_STEP_LIMIT},
    tracer::{BlueTracer, DispatchEvent, NoopTracer, RecordingTracer},
    vm::Vm,
};
