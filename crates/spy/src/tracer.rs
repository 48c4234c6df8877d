//! Compile-time tracing hooks over blue evaluation and dispatch.
//!
//! Mirrors the teacher crate's `tracer::VmTracer` design: a trait with one
//! method per interesting event, monomorphized into the blue evaluator so
//! [`NoopTracer`] compiles away entirely and costs nothing in the default
//! (non-debugging) path. This is this crate's substitute for a `tracing`/
//! `log` dependency — the teacher crate doesn't pull one in either, instead
//! hand-rolling the same zero-cost-when-unused shape.

use crate::fqn::Fqn;

/// A resolved dispatch decision, reported once per operator node for
/// tracing/debugging (not part of the compiled output).
#[derive(Debug, Clone)]
pub struct DispatchEvent {
    /// The operator symbol that was resolved (e.g. `"+"`, `"GETATTR"`).
    pub op: String,
    /// Which cascade rule (spec.md §4.6) produced the result, 1-5.
    pub rule: u8,
    /// FQN of the resolved callee, if dispatch succeeded.
    pub callee: Option<Fqn>,
}

/// Hook points exercised by the blue evaluator and the dispatcher.
pub trait BlueTracer {
    /// A blue function is about to be called.
    fn on_blue_call(&mut self, _callee: &Fqn) {}

    /// A blue function call returned.
    fn on_blue_return(&mut self, _callee: &Fqn) {}

    /// The dispatcher resolved (or failed to resolve) an operator node.
    fn on_dispatch(&mut self, _event: DispatchEvent) {}

    /// Redshift finished lowering one function.
    fn on_redshift_function(&mut self, _fqn: &Fqn) {}
}

/// Zero-cost tracer: every hook is an empty, inlined no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl BlueTracer for NoopTracer {}

/// Records every event in order, for tests and offline inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingTracer {
    pub blue_calls: Vec<Fqn>,
    pub dispatches: Vec<DispatchEvent>,
    pub redshifted_functions: Vec<Fqn>,
}

impl BlueTracer for RecordingTracer {
    fn on_blue_call(&mut self, callee: &Fqn) {
        self.blue_calls.push(callee.clone());
    }

    fn on_dispatch(&mut self, event: DispatchEvent) {
        self.dispatches.push(event);
    }

    fn on_redshift_function(&mut self, fqn: &Fqn) {
        self.redshifted_functions.push(fqn.clone());
    }
}
