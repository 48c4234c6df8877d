//! Diagnostics: source spans, the error taxonomy, and the annotation format
//! consumed by a test harness (spec.md §6 "Diagnostics format", §7 "Error
//! Handling Design").
//!
//! Grounded on the teacher crate's `parse::CodeRange`/`CodeLoc` pair for
//! span representation and on `repl_error::ReplError` for the
//! "one enum per pipeline stage, `Display` plus `From` impls" shape.

use std::fmt;

/// A single source position (0-indexed line and column), mirroring
/// `CodeLoc` in the teacher crate's `parse.rs`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CodeLoc {
    pub line: u32,
    pub column: u32,
}

impl CodeLoc {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for CodeLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A start/end source span. The Parser stamps every AST node with one;
/// the core never fabricates spans, only threads them through (spec.md §6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: CodeLoc,
    pub end: CodeLoc,
}

impl Span {
    #[must_use]
    pub const fn new(start: CodeLoc, end: CodeLoc) -> Self {
        Self { start, end }
    }

    /// A placeholder span for synthesized nodes that have no source
    /// location of their own (e.g. an inserted conversion call).
    #[must_use]
    pub const fn synthesized() -> Self {
        Self {
            start: CodeLoc::new(0, 0),
            end: CodeLoc::new(0, 0),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One `(span, note)` annotation attached to a diagnostic (spec.md §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub span: Span,
    pub note: String,
}

impl Annotation {
    pub fn new(span: Span, note: impl Into<String>) -> Self {
        Self { span, note: note.into() }
    }
}

/// The error kind, matching spec.md §7's taxonomy one-to-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Surfaced unchanged from the Parser.
    ParseError,
    /// Undeclared name, redeclaration, not-in-scope.
    ScopeError,
    /// Mismatched types, not-a-type, not-callable, member not found,
    /// assignment-to-const.
    TypeError,
    /// No opimpl found for an operator with the given operand types; a
    /// specialization of `TypeError` raised at the dispatcher.
    DispatchError,
    /// An exception raised inside a blue call.
    BlueEvalError,
    /// A blue call aborted the whole compilation. Contract-level only: no
    /// panic-catching machinery in this crate constructs it, matching
    /// spec.md's own scoping of the concern — see `DESIGN.md`'s Non-goals.
    RuntimeAbort,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ParseError => "parse error",
            Self::ScopeError => "scope error",
            Self::TypeError => "mismatched types",
            Self::DispatchError => "dispatch error",
            Self::BlueEvalError => "blue evaluation error",
            Self::RuntimeAbort => "runtime abort",
        };
        f.write_str(s)
    }
}

/// A single compile diagnostic: kind, primary message, and annotations.
///
/// This is the unit the redshift pass emits per spec.md §4.9 "Failure
/// semantics" and what a test harness asserts against by message fragment
/// and span (spec.md §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub annotations: Vec<Annotation>,
}

impl CompileError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            annotations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_annotation(mut self, span: Span, note: impl Into<String>) -> Self {
        self.annotations.push(Annotation::new(span, note));
        self
    }

    #[must_use]
    pub fn dispatch(message: impl Into<String>, span: Span, note: impl Into<String>) -> Self {
        Self::new(ErrorKind::DispatchError, message).with_annotation(span, note)
    }

    #[must_use]
    pub fn type_mismatch(expected: &str, got: &str, span: Span) -> Self {
        Self::new(ErrorKind::TypeError, "mismatched types")
            .with_annotation(span, format!("expected `{expected}`, got `{got}`"))
    }

    #[must_use]
    pub fn wrong_arity(expected: usize, got: usize) -> Self {
        let arg_word = |n: usize| if n == 1 { "argument" } else { "arguments" };
        Self::new(
            ErrorKind::TypeError,
            format!(
                "this function takes {expected} {} but {got} {} were supplied",
                arg_word(expected),
                arg_word(got)
            ),
        )
    }

    #[must_use]
    pub fn no_attribute(type_name: &str, attr: &str) -> Self {
        Self::new(
            ErrorKind::TypeError,
            format!("type '{type_name}' has no attribute '{attr}'"),
        )
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        for ann in &self.annotations {
            write!(f, "\n  at {}: {}", ann.span, ann.note)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

/// Result alias used throughout the compiler for operations that can fail
/// with a structured [`CompileError`].
pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_arity_message_matches_conformance_text() {
        let err = CompileError::wrong_arity(1, 2);
        assert_eq!(
            err.message,
            "this function takes 1 argument but 2 arguments were supplied"
        );
    }

    #[test]
    fn type_mismatch_message_matches_conformance_text() {
        let err = CompileError::type_mismatch("i32", "str", Span::synthesized());
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert_eq!(err.annotations[0].note, "expected `i32`, got `str`");
    }

    #[test]
    fn no_attribute_message_matches_conformance_text() {
        let err = CompileError::no_attribute("MyClass", "nosuch");
        assert_eq!(err.message, "type 'MyClass' has no attribute 'nosuch'");
    }
}
