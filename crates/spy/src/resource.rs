//! Resource limits for blue evaluation (spec.md §5).
//!
//! Compilation is single-threaded and cooperative: nothing suspends inside
//! redshift or blue evaluation, and a pathological blue program (an
//! infinite `while True:` at compile time) must abort the compilation job
//! rather than hang the compiler process. Grounded on the teacher crate's
//! `resource::ResourceTracker`, trimmed to the one counter this crate needs:
//! a step budget on the blue evaluator's statement-execution loop.

use std::fmt;

/// Exceeding the step budget aborts the compilation job (spec.md §5,
/// "Cancellation is not supported mid-compilation; a fatal error aborts the
/// job with a structured diagnostic").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepBudgetExceeded {
    pub limit: u64,
}

impl fmt::Display for StepBudgetExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blue evaluation step budget exceeded ({} steps)", self.limit)
    }
}

impl std::error::Error for StepBudgetExceeded {}

/// Counts statements executed by the blue evaluator, aborting once a fixed
/// limit is exceeded. `None` means unlimited (used by tests and the CLI's
/// `--unlimited` smoke mode).
#[derive(Debug, Clone, Copy)]
pub struct StepBudget {
    limit: Option<u64>,
    spent: u64,
}

/// A reasonable default for one compilation job: generous enough for any
/// realistic blue-time metaprogramming, small enough to fail fast on a
/// runaway loop instead of hanging the compiler.
pub const DEFAULT_STEP_LIMIT: u64 = 10_000_000;

impl StepBudget {
    #[must_use]
    pub fn new(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            spent: 0,
        }
    }

    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            limit: None,
            spent: 0,
        }
    }

    /// Records one blue-evaluator step, failing once the limit is crossed.
    pub fn tick(&mut self) -> Result<(), StepBudgetExceeded> {
        self.spent += 1;
        match self.limit {
            Some(limit) if self.spent > limit => Err(StepBudgetExceeded { limit }),
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn spent(&self) -> u64 {
        self.spent
    }
}

impl Default for StepBudget {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_trips_after_limit() {
        let mut budget = StepBudget::new(3);
        assert!(budget.tick().is_ok());
        assert!(budget.tick().is_ok());
        assert!(budget.tick().is_ok());
        assert!(budget.tick().is_err());
    }

    #[test]
    fn unlimited_never_trips() {
        let mut budget = StepBudget::unlimited();
        for _ in 0..1000 {
            assert!(budget.tick().is_ok());
        }
    }
}
