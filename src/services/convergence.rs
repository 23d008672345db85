//! Convergence evaluation for the research loop.
//!
//! Stopping rules, checked in order:
//! 1. empty checklist
//! 2. iteration budget spent
//! 3. every requirement at or above the score threshold
//! 4. optional stagnation: no score moved by at least `stagnation_delta`
//!    since the previous scoring
//!
//! Evaluation is pure and never touches its inputs.

use serde::Serialize;

use crate::domain::models::{Checklist, RunConfig, StopReason};

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum ConvergenceDecision {
    Continue,
    Stop(StopReason),
}

impl ConvergenceDecision {
    pub fn should_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self {
            Self::Continue => None,
            Self::Stop(reason) => Some(*reason),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConvergenceEvaluator {
    stagnation_delta: Option<f64>,
}

impl ConvergenceEvaluator {
    pub const fn new() -> Self {
        Self {
            stagnation_delta: None,
        }
    }

    /// Enable the stagnation rule. Negative or non-finite deltas disable it.
    #[must_use]
    pub fn with_stagnation_delta(mut self, delta: Option<f64>) -> Self {
        self.stagnation_delta = delta.filter(|d| d.is_finite() && *d >= 0.0);
        self
    }

    /// Rules 1-3 only.
    pub fn should_continue(&self, checklist: &Checklist, iteration_count: usize, config: &RunConfig) -> bool {
        self.evaluate(checklist, None, iteration_count, config)
            .should_continue()
    }

    /// Full evaluation. `previous` is the checklist as scored one iteration
    /// earlier; the stagnation rule needs it.
    pub fn evaluate(
        &self,
        checklist: &Checklist,
        previous: Option<&Checklist>,
        iteration_count: usize,
        config: &RunConfig,
    ) -> ConvergenceDecision {
        if checklist.is_empty() {
            return ConvergenceDecision::Stop(StopReason::EmptyChecklist);
        }
        if iteration_count >= config.max_iterations as usize {
            return ConvergenceDecision::Stop(StopReason::BudgetExhausted);
        }
        if checklist.all_meet(config.score_threshold) {
            return ConvergenceDecision::Stop(StopReason::ThresholdMet);
        }
        if let (Some(delta), Some(previous)) = (self.stagnation_delta, previous) {
            if is_stagnant(checklist, previous, delta) {
                return ConvergenceDecision::Stop(StopReason::Stagnated);
            }
        }
        ConvergenceDecision::Continue
    }
}

/// No item moved by `delta` or more. Checklists of different shape never
/// count as stagnant.
fn is_stagnant(current: &Checklist, previous: &Checklist, delta: f64) -> bool {
    if current.len() != previous.len() {
        return false;
    }
    current
        .iter()
        .zip(previous.iter())
        .all(|(now, before)| (now.current_score - before.current_score).abs() < delta)
}
