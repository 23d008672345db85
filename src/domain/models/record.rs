//! Iteration snapshots and run outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::checklist::Checklist;
use super::knowledge::KnowledgeBase;
use super::query::{QueryHistory, SearchQuery};
use super::search::SearchResult;
use super::state::{OrchestratorState, RunStatus};

/// Complete observable state of a run after a step completed.
///
/// Every field has an explicit default so a snapshot is valid at any point
/// of the run, including before the first step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub run_id: Uuid,
    /// State entered when this snapshot was taken
    pub state: OrchestratorState,
    /// Number of fully completed iterations
    pub iteration: usize,
    pub question: String,
    pub improved_question: Option<String>,
    pub current_query: Option<SearchQuery>,
    pub query_history: QueryHistory,
    pub search_results: Vec<SearchResult>,
    pub knowledge_base: KnowledgeBase,
    pub answer: Option<String>,
    pub scored_checklist: Checklist,
    /// Non-fatal issues seen during the current iteration
    #[serde(default)]
    pub warnings: Vec<String>,
    pub taken_at: DateTime<Utc>,
}

impl IterationRecord {
    pub fn new(run_id: Uuid, question: impl Into<String>) -> Self {
        Self {
            run_id,
            state: OrchestratorState::Init,
            iteration: 0,
            question: question.into(),
            improved_question: None,
            current_query: None,
            query_history: QueryHistory::new(),
            search_results: Vec::new(),
            knowledge_base: KnowledgeBase::new(),
            answer: None,
            scored_checklist: Checklist::default(),
            warnings: Vec::new(),
            taken_at: Utc::now(),
        }
    }

    /// The question steps should work from: the improved one once it exists.
    pub fn canonical_question(&self) -> &str {
        self.improved_question.as_deref().unwrap_or(&self.question)
    }
}

/// Why the loop stopped in `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The checklist had no requirements
    EmptyChecklist,
    /// `max_iterations` reached
    BudgetExhausted,
    /// Every requirement reached the score threshold
    ThresholdMet,
    /// Scores stopped moving between iterations
    Stagnated,
}

impl StopReason {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::EmptyChecklist => "checklist is empty",
            Self::BudgetExhausted => "iteration budget exhausted",
            Self::ThresholdMet => "all requirements met the score threshold",
            Self::Stagnated => "scores stopped improving",
        }
    }
}

/// Final result of a run: terminal status plus the last consistent snapshot.
///
/// The query is appended to the history when it is planned. A run that stops
/// mid-iteration therefore has one more query in `record.query_history` than
/// `iterations_completed`; [`RunOutcome::in_flight_query`] returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub record: IterationRecord,
    /// Iterations that reached scoring
    pub iterations_completed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    /// Step that failed, when `status` is `Errored`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_state: Option<OrchestratorState>,
    /// Human-readable failure description, when `status` is `Errored`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunOutcome {
    pub fn is_done(&self) -> bool {
        self.status == RunStatus::Done
    }

    /// Query of the iteration that was interrupted, if the run stopped
    /// between planning and scoring.
    pub fn in_flight_query(&self) -> Option<&SearchQuery> {
        if self.record.query_history.len() > self.iterations_completed {
            self.record.query_history.last()
        } else {
            None
        }
    }
}
