//! Orchestrator state machine.
//!
//! The transition table lives here so it can be enumerated and tested
//! without running any step bodies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a research run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    /// Run created, nothing executed yet
    #[default]
    Init,
    /// Restating the raw question
    ImprovingQuestion,
    /// Generating the requirement checklist
    BuildingChecklist,
    /// Choosing the next search query
    PlanningQuery,
    /// Running the search and fetching result pages
    Searching,
    /// Extracting nuggets and merging them into the knowledge base
    MergingKnowledge,
    /// Regenerating the answer
    DraftingAnswer,
    /// Scoring the answer against the checklist
    Scoring,
    /// Deciding whether to iterate again
    Evaluating,
    /// Converged or budget spent
    Done,
    /// Stopped by a cancellation request
    Cancelled,
    /// Stopped by an unrecoverable step failure
    Errored,
}

impl OrchestratorState {
    /// Every state, in table order.
    pub const ALL: [Self; 12] = [
        Self::Init,
        Self::ImprovingQuestion,
        Self::BuildingChecklist,
        Self::PlanningQuery,
        Self::Searching,
        Self::MergingKnowledge,
        Self::DraftingAnswer,
        Self::Scoring,
        Self::Evaluating,
        Self::Done,
        Self::Cancelled,
        Self::Errored,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::ImprovingQuestion => "improving_question",
            Self::BuildingChecklist => "building_checklist",
            Self::PlanningQuery => "planning_query",
            Self::Searching => "searching",
            Self::MergingKnowledge => "merging_knowledge",
            Self::DraftingAnswer => "drafting_answer",
            Self::Scoring => "scoring",
            Self::Evaluating => "evaluating",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Errored => "errored",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Errored)
    }

    /// States that execute one step of the per-iteration loop.
    pub fn is_iteration_step(&self) -> bool {
        matches!(
            self,
            Self::PlanningQuery
                | Self::Searching
                | Self::MergingKnowledge
                | Self::DraftingAnswer
                | Self::Scoring
                | Self::Evaluating
        )
    }

    /// Forward edges of the happy path, excluding the cancel/error side exits.
    fn forward_transitions(&self) -> &'static [Self] {
        match self {
            Self::Init => &[Self::ImprovingQuestion],
            Self::ImprovingQuestion => &[Self::BuildingChecklist],
            Self::BuildingChecklist => &[Self::PlanningQuery],
            Self::PlanningQuery => &[Self::Searching],
            Self::Searching => &[Self::MergingKnowledge],
            Self::MergingKnowledge => &[Self::DraftingAnswer],
            Self::DraftingAnswer => &[Self::Scoring],
            Self::Scoring => &[Self::Evaluating],
            Self::Evaluating => &[Self::PlanningQuery, Self::Done],
            Self::Done | Self::Cancelled | Self::Errored => &[],
        }
    }

    /// Valid transitions from this state.
    ///
    /// Every non-terminal state may also exit to `Cancelled` or `Errored`.
    pub fn valid_transitions(&self) -> Vec<Self> {
        let mut next = self.forward_transitions().to_vec();
        if !self.is_terminal() {
            next.push(Self::Cancelled);
            next.push(Self::Errored);
        }
        next
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal status reported to the caller of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Done,
    Cancelled,
    Errored,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Errored => "errored",
        }
    }
}

impl From<RunStatus> for OrchestratorState {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Done => Self::Done,
            RunStatus::Cancelled => Self::Cancelled,
            RunStatus::Errored => Self::Errored,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
