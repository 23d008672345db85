pub mod catalog;
pub mod checklist;
pub mod config;
pub mod knowledge;
pub mod query;
pub mod record;
pub mod search;
pub mod state;

pub use catalog::{ModelSpec, DEFAULT_MODEL, MODEL_CATALOG};
pub use checklist::{Checklist, ChecklistItem, ChecklistItemId, MissingScorePolicy, ScoreAssignment};
pub use config::{
    CompletionConfig, Config, FetchConfig, LoggingConfig, ModelsConfig, ResearchConfig,
    ResearchOptions, RetryConfig, RunConfig, SearchConfig,
};
pub use knowledge::{ExtractedNugget, KnowledgeBase, KnowledgeNugget, NuggetId, NuggetUpdate};
pub use query::{QueryHistory, SearchQuery};
pub use record::{IterationRecord, RunOutcome, StopReason};
pub use search::{SearchResult, SourceDocument};
pub use state::{OrchestratorState, RunStatus};
