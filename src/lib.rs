//! Rave - iterative research agent
//!
//! Rave answers a question by looping: plan a search query from the weakest
//! requirements of an answer checklist, search and fetch sources, merge the
//! extracted facts into a knowledge base, draft an answer, score it against
//! the checklist, and repeat until the scores converge or the iteration
//! budget runs out.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, ports and the error taxonomy
//! - **Service Layer** (`services`): knowledge merge, convergence rules,
//!   prompts and the model-backed step implementations
//! - **Application Layer** (`application`): the orchestrator state machine
//! - **Infrastructure Layer** (`infrastructure`): config, logging and the
//!   HTTP adapters for completion, search and page fetch
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rave::{LlmResearcher, Orchestrator, ResearchOptions, ResearchSteps, RunConfig};
//!
//! let researcher = Arc::new(LlmResearcher::new(completion));
//! let steps = ResearchSteps::from_researcher(researcher, search, fetcher);
//! let orchestrator = Orchestrator::new(steps, ResearchOptions::default());
//! let outcome = orchestrator.run("What is the capital of France?", &RunConfig::default()).await?;
//! println!("{}", outcome.record.answer.unwrap_or_default());
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{CancellationToken, Orchestrator, ResearchSteps};
pub use domain::errors::{RaveError, RaveResult, ServiceError};
pub use domain::models::{
    Checklist, ChecklistItem, Config, IterationRecord, KnowledgeBase, KnowledgeNugget,
    OrchestratorState, QueryHistory, ResearchOptions, RunConfig, RunOutcome, RunStatus,
    StopReason,
};
pub use domain::ports::{CompletionService, PageFetchService, SearchService};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{merge, ConvergenceEvaluator, EventBus, LlmResearcher, RunEvent};
