//! Port trait definitions (Hexagonal Architecture)
//!
//! The loop depends only on these traits:
//! - CompletionService, SearchService, PageFetchService: external capabilities
//! - the step traits in [`steps`]: one per model-backed step of the loop
//!
//! Infrastructure adapters implement the external capabilities; the services
//! layer implements the steps on top of a `CompletionService`.

pub mod completion;
pub mod fetch;
pub mod search;
pub mod steps;

pub use completion::{CompletionService, Prompt};
pub use fetch::{FetchRequest, PageFetchService};
pub use search::SearchService;
pub use steps::{
    AnswerDrafter, ChecklistGenerator, ChecklistScorer, KnowledgeExtractor, QueryPlanner,
    QuestionImprover,
};
