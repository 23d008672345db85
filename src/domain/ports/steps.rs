//! One trait per model-backed step of the research loop.
//!
//! Each step receives the model identifier it should use. Implementations
//! return [`ServiceError::Malformed`] when a response cannot be parsed into
//! the expected shape.

use async_trait::async_trait;

use crate::domain::errors::ServiceError;
use crate::domain::models::{
    Checklist, ExtractedNugget, KnowledgeBase, QueryHistory, SourceDocument,
};

#[async_trait]
pub trait QuestionImprover: Send + Sync {
    /// Restate the question so it is specific and answerable.
    async fn improve(&self, question: &str, model: &str) -> Result<String, ServiceError>;
}

#[async_trait]
pub trait ChecklistGenerator: Send + Sync {
    /// Produce the requirements a complete answer must satisfy, all scored 0.
    async fn generate(&self, question: &str, model: &str) -> Result<Checklist, ServiceError>;
}

#[async_trait]
pub trait QueryPlanner: Send + Sync {
    /// Choose the next search query, targeting the lowest-scored requirements
    /// and avoiding queries already in `history`.
    async fn plan(
        &self,
        question: &str,
        checklist: &Checklist,
        history: &QueryHistory,
        model: &str,
    ) -> Result<String, ServiceError>;
}

#[async_trait]
pub trait KnowledgeExtractor: Send + Sync {
    /// Turn one source document into new nuggets or updates of existing ones.
    async fn extract(
        &self,
        question: &str,
        document: &SourceDocument,
        knowledge_base: &KnowledgeBase,
        model: &str,
    ) -> Result<Vec<ExtractedNugget>, ServiceError>;
}

#[async_trait]
pub trait AnswerDrafter: Send + Sync {
    /// Write the full answer from the knowledge base.
    async fn draft(
        &self,
        question: &str,
        checklist: &Checklist,
        knowledge_base: &KnowledgeBase,
        model: &str,
    ) -> Result<String, ServiceError>;
}

#[async_trait]
pub trait ChecklistScorer: Send + Sync {
    /// Rescore every requirement against the answer.
    ///
    /// The returned checklist has the same ids and requirement texts, in the
    /// same order, as `checklist`.
    async fn score(
        &self,
        question: &str,
        answer: &str,
        checklist: &Checklist,
        model: &str,
    ) -> Result<Checklist, ServiceError>;
}
