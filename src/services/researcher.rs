//! Model-backed research steps.
//!
//! [`LlmResearcher`] implements every step trait on top of a single
//! [`CompletionService`]. Structured responses are parsed and validated here;
//! anything that does not fit the expected shape is reported as
//! [`ServiceError::Malformed`].

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::domain::errors::ServiceError;
use crate::domain::models::{
    Checklist, ChecklistItemId, ExtractedNugget, KnowledgeBase, KnowledgeNugget, MissingScorePolicy,
    NuggetId, NuggetUpdate, QueryHistory, ScoreAssignment, SourceDocument,
};
use crate::domain::ports::{
    AnswerDrafter, ChecklistGenerator, ChecklistScorer, CompletionService, KnowledgeExtractor,
    QueryPlanner, QuestionImprover,
};

use super::{extract_json_from_response, prompts, query_planner::clean_query};

pub struct LlmResearcher {
    completion: Arc<dyn CompletionService>,
    missing_score: MissingScorePolicy,
}

impl LlmResearcher {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self {
            completion,
            missing_score: MissingScorePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_missing_score(mut self, policy: MissingScorePolicy) -> Self {
        self.missing_score = policy;
        self
    }
}

#[async_trait]
impl QuestionImprover for LlmResearcher {
    #[instrument(skip(self, question))]
    async fn improve(&self, question: &str, model: &str) -> Result<String, ServiceError> {
        let response = self
            .completion
            .complete(&prompts::improve_question(question), model)
            .await?;
        non_empty_text(&response, "improved question")
    }
}

#[async_trait]
impl ChecklistGenerator for LlmResearcher {
    #[instrument(skip(self, question))]
    async fn generate(&self, question: &str, model: &str) -> Result<Checklist, ServiceError> {
        let response = self
            .completion
            .complete(&prompts::build_checklist(question), model)
            .await?;
        parse_checklist(&response)
    }
}

#[async_trait]
impl QueryPlanner for LlmResearcher {
    #[instrument(skip(self, question, checklist, history), fields(history = history.len()))]
    async fn plan(
        &self,
        question: &str,
        checklist: &Checklist,
        history: &QueryHistory,
        model: &str,
    ) -> Result<String, ServiceError> {
        let response = self
            .completion
            .complete(&prompts::plan_query(question, checklist, history), model)
            .await?;
        let query = clean_query(&response)
            .ok_or_else(|| ServiceError::Malformed("response contains no search query".to_string()))?;

        if history.contains_equivalent(&query) {
            warn!(query = %query, "Planner repeated an earlier query");
        }
        Ok(query)
    }
}

#[async_trait]
impl KnowledgeExtractor for LlmResearcher {
    #[instrument(skip(self, question, document, knowledge_base), fields(url = %document.url))]
    async fn extract(
        &self,
        question: &str,
        document: &SourceDocument,
        knowledge_base: &KnowledgeBase,
        model: &str,
    ) -> Result<Vec<ExtractedNugget>, ServiceError> {
        let response = self
            .completion
            .complete(
                &prompts::extract_knowledge(question, document, knowledge_base),
                model,
            )
            .await?;
        let units = parse_extraction(&response, &document.url)?;
        debug!(units = units.len(), "Extracted knowledge units");
        Ok(units)
    }
}

#[async_trait]
impl AnswerDrafter for LlmResearcher {
    #[instrument(skip(self, question, checklist, knowledge_base), fields(nuggets = knowledge_base.len()))]
    async fn draft(
        &self,
        question: &str,
        checklist: &Checklist,
        knowledge_base: &KnowledgeBase,
        model: &str,
    ) -> Result<String, ServiceError> {
        let response = self
            .completion
            .complete(&prompts::draft_answer(question, checklist, knowledge_base), model)
            .await?;
        non_empty_text(&response, "answer")
    }
}

#[async_trait]
impl ChecklistScorer for LlmResearcher {
    #[instrument(skip(self, question, answer, checklist), fields(items = checklist.len()))]
    async fn score(
        &self,
        question: &str,
        answer: &str,
        checklist: &Checklist,
        model: &str,
    ) -> Result<Checklist, ServiceError> {
        let response = self
            .completion
            .complete(&prompts::score_answer(question, answer, checklist), model)
            .await?;
        let assignments = parse_scores(&response)?;
        Ok(checklist.rescored(&assignments, self.missing_score))
    }
}

fn non_empty_text(response: &str, what: &str) -> Result<String, ServiceError> {
    let text = response.trim();
    if text.is_empty() {
        return Err(ServiceError::Malformed(format!("empty {what}")));
    }
    Ok(text.to_string())
}

fn malformed(what: &str, err: serde_json::Error) -> ServiceError {
    ServiceError::Malformed(format!("{what}: {err}"))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChecklistResponse {
    Wrapped { requirements: Vec<String> },
    Bare(Vec<String>),
}

/// Parse `{"requirements": [...]}` or a bare JSON array of strings.
pub fn parse_checklist(response: &str) -> Result<Checklist, ServiceError> {
    let json = extract_json_from_response(response);
    let requirements = match serde_json::from_str::<ChecklistResponse>(&json)
        .map_err(|e| malformed("checklist is not a list of requirements", e))?
    {
        ChecklistResponse::Wrapped { requirements } | ChecklistResponse::Bare(requirements) => requirements,
    };
    Ok(Checklist::from_requirements(requirements))
}

#[derive(Deserialize)]
struct ScoresResponse {
    scores: Vec<RawScore>,
}

#[derive(Deserialize)]
struct RawScore {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    requirement: Option<String>,
    score: f64,
}

/// Parse `{"scores": [{"id", "requirement", "score"}]}`.
///
/// Every score must lie in [0, 1] and name an id or a requirement.
pub fn parse_scores(response: &str) -> Result<Vec<ScoreAssignment>, ServiceError> {
    let json = extract_json_from_response(response);
    let parsed: ScoresResponse =
        serde_json::from_str(&json).map_err(|e| malformed("scores do not match the expected shape", e))?;

    parsed
        .scores
        .into_iter()
        .map(|raw| {
            validate_unit(raw.score, "score")?;
            if raw.id.is_none() && raw.requirement.is_none() {
                return Err(ServiceError::Malformed(
                    "score entry names neither an id nor a requirement".to_string(),
                ));
            }
            Ok(ScoreAssignment {
                id: raw.id.map(|id| ChecklistItemId::from(id.trim())),
                requirement: raw.requirement,
                score: raw.score,
            })
        })
        .collect()
}

#[derive(Deserialize)]
struct ExtractionResponse {
    nuggets: Vec<RawNugget>,
}

#[derive(Deserialize)]
struct RawNugget {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    nugget_id: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    conflicts_with: Option<Vec<String>>,
}

/// Parse an extraction response into merge units.
///
/// New nuggets always get a freshly generated id and `source_url` as their
/// source; any id the model proposes for them is ignored. Updates must name
/// the nugget they change.
pub fn parse_extraction(response: &str, source_url: &str) -> Result<Vec<ExtractedNugget>, ServiceError> {
    let json = extract_json_from_response(response);
    let parsed: ExtractionResponse = serde_json::from_str(&json)
        .map_err(|e| malformed("extraction does not match the expected shape", e))?;

    parsed
        .nuggets
        .into_iter()
        .map(|raw| {
            if let Some(confidence) = raw.confidence {
                validate_unit(confidence, "confidence")?;
            }
            let conflicts = raw.conflicts_with.map(|ids| {
                ids.into_iter()
                    .map(|id| NuggetId::new(id.trim()))
                    .collect::<BTreeSet<_>>()
            });

            match raw.action.as_deref().unwrap_or("new") {
                "new" => {
                    let content = raw
                        .content
                        .filter(|c| !c.trim().is_empty())
                        .ok_or_else(|| ServiceError::Malformed("new nugget without content".to_string()))?;
                    let mut nugget = KnowledgeNugget::new(
                        NuggetId::generate(),
                        content.trim(),
                        source_url,
                        raw.confidence.unwrap_or(0.5),
                    );
                    nugget.conflicts_with = conflicts.unwrap_or_default();
                    Ok(ExtractedNugget::New(nugget))
                }
                "update" => {
                    let id = raw
                        .nugget_id
                        .filter(|id| !id.trim().is_empty())
                        .ok_or_else(|| ServiceError::Malformed("update without nugget_id".to_string()))?;
                    Ok(ExtractedNugget::Update(NuggetUpdate {
                        nugget_id: NuggetId::new(id.trim()),
                        content: raw.content,
                        confidence: raw.confidence,
                        conflicts_with: conflicts,
                    }))
                }
                other => Err(ServiceError::Malformed(format!("unknown nugget action '{other}'"))),
            }
        })
        .collect()
}

fn validate_unit(value: f64, field: &str) -> Result<(), ServiceError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ServiceError::Malformed(format!("{field} {value} is outside [0, 1]")))
    }
}
