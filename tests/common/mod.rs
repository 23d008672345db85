//! Common test utilities for integration tests
//!
//! Deterministic fakes for every capability the research loop depends on,
//! plus helpers to assemble an orchestrator from them.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use rave::application::{CancellationToken, Orchestrator, ResearchSteps};
use rave::domain::errors::ServiceError;
use rave::domain::models::{
    Checklist, ExtractedNugget, IterationRecord, KnowledgeBase, KnowledgeNugget, NuggetId,
    NuggetUpdate, QueryHistory, ResearchOptions, ScoreAssignment, MissingScorePolicy,
    SearchResult, SourceDocument,
};
use rave::domain::ports::{
    AnswerDrafter, ChecklistGenerator, ChecklistScorer, FetchRequest, KnowledgeExtractor,
    PageFetchService, QueryPlanner, QuestionImprover, SearchService,
};
use rave::services::RunEvent;

pub const QUESTION: &str = "What is the capital of France?";

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub struct EchoImprover;

#[async_trait]
impl QuestionImprover for EchoImprover {
    async fn improve(&self, question: &str, _model: &str) -> Result<String, ServiceError> {
        Ok(format!("{question} (improved)"))
    }
}

pub struct FixedChecklist(pub Vec<&'static str>);

impl FixedChecklist {
    pub fn capital() -> Self {
        Self(vec!["Names the capital city", "Cites a source"])
    }
}

#[async_trait]
impl ChecklistGenerator for FixedChecklist {
    async fn generate(&self, _question: &str, _model: &str) -> Result<Checklist, ServiceError> {
        Ok(Checklist::from_requirements(self.0.iter().copied()))
    }
}

/// Issues "query 1", "query 2", ... in order.
pub struct CountingPlanner;

#[async_trait]
impl QueryPlanner for CountingPlanner {
    async fn plan(
        &self,
        _question: &str,
        _checklist: &Checklist,
        history: &QueryHistory,
        _model: &str,
    ) -> Result<String, ServiceError> {
        Ok(format!("query {}", history.len() + 1))
    }
}

/// One new nugget per document, holding the document's text.
pub struct PageExtractor;

#[async_trait]
impl KnowledgeExtractor for PageExtractor {
    async fn extract(
        &self,
        _question: &str,
        document: &SourceDocument,
        _knowledge_base: &KnowledgeBase,
        _model: &str,
    ) -> Result<Vec<ExtractedNugget>, ServiceError> {
        Ok(vec![ExtractedNugget::New(KnowledgeNugget::new(
            NuggetId::generate(),
            document.content.clone(),
            document.url.clone(),
            0.8,
        ))])
    }
}

/// Only ever proposes updates for a nugget nobody created.
pub struct DanglingExtractor;

#[async_trait]
impl KnowledgeExtractor for DanglingExtractor {
    async fn extract(
        &self,
        _question: &str,
        _document: &SourceDocument,
        _knowledge_base: &KnowledgeBase,
        _model: &str,
    ) -> Result<Vec<ExtractedNugget>, ServiceError> {
        Ok(vec![ExtractedNugget::Update(
            NuggetUpdate::new("ghost").content("Paris is the capital"),
        )])
    }
}

pub struct SummaryDrafter;

#[async_trait]
impl AnswerDrafter for SummaryDrafter {
    async fn draft(
        &self,
        question: &str,
        _checklist: &Checklist,
        knowledge_base: &KnowledgeBase,
        _model: &str,
    ) -> Result<String, ServiceError> {
        Ok(format!(
            "Answer to '{question}' from {} nuggets",
            knowledge_base.len()
        ))
    }
}

/// Assigns every requirement the same score; the n-th scoring call uses
/// `schedule[n]`, repeating the last entry once the schedule runs out.
pub struct ScheduledScorer {
    schedule: Vec<f64>,
    calls: AtomicUsize,
}

impl ScheduledScorer {
    pub fn new(schedule: Vec<f64>) -> Self {
        Self {
            schedule,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn constant(score: f64) -> Self {
        Self::new(vec![score])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChecklistScorer for ScheduledScorer {
    async fn score(
        &self,
        _question: &str,
        _answer: &str,
        checklist: &Checklist,
        _model: &str,
    ) -> Result<Checklist, ServiceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let score = self
            .schedule
            .get(call)
            .or_else(|| self.schedule.last())
            .copied()
            .unwrap_or(0.0);
        let assignments: Vec<_> = checklist
            .iter()
            .map(|item| ScoreAssignment::for_id(item.id.clone(), score))
            .collect();
        Ok(checklist.rescored(&assignments, MissingScorePolicy::Retain))
    }
}

/// Scores like `inner` and fires `token` during the given scoring call.
pub struct CancellingScorer {
    pub inner: ScheduledScorer,
    pub token: CancellationToken,
    pub cancel_on_call: usize,
}

#[async_trait]
impl ChecklistScorer for CancellingScorer {
    async fn score(
        &self,
        question: &str,
        answer: &str,
        checklist: &Checklist,
        model: &str,
    ) -> Result<Checklist, ServiceError> {
        if self.inner.calls() + 1 == self.cancel_on_call {
            self.token.cancel();
        }
        self.inner.score(question, answer, checklist, model).await
    }
}

/// Scorer that drops a requirement, breaking the scoring contract.
pub struct LossyScorer;

#[async_trait]
impl ChecklistScorer for LossyScorer {
    async fn score(
        &self,
        _question: &str,
        _answer: &str,
        checklist: &Checklist,
        _model: &str,
    ) -> Result<Checklist, ServiceError> {
        Ok(Checklist::from_requirements(
            checklist.iter().skip(1).map(|item| item.requirement.clone()),
        ))
    }
}

pub struct StaticSearch {
    results: Vec<SearchResult>,
    calls: AtomicUsize,
}

impl StaticSearch {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn paris() -> Self {
        Self::new(vec![
            SearchResult::new(
                "Paris - Wikipedia",
                "https://en.wikipedia.org/wiki/Paris",
                "Paris is the capital of France.",
            ),
            SearchResult::new(
                "France facts",
                "https://facts.example/france",
                "The capital of France is Paris.",
            ),
        ])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchService for StaticSearch {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchResult>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.results.iter().take(max_results).cloned().collect())
    }
}

pub struct FailingSearch;

#[async_trait]
impl SearchService for FailingSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchResult>, ServiceError> {
        Err(ServiceError::Server {
            status: 503,
            body: "search backend unavailable".to_string(),
        })
    }
}

/// Serves "page text for <url>", failing for URLs in `failing`.
#[derive(Default)]
pub struct StaticFetcher {
    pub failing: HashSet<String>,
}

impl StaticFetcher {
    pub fn failing_on(urls: &[&str]) -> Self {
        Self {
            failing: urls.iter().map(|u| (*u).to_string()).collect(),
        }
    }
}

#[async_trait]
impl PageFetchService for StaticFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, ServiceError> {
        if self.failing.contains(&request.url) {
            return Err(ServiceError::Rejected {
                status: 404,
                body: "not found".to_string(),
            });
        }
        Ok(format!("page text for {}", request.url))
    }
}

/// Improver that never answers in time.
pub struct SlowImprover(pub Duration);

#[async_trait]
impl QuestionImprover for SlowImprover {
    async fn improve(&self, question: &str, _model: &str) -> Result<String, ServiceError> {
        tokio::time::sleep(self.0).await;
        Ok(question.to_string())
    }
}

/// Deterministic steps around the given scorer and search service.
pub fn steps(scorer: Arc<dyn ChecklistScorer>, search: Arc<dyn SearchService>) -> ResearchSteps {
    ResearchSteps {
        question_improver: Arc::new(EchoImprover),
        checklist_generator: Arc::new(FixedChecklist::capital()),
        query_planner: Arc::new(CountingPlanner),
        search,
        fetcher: Arc::new(StaticFetcher::default()),
        extractor: Arc::new(PageExtractor),
        drafter: Arc::new(SummaryDrafter),
        scorer,
    }
}

pub fn orchestrator(steps: ResearchSteps) -> Orchestrator {
    Orchestrator::new(steps, ResearchOptions::default())
}

/// Every event published so far, in order.
pub fn drain(events: &mut broadcast::Receiver<RunEvent>) -> Vec<RunEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

/// Snapshots among `events`, in publication order.
pub fn snapshots(events: &[RunEvent]) -> Vec<IterationRecord> {
    events
        .iter()
        .filter_map(|e| e.snapshot().cloned())
        .collect()
}
