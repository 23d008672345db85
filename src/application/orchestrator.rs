//! Research loop orchestrator.
//!
//! Drives the state machine of [`OrchestratorState`]: one step per state,
//! strictly sequential. Each step works on a copy of the last published
//! [`IterationRecord`]; the copy is published only when the step succeeds, so
//! observers and callers never see a half-applied step.
//!
//! After every transition the orchestrator publishes a progress event and
//! then a snapshot event on its [`EventBus`]. Cancellation is polled between
//! steps. A failing step ends the run in `Errored` and the last published
//! snapshot is returned unchanged.

use chrono::Utc;
use futures::future::join_all;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{RaveError, RaveResult, ServiceError};
use crate::domain::models::{
    Checklist, IterationRecord, KnowledgeBase, OrchestratorState, ResearchOptions, RunConfig,
    RunOutcome, RunStatus, SearchResult, SourceDocument, StopReason,
};
use crate::domain::ports::{
    AnswerDrafter, ChecklistGenerator, ChecklistScorer, FetchRequest, KnowledgeExtractor,
    PageFetchService, QueryPlanner, QuestionImprover, SearchService,
};
use crate::services::url_selector::truncate_content;
use crate::services::{
    merge, ConvergenceEvaluator, EventBus, LlmResearcher, MergeReport, RunEvent, UrlSelector,
};

/// Capabilities the loop is built from.
#[derive(Clone)]
pub struct ResearchSteps {
    pub question_improver: Arc<dyn QuestionImprover>,
    pub checklist_generator: Arc<dyn ChecklistGenerator>,
    pub query_planner: Arc<dyn QueryPlanner>,
    pub search: Arc<dyn SearchService>,
    pub fetcher: Arc<dyn PageFetchService>,
    pub extractor: Arc<dyn KnowledgeExtractor>,
    pub drafter: Arc<dyn AnswerDrafter>,
    pub scorer: Arc<dyn ChecklistScorer>,
}

impl ResearchSteps {
    /// Every model-backed step served by one researcher.
    pub fn from_researcher(
        researcher: Arc<LlmResearcher>,
        search: Arc<dyn SearchService>,
        fetcher: Arc<dyn PageFetchService>,
    ) -> Self {
        Self {
            question_improver: researcher.clone(),
            checklist_generator: researcher.clone(),
            query_planner: researcher.clone(),
            search,
            fetcher,
            extractor: researcher.clone(),
            drafter: researcher.clone(),
            scorer: researcher,
        }
    }
}

pub struct Orchestrator {
    steps: ResearchSteps,
    options: ResearchOptions,
    evaluator: ConvergenceEvaluator,
    events: Arc<EventBus>,
    running: AtomicBool,
}

impl Orchestrator {
    pub fn new(steps: ResearchSteps, options: ResearchOptions) -> Self {
        let evaluator = ConvergenceEvaluator::new().with_stagnation_delta(options.stagnation_delta);
        let events = Arc::new(EventBus::new(options.event_buffer));
        Self {
            steps,
            options,
            evaluator,
            events,
            running: AtomicBool::new(false),
        }
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run the loop to completion.
    pub async fn run(&self, question: &str, config: &RunConfig) -> RaveResult<RunOutcome> {
        self.run_with_cancel(question, config, &CancellationToken::new())
            .await
    }

    /// Run the loop, stopping at the next step boundary once `cancel` fires.
    ///
    /// Returns `Err` only when the run cannot start: empty question, invalid
    /// config, or another run in flight. Step failures and cancellation are
    /// reported through the outcome's status.
    #[instrument(skip_all, fields(run_id = tracing::field::Empty))]
    pub async fn run_with_cancel(
        &self,
        question: &str,
        config: &RunConfig,
        cancel: &CancellationToken,
    ) -> RaveResult<RunOutcome> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RaveError::Input("question cannot be empty".to_string()));
        }
        config.validate()?;
        let _guard = RunGuard::acquire(&self.running)?;

        let mut run = Run::new(self, config, question);
        tracing::Span::current().record("run_id", tracing::field::display(run.record.run_id));
        info!(max_iterations = config.max_iterations, threshold = config.score_threshold, "Starting research run");

        Ok(run.execute(cancel).await)
    }
}

/// Holds the running flag for the duration of a run.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> RaveResult<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| RaveError::AlreadyRunning)?;
        Ok(Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Output of the searching step.
struct Retrieval {
    results: Vec<SearchResult>,
    documents: Vec<SourceDocument>,
    warnings: Vec<String>,
}

/// State of one run.
struct Run<'a> {
    orchestrator: &'a Orchestrator,
    config: &'a RunConfig,
    /// Last published snapshot
    record: IterationRecord,
    /// Documents retrieved by the last search, consumed by the merge step
    documents: Vec<SourceDocument>,
    /// Checklist as scored one iteration before the current one
    previous_scoring: Option<Checklist>,
    stop_reason: Option<StopReason>,
}

impl<'a> Run<'a> {
    fn new(orchestrator: &'a Orchestrator, config: &'a RunConfig, question: &str) -> Self {
        Self {
            orchestrator,
            config,
            record: IterationRecord::new(Uuid::new_v4(), question),
            documents: Vec::new(),
            previous_scoring: None,
            stop_reason: None,
        }
    }

    async fn execute(&mut self, cancel: &CancellationToken) -> RunOutcome {
        self.publish("Starting research".to_string());
        let mut state = OrchestratorState::Init;

        loop {
            if cancel.is_cancelled() {
                return self.cancelled(state);
            }

            let mut next = self.record.clone();
            let (to, message) = match self.advance(state, &mut next).await {
                Ok(step) => step,
                Err(err) => return self.errored(err),
            };
            if !state.can_transition_to(to) {
                return self.errored(RaveError::InvalidTransition { from: state, to });
            }

            debug!(from = %state, to = %to, "State transition");
            next.state = to;
            next.taken_at = Utc::now();
            self.record = next;
            self.publish(message);

            if to == OrchestratorState::Done {
                return self.outcome(RunStatus::Done, None);
            }
            state = to;
        }
    }

    /// Execute the step of `state` against `next` and pick the following state.
    async fn advance(
        &mut self,
        state: OrchestratorState,
        next: &mut IterationRecord,
    ) -> RaveResult<(OrchestratorState, String)> {
        use OrchestratorState as S;

        let steps = &self.orchestrator.steps;
        let config = self.config;

        match state {
            S::Init => Ok((S::ImprovingQuestion, "Improving question".to_string())),

            S::ImprovingQuestion => {
                let improved = self
                    .call(state, steps.question_improver.improve(&next.question, &config.question_model))
                    .await?;
                let message = format!("Improved question: {improved}");
                next.improved_question = Some(improved);
                Ok((S::BuildingChecklist, message))
            }

            S::BuildingChecklist => {
                let checklist = self
                    .call(
                        state,
                        steps
                            .checklist_generator
                            .generate(next.canonical_question(), &config.checklist_model),
                    )
                    .await?;
                let message = format!("Checklist has {} requirements", checklist.len());
                next.scored_checklist = checklist;
                Ok((S::PlanningQuery, message))
            }

            S::PlanningQuery => {
                let text = self
                    .call(
                        state,
                        steps.query_planner.plan(
                            next.canonical_question(),
                            &next.scored_checklist,
                            &next.query_history,
                            &config.query_model,
                        ),
                    )
                    .await?;
                next.warnings.clear();
                next.search_results.clear();
                let query = next.query_history.push(text);
                let message = format!("Searching: {}", query.text);
                next.current_query = Some(query);
                Ok((S::Searching, message))
            }

            S::Searching => {
                let query = next
                    .current_query
                    .as_ref()
                    .map(|q| q.text.clone())
                    .unwrap_or_default();
                let retrieval = self.call(state, self.retrieve(&query)).await?;

                if retrieval.results.is_empty() {
                    warn!(query = %query, "Search returned no results");
                    next.warnings.push(format!("no search results for '{query}'"));
                }
                next.warnings.extend(retrieval.warnings);
                let message = format!(
                    "Found {} results, {} usable documents",
                    retrieval.results.len(),
                    retrieval.documents.len()
                );
                next.search_results = retrieval.results;
                self.documents = retrieval.documents;
                Ok((S::MergingKnowledge, message))
            }

            S::MergingKnowledge => {
                let documents = std::mem::take(&mut self.documents);
                let (knowledge_base, report) = self
                    .call(
                        state,
                        self.extract_and_merge(next.canonical_question(), &documents, &next.knowledge_base),
                    )
                    .await?;
                debug!(%report, nuggets = knowledge_base.len(), "Merged knowledge");
                let message = format!("Knowledge base holds {} nuggets ({report})", knowledge_base.len());
                next.knowledge_base = knowledge_base;
                Ok((S::DraftingAnswer, message))
            }

            S::DraftingAnswer => {
                let answer = self
                    .call(
                        state,
                        steps.drafter.draft(
                            next.canonical_question(),
                            &next.scored_checklist,
                            &next.knowledge_base,
                            &config.answer_model,
                        ),
                    )
                    .await?;
                next.answer = Some(answer);
                Ok((S::Scoring, "Scoring answer".to_string()))
            }

            S::Scoring => {
                let answer = next.answer.clone().unwrap_or_default();
                let scored = self
                    .call(
                        state,
                        steps.scorer.score(
                            next.canonical_question(),
                            &answer,
                            &next.scored_checklist,
                            &config.scoring_model,
                        ),
                    )
                    .await?;
                if scored.requirements() != next.scored_checklist.requirements() {
                    return Err(RaveError::Schema {
                        state,
                        message: "scorer changed the set of requirements".to_string(),
                    });
                }

                self.previous_scoring = (next.iteration > 0).then(|| next.scored_checklist.clone());
                next.scored_checklist = scored;
                next.iteration += 1;
                let message = format!(
                    "Iteration {} scored: mean {:.2}, min {:.2}",
                    next.iteration,
                    next.scored_checklist.mean_score(),
                    next.scored_checklist.min_score()
                );
                Ok((S::Evaluating, message))
            }

            S::Evaluating => {
                let decision = self.orchestrator.evaluator.evaluate(
                    &next.scored_checklist,
                    self.previous_scoring.as_ref(),
                    next.iteration,
                    config,
                );
                match decision.stop_reason() {
                    None => Ok((
                        S::PlanningQuery,
                        format!(
                            "Planning query for iteration {} of {}",
                            next.iteration + 1,
                            config.max_iterations
                        ),
                    )),
                    Some(reason) => {
                        info!(iterations = next.iteration, reason = reason.describe(), "Research converged");
                        self.stop_reason = Some(reason);
                        Ok((S::Done, format!("Done: {}", reason.describe())))
                    }
                }
            }

            S::Done | S::Cancelled | S::Errored => Err(RaveError::InvalidTransition {
                from: state,
                to: state,
            }),
        }
    }

    /// Run one external call under the step deadline.
    async fn call<T>(
        &self,
        state: OrchestratorState,
        call: impl Future<Output = Result<T, ServiceError>>,
    ) -> RaveResult<T> {
        let limit = self.orchestrator.options.step_timeout;
        match timeout(limit, call).await {
            Ok(result) => result.map_err(|err| RaveError::from_service(state, err)),
            Err(_) => Err(RaveError::Timeout {
                state,
                seconds: limit.as_secs(),
            }),
        }
    }

    /// Search, then fetch the selected pages concurrently. Pages that cannot
    /// be fetched fall back to their snippet.
    async fn retrieve(&self, query: &str) -> Result<Retrieval, ServiceError> {
        let steps = &self.orchestrator.steps;
        let options = &self.orchestrator.options;

        let results = steps.search.search(query, options.max_search_results).await?;
        let selected = UrlSelector::new(options.max_pages).select(&results);
        let fetched = join_all(selected.iter().map(|result| self.fetch_page(result))).await;
        let mut pages: Vec<_> = selected.into_iter().zip(fetched).collect();

        let mut documents = Vec::with_capacity(results.len());
        let mut warnings = Vec::new();
        for result in &results {
            let page = pages
                .iter()
                .position(|(selected, _)| std::ptr::eq(*selected, result))
                .map(|index| pages.swap_remove(index).1);
            let document = match page {
                Some(Ok(text)) if !text.trim().is_empty() => {
                    SourceDocument::from_page(result, truncate_content(&text, options.max_content_chars))
                }
                Some(Err(err)) => {
                    warn!(url = %result.url, error = %err, "Fetch failed, using snippet");
                    warnings.push(format!("could not fetch {}: {err}", result.url));
                    SourceDocument::from_snippet(result)
                }
                Some(Ok(_)) | None => SourceDocument::from_snippet(result),
            };

            if !document.content.trim().is_empty() {
                documents.push(document);
            }
        }

        Ok(Retrieval {
            results,
            documents,
            warnings,
        })
    }

    async fn fetch_page(&self, result: &SearchResult) -> Result<String, ServiceError> {
        let options = &self.orchestrator.options;
        let request = FetchRequest::new(result.url.as_str(), options.fetch_timeout)
            .with_headers(options.fetch_headers.clone());
        self.orchestrator.steps.fetcher.fetch(&request).await
    }

    /// Extract from each document in turn, merging after each so later
    /// extractions see earlier nuggets.
    async fn extract_and_merge(
        &self,
        question: &str,
        documents: &[SourceDocument],
        current: &KnowledgeBase,
    ) -> Result<(KnowledgeBase, MergeReport), ServiceError> {
        let steps = &self.orchestrator.steps;
        let mut knowledge_base = current.clone();
        let mut report = MergeReport::default();

        for document in documents {
            let units = steps
                .extractor
                .extract(question, document, &knowledge_base, &self.config.kb_model)
                .await?;
            let (merged, merge_report) = merge(&knowledge_base, &units);
            knowledge_base = merged;
            report.absorb(merge_report);
        }

        Ok((knowledge_base, report))
    }

    fn publish(&self, message: String) {
        let events = &self.orchestrator.events;
        events.publish_progress(self.record.run_id, self.record.state, message);
        events.publish_snapshot(&self.record);
    }

    /// Terminal exit that republishes the last snapshot as is.
    fn publish_terminal(&self, state: OrchestratorState, message: String) {
        let events = &self.orchestrator.events;
        events.publish_progress(self.record.run_id, state, message);
        events.publish_snapshot(&self.record);
    }

    fn cancelled(&self, at: OrchestratorState) -> RunOutcome {
        info!(state = %at, iterations = self.record.iteration, "Run cancelled");
        self.publish_terminal(OrchestratorState::Cancelled, format!("Cancelled before {at}"));
        self.outcome(RunStatus::Cancelled, None)
    }

    fn errored(&self, err: RaveError) -> RunOutcome {
        warn!(error = %err, "Run failed");
        self.publish_terminal(OrchestratorState::Errored, err.to_string());
        self.outcome(RunStatus::Errored, Some(err))
    }

    fn outcome(&self, status: RunStatus, err: Option<RaveError>) -> RunOutcome {
        RunOutcome {
            status,
            record: self.record.clone(),
            iterations_completed: self.record.iteration,
            stop_reason: self.stop_reason,
            failed_state: err.as_ref().and_then(RaveError::failed_state),
            error: err.map(|e| e.to_string()),
        }
    }
}
