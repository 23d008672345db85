//! `rave ask`: run the research loop for one question.

use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{init_logging, load_config, warn_unknown_models};
use crate::application::{CancellationToken, Orchestrator, ResearchSteps};
use crate::cli::output::progress::{create_spinner, hidden_spinner, ProgressBarExt};
use crate::cli::output::table::{checklist_table, knowledge_table, render_list};
use crate::cli::output::{heading, output, CommandOutput};
use crate::cli::types::AskArgs;
use crate::domain::models::{ResearchOptions, RunConfig, RunOutcome, RunStatus};
use crate::infrastructure::{HttpPageFetcher, OpenAiClient, TavilySearch};
use crate::services::{LlmResearcher, RunEvent};

#[derive(Debug, Serialize)]
pub struct AskOutput {
    #[serde(flatten)]
    pub outcome: RunOutcome,
    #[serde(skip)]
    pub threshold: f64,
}

impl CommandOutput for AskOutput {
    fn to_human(&self) -> String {
        let record = &self.outcome.record;
        let mut sections = Vec::new();

        if let Some(improved) = &record.improved_question {
            sections.push(format!("{}\n{improved}", heading("Question")));
        }
        sections.push(format!(
            "{}\n{}",
            heading("Answer"),
            record.answer.as_deref().unwrap_or("(no answer drafted)")
        ));
        sections.push(format!(
            "{}\n{}",
            heading("Checklist"),
            render_list(
                "requirement",
                &checklist_table(&record.scored_checklist, self.threshold),
                record.scored_checklist.len()
            )
        ));
        sections.push(format!(
            "{}\n{}",
            heading("Knowledge"),
            render_list("nugget", &knowledge_table(&record.knowledge_base), record.knowledge_base.len())
        ));
        if !record.warnings.is_empty() {
            let warnings = record
                .warnings
                .iter()
                .map(|w| format!("- {w}"))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(format!("{}\n{warnings}", heading("Warnings")));
        }
        sections.push(status_line(&self.outcome));

        sections.join("\n\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn status_line(outcome: &RunOutcome) -> String {
    let iterations = outcome.iterations_completed;
    match outcome.status {
        RunStatus::Done => match outcome.stop_reason {
            Some(reason) => format!("Done after {iterations} iteration(s): {}", reason.describe()),
            None => format!("Done after {iterations} iteration(s)"),
        },
        RunStatus::Cancelled => format!("Cancelled after {iterations} iteration(s)"),
        RunStatus::Errored => format!(
            "Failed after {iterations} iteration(s): {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

pub async fn execute(args: AskArgs, json: bool) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let _logger = init_logging(&config)?;
    warn_unknown_models(&config);

    let mut run_config = RunConfig::from(&config);
    if let Some(max_iterations) = args.max_iterations {
        run_config = run_config.with_max_iterations(max_iterations);
    }
    if let Some(threshold) = args.threshold {
        run_config = run_config.with_score_threshold(threshold);
    }
    run_config.validate()?;

    let completion = Arc::new(OpenAiClient::new(&config.completion).context("Failed to set up completion client")?);
    let search = Arc::new(TavilySearch::new(&config.search).context("Failed to set up search client")?);
    let fetcher = Arc::new(HttpPageFetcher::new(&config.fetch).context("Failed to set up page fetcher")?);
    let researcher =
        Arc::new(LlmResearcher::new(completion).with_missing_score(config.research.missing_score));
    let steps = ResearchSteps::from_researcher(researcher, search, fetcher);
    let orchestrator = Orchestrator::new(steps, ResearchOptions::from(&config));

    let spinner = if json { hidden_spinner() } else { create_spinner() };
    let progress = follow_progress(orchestrator.subscribe(), spinner.clone());

    let cancel = CancellationToken::new();
    let interrupt = cancel_on_ctrl_c(cancel.clone());

    let outcome = orchestrator
        .run_with_cancel(&args.question, &run_config, &cancel)
        .await;
    interrupt.abort();

    // Dropping the orchestrator closes the event bus so the follower drains and exits.
    drop(orchestrator);
    let _ = progress.await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            spinner.finish_error(err.to_string());
            return Err(err.into());
        }
    };

    match outcome.status {
        RunStatus::Done => spinner.finish_success("Research complete"),
        RunStatus::Cancelled => spinner.finish_warning("Research cancelled"),
        RunStatus::Errored => spinner.finish_error("Research failed"),
    }

    let failure = outcome.error.clone();
    output(
        &AskOutput {
            outcome,
            threshold: run_config.score_threshold,
        },
        json,
    );

    match failure {
        Some(error) => bail!(error),
        None => Ok(()),
    }
}

/// Mirror progress events onto the spinner until the bus closes.
fn follow_progress(mut events: broadcast::Receiver<RunEvent>, spinner: ProgressBar) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some((state, message)) = event.progress() {
                        spinner.set_message(format!("[{state}] {message}"));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Progress display fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn cancel_on_ctrl_c(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    info!("Interrupt received, stopping after the current step");
                    cancel.cancel();
                }
            }
            () = cancel.cancelled() => {}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Checklist, IterationRecord, StopReason};
    use uuid::Uuid;

    fn outcome(status: RunStatus) -> RunOutcome {
        let mut record = IterationRecord::new(Uuid::new_v4(), "What is the capital of France?");
        record.answer = Some("Paris.".to_string());
        record.scored_checklist = Checklist::from_requirements(["Names the capital"]);
        record.iteration = 1;
        RunOutcome {
            status,
            record,
            iterations_completed: 1,
            stop_reason: (status == RunStatus::Done).then_some(StopReason::BudgetExhausted),
            failed_state: None,
            error: (status == RunStatus::Errored).then(|| "Searching failed: boom".to_string()),
        }
    }

    #[test]
    fn test_human_output_sections() {
        let out = AskOutput {
            outcome: outcome(RunStatus::Done),
            threshold: 0.9,
        };
        let human = out.to_human();
        assert!(human.contains("Paris."));
        assert!(human.contains("Names the capital"));
        assert!(human.contains("No nuggets found."));
        assert!(human.contains("iteration budget exhausted"));
    }

    #[test]
    fn test_json_output_is_the_outcome() {
        let out = AskOutput {
            outcome: outcome(RunStatus::Errored),
            threshold: 0.9,
        };
        let value = out.to_json();
        assert_eq!(value["status"], "errored");
        assert_eq!(value["error"], "Searching failed: boom");
        assert_eq!(value["record"]["answer"], "Paris.");
        assert!(value.get("threshold").is_none());
    }
}
