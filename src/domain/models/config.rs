use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::catalog::DEFAULT_MODEL;
use super::checklist::MissingScorePolicy;
use crate::domain::errors::{RaveError, RaveResult};

/// Main configuration structure for rave
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Model identifier per step
    #[serde(default)]
    pub models: ModelsConfig,

    /// Loop budget and stopping rules
    #[serde(default)]
    pub research: ResearchConfig,

    /// Completion provider
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Search provider
    #[serde(default)]
    pub search: SearchConfig,

    /// Page fetching
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Model identifiers, one per step that calls the completion service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelsConfig {
    #[serde(default = "default_model")]
    pub question: String,
    #[serde(default = "default_model")]
    pub checklist: String,
    #[serde(default = "default_model")]
    pub query: String,
    #[serde(default = "default_model")]
    pub answer: String,
    #[serde(default = "default_model")]
    pub scoring: String,
    #[serde(default = "default_model")]
    pub kb: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            question: default_model(),
            checklist: default_model(),
            query: default_model(),
            answer: default_model(),
            scoring: default_model(),
            kb: default_model(),
        }
    }
}

impl ModelsConfig {
    /// `(step name, model)` pairs, for validation and display.
    pub fn entries(&self) -> [(&'static str, &str); 6] {
        [
            ("question", &self.question),
            ("checklist", &self.checklist),
            ("query", &self.query),
            ("answer", &self.answer),
            ("scoring", &self.scoring),
            ("kb", &self.kb),
        ]
    }
}

/// Loop budget and stopping rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResearchConfig {
    /// Maximum iterations per run (>= 1)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Score every requirement must reach, in [0, 1]
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,

    /// Stop when no requirement moves by at least this much between
    /// iterations. Disabled when unset.
    #[serde(default)]
    pub stagnation_delta: Option<f64>,

    /// Score given to requirements the scorer leaves out
    #[serde(default)]
    pub missing_score: MissingScorePolicy,

    /// Deadline for a single step, in seconds
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,

    /// Events buffered per observer before a slow observer starts losing them
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

const fn default_max_iterations() -> u32 {
    3
}

const fn default_score_threshold() -> f64 {
    0.9
}

const fn default_step_timeout_secs() -> u64 {
    600
}

const fn default_event_buffer() -> usize {
    1024
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            score_threshold: default_score_threshold(),
            stagnation_delta: None,
            missing_score: MissingScorePolicy::default(),
            step_timeout_secs: default_step_timeout_secs(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    8_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// OpenAI-compatible completion endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CompletionConfig {
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,

    /// Falls back to `OPENAI_API_KEY` when unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,

    /// Requests per second allowed
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_completion_base_url() -> String {
    "https://api.openai.com".to_string()
}

const fn default_completion_timeout_secs() -> u64 {
    120
}

const fn default_requests_per_second() -> f64 {
    5.0
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_completion_base_url(),
            api_key: None,
            timeout_secs: default_completion_timeout_secs(),
            requests_per_second: default_requests_per_second(),
            retry: RetryConfig::default(),
        }
    }
}

/// Web search provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SearchConfig {
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Falls back to `TAVILY_API_KEY` when unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_search_base_url() -> String {
    "https://api.tavily.com".to_string()
}

const fn default_max_results() -> usize {
    3
}

const fn default_search_timeout_secs() -> u64 {
    30
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            api_key: None,
            max_results: default_max_results(),
            timeout_secs: default_search_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

/// Page fetching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FetchConfig {
    /// Pages fetched per iteration; remaining results contribute their snippet
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Page text is cut to this many characters before extraction
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,

    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Extra request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub retry: RetryConfig,
}

const fn default_max_pages() -> usize {
    3
}

const fn default_max_content_chars() -> usize {
    12_000
}

const fn default_fetch_timeout_secs() -> u64 {
    20
}

fn default_user_agent() -> String {
    format!("rave/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            max_content_chars: default_max_content_chars(),
            timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
            headers: BTreeMap::new(),
            retry: RetryConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rotated log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Per-run parameters: one model per step plus the loop budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub question_model: String,
    pub checklist_model: String,
    pub query_model: String,
    pub answer_model: String,
    pub scoring_model: String,
    pub kb_model: String,
    pub max_iterations: u32,
    pub score_threshold: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for RunConfig {
    fn from(config: &Config) -> Self {
        let models = &config.models;
        Self {
            question_model: models.question.clone(),
            checklist_model: models.checklist.clone(),
            query_model: models.query.clone(),
            answer_model: models.answer.clone(),
            scoring_model: models.scoring.clone(),
            kb_model: models.kb.clone(),
            max_iterations: config.research.max_iterations,
            score_threshold: config.research.score_threshold,
        }
    }
}

impl RunConfig {
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn with_score_threshold(mut self, score_threshold: f64) -> Self {
        self.score_threshold = score_threshold;
        self
    }

    /// Reject configs the loop cannot run with.
    pub fn validate(&self) -> RaveResult<()> {
        if self.max_iterations == 0 {
            return Err(RaveError::Input("max_iterations must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(RaveError::Input(format!(
                "score_threshold must be within [0, 1], got {}",
                self.score_threshold
            )));
        }
        let models = [
            ("question_model", &self.question_model),
            ("checklist_model", &self.checklist_model),
            ("query_model", &self.query_model),
            ("answer_model", &self.answer_model),
            ("scoring_model", &self.scoring_model),
            ("kb_model", &self.kb_model),
        ];
        for (name, model) in models {
            if model.trim().is_empty() {
                return Err(RaveError::Input(format!("{name} cannot be empty")));
            }
        }
        Ok(())
    }
}

/// Loop parameters that are not part of the per-run contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchOptions {
    pub max_search_results: usize,
    pub max_pages: usize,
    pub max_content_chars: usize,
    pub fetch_timeout: Duration,
    pub fetch_headers: BTreeMap<String, String>,
    pub step_timeout: Duration,
    pub stagnation_delta: Option<f64>,
    pub event_buffer: usize,
}

impl Default for ResearchOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ResearchOptions {
    fn from(config: &Config) -> Self {
        let mut fetch_headers = config.fetch.headers.clone();
        fetch_headers
            .entry("User-Agent".to_string())
            .or_insert_with(|| config.fetch.user_agent.clone());

        Self {
            max_search_results: config.search.max_results,
            max_pages: config.fetch.max_pages,
            max_content_chars: config.fetch.max_content_chars,
            fetch_timeout: Duration::from_secs(config.fetch.timeout_secs),
            fetch_headers,
            step_timeout: Duration::from_secs(config.research.step_timeout_secs),
            stagnation_delta: config.research.stagnation_delta,
            event_buffer: config.research.event_buffer,
        }
    }
}
