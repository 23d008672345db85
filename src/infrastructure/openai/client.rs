use anyhow::Result;
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client as ReqwestClient;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, instrument};

use super::types::{ChatRequest, ChatResponse};
use crate::domain::errors::ServiceError;
use crate::domain::models::catalog;
use crate::domain::models::config::CompletionConfig;
use crate::domain::ports::{CompletionService, Prompt};
use crate::infrastructure::http::{build_client, classify_status, classify_transport, RetryPolicy};

/// Chat completions client for OpenAI-compatible endpoints.
///
/// Requests are paced by a governor rate limiter and transient failures are
/// retried with exponential backoff.
pub struct OpenAiClient {
    http_client: ReqwestClient,
    api_key: String,
    base_url: String,
    timeout: Duration,
    rate_limiter: DefaultDirectRateLimiter,
    retry_policy: RetryPolicy,
    temperature: Option<f32>,
}

impl OpenAiClient {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ServiceError::NotConfigured(
                    "completion API key missing (set OPENAI_API_KEY or completion.api_key)".to_string(),
                )
            })?;
        let timeout = Duration::from_secs(config.timeout_secs);

        Ok(Self {
            http_client: build_client(timeout, concat!("rave/", env!("CARGO_PKG_VERSION")))?,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
            rate_limiter: RateLimiter::direct(quota(config.requests_per_second)),
            retry_policy: RetryPolicy::from(&config.retry),
            temperature: None,
        })
    }

    /// Sampling temperature sent to models that accept one.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<ChatResponse, ServiceError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| classify_transport(&e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ServiceError::Malformed(format!("completion response: {e}")))
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    #[instrument(skip(self, prompt), fields(prompt_chars = prompt.user.len()))]
    async fn complete(&self, prompt: &Prompt, model: &str) -> Result<String, ServiceError> {
        // Reasoning models reject a temperature
        let temperature = self
            .temperature
            .filter(|_| catalog::lookup(model).map_or(true, |spec| spec.supports_temperature));
        let request = ChatRequest::new(model, prompt).with_temperature(temperature);

        let response = self
            .retry_policy
            .execute(|| self.send_once(&request))
            .await?;
        let text = response.into_text()?;
        debug!(response_chars = text.len(), "Completion received");
        Ok(text)
    }
}

fn quota(requests_per_second: f64) -> Quota {
    let period = Duration::from_secs_f64(1.0 / requests_per_second.max(0.001));
    Quota::with_period(period).unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
}
