use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::domain::errors::ServiceError;
use crate::domain::models::config::SearchConfig;
use crate::domain::models::SearchResult;
use crate::domain::ports::SearchService;
use crate::infrastructure::http::{build_client, classify_status, classify_transport, RetryPolicy};

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

impl From<TavilyResult> for SearchResult {
    fn from(result: TavilyResult) -> Self {
        SearchResult::new(result.title, result.url, result.content)
    }
}

/// Tavily search API client.
pub struct TavilySearch {
    http_client: ReqwestClient,
    api_key: String,
    base_url: String,
    timeout: Duration,
    retry_policy: RetryPolicy,
}

impl TavilySearch {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ServiceError::NotConfigured(
                    "search API key missing (set TAVILY_API_KEY or search.api_key)".to_string(),
                )
            })?;
        let timeout = Duration::from_secs(config.timeout_secs);

        Ok(Self {
            http_client: build_client(timeout, concat!("rave/", env!("CARGO_PKG_VERSION")))?,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
            retry_policy: RetryPolicy::from(&config.retry),
        })
    }

    async fn search_once(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, ServiceError> {
        let response = self
            .http_client
            .post(format!("{}/search", self.base_url))
            .json(&SearchRequest {
                api_key: &self.api_key,
                query,
                max_results,
            })
            .send()
            .await
            .map_err(|e| classify_transport(&e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(format!("search response: {e}")))?;
        Ok(parsed
            .results
            .into_iter()
            .take(max_results)
            .map(SearchResult::from)
            .collect())
    }
}

#[async_trait]
impl SearchService for TavilySearch {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, ServiceError> {
        if max_results == 0 {
            return Ok(Vec::new());
        }
        let results = self
            .retry_policy
            .execute(|| self.search_once(query, max_results))
            .await?;
        debug!(count = results.len(), "Search completed");
        Ok(results)
    }
}
