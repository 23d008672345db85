use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client as ReqwestClient;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::domain::errors::ServiceError;
use crate::domain::models::config::FetchConfig;
use crate::domain::ports::{FetchRequest, PageFetchService};
use crate::infrastructure::http::{build_client, classify_status, classify_transport, RetryPolicy};

/// Line width used when rendering HTML to text.
const TEXT_WIDTH: usize = 120;

/// Fetches pages over HTTP(S) and returns their readable text.
pub struct HttpPageFetcher {
    http_client: ReqwestClient,
    retry_policy: RetryPolicy,
}

impl HttpPageFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            http_client: build_client(Duration::from_secs(config.timeout_secs), &config.user_agent)?,
            retry_policy: RetryPolicy::from(&config.retry),
        })
    }

    async fn fetch_once(&self, url: &Url, request: &FetchRequest) -> Result<String, ServiceError> {
        let response = self
            .http_client
            .get(url.clone())
            .headers(header_map(request)?)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| classify_transport(&e, request.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_ascii_lowercase();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify_transport(&e, request.timeout))?;

        page_text(&content_type, &body)
    }
}

#[async_trait]
impl PageFetchService for HttpPageFetcher {
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn fetch(&self, request: &FetchRequest) -> Result<String, ServiceError> {
        let url = parse_url(&request.url)?;
        let text = self
            .retry_policy
            .execute(|| self.fetch_once(&url, request))
            .await?;
        debug!(chars = text.len(), "Page fetched");
        Ok(text)
    }
}

fn parse_url(raw: &str) -> Result<Url, ServiceError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ServiceError::InvalidRequest(format!("invalid url '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ServiceError::InvalidRequest(format!(
            "unsupported url scheme '{}'",
            url.scheme()
        )));
    }
    Ok(url)
}

fn header_map(request: &FetchRequest) -> Result<HeaderMap, ServiceError> {
    let mut headers = HeaderMap::with_capacity(request.headers.len());
    for (name, value) in &request.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ServiceError::InvalidRequest(format!("header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ServiceError::InvalidRequest(format!("header value for '{name}': {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Convert a response body to plain text based on its content type.
fn page_text(content_type: &str, body: &[u8]) -> Result<String, ServiceError> {
    if content_type.contains("html") {
        return Ok(html2text::from_read(body, TEXT_WIDTH).unwrap_or_default());
    }
    let textual = content_type.starts_with("text/")
        || content_type.contains("json")
        || content_type.contains("xml");
    if textual {
        return Ok(String::from_utf8_lossy(body).into_owned());
    }
    Err(ServiceError::InvalidRequest(format!(
        "unsupported content type '{content_type}'"
    )))
}
