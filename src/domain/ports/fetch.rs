use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::domain::errors::ServiceError;

/// A single page retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub timeout: Duration,
    pub headers: BTreeMap<String, String>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            headers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

/// Retrieves a page and returns its readable text.
#[async_trait]
pub trait PageFetchService: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, ServiceError>;
}
