use async_trait::async_trait;

use crate::domain::errors::ServiceError;
use crate::domain::models::SearchResult;

/// Web search returning at most `max_results` hits, best first.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, ServiceError>;
}
