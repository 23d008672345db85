//! Search results and fetched source documents.
//!
//! Both are ephemeral: they live for the current iteration only.

use serde::{Deserialize, Serialize};

/// One hit returned by the search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, url: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
        }
    }
}

/// Text handed to knowledge extraction for a single result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub title: String,
    pub url: String,
    pub content: String,
    /// False when the page could not be fetched and `content` is the snippet
    pub fetched: bool,
}

impl SourceDocument {
    /// Document built from fetched page text.
    pub fn from_page(result: &SearchResult, content: String) -> Self {
        Self {
            title: result.title.clone(),
            url: result.url.clone(),
            content,
            fetched: true,
        }
    }

    /// Fallback document carrying only the search snippet.
    pub fn from_snippet(result: &SearchResult) -> Self {
        Self {
            title: result.title.clone(),
            url: result.url.clone(),
            content: result.snippet.clone(),
            fetched: false,
        }
    }
}
