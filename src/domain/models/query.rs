//! Search queries and the append-only history of issued queries.

use serde::{Deserialize, Serialize};

use super::checklist::normalize_text;

/// A query together with its position in the run (0-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub ordinal: usize,
}

/// Every query issued during a run, in issue order.
///
/// Only [`QueryHistory::push`] mutates it, so entries are never reordered
/// or dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryHistory {
    queries: Vec<SearchQuery>,
}

impl QueryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a query and return it with its assigned ordinal.
    pub fn push(&mut self, text: impl Into<String>) -> SearchQuery {
        let query = SearchQuery {
            text: text.into(),
            ordinal: self.queries.len(),
        };
        self.queries.push(query.clone());
        query
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn last(&self) -> Option<&SearchQuery> {
        self.queries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchQuery> {
        self.queries.iter()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.queries.iter().map(|q| q.text.as_str()).collect()
    }

    /// Case- and whitespace-insensitive membership check.
    pub fn contains_equivalent(&self, text: &str) -> bool {
        let wanted = normalize_text(text);
        self.queries.iter().any(|q| normalize_text(&q.text) == wanted)
    }
}
