//! Chooses which search results get their page fetched.

use std::collections::HashSet;
use tracing::debug;
use url::Url;

use crate::domain::models::SearchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlSelector {
    max_pages: usize,
}

impl UrlSelector {
    pub const fn new(max_pages: usize) -> Self {
        Self { max_pages }
    }

    /// Results worth fetching, in search-rank order.
    ///
    /// Drops unparsable and non-http(s) URLs and URLs already selected
    /// (ignoring fragments), then keeps the first `max_pages`.
    pub fn select<'a>(&self, results: &'a [SearchResult]) -> Vec<&'a SearchResult> {
        let mut seen = HashSet::new();
        results
            .iter()
            .filter(|result| match canonical_url(&result.url) {
                Some(key) => seen.insert(key),
                None => {
                    debug!(url = %result.url, "Skipping unfetchable url");
                    false
                }
            })
            .take(self.max_pages)
            .collect()
    }
}

fn canonical_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_content(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
