pub mod convergence;
pub mod event_bus;
pub mod knowledge_base;
pub mod prompts;
pub mod query_planner;
pub mod researcher;
pub mod url_selector;

pub use convergence::{ConvergenceDecision, ConvergenceEvaluator};
pub use event_bus::{EventBus, EventId, RunEvent, RunEventPayload, SequenceNumber};
pub use knowledge_base::{merge, MergeReport};
pub use query_planner::clean_query;
pub use researcher::LlmResearcher;
pub use url_selector::UrlSelector;

/// Extract the JSON payload from a model response.
///
/// Handles fenced code blocks (```json ... ``` or bare ```) and prose around
/// a single top-level object or array. Returns the trimmed input when no
/// JSON-looking span is found.
pub fn extract_json_from_response(response: &str) -> String {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let body_start = after_fence.find('\n').map_or(0, |i| i + 1);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            return body[..end].trim().to_string();
        }
    }

    let open = trimmed.find(['{', '[']);
    let close = trimmed.rfind(['}', ']']);
    match (open, close) {
        (Some(open), Some(close)) if close > open => trimmed[open..=close].to_string(),
        _ => trimmed.to_string(),
    }
}
