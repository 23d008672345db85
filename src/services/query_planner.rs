//! Helpers for turning a checklist into a search query and a raw model
//! response into a single clean query line.

use crate::domain::models::{Checklist, ChecklistItem};

/// Lines that echo the prompt back instead of proposing a query.
const ECHO_PREFIXES: &[&str] = &[
    "gaps:",
    "original query:",
    "previous queries:",
    "with this information",
    "requirements:",
];

/// Labels stripped from the front of a query line.
const QUERY_LABELS: &[&str] = &["search query:", "query:"];

/// Requirements most in need of evidence: lowest score first, ties kept in
/// checklist order.
pub fn focus_requirements(checklist: &Checklist, limit: usize) -> Vec<&ChecklistItem> {
    let mut items: Vec<&ChecklistItem> = checklist.iter().collect();
    items.sort_by(|a, b| a.current_score.total_cmp(&b.current_score));
    items.truncate(limit);
    items
}

/// First usable query line of a model response.
///
/// Strips list markers, labels and surrounding quotes, and skips lines that
/// merely echo the prompt. Returns `None` when nothing usable remains.
pub fn clean_query(raw: &str) -> Option<String> {
    raw.lines().find_map(clean_line)
}

fn clean_line(line: &str) -> Option<String> {
    let mut text = strip_list_marker(line.trim()).trim();
    let lower = text.to_lowercase();

    if ECHO_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return None;
    }
    if let Some(label) = QUERY_LABELS.iter().find(|l| lower.starts_with(*l)) {
        text = text.get(label.len()..).unwrap_or(text).trim();
    }

    let text = text
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '“' | '”'))
        .trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn strip_list_marker(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix(['-', '*', '•']) {
        return rest;
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(['.', ')']) {
            return rest;
        }
    }
    line
}
