//! Requirement checklist.
//!
//! The checklist is built once per run. Later iterations only rescore it,
//! so its length and requirement texts never change after creation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Stable identifier assigned to a checklist item at creation (`r1`, `r2`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecklistItemId(String);

impl ChecklistItemId {
    /// Identifier for the item at `index` (0-based).
    pub fn for_index(index: usize) -> Self {
        Self(format!("r{}", index + 1))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChecklistItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChecklistItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A single requirement and its latest score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: ChecklistItemId,
    pub requirement: String,
    /// Always within [0, 1]
    pub current_score: f64,
}

impl ChecklistItem {
    fn new(id: ChecklistItemId, requirement: String) -> Self {
        Self {
            id,
            requirement,
            current_score: 0.0,
        }
    }

    fn set_score(&mut self, score: f64) {
        self.current_score = clamp_unit(score);
    }
}

/// What happens to a requirement the scorer did not address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingScorePolicy {
    /// Keep the previous score (0.0 on a freshly built checklist)
    #[default]
    Retain,
    /// Reset the score to 0.0
    Zero,
}

/// One score reported by a scorer.
///
/// Matched to an item by `id` first, then by normalized requirement text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreAssignment {
    #[serde(default)]
    pub id: Option<ChecklistItemId>,
    #[serde(default)]
    pub requirement: Option<String>,
    pub score: f64,
}

impl ScoreAssignment {
    pub fn for_id(id: impl Into<ChecklistItemId>, score: f64) -> Self {
        Self {
            id: Some(id.into()),
            requirement: None,
            score,
        }
    }

    pub fn for_requirement(requirement: impl Into<String>, score: f64) -> Self {
        Self {
            id: None,
            requirement: Some(requirement.into()),
            score,
        }
    }
}

/// Fixed-length list of scorable requirements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checklist {
    items: Vec<ChecklistItem>,
}

impl Checklist {
    /// Build a checklist from requirement texts.
    ///
    /// Blank entries and duplicates (after normalization) are dropped, since
    /// two identical requirements could not be told apart by text.
    pub fn from_requirements<I, S>(requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let items = requirements
            .into_iter()
            .map(|r| r.into().trim().to_string())
            .filter(|r| !r.is_empty() && seen.insert(normalize_text(r)))
            .enumerate()
            .map(|(index, requirement)| {
                ChecklistItem::new(ChecklistItemId::for_index(index), requirement)
            })
            .collect();
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.items.iter()
    }

    pub fn get(&self, id: &ChecklistItemId) -> Option<&ChecklistItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Requirement texts in checklist order.
    pub fn requirements(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.requirement.as_str()).collect()
    }

    pub fn scores(&self) -> Vec<f64> {
        self.items.iter().map(|i| i.current_score).collect()
    }

    /// True when every item reaches `threshold`. Vacuously true when empty.
    pub fn all_meet(&self, threshold: f64) -> bool {
        self.items.iter().all(|i| i.current_score >= threshold)
    }

    pub fn mean_score(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        self.items.iter().map(|i| i.current_score).sum::<f64>() / self.items.len() as f64
    }

    pub fn min_score(&self) -> f64 {
        self.items
            .iter()
            .map(|i| i.current_score)
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.min(s))))
            .unwrap_or(0.0)
    }

    /// Apply a scorer's output, producing a checklist with the same ids and
    /// requirement texts in the same order.
    ///
    /// Assignments that match no item are ignored. When several assignments
    /// hit the same item the last one wins.
    pub fn rescored(&self, assignments: &[ScoreAssignment], policy: MissingScorePolicy) -> Self {
        let mut next = self.clone();
        if policy == MissingScorePolicy::Zero {
            for item in &mut next.items {
                item.set_score(0.0);
            }
        }

        for assignment in assignments {
            let index = assignment
                .id
                .as_ref()
                .and_then(|id| next.items.iter().position(|i| &i.id == id))
                .or_else(|| {
                    let wanted = normalize_text(assignment.requirement.as_deref()?);
                    next.items
                        .iter()
                        .position(|i| normalize_text(&i.requirement) == wanted)
                });

            if let Some(index) = index {
                next.items[index].set_score(assignment.score);
            }
        }

        next
    }
}

impl<'a> IntoIterator for &'a Checklist {
    type Item = &'a ChecklistItem;
    type IntoIter = std::slice::Iter<'a, ChecklistItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Lowercase and collapse whitespace, for case/whitespace-insensitive matching.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Clamp into [0, 1]; non-finite values count as 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Checklist {
        Checklist::from_requirements(["Names the capital", "Cites a source", "Mentions population"])
    }

    #[test]
    fn test_from_requirements_assigns_stable_ids() {
        let checklist = sample();
        let ids: Vec<_> = checklist.iter().map(|i| i.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["r1", "r2", "r3"]);
        assert!(checklist.iter().all(|i| i.current_score == 0.0));
    }

    #[test]
    fn test_from_requirements_drops_blank_and_duplicate() {
        let checklist =
            Checklist::from_requirements(["  A point ", "", "a   POINT", "Another point"]);
        assert_eq!(checklist.requirements(), vec!["A point", "Another point"]);
        assert_eq!(checklist.items()[1].id.as_str(), "r2");
    }

    #[test]
    fn test_rescored_matches_by_id_then_text() {
        let checklist = sample();
        let next = checklist.rescored(
            &[
                ScoreAssignment::for_id("r2", 0.7),
                ScoreAssignment::for_requirement("names THE capital", 0.9),
            ],
            MissingScorePolicy::Retain,
        );
        assert_eq!(next.scores(), vec![0.9, 0.7, 0.0]);
        assert_eq!(next.requirements(), checklist.requirements());
    }

    #[test]
    fn test_rescored_retain_keeps_previous_score() {
        let first = sample().rescored(
            &[
                ScoreAssignment::for_id("r1", 0.5),
                ScoreAssignment::for_id("r3", 0.4),
            ],
            MissingScorePolicy::Retain,
        );
        let second = first.rescored(&[ScoreAssignment::for_id("r1", 0.8)], MissingScorePolicy::Retain);
        assert_eq!(second.scores(), vec![0.8, 0.0, 0.4]);
    }

    #[test]
    fn test_rescored_zero_resets_unaddressed() {
        let first = sample().rescored(&[ScoreAssignment::for_id("r3", 0.4)], MissingScorePolicy::Retain);
        let second = first.rescored(&[ScoreAssignment::for_id("r1", 0.8)], MissingScorePolicy::Zero);
        assert_eq!(second.scores(), vec![0.8, 0.0, 0.0]);
    }

    #[test]
    fn test_rescored_clamps_and_ignores_unknown() {
        let next = sample().rescored(
            &[
                ScoreAssignment::for_id("r1", 1.7),
                ScoreAssignment::for_id("r2", f64::NAN),
                ScoreAssignment::for_id("r9", 0.5),
                ScoreAssignment::for_requirement("not on the list", 0.5),
            ],
            MissingScorePolicy::Retain,
        );
        assert_eq!(next.scores(), vec![1.0, 0.0, 0.0]);
        assert_eq!(next.len(), 3);
    }

    #[test]
    fn test_all_meet_and_empty() {
        let empty = Checklist::default();
        assert!(empty.all_meet(0.9));
        assert_eq!(empty.mean_score(), 0.0);

        let scored = sample().rescored(
            &[
                ScoreAssignment::for_id("r1", 0.9),
                ScoreAssignment::for_id("r2", 0.95),
                ScoreAssignment::for_id("r3", 0.9),
            ],
            MissingScorePolicy::Retain,
        );
        assert!(scored.all_meet(0.9));
        assert!(!scored.all_meet(0.91));
        assert!((scored.min_score() - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Capital   of\tFRANCE "), "capital of france");
    }
}
