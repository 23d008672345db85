//! Knowledge-base merge.
//!
//! Merging is keyed purely on nugget id:
//! - an unknown id carried by a new nugget is inserted as-is
//! - a known id, whether carried by a new nugget or an update, overwrites the
//!   fields the unit supplies and keeps the rest
//! - an update for an unknown id is dropped and reported as dangling
//!
//! Conflict links are stored exactly as given. Nothing is ever removed.

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::domain::models::{ExtractedNugget, KnowledgeBase, NuggetId, NuggetUpdate};

/// What a merge did with its input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub inserted: usize,
    pub updated: usize,
    /// Ids of updates that referenced no existing nugget
    pub dangling: Vec<NuggetId>,
}

impl MergeReport {
    /// Fold another report into this one.
    pub fn absorb(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.dangling.extend(other.dangling);
    }

    /// True when the merge left the knowledge base untouched.
    pub fn is_noop(&self) -> bool {
        self.inserted == 0 && self.updated == 0
    }
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} new, {} updated, {} ignored",
            self.inserted,
            self.updated,
            self.dangling.len()
        )
    }
}

/// Merge extracted units into a copy of `current`.
///
/// Units are applied in order, so a later unit sees the effect of an earlier
/// one in the same batch.
pub fn merge(current: &KnowledgeBase, extracted: &[ExtractedNugget]) -> (KnowledgeBase, MergeReport) {
    let mut next = current.clone();
    let mut report = MergeReport::default();

    for unit in extracted {
        match unit {
            ExtractedNugget::New(nugget) => {
                if next.insert(nugget.clone()) {
                    report.inserted += 1;
                } else {
                    next.update(&NuggetUpdate::from(nugget));
                    report.updated += 1;
                }
            }
            ExtractedNugget::Update(update) => {
                if next.update(update) {
                    report.updated += 1;
                } else {
                    debug!(nugget_id = %update.nugget_id, "Ignoring update for unknown nugget");
                    report.dangling.push(update.nugget_id.clone());
                }
            }
        }
    }

    (next, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::KnowledgeNugget;

    fn base() -> KnowledgeBase {
        KnowledgeBase::from(vec![
            KnowledgeNugget::new("n1", "Paris is the capital of France", "https://a", 0.9),
            KnowledgeNugget::new("n2", "Paris has 2.1M inhabitants", "https://b", 0.6),
        ])
    }

    #[test]
    fn test_empty_merge_is_noop() {
        let kb = base();
        let (next, report) = merge(&kb, &[]);
        assert_eq!(next, kb);
        assert!(report.is_noop());
    }

    #[test]
    fn test_new_nugget_inserted_at_end() {
        let (next, report) = merge(
            &base(),
            &[ExtractedNugget::New(KnowledgeNugget::new(
                "n3",
                "The Seine flows through Paris",
                "https://c",
                0.8,
            ))],
        );
        assert_eq!(report.inserted, 1);
        assert_eq!(
            next.ids().map(NuggetId::as_str).collect::<Vec<_>>(),
            vec!["n1", "n2", "n3"]
        );
    }

    #[test]
    fn test_update_overwrites_only_supplied_fields() {
        let (next, report) = merge(
            &base(),
            &[ExtractedNugget::Update(
                NuggetUpdate::new("n2").confidence(0.3).conflicts_with(["n4"]),
            )],
        );
        assert_eq!(report.updated, 1);
        let nugget = next.get(&"n2".into()).unwrap();
        assert_eq!(nugget.content, "Paris has 2.1M inhabitants");
        assert_eq!(nugget.confidence, 0.3);
        assert!(nugget.conflicts_with.contains(&NuggetId::from("n4")));
    }

    #[test]
    fn test_dangling_update_creates_nothing() {
        let kb = base();
        let (next, report) = merge(
            &kb,
            &[ExtractedNugget::Update(NuggetUpdate::new("ghost").content("made up"))],
        );
        assert_eq!(next, kb);
        assert_eq!(report.dangling, vec![NuggetId::from("ghost")]);
        assert!(report.is_noop());
    }

    #[test]
    fn test_new_with_existing_id_acts_as_update() {
        let (next, report) = merge(
            &base(),
            &[ExtractedNugget::New(KnowledgeNugget::new(
                "n1",
                "Paris is the capital and largest city of France",
                "https://z",
                0.95,
            ))],
        );
        assert_eq!(next.len(), 2);
        assert_eq!(report.updated, 1);
        let nugget = next.get(&"n1".into()).unwrap();
        assert_eq!(nugget.content, "Paris is the capital and largest city of France");
        // source is not part of an update
        assert_eq!(nugget.source_url, "https://a");
    }

    #[test]
    fn test_new_with_existing_id_keeps_conflicts_it_omits() {
        let kb = KnowledgeBase::from(vec![KnowledgeNugget::new(
            "n1",
            "Paris has 2.1M inhabitants",
            "https://a",
            0.6,
        )
        .with_conflicts(["n0"])]);
        let unit: ExtractedNugget = serde_json::from_str(
            r#"{"action": "new", "nugget_id": "n1", "content": "Population 2.2M",
                "source_url": "https://b", "confidence": 0.7}"#,
        )
        .unwrap();

        let (next, report) = merge(&kb, &[unit]);

        assert_eq!(report.updated, 1);
        let nugget = next.get(&"n1".into()).unwrap();
        assert_eq!(nugget.content, "Population 2.2M");
        assert!(nugget.conflicts_with.contains(&NuggetId::from("n0")));
    }

    #[test]
    fn test_new_with_existing_id_replaces_declared_conflicts() {
        let kb = KnowledgeBase::from(vec![
            KnowledgeNugget::new("n1", "draft", "https://a", 0.5).with_conflicts(["n0"]),
        ]);
        let unit = ExtractedNugget::New(
            KnowledgeNugget::new("n1", "final", "https://a", 0.5).with_conflicts(["n2"]),
        );

        let (next, _) = merge(&kb, &[unit]);

        let nugget = next.get(&"n1".into()).unwrap();
        assert_eq!(
            nugget.conflicts_with.iter().collect::<Vec<_>>(),
            vec![&NuggetId::from("n2")]
        );
    }

    #[test]
    fn test_units_apply_in_order() {
        let (next, _) = merge(
            &KnowledgeBase::new(),
            &[
                ExtractedNugget::New(KnowledgeNugget::new("n1", "draft", "https://a", 0.2)),
                ExtractedNugget::Update(NuggetUpdate::new("n1").content("final")),
            ],
        );
        assert_eq!(next.get(&"n1".into()).unwrap().content, "final");
    }

    #[test]
    fn test_report_absorb_and_display() {
        let mut total = MergeReport {
            inserted: 1,
            ..Default::default()
        };
        total.absorb(MergeReport {
            inserted: 2,
            updated: 1,
            dangling: vec!["x".into()],
        });
        assert_eq!(total.to_string(), "3 new, 1 updated, 1 ignored");
    }
}
