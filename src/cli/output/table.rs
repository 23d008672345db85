//! Table builders around comfy-table for list display.

use comfy_table::{presets, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;

use super::truncate;
use crate::domain::models::{Checklist, KnowledgeBase, ModelSpec};

const CONTENT_WIDTH: usize = 80;
const URL_WIDTH: usize = 48;

/// Create a standard list table with the given headers.
///
/// Uses the NOTHING preset (no borders) for a clean CLI aesthetic.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// Render the table with a count line, or a "No ... found." line when empty.
pub fn render_list(entity_name: &str, table: &Table, total: usize) -> String {
    if total == 0 {
        return format!("No {entity_name}s found.");
    }
    let noun = if total == 1 {
        entity_name.to_string()
    } else {
        format!("{entity_name}s")
    };
    format!("{} {noun}:\n{table}", style(total).bold())
}

/// Scored checklist; scores below `threshold` are highlighted.
pub fn checklist_table(checklist: &Checklist, threshold: f64) -> Table {
    let mut table = list_table(&["id", "score", "requirement"]);
    for item in checklist.iter() {
        let color = if item.current_score >= threshold {
            Color::Green
        } else {
            Color::Yellow
        };
        table.add_row(vec![
            Cell::new(item.id.as_str()),
            Cell::new(format!("{:.2}", item.current_score)).fg(color),
            Cell::new(&item.requirement),
        ]);
    }
    table
}

pub fn knowledge_table(knowledge_base: &KnowledgeBase) -> Table {
    let mut table = list_table(&["id", "conf", "content", "source", "conflicts"]);
    for nugget in knowledge_base.iter() {
        let conflicts = nugget
            .conflicts_with
            .iter()
            .map(|id| truncate(id.as_str(), 8))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(truncate(nugget.nugget_id.as_str(), 8)),
            Cell::new(format!("{:.2}", nugget.confidence)),
            Cell::new(truncate(&nugget.content, CONTENT_WIDTH)),
            Cell::new(truncate(&nugget.source_url, URL_WIDTH)),
            Cell::new(conflicts),
        ]);
    }
    table
}

pub fn models_table(models: &[ModelSpec]) -> Table {
    let mut table = list_table(&["model", "context", "temperature", "use cases"]);
    for model in models {
        table.add_row(vec![
            Cell::new(model.name),
            Cell::new(model.context_window),
            Cell::new(if model.supports_temperature { "yes" } else { "no" }),
            Cell::new(model.use_cases.join(", ")),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{KnowledgeNugget, MODEL_CATALOG};

    #[test]
    fn test_render_empty_list() {
        let table = list_table(&["id"]);
        assert_eq!(render_list("nugget", &table, 0), "No nuggets found.");
    }

    #[test]
    fn test_checklist_table_has_row_per_item() {
        let checklist = Checklist::from_requirements(["Names the capital", "Cites a source"]);
        let rendered = checklist_table(&checklist, 0.9).to_string();
        assert!(rendered.contains("Names the capital"));
        assert!(rendered.contains("r2"));
        assert!(rendered.contains("0.00"));
    }

    #[test]
    fn test_knowledge_table_truncates_content() {
        let long = "x".repeat(200);
        let kb = KnowledgeBase::from(vec![KnowledgeNugget::new("n1", long.clone(), "https://a.example", 0.5)]);
        let rendered = knowledge_table(&kb).to_string();
        assert!(!rendered.contains(&long));
        assert!(rendered.contains("..."));
    }

    #[test]
    fn test_models_table_lists_catalog() {
        let rendered = models_table(MODEL_CATALOG).to_string();
        for model in MODEL_CATALOG {
            assert!(rendered.contains(model.name));
        }
    }
}
