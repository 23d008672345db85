//! Prompt builders for the model-backed steps.

use crate::domain::models::{Checklist, KnowledgeBase, QueryHistory, SourceDocument};
use crate::domain::ports::Prompt;

use super::query_planner::focus_requirements;

/// Requirements named in a query-planning prompt.
const FOCUS_LIMIT: usize = 3;

pub fn improve_question(question: &str) -> Prompt {
    Prompt::new(
        "You rewrite user questions so they are specific, unambiguous and answerable \
         with web research. Keep the original intent. Reply with the rewritten question only.",
        format!("Question: {question}"),
    )
}

pub fn build_checklist(question: &str) -> Prompt {
    Prompt::new(
        "You list the requirements a complete, correct answer to a question must satisfy. \
         Each requirement is one short, independently checkable statement. \
         Reply with JSON only: {\"requirements\": [\"...\", \"...\"]}",
        format!("Question: {question}"),
    )
}

pub fn plan_query(question: &str, checklist: &Checklist, history: &QueryHistory) -> Prompt {
    let focus = focus_requirements(checklist, FOCUS_LIMIT)
        .iter()
        .map(|item| format!("- {} (score {:.2})", item.requirement, item.current_score))
        .collect::<Vec<_>>()
        .join("\n");
    let previous = if history.is_empty() {
        "(none)".to_string()
    } else {
        history
            .iter()
            .map(|q| format!("- {}", q.text))
            .collect::<Vec<_>>()
            .join("\n")
    };

    Prompt::new(
        "You write one web search query that finds evidence for the weakest requirements \
         of an answer. Do not repeat a previous query. \
         Reply with the search query only, on a single line.",
        format!(
            "Question: {question}\n\nRequirements needing evidence:\n{focus}\n\nPrevious queries:\n{previous}"
        ),
    )
}

pub fn extract_knowledge(question: &str, document: &SourceDocument, knowledge_base: &KnowledgeBase) -> Prompt {
    Prompt::new(
        "You extract discrete, sourced facts relevant to a question from a document and \
         reconcile them with an existing knowledge base. For each fact either add a new \
         nugget or update an existing one by its nugget_id. When a fact contradicts an \
         existing nugget, list that nugget's id in conflicts_with. \
         Reply with JSON only:\n\
         {\"nuggets\": [\n\
           {\"action\": \"new\", \"content\": \"...\", \"confidence\": 0.0-1.0, \"conflicts_with\": [\"id\"]},\n\
           {\"action\": \"update\", \"nugget_id\": \"id\", \"content\": \"...\", \"confidence\": 0.0-1.0, \"conflicts_with\": [\"id\"]}\n\
         ]}\n\
         Omit fields of an update that do not change. Reply {\"nuggets\": []} if the \
         document has nothing relevant.",
        format!(
            "Question: {question}\n\nDocument: {title}\nURL: {url}\n\n{content}\n\nKnowledge base:\n{kb}",
            title = document.title,
            url = document.url,
            content = document.content,
            kb = knowledge_base.to_prompt_json(),
        ),
    )
}

pub fn draft_answer(question: &str, checklist: &Checklist, knowledge_base: &KnowledgeBase) -> Prompt {
    let requirements = checklist
        .iter()
        .map(|item| format!("- {}", item.requirement))
        .collect::<Vec<_>>()
        .join("\n");

    Prompt::new(
        "You write a complete answer to a question using only the facts in the knowledge \
         base. Address every requirement. Cite source URLs where you use a fact and point \
         out conflicting facts instead of picking one silently.",
        format!(
            "Question: {question}\n\nRequirements:\n{requirements}\n\nKnowledge base:\n{kb}",
            kb = knowledge_base.to_prompt_json(),
        ),
    )
}

pub fn score_answer(question: &str, answer: &str, checklist: &Checklist) -> Prompt {
    let requirements = checklist
        .iter()
        .map(|item| format!("- [{}] {}", item.id, item.requirement))
        .collect::<Vec<_>>()
        .join("\n");

    Prompt::new(
        "You grade how well an answer satisfies each requirement, from 0.0 (not at all) \
         to 1.0 (fully). Grade every requirement. \
         Reply with JSON only: {\"scores\": [{\"id\": \"r1\", \"score\": 0.0}]}",
        format!("Question: {question}\n\nAnswer:\n{answer}\n\nRequirements:\n{requirements}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::QueryHistory;

    #[test]
    fn test_plan_query_lists_history() {
        let checklist = Checklist::from_requirements(["Names the capital"]);
        let mut history = QueryHistory::new();
        history.push("capital of france");

        let prompt = plan_query("What is the capital of France?", &checklist, &history);
        assert!(prompt.user.contains("- capital of france"));
        assert!(prompt.user.contains("Names the capital"));
    }

    #[test]
    fn test_score_prompt_carries_ids() {
        let checklist = Checklist::from_requirements(["Names the capital", "Cites a source"]);
        let prompt = score_answer("q", "Paris.", &checklist);
        assert!(prompt.user.contains("[r1] Names the capital"));
        assert!(prompt.user.contains("[r2] Cites a source"));
    }
}
