//! Coercion of untrusted oracle records into typed candidates
//!
//! Oracle output is unordered and loosely shaped. Records with a usable
//! core survive with missing fields defaulted; everything else is dropped
//! silently. Downstream code never sees a raw record.

use std::collections::BTreeMap;

use serde_json::Value;
use surveydag_domain::predicate::{PredicateDef, P_TRUE};
use surveydag_domain::traits::record_class;
use surveydag_domain::{ContentNode, ExtractionRecord, QuestionIndexEntry, StructureEdge};
use tracing::debug;

fn attr_str(attributes: &Value, key: &str) -> Option<String> {
    let s = attributes.get(key)?.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Coerce index records from one window.
///
/// A record needs both an id and a verbatim short stem; `page_guess` is
/// forced to the window's starting page regardless of what the oracle
/// claimed.
pub fn coerce_index_records(
    records: &[ExtractionRecord],
    page_start: usize,
) -> Vec<QuestionIndexEntry> {
    let mut out = Vec::new();
    for rec in records {
        if rec.class != record_class::QUESTION_INDEX {
            continue;
        }
        let Some(id) = attr_str(&rec.attributes, "id") else {
            continue;
        };
        let Some(short_text) = attr_str(&rec.attributes, "short_text") else {
            continue;
        };
        out.push(QuestionIndexEntry { id, short_text, page_guess: page_start });
    }
    out
}

/// Coerce the content record for one targeted question.
///
/// Picks the first record whose id (trimmed) matches the target; any other
/// questions the oracle volunteered are ignored. Returns `None` when the
/// oracle found nothing usable, which the pipeline degrades to a
/// placeholder node.
pub fn coerce_content_record(
    records: &[ExtractionRecord],
    target_id: &str,
) -> Option<ContentNode> {
    for rec in records {
        if rec.class != record_class::QUESTION_CONTENT {
            continue;
        }
        let Some(id) = attr_str(&rec.attributes, "id") else {
            continue;
        };
        if id != target_id {
            debug!(got = %id, want = %target_id, "content record for wrong question, skipping");
            continue;
        }
        let mut node: ContentNode = match serde_json::from_value(rec.attributes.clone()) {
            Ok(node) => node,
            Err(_) => continue,
        };
        node.id = id;
        return Some(node);
    }
    None
}

/// Coerce skip-logic records from one window into edges and predicates.
///
/// An edge needs both endpoints; a missing predicate ref defaults to
/// `P_TRUE`. Predicate bodies are first-seen per id with missing fields
/// defaulted, and `P_TRUE` is always present in the returned map.
pub fn coerce_skip_records(
    records: &[ExtractionRecord],
) -> (Vec<StructureEdge>, BTreeMap<String, PredicateDef>) {
    let mut edges = Vec::new();
    let mut predicates: BTreeMap<String, PredicateDef> = BTreeMap::new();

    for rec in records {
        match rec.class.as_str() {
            record_class::STRUCTURE_EDGE => {
                let (Some(source), Some(target)) = (
                    attr_str(&rec.attributes, "source"),
                    attr_str(&rec.attributes, "target"),
                ) else {
                    continue;
                };
                let predicate =
                    attr_str(&rec.attributes, "predicate").unwrap_or_else(|| P_TRUE.to_string());
                edges.push(StructureEdge { source, target, predicate });
            }
            record_class::STRUCTURE_PREDICATE => {
                let Some(id) = attr_str(&rec.attributes, "id") else {
                    continue;
                };
                predicates.entry(id).or_insert_with(|| PredicateDef {
                    expr: attr_str(&rec.attributes, "expr").unwrap_or_default(),
                    ast: rec
                        .attributes
                        .get("ast")
                        .filter(|v| !v.is_null())
                        .cloned()
                        .unwrap_or_else(|| Value::from(vec!["TRUE"])),
                    depends_on: rec
                        .attributes
                        .get("depends_on")
                        .and_then(|v| serde_json::from_value(v.clone()).ok())
                        .unwrap_or_default(),
                });
            }
            _ => {}
        }
    }

    predicates
        .entry(P_TRUE.to_string())
        .or_insert_with(PredicateDef::tautology);
    (edges, predicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use surveydag_domain::ResponseType;

    fn rec(class: &str, attributes: Value) -> ExtractionRecord {
        ExtractionRecord { class: class.to_string(), text: String::new(), attributes }
    }

    #[test]
    fn test_index_requires_id_and_short_text() {
        let records = vec![
            rec("question_index", json!({"id": "Q1", "short_text": "Q1. Age?"})),
            rec("question_index", json!({"id": "Q2"})),
            rec("question_index", json!({"short_text": "orphan stem"})),
            rec("structure_edge", json!({"source": "Q1", "target": "Q2"})),
        ];
        let entries = coerce_index_records(&records, 4);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "Q1");
    }

    #[test]
    fn test_index_page_guess_is_window_start() {
        let records = vec![rec(
            "question_index",
            json!({"id": "Q1", "short_text": "Q1. Age?", "page_guess": 99}),
        )];
        let entries = coerce_index_records(&records, 7);
        assert_eq!(entries[0].page_guess, 7);
    }

    #[test]
    fn test_content_matches_trimmed_target_id() {
        let records = vec![
            rec("question_content", json!({"id": "Q9", "text": "wrong question"})),
            rec(
                "question_content",
                json!({
                    "id": " Q5 ",
                    "text": "Q5. Do you smoke?",
                    "response_type": "enum",
                    "response_options": [{"code": 1, "text": "Yes"}, {"code": 2, "text": "No"}]
                }),
            ),
        ];
        let node = coerce_content_record(&records, "Q5").unwrap();
        assert_eq!(node.id, "Q5");
        assert_eq!(node.text, "Q5. Do you smoke?");
        assert_eq!(node.response_type, Some(ResponseType::Enum));
        assert_eq!(node.response_options.unwrap().len(), 2);
    }

    #[test]
    fn test_content_none_when_target_absent() {
        let records = vec![rec("question_content", json!({"id": "Q9", "text": "other"}))];
        assert!(coerce_content_record(&records, "Q5").is_none());
        assert!(coerce_content_record(&[], "Q5").is_none());
    }

    #[test]
    fn test_skip_edge_defaults_predicate() {
        let records = vec![
            rec("structure_edge", json!({"source": "Q1", "target": "Q3"})),
            rec("structure_edge", json!({"source": "Q1"})),
        ];
        let (edges, predicates) = coerce_skip_records(&records);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].predicate, P_TRUE);
        assert!(predicates.contains_key(P_TRUE));
    }

    #[test]
    fn test_skip_predicate_first_seen_with_defaults() {
        let records = vec![
            rec(
                "structure_predicate",
                json!({"id": "P_Q1_EQ_2", "expr": "Q1 == No", "ast": ["==", "Q1", 2], "depends_on": ["Q1"]}),
            ),
            rec(
                "structure_predicate",
                json!({"id": "P_Q1_EQ_2", "expr": "a later, different body"}),
            ),
            rec("structure_predicate", json!({"id": "P_BARE"})),
        ];
        let (_, predicates) = coerce_skip_records(&records);
        assert_eq!(predicates["P_Q1_EQ_2"].expr, "Q1 == No");
        assert_eq!(predicates["P_Q1_EQ_2"].depends_on, vec!["Q1"]);
        assert_eq!(predicates["P_BARE"].ast, json!(["TRUE"]));
        assert!(predicates["P_BARE"].expr.is_empty());
    }

    #[test]
    fn test_skip_always_carries_tautology() {
        let (edges, predicates) = coerce_skip_records(&[]);
        assert!(edges.is_empty());
        assert_eq!(predicates.len(), 1);
        assert!(predicates.contains_key(P_TRUE));
    }
}
