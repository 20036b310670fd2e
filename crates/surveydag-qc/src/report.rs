//! The QC report - ten independent structural checks
//!
//! `report` is a pure function: it never mutates the document and never
//! fails, whatever shape the graph is in. Reachability is computed with an
//! explicit stack so a pathological many-node graph cannot blow the call
//! stack.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use surveydag_domain::{is_terminal_alias, FinalDoc, NodeKind, ResponseType, CANON_TERMINAL};
use tracing::debug;

/// Cap on items listed per category in the markdown rendering.
const RENDER_CAP: usize = 200;

/// Headline counts of the inspected document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Node count
    pub nodes: usize,
    /// Edge count
    pub edges: usize,
    /// Predicate count
    pub predicates: usize,
    /// Start node id
    pub start: String,
}

/// The ten issue categories, each computed independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issues {
    /// Node ids appearing more than once
    pub duplicate_node_ids: Vec<String>,
    /// Question nodes with empty or missing text
    pub empty_question_text: Vec<String>,
    /// Enum/set questions with no response values
    pub enum_or_set_without_values: Vec<String>,
    /// Edges naming a node id absent from the node set
    pub edges_with_unknown_endpoints: Vec<String>,
    /// Nodes not reachable from `start`
    pub unreachable_nodes_from_start: Vec<String>,
    /// Reachable non-terminal nodes with no outgoing edge
    pub dead_ends_nonterminal: Vec<String>,
    /// Predicate ids referenced by edges but never defined (hard defect)
    pub missing_predicates: Vec<String>,
    /// Predicate ids defined but never referenced (informational)
    pub unused_predicates: Vec<String>,
    /// Terminal-alias ids that repair should have canonicalized away
    pub terminal_alias_nodes_present: Vec<String>,
    /// Whether the canonical terminal node exists
    pub canonical_terminal_present: bool,
}

/// Structured QC output: summary plus issues.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QcReport {
    /// Headline counts
    pub summary: Summary,
    /// The ten issue categories
    pub issues: Issues,
}

impl QcReport {
    /// Total defect count. Unused predicates are informational and the
    /// canonical-terminal flag is counted as one defect when absent.
    pub fn issue_count(&self) -> usize {
        let i = &self.issues;
        i.duplicate_node_ids.len()
            + i.empty_question_text.len()
            + i.enum_or_set_without_values.len()
            + i.edges_with_unknown_endpoints.len()
            + i.unreachable_nodes_from_start.len()
            + i.dead_ends_nonterminal.len()
            + i.missing_predicates.len()
            + i.terminal_alias_nodes_present.len()
            + usize::from(!i.canonical_terminal_present)
    }

    /// Whether the document has no defects at all.
    pub fn is_clean(&self) -> bool {
        self.issue_count() == 0
    }

    /// Human-readable markdown rendering, each list capped at 200 items.
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# QC report");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "- nodes: {} / edges: {} / predicates: {} / start: `{}`",
            self.summary.nodes, self.summary.edges, self.summary.predicates, self.summary.start
        );
        let _ = writeln!(
            out,
            "- canonical terminal present: {}",
            self.issues.canonical_terminal_present
        );
        let _ = writeln!(out, "- defects: {}", self.issue_count());

        let sections: [(&str, &[String]); 8] = [
            ("Duplicate node ids", &self.issues.duplicate_node_ids),
            ("Empty question text", &self.issues.empty_question_text),
            ("Enum/set without values", &self.issues.enum_or_set_without_values),
            ("Edges with unknown endpoints", &self.issues.edges_with_unknown_endpoints),
            ("Unreachable from start", &self.issues.unreachable_nodes_from_start),
            ("Dead ends (non-terminal)", &self.issues.dead_ends_nonterminal),
            ("Missing predicates", &self.issues.missing_predicates),
            ("Unused predicates (informational)", &self.issues.unused_predicates),
        ];
        for (title, items) in sections {
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "## {} ({})", title, items.len());
            for item in items.iter().take(RENDER_CAP) {
                let _ = writeln!(out, "- {item}");
            }
            if items.len() > RENDER_CAP {
                let _ = writeln!(out, "- ... and {} more", items.len() - RENDER_CAP);
            }
        }
        if !self.issues.terminal_alias_nodes_present.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "## Terminal aliases still present: {}",
                self.issues.terminal_alias_nodes_present.join(", ")
            );
        }
        out
    }
}

/// Run every check against a final document.
pub fn report(doc: &FinalDoc) -> QcReport {
    let graph = &doc.survey_dag.graph;
    let mut issues = Issues::default();

    // duplicate ids
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for node in &graph.nodes {
        *counts.entry(node.id.as_str()).or_insert(0) += 1;
    }
    issues.duplicate_node_ids = counts
        .iter()
        .filter(|(_, n)| **n > 1)
        .map(|(id, _)| id.to_string())
        .collect();

    // empty text / missing values
    for node in &graph.nodes {
        if node.kind != NodeKind::Question {
            continue;
        }
        if node.metadata.text.trim().is_empty() {
            issues.empty_question_text.push(node.id.clone());
        }
        let coded = matches!(node.domain.kind, ResponseType::Enum | ResponseType::Set);
        let has_values = !node.domain.values.is_empty()
            || node.response_options.as_ref().is_some_and(|o| !o.is_empty());
        if coded && !has_values {
            issues.enum_or_set_without_values.push(node.id.clone());
        }
    }

    // unknown endpoints
    let known: BTreeSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    for edge in &graph.edges {
        if !known.contains(edge.source.as_str()) || !known.contains(edge.target.as_str()) {
            issues
                .edges_with_unknown_endpoints
                .push(format!("{}: {} -> {}", edge.id, edge.source, edge.target));
        }
    }

    // reachability from start, iterative
    let mut outgoing: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for edge in &graph.edges {
        outgoing
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }
    let mut reachable: BTreeSet<&str> = BTreeSet::new();
    if known.contains(graph.start.as_str()) {
        let mut stack = vec![graph.start.as_str()];
        while let Some(id) = stack.pop() {
            if !reachable.insert(id) {
                continue;
            }
            for target in outgoing.get(id).into_iter().flatten() {
                if known.contains(target) && !reachable.contains(target) {
                    stack.push(target);
                }
            }
        }
    }
    issues.unreachable_nodes_from_start = graph
        .nodes
        .iter()
        .filter(|n| !reachable.contains(n.id.as_str()))
        .map(|n| n.id.clone())
        .collect();

    // dead ends among reachable non-terminals
    issues.dead_ends_nonterminal = graph
        .nodes
        .iter()
        .filter(|n| {
            n.kind != NodeKind::Terminal
                && reachable.contains(n.id.as_str())
                && outgoing.get(n.id.as_str()).is_none_or(Vec::is_empty)
        })
        .map(|n| n.id.clone())
        .collect();

    // predicate referential integrity
    let referenced: BTreeSet<&str> = graph.edges.iter().map(|e| e.predicate.as_str()).collect();
    let defined: BTreeSet<&str> = doc.survey_dag.predicates.keys().map(String::as_str).collect();
    issues.missing_predicates = referenced
        .difference(&defined)
        .map(|p| p.to_string())
        .collect();
    issues.unused_predicates = defined
        .difference(&referenced)
        .filter(|p| **p != surveydag_domain::P_TRUE)
        .map(|p| p.to_string())
        .collect();

    // terminal state
    issues.terminal_alias_nodes_present = graph
        .nodes
        .iter()
        .filter(|n| is_terminal_alias(&n.id))
        .map(|n| n.id.clone())
        .collect();
    issues.canonical_terminal_present = graph.nodes.iter().any(|n| n.id == CANON_TERMINAL);

    let report = QcReport {
        summary: Summary {
            nodes: graph.nodes.len(),
            edges: graph.edges.len(),
            predicates: doc.survey_dag.predicates.len(),
            start: graph.start.clone(),
        },
        issues,
    };
    debug!(defects = report.issue_count(), "qc report computed");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(graph: serde_json::Value, predicates: serde_json::Value) -> FinalDoc {
        serde_json::from_value(json!({
            "survey_dag": {
                "metadata": {"id": "s", "version": "1.0", "build": {}},
                "graph": graph,
                "predicates": predicates,
                "validation": {},
                "analysis": {}
            }
        }))
        .unwrap()
    }

    fn clean_doc() -> FinalDoc {
        doc(
            json!({
                "start": "Q1",
                "terminals": ["END_COMPLETE"],
                "nodes": [
                    {"id": "Q1", "type": "question", "order_index": 0,
                     "domain": {"kind": "enum", "values": [1, 2]},
                     "metadata": {"text": "Do you smoke?", "required": false}},
                    {"id": "Q2", "type": "question", "order_index": 1,
                     "domain": {"kind": "text", "values": []},
                     "metadata": {"text": "Why?", "required": false}},
                    {"id": "END_COMPLETE", "type": "terminal", "order_index": 2}
                ],
                "edges": [
                    {"id": "E_0000000001", "source": "Q1", "target": "Q2",
                     "predicate": "P_TRUE", "kind": "fallthrough", "subkind": "sequence"},
                    {"id": "E_0000000002", "source": "Q2", "target": "END_COMPLETE",
                     "predicate": "P_TRUE", "kind": "terminate", "subkind": "terminal_exit"}
                ]
            }),
            json!({"P_TRUE": {"ast": ["TRUE"], "text": "Always true",
                              "depends_on": [], "complexity": "trivial"}}),
        )
    }

    #[test]
    fn test_clean_document_has_zero_issues() {
        let report = report(&clean_doc());
        assert!(report.is_clean(), "unexpected issues: {:?}", report.issues);
        assert_eq!(report.summary.nodes, 3);
        assert_eq!(report.summary.edges, 2);
        assert_eq!(report.summary.start, "Q1");
    }

    #[test]
    fn test_duplicate_ids_flagged() {
        let d = doc(
            json!({
                "start": "Q1",
                "terminals": [],
                "nodes": [{"id": "Q1", "type": "question"}, {"id": "Q1", "type": "question"}],
                "edges": []
            }),
            json!({}),
        );
        let r = report(&d);
        assert_eq!(r.issues.duplicate_node_ids, vec!["Q1"]);
    }

    #[test]
    fn test_empty_text_and_missing_values_flagged() {
        let d = doc(
            json!({
                "start": "Q1",
                "terminals": [],
                "nodes": [{"id": "Q1", "type": "question",
                           "domain": {"kind": "set", "values": []}}],
                "edges": []
            }),
            json!({}),
        );
        let r = report(&d);
        assert_eq!(r.issues.empty_question_text, vec!["Q1"]);
        assert_eq!(r.issues.enum_or_set_without_values, vec!["Q1"]);
    }

    #[test]
    fn test_unknown_endpoint_and_missing_predicate_flagged() {
        let d = doc(
            json!({
                "start": "Q1",
                "terminals": [],
                "nodes": [{"id": "Q1", "type": "question",
                           "metadata": {"text": "x", "required": false}}],
                "edges": [{"id": "E_0000000001", "source": "Q1", "target": "GHOST",
                           "predicate": "P_LOST", "kind": "branch", "subkind": "skip"}]
            }),
            json!({}),
        );
        let r = report(&d);
        assert_eq!(r.issues.edges_with_unknown_endpoints, vec!["E_0000000001: Q1 -> GHOST"]);
        assert_eq!(r.issues.missing_predicates, vec!["P_LOST"]);
    }

    #[test]
    fn test_unreachable_and_dead_end_detection() {
        let d = doc(
            json!({
                "start": "Q1",
                "terminals": ["END_COMPLETE"],
                "nodes": [
                    {"id": "Q1", "type": "question", "metadata": {"text": "a", "required": false}},
                    {"id": "Q2", "type": "question", "metadata": {"text": "b", "required": false}},
                    {"id": "ISLAND", "type": "question", "metadata": {"text": "c", "required": false}},
                    {"id": "END_COMPLETE", "type": "terminal"}
                ],
                "edges": [{"id": "E_0000000001", "source": "Q1", "target": "Q2",
                           "predicate": "P_TRUE", "kind": "fallthrough", "subkind": "sequence"}]
            }),
            json!({"P_TRUE": {"ast": ["TRUE"], "text": "", "depends_on": [], "complexity": "trivial"}}),
        );
        let r = report(&d);
        assert_eq!(r.issues.unreachable_nodes_from_start, vec!["ISLAND", "END_COMPLETE"]);
        // Q2 is reachable but goes nowhere
        assert_eq!(r.issues.dead_ends_nonterminal, vec!["Q2"]);
    }

    #[test]
    fn test_unused_predicates_exclude_tautology() {
        let d = doc(
            json!({"start": "Q1", "terminals": [],
                   "nodes": [{"id": "Q1", "type": "question", "metadata": {"text": "a", "required": false}}],
                   "edges": []}),
            json!({
                "P_TRUE": {"ast": ["TRUE"], "text": "", "depends_on": [], "complexity": "trivial"},
                "P_ORPHAN": {"ast": ["==", "Q1", 2], "text": "", "depends_on": ["Q1"], "complexity": "simple"}
            }),
        );
        let r = report(&d);
        assert_eq!(r.issues.unused_predicates, vec!["P_ORPHAN"]);
        // informational only, does not count as a defect
        let defect_without = {
            let mut d2 = r.clone();
            d2.issues.unused_predicates.clear();
            d2.issue_count()
        };
        assert_eq!(r.issue_count(), defect_without);
    }

    #[test]
    fn test_terminal_alias_and_missing_canonical() {
        let d = doc(
            json!({"start": "Q1", "terminals": ["END"],
                   "nodes": [
                       {"id": "Q1", "type": "question", "metadata": {"text": "a", "required": false}},
                       {"id": "END", "type": "terminal"}
                   ],
                   "edges": [{"id": "E_0000000001", "source": "Q1", "target": "END",
                              "predicate": "P_TRUE", "kind": "terminate", "subkind": "terminal_exit"}]}),
            json!({"P_TRUE": {"ast": ["TRUE"], "text": "", "depends_on": [], "complexity": "trivial"}}),
        );
        let r = report(&d);
        assert_eq!(r.issues.terminal_alias_nodes_present, vec!["END"]);
        assert!(!r.issues.canonical_terminal_present);
    }

    #[test]
    fn test_report_never_panics_on_hollow_document() {
        let d = doc(json!({"start": "", "terminals": [], "nodes": [], "edges": []}), json!({}));
        let r = report(&d);
        assert!(!r.issues.canonical_terminal_present);
        assert_eq!(r.summary.nodes, 0);
    }

    #[test]
    fn test_markdown_rendering_lists_sections() {
        let d = doc(
            json!({"start": "Q1", "terminals": [],
                   "nodes": [{"id": "Q1", "type": "question",
                              "domain": {"kind": "enum", "values": []}}],
                   "edges": []}),
            json!({}),
        );
        let text = report(&d).render_markdown();
        assert!(text.contains("# QC report"));
        assert!(text.contains("## Empty question text (1)"));
        assert!(text.contains("## Enum/set without values (1)"));
        assert!(text.contains("canonical terminal present: false"));
    }

    #[test]
    fn test_markdown_rendering_caps_long_lists() {
        let nodes: Vec<_> = (0..250)
            .map(|i| json!({"id": format!("Q{i}"), "type": "question"}))
            .collect();
        let d = doc(
            json!({"start": "NONE", "terminals": [], "nodes": nodes, "edges": []}),
            json!({}),
        );
        let text = report(&d).render_markdown();
        assert!(text.contains("... and 50 more"));
    }
}
