//! Structural repair - make the reduced structure internally consistent
//!
//! Three invariants hold after repair: exactly one canonical terminal,
//! every edge endpoint names an existing node, and every action taken is
//! recorded in the [`RepairReport`].

use std::collections::BTreeSet;
use surveydag_domain::{
    is_terminal_alias, ContentDoc, NodeKind, RepairReport, StructureDoc, StructureNode,
    CANON_TERMINAL,
};
use tracing::{debug, info};

/// Repair a reduced structure against content evidence.
///
/// Steps, in order:
///
/// 1. rewrite every edge endpoint naming a terminal alias (`END`, `SUBMIT`,
///    ...) to the canonical terminal and drop the alias nodes;
/// 2. ensure the canonical terminal node exists;
/// 3. heal unknown edge endpoints: synthesize a stub question node when the
///    content pass proved the id exists, otherwise drop the edge verbatim
///    into the report;
/// 4. deduplicate edges by `(source, target, predicate)`, first-seen order.
///
/// Never fails: any input structure comes out consistent.
pub fn repair_structure_with_content(
    doc: StructureDoc,
    content: &ContentDoc,
) -> (StructureDoc, RepairReport) {
    let mut s = doc.survey_dag_structure;
    let mut report = RepairReport::default();

    // 1. terminal canonicalization
    for edge in &mut s.edges {
        if is_terminal_alias(&edge.source) {
            edge.source = CANON_TERMINAL.to_string();
            report.rewired_terminal_edges += 1;
        }
        if is_terminal_alias(&edge.target) {
            edge.target = CANON_TERMINAL.to_string();
            report.rewired_terminal_edges += 1;
        }
    }
    s.nodes.retain(|n| !is_terminal_alias(&n.id));
    if let Some(start) = &s.start {
        if is_terminal_alias(start) {
            s.start = Some(CANON_TERMINAL.to_string());
        }
    }

    // 2. canonical terminal node
    let mut known: BTreeSet<String> = s.node_id_set();
    if !known.contains(CANON_TERMINAL) {
        s.nodes
            .push(StructureNode::stub_of_kind(CANON_TERMINAL, NodeKind::Terminal));
        known.insert(CANON_TERMINAL.to_string());
        report.ensured_terminal = true;
    }
    s.terminals = vec![CANON_TERMINAL.to_string()];

    // 3. endpoint healing
    let content_ids = content.id_set();
    let mut kept = Vec::with_capacity(s.edges.len());
    for edge in s.edges.drain(..) {
        let mut healed = true;
        for endpoint in [&edge.source, &edge.target] {
            if known.contains(endpoint.as_str()) {
                continue;
            }
            if content_ids.contains(endpoint.as_str()) {
                s.nodes.push(StructureNode::stub(endpoint.clone()));
                known.insert(endpoint.clone());
                report.added_nodes_from_content.push(endpoint.clone());
            } else {
                healed = false;
            }
        }
        if healed {
            kept.push(edge);
        } else {
            info!(source = %edge.source, target = %edge.target, "edge dropped, unknown endpoint");
            report.dropped_edges_unknown_endpoints.push(edge);
        }
    }

    // 4. edge dedup
    let mut seen: BTreeSet<(String, String, String)> = BTreeSet::new();
    for edge in kept {
        let key = (edge.source.clone(), edge.target.clone(), edge.predicate.clone());
        if seen.insert(key) {
            s.edges.push(edge);
        }
    }

    if !report.is_noop() {
        debug!(
            stubs = report.added_nodes_from_content.len(),
            dropped = report.dropped_edges_unknown_endpoints.len(),
            rewired = report.rewired_terminal_edges,
            "structure repaired"
        );
    }
    (StructureDoc { survey_dag_structure: s }, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use surveydag_domain::Structure;

    fn doc(value: serde_json::Value) -> StructureDoc {
        serde_json::from_value(json!({"survey_dag_structure": value})).unwrap()
    }

    fn content(ids: &[&str]) -> ContentDoc {
        let nodes: Vec<_> = ids.iter().map(|id| json!({"id": id, "text": "stub"})).collect();
        serde_json::from_value(json!({"survey_content": {"nodes": nodes}})).unwrap()
    }

    fn structure(doc: &StructureDoc) -> &Structure {
        &doc.survey_dag_structure
    }

    #[test]
    fn test_aliases_collapse_onto_canonical_terminal() {
        let input = doc(json!({
            "nodes": [
                {"id": "Q1"},
                {"id": "END", "kind": "terminal"},
                {"id": "SUBMIT", "kind": "terminal"}
            ],
            "edges": [
                {"source": "Q1", "target": "END"},
                {"source": "Q1", "target": "SUBMIT"}
            ]
        }));
        let (out, report) = repair_structure_with_content(input, &content(&[]));
        let s = structure(&out);
        assert!(!s.nodes.iter().any(|n| n.id == "END" || n.id == "SUBMIT"));
        assert!(s.nodes.iter().any(|n| n.id == CANON_TERMINAL));
        // both alias edges now point at the canonical terminal and collapse
        // into one by dedup
        assert_eq!(s.edges.len(), 1);
        assert_eq!(s.edges[0].target, CANON_TERMINAL);
        assert_eq!(report.rewired_terminal_edges, 2);
        assert!(report.ensured_terminal);
    }

    #[test]
    fn test_unknown_endpoint_with_content_evidence_gets_stub() {
        let input = doc(json!({
            "nodes": [{"id": "Q1"}],
            "edges": [{"source": "Q1", "target": "Q2"}]
        }));
        let (out, report) = repair_structure_with_content(input, &content(&["Q2"]));
        let s = structure(&out);
        assert!(s.nodes.iter().any(|n| n.id == "Q2" && n.kind == NodeKind::Question));
        assert_eq!(s.edges.len(), 1);
        assert_eq!(report.added_nodes_from_content, vec!["Q2"]);
        assert!(report.dropped_edges_unknown_endpoints.is_empty());
    }

    #[test]
    fn test_unknown_endpoint_without_evidence_drops_edge() {
        let input = doc(json!({
            "nodes": [{"id": "Q1"}],
            "edges": [{"source": "Q1", "target": "GHOST"}]
        }));
        let (out, report) = repair_structure_with_content(input, &content(&[]));
        let s = structure(&out);
        assert!(s.edges.is_empty());
        assert_eq!(report.dropped_edges_unknown_endpoints.len(), 1);
        assert_eq!(report.dropped_edges_unknown_endpoints[0].target, "GHOST");
        // the ghost node is not invented
        assert!(!s.nodes.iter().any(|n| n.id == "GHOST"));
    }

    #[test]
    fn test_edge_with_one_healable_and_one_unknown_endpoint_is_dropped() {
        let input = doc(json!({
            "nodes": [],
            "edges": [{"source": "Q5", "target": "GHOST"}]
        }));
        let (out, report) = repair_structure_with_content(input, &content(&["Q5"]));
        let s = structure(&out);
        // Q5 was stubbed, but the edge still had a dangling endpoint
        assert!(s.nodes.iter().any(|n| n.id == "Q5"));
        assert!(s.edges.is_empty());
        assert_eq!(report.dropped_edges_unknown_endpoints.len(), 1);
    }

    #[test]
    fn test_every_endpoint_resolves_after_repair() {
        let input = doc(json!({
            "nodes": [{"id": "Q1"}, {"id": "Q3"}],
            "edges": [
                {"source": "Q1", "target": "Q2"},
                {"source": "Q2", "target": "Q3"},
                {"source": "Q3", "target": "FINISH"},
                {"source": "Q3", "target": "NOWHERE"}
            ]
        }));
        let (out, _) = repair_structure_with_content(input, &content(&["Q1", "Q2", "Q3"]));
        let s = structure(&out);
        let ids = s.node_id_set();
        for edge in &s.edges {
            assert!(ids.contains(&edge.source), "dangling source {}", edge.source);
            assert!(ids.contains(&edge.target), "dangling target {}", edge.target);
        }
    }

    #[test]
    fn test_consistent_input_is_noop() {
        let input = doc(json!({
            "nodes": [{"id": "Q1"}, {"id": "END_COMPLETE", "kind": "terminal"}],
            "edges": [{"source": "Q1", "target": "END_COMPLETE"}],
            "terminals": ["END_COMPLETE"]
        }));
        let (out, report) = repair_structure_with_content(input.clone(), &content(&[]));
        assert!(report.is_noop());
        assert_eq!(out, input);
    }

    #[test]
    fn test_start_alias_rewritten() {
        let input = doc(json!({
            "start": "END",
            "nodes": [{"id": "END", "kind": "terminal"}]
        }));
        let (out, _) = repair_structure_with_content(input, &content(&[]));
        assert_eq!(structure(&out).start.as_deref(), Some(CANON_TERMINAL));
    }
}
