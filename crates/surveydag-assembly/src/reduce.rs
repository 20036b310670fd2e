//! Chunk reduction - union per-window candidates into one document
//!
//! Windows overlap, so the same node, edge, or predicate can be reported
//! several times. Reduction is first-occurrence-wins over windows sorted by
//! window index: oracle calls complete in arbitrary order under the worker
//! pool, and re-sorting here is what keeps the reduced output independent
//! of completion order.

use std::collections::BTreeMap;
use surveydag_domain::{
    ContentDoc, ContentNode, NodeKind, ResponseType, Structure, StructureDoc, StructureNode,
    SurveyContent, CANON_TERMINAL,
};
use tracing::debug;

/// Union structure chunks into one structure document.
///
/// Node definitions and predicate bodies are deduplicated first-seen;
/// edges are unioned without dedup (duplicates are resolved later by set
/// semantics at use sites). The canonical terminal is guaranteed present
/// whenever any terminal existed in the input.
pub fn reduce_structure_chunks(mut chunks: Vec<(usize, StructureDoc)>) -> StructureDoc {
    chunks.sort_by_key(|(idx, _)| *idx);

    let mut out = Structure::default();
    let mut node_order: Vec<StructureNode> = Vec::new();
    let mut seen_nodes: BTreeMap<String, ()> = BTreeMap::new();
    let mut saw_terminal = false;

    for (_, chunk) in chunks {
        let s = chunk.survey_dag_structure;
        if out.id.is_none() {
            out.id = s.id;
        }
        if out.version.is_none() {
            out.version = s.version;
        }
        if out.start.is_none() {
            // tentative start = first node of the first non-empty chunk
            out.start = s.start.or_else(|| s.nodes.first().map(|n| n.id.clone()));
        }
        saw_terminal |= !s.terminals.is_empty();

        for node in s.nodes {
            if node.id.is_empty() || seen_nodes.contains_key(&node.id) {
                continue;
            }
            saw_terminal |= node.kind == NodeKind::Terminal;
            seen_nodes.insert(node.id.clone(), ());
            node_order.push(node);
        }

        for edge in s.edges {
            if edge.source.is_empty() || edge.target.is_empty() {
                continue;
            }
            out.edges.push(edge);
        }

        for (pid, body) in s.predicates {
            out.predicates.entry(pid).or_insert(body);
        }
    }

    if saw_terminal && !seen_nodes.contains_key(CANON_TERMINAL) {
        node_order.push(StructureNode::stub_of_kind(CANON_TERMINAL, NodeKind::Terminal));
        seen_nodes.insert(CANON_TERMINAL.to_string(), ());
    }

    if out.start.is_none() {
        out.start = node_order.first().map(|n| n.id.clone());
    }
    out.terminals = if saw_terminal {
        vec![CANON_TERMINAL.to_string()]
    } else {
        Vec::new()
    };
    out.nodes = node_order;
    debug!(
        nodes = out.nodes.len(),
        edges = out.edges.len(),
        predicates = out.predicates.len(),
        "structure chunks reduced"
    );
    StructureDoc { survey_dag_structure: out }
}

/// Union content chunks into one content document.
///
/// For a question id seen in several windows: keep the longest non-empty
/// text, the richer response_type (enum/set > number/boolean > text >
/// none; first-seen wins on equal rank), and the option list with more
/// entries. The lossless merger performs true option-level union; this
/// basic reducer stays a cheap heuristic on purpose.
pub fn reduce_content_chunks(mut chunks: Vec<(usize, ContentDoc)>) -> ContentDoc {
    chunks.sort_by_key(|(idx, _)| *idx);

    let mut order: Vec<String> = Vec::new();
    let mut by_id: BTreeMap<String, ContentNode> = BTreeMap::new();

    for (_, chunk) in chunks {
        for node in chunk.survey_content.nodes {
            if node.id.is_empty() {
                continue;
            }
            match by_id.get_mut(&node.id) {
                None => {
                    order.push(node.id.clone());
                    by_id.insert(node.id.clone(), node);
                }
                Some(current) => {
                    if node.text.len() > current.text.len() {
                        current.text = node.text;
                    }
                    if ResponseType::richness(node.response_type)
                        > ResponseType::richness(current.response_type)
                    {
                        current.response_type = node.response_type;
                    }
                    let current_len = current.response_options.as_ref().map_or(0, Vec::len);
                    let new_len = node.response_options.as_ref().map_or(0, Vec::len);
                    if new_len > current_len {
                        current.response_options = node.response_options;
                    }
                }
            }
        }
    }

    let nodes = order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect();
    ContentDoc { survey_content: SurveyContent { nodes } }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn arb_chunk() -> impl Strategy<Value = StructureDoc> {
        (
            proptest::collection::vec("Q[0-9]{1,2}", 0..6),
            proptest::collection::vec(("Q[0-9]{1,2}", "Q[0-9]{1,2}"), 0..6),
        )
            .prop_map(|(node_ids, edge_pairs)| {
                let nodes: Vec<_> = node_ids.iter().map(|id| json!({"id": id})).collect();
                let edges: Vec<_> = edge_pairs
                    .iter()
                    .map(|(s, t)| json!({"source": s, "target": t}))
                    .collect();
                serde_json::from_value(json!({
                    "survey_dag_structure": {"nodes": nodes, "edges": edges}
                }))
                .unwrap()
            })
    }

    proptest! {
        /// Property: reducing a reduced document changes nothing
        #[test]
        fn test_structure_reduction_idempotent(
            chunks in proptest::collection::vec(arb_chunk(), 1..5)
        ) {
            let indexed: Vec<_> = chunks.into_iter().enumerate().collect();
            let once = reduce_structure_chunks(indexed);
            let again = reduce_structure_chunks(vec![(0, once.clone())]);
            prop_assert_eq!(once, again);
        }

        /// Property: the result does not depend on arrival order
        #[test]
        fn test_structure_reduction_order_invariant(
            chunks in proptest::collection::vec(arb_chunk(), 2..5)
        ) {
            let forward: Vec<_> = chunks.iter().cloned().enumerate().collect();
            let mut reversed = forward.clone();
            reversed.reverse();
            prop_assert_eq!(
                reduce_structure_chunks(forward),
                reduce_structure_chunks(reversed)
            );
        }

        /// Property: no node id present in any chunk goes missing
        #[test]
        fn test_structure_reduction_loses_no_node(
            chunks in proptest::collection::vec(arb_chunk(), 1..5)
        ) {
            let input_ids: std::collections::BTreeSet<String> = chunks
                .iter()
                .flat_map(|c| c.survey_dag_structure.nodes.iter().map(|n| n.id.clone()))
                .collect();
            let indexed: Vec<_> = chunks.into_iter().enumerate().collect();
            let reduced = reduce_structure_chunks(indexed);
            let output_ids = reduced.survey_dag_structure.node_id_set();
            for id in input_ids {
                prop_assert!(output_ids.contains(&id), "node {} lost in reduction", id);
            }
        }
    }
}
