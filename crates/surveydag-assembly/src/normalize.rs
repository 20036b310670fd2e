//! Normalization - predicate id canonicalization and the schema-lossless
//! final pass
//!
//! Two distinct passes live here. [`normalize_predicates`] runs on the
//! repaired structure and makes the predicate map referentially sound.
//! [`coerce_to_schema_lossless`] runs on the assembled final document and
//! rewrites everything the strict schema would reject, recording each
//! rewrite in a [`Sidecar`] so nothing is actually lost.

use std::collections::BTreeMap;
use surveydag_domain::{
    ast, CoreNode, FinalDoc, NodeKind, PredicateDef, ResponseOption, RichRecord, Sidecar,
    StructureDoc, P_TRUE,
};
use serde_json::Value;
use tracing::debug;

/// Canonical form of a predicate id: uppercase, `[A-Z0-9_]` only, `P_`
/// prefix. An id that sanitizes to nothing becomes `P_TRUE`.
fn canon_predicate_id(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '_')
        .collect();
    if cleaned.is_empty() {
        return P_TRUE.to_string();
    }
    if cleaned == P_TRUE || cleaned.starts_with("P_") {
        cleaned
    } else {
        format!("P_{cleaned}")
    }
}

/// Make the predicate map referentially sound.
///
/// Canonicalizes predicate ids in both the map and the edges (first body
/// wins on collisions), guarantees `P_TRUE` exists, synthesizes a
/// tautology body for every edge-referenced id that has no definition,
/// and recomputes `depends_on` for each body from its AST.
pub fn normalize_predicates(doc: &mut StructureDoc) {
    let s = &mut doc.survey_dag_structure;

    let mut renamed: BTreeMap<String, PredicateDef> = BTreeMap::new();
    for (raw_id, body) in std::mem::take(&mut s.predicates) {
        renamed.entry(canon_predicate_id(&raw_id)).or_insert(body);
    }
    s.predicates = renamed;

    for edge in &mut s.edges {
        edge.predicate = canon_predicate_id(&edge.predicate);
    }

    s.predicates
        .entry(P_TRUE.to_string())
        .or_insert_with(PredicateDef::tautology);
    let mut synthesized = 0usize;
    for edge in &s.edges {
        if !s.predicates.contains_key(&edge.predicate) {
            s.predicates
                .insert(edge.predicate.clone(), PredicateDef::tautology());
            synthesized += 1;
        }
    }
    if synthesized > 0 {
        debug!(synthesized, "tautology bodies synthesized for dangling predicate refs");
    }

    for body in s.predicates.values_mut() {
        body.recompute_dependencies();
    }
}

/// Canonical form of a node id under the strict schema: `[A-Za-z0-9_]`
/// only, fallback `NODE` when nothing survives.
fn canon_node_id(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "NODE".to_string()
    } else {
        cleaned
    }
}

/// Rewrite the final document into strict-schema shape, returning the
/// sidecar that makes the rewrite reversible.
///
/// - node ids are sanitized; collisions get `_2`, `_3`, ... suffixes in
///   encounter order; every rename lands in `sidecar.id_map` and is applied
///   to edges, `start`, `terminals`, and predicate ASTs/`depends_on`;
/// - rich response options are flattened to schema primitives into
///   `domain.values`, with the rich records kept in `sidecar.option_maps`;
/// - rich objects already sitting in `domain.values` are flattened into
///   `sidecar.domain_value_maps`;
/// - a junction stub is synthesized when `start` names no node, and a
///   terminal stub for each missing terminal id.
pub fn coerce_to_schema_lossless(doc: &mut FinalDoc) -> Sidecar {
    let mut sidecar = Sidecar::default();
    let dag = &mut doc.survey_dag;

    // node id sanitization with collision suffixes
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut id_map: BTreeMap<String, String> = BTreeMap::new();
    for node in &mut dag.graph.nodes {
        let base = canon_node_id(&node.id);
        let n = counts.entry(base.clone()).or_insert(0);
        *n += 1;
        let new_id = if *n == 1 { base } else { format!("{base}_{n}") };
        if new_id != node.id {
            id_map.insert(node.id.clone(), new_id.clone());
            node.id = new_id;
        }
    }
    if !id_map.is_empty() {
        for edge in &mut dag.graph.edges {
            if let Some(new) = id_map.get(&edge.source) {
                edge.source = new.clone();
            }
            if let Some(new) = id_map.get(&edge.target) {
                edge.target = new.clone();
            }
        }
        if let Some(new) = id_map.get(&dag.graph.start) {
            dag.graph.start = new.clone();
        }
        for terminal in &mut dag.graph.terminals {
            if let Some(new) = id_map.get(terminal) {
                *terminal = new.clone();
            }
        }
        for predicate in dag.predicates.values_mut() {
            rewrite_ast_refs(&mut predicate.ast, &id_map);
            predicate.depends_on = ast::depends_on(&predicate.ast);
        }
        sidecar.id_map = id_map;
    }

    // option and domain-value flattening
    for node in &mut dag.graph.nodes {
        if let Some(options) = node.response_options.take() {
            let mut flat = Vec::with_capacity(options.len());
            let mut rich = Vec::new();
            for opt in &options {
                let (value, record) = opt.flatten();
                if value.is_null() {
                    continue;
                }
                flat.push(value);
                if let Some(record) = record {
                    rich.push(record);
                }
            }
            if !flat.is_empty() {
                node.domain.values = flat;
            }
            if !rich.is_empty() {
                sidecar.option_maps.insert(node.id.clone(), rich);
            }
        }
        flatten_domain_values(node, &mut sidecar);
    }

    // start / terminal stubs
    let known = dag.graph.node_id_set();
    let next_index = dag.graph.nodes.len();
    if !dag.graph.start.is_empty() && !known.contains(&dag.graph.start) {
        let mut stub = CoreNode::terminal(dag.graph.start.clone(), next_index);
        stub.kind = NodeKind::Junction;
        dag.graph.nodes.push(stub);
    }
    let known = dag.graph.node_id_set();
    let mut next_index = dag.graph.nodes.len();
    for terminal in dag.graph.terminals.clone() {
        if !known.contains(&terminal) {
            dag.graph.nodes.push(CoreNode::terminal(terminal, next_index));
            next_index += 1;
        }
    }

    if !sidecar.is_empty() {
        debug!(
            renamed = sidecar.id_map.len(),
            flattened = sidecar.option_maps.len(),
            "schema coercion recorded rewrites"
        );
    }
    sidecar
}

/// Flatten rich `{code, text}` objects that extraction left directly in
/// `domain.values`.
fn flatten_domain_values(node: &mut CoreNode, sidecar: &mut Sidecar) {
    if !node.domain.values.iter().any(Value::is_object) {
        return;
    }
    let mut flat = Vec::with_capacity(node.domain.values.len());
    let mut rich = Vec::new();
    for value in node.domain.values.drain(..) {
        if value.is_object() {
            let opt: ResponseOption = match serde_json::from_value(value.clone()) {
                Ok(opt) => opt,
                Err(_) => {
                    // unrecognized object shape: keep its text rendering
                    let text = value.to_string();
                    flat.push(Value::String(text.clone()));
                    rich.push(RichRecord { code: None, text });
                    continue;
                }
            };
            let (v, record) = opt.flatten();
            if !v.is_null() {
                flat.push(v);
            }
            if let Some(record) = record {
                rich.push(record);
            }
        } else {
            flat.push(value);
        }
    }
    node.domain.values = flat;
    if !rich.is_empty() {
        sidecar.domain_value_maps.insert(node.id.clone(), rich);
    }
}

/// Replace renamed node ids in comparison operands of a predicate AST.
fn rewrite_ast_refs(ast: &mut Value, id_map: &BTreeMap<String, String>) {
    let Some(items) = ast.as_array_mut() else { return };
    let is_comparison = items
        .first()
        .and_then(Value::as_str)
        .map(|op| ["==", "!=", ">", ">=", "<", "<=", "IN"].contains(&op))
        .unwrap_or(false);
    if is_comparison {
        if let Some(Value::String(var)) = items.get_mut(1) {
            if let Some(new) = id_map.get(var.as_str()) {
                *var = new.clone();
            }
        }
    }
    for item in items.iter_mut().skip(1) {
        rewrite_ast_refs(item, id_map);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use surveydag_domain::ast::Complexity;

    fn structure_doc(value: serde_json::Value) -> StructureDoc {
        serde_json::from_value(json!({"survey_dag_structure": value})).unwrap()
    }

    fn final_doc(graph: serde_json::Value, predicates: serde_json::Value) -> FinalDoc {
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

    #[test]
    fn test_predicate_id_canonicalization() {
        assert_eq!(canon_predicate_id("p_skip-1"), "P_SKIP1");
        assert_eq!(canon_predicate_id("SKIP_1"), "P_SKIP_1");
        assert_eq!(canon_predicate_id("P_TRUE"), "P_TRUE");
        assert_eq!(canon_predicate_id("  "), "P_TRUE");
    }

    #[test]
    fn test_dangling_predicate_ref_gets_tautology_body() {
        let mut doc = structure_doc(json!({
            "edges": [{"source": "Q1", "target": "Q2", "predicate": "P_MISSING"}]
        }));
        normalize_predicates(&mut doc);
        let s = &doc.survey_dag_structure;
        assert_eq!(s.predicates["P_MISSING"].ast, json!(["TRUE"]));
        assert!(s.predicates.contains_key(P_TRUE));
    }

    #[test]
    fn test_edge_refs_follow_renames() {
        let mut doc = structure_doc(json!({
            "edges": [{"source": "Q1", "target": "Q2", "predicate": "skip_1"}],
            "predicates": {"skip_1": {"expr": "Q1 == 2", "ast": ["==", "Q1", 2]}}
        }));
        normalize_predicates(&mut doc);
        let s = &doc.survey_dag_structure;
        assert_eq!(s.edges[0].predicate, "P_SKIP_1");
        assert!(s.predicates.contains_key("P_SKIP_1"));
        // referential soundness: every edge predicate is defined
        for edge in &s.edges {
            assert!(s.predicates.contains_key(&edge.predicate));
        }
    }

    #[test]
    fn test_dependencies_recomputed() {
        let mut doc = structure_doc(json!({
            "predicates": {"P_A": {"expr": "Q5 == 2", "ast": ["==", "Q5", 2], "depends_on": ["WRONG"]}}
        }));
        normalize_predicates(&mut doc);
        assert_eq!(doc.survey_dag_structure.predicates["P_A"].depends_on, vec!["Q5"]);
    }

    #[test]
    fn test_id_sanitization_and_collision_suffix() {
        let mut doc = final_doc(
            json!({
                "start": "EMP■7",
                "terminals": ["END_COMPLETE"],
                "nodes": [
                    {"id": "EMP■7", "type": "question"},
                    {"id": "EMP7*", "type": "question"},
                    {"id": "END_COMPLETE", "type": "terminal"}
                ],
                "edges": [
                    {"id": "E_0000000001", "source": "EMP■7", "target": "EMP7*",
                     "predicate": "P_TRUE", "kind": "fallthrough", "subkind": "sequence"}
                ]
            }),
            json!({}),
        );
        let sidecar = coerce_to_schema_lossless(&mut doc);
        let g = &doc.survey_dag.graph;
        assert_eq!(g.nodes[0].id, "EMP7");
        assert_eq!(g.nodes[1].id, "EMP7_2");
        assert_eq!(g.start, "EMP7");
        assert_eq!(g.edges[0].source, "EMP7");
        assert_eq!(g.edges[0].target, "EMP7_2");
        assert_eq!(sidecar.id_map["EMP■7"], "EMP7");
        assert_eq!(sidecar.id_map["EMP7*"], "EMP7_2");
    }

    #[test]
    fn test_option_flattening_round_trip() {
        let mut doc = final_doc(
            json!({
                "start": "Q1",
                "terminals": [],
                "nodes": [{
                    "id": "Q1", "type": "question",
                    "domain": {"kind": "enum", "values": []},
                    "response_options": [{"code": 1, "text": "Yes"}, {"code": 2, "text": "No"}]
                }],
                "edges": []
            }),
            json!({}),
        );
        let sidecar = coerce_to_schema_lossless(&mut doc);
        let node = &doc.survey_dag.graph.nodes[0];
        assert_eq!(node.domain.values, vec![json!(1), json!(2)]);
        assert!(node.response_options.is_none());
        let rich = &sidecar.option_maps["Q1"];
        assert_eq!(rich[0].text, "Yes");
        assert_eq!(rich[1].text, "No");
        // flat value + sidecar record reconstruct the original pair
        assert_eq!(rich[0].code, Some(json!(1)));
    }

    #[test]
    fn test_rich_domain_values_flattened() {
        let mut doc = final_doc(
            json!({
                "start": "Q1",
                "terminals": [],
                "nodes": [{
                    "id": "Q1", "type": "question",
                    "domain": {"kind": "enum", "values": [{"code": 1, "text": "Yes"}, 2]}
                }],
                "edges": []
            }),
            json!({}),
        );
        let sidecar = coerce_to_schema_lossless(&mut doc);
        assert_eq!(doc.survey_dag.graph.nodes[0].domain.values, vec![json!(1), json!(2)]);
        assert_eq!(sidecar.domain_value_maps["Q1"][0].text, "Yes");
    }

    #[test]
    fn test_missing_start_and_terminal_stubbed() {
        let mut doc = final_doc(
            json!({
                "start": "INTRO",
                "terminals": ["END_COMPLETE"],
                "nodes": [{"id": "Q1", "type": "question"}],
                "edges": []
            }),
            json!({}),
        );
        coerce_to_schema_lossless(&mut doc);
        let g = &doc.survey_dag.graph;
        let intro = g.nodes.iter().find(|n| n.id == "INTRO").unwrap();
        assert_eq!(intro.kind, NodeKind::Junction);
        let end = g.nodes.iter().find(|n| n.id == "END_COMPLETE").unwrap();
        assert_eq!(end.kind, NodeKind::Terminal);
    }

    #[test]
    fn test_clean_document_yields_empty_sidecar() {
        let mut doc = final_doc(
            json!({
                "start": "Q1",
                "terminals": ["END_COMPLETE"],
                "nodes": [
                    {"id": "Q1", "type": "question", "domain": {"kind": "enum", "values": [1, 2]}},
                    {"id": "END_COMPLETE", "type": "terminal"}
                ],
                "edges": []
            }),
            json!({}),
        );
        let before = doc.clone();
        let sidecar = coerce_to_schema_lossless(&mut doc);
        assert!(sidecar.is_empty());
        assert_eq!(doc, before);
    }

    #[test]
    fn test_renames_flow_into_predicate_asts() {
        let mut doc = final_doc(
            json!({
                "start": "Q1",
                "terminals": [],
                "nodes": [{"id": "Q■5", "type": "question"}, {"id": "Q1", "type": "question"}],
                "edges": []
            }),
            json!({
                "P_A": {"ast": ["==", "Q■5", 2], "text": "Q■5 == 2",
                        "depends_on": ["Q■5"], "complexity": "simple"}
            }),
        );
        coerce_to_schema_lossless(&mut doc);
        let p = &doc.survey_dag.predicates["P_A"];
        assert_eq!(p.ast, json!(["==", "Q5", 2]));
        assert_eq!(p.depends_on, vec!["Q5"]);
        assert_eq!(p.complexity, Complexity::Simple);
    }
}
