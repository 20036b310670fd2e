//! Core merge - combine repaired structure and merged content into the
//! final document
//!
//! Structure supplies ordering, routing, and predicates; content supplies
//! question text and response domains. The output is the pre-normalization
//! final document: rich options are still attached to nodes (the
//! schema-lossless pass flattens them) and validation is unfilled.

use std::collections::BTreeMap;
use surveydag_domain::{
    ast, page_for_offset, BuildInfo, ContentDoc, ContentNode, CoreEdge, CoreGraph, CoreNode,
    CorePredicate, DomainSpec, EdgeKind, EdgeSubkind, FinalDoc, Locator, Metadata, NodeKind,
    NodeMetadata, PageSpan, Provenance, ResponseType, Structure, SurveyDag, CANON_TERMINAL,
    P_TRUE,
};
use tracing::debug;

/// Snippet length used to locate a question's page in the source text.
const LOCATOR_SNIPPET_CHARS: usize = 120;

/// Build the final document from repaired structure and merged content.
///
/// Nodes come out in structure order (`order_index` ascending) followed by
/// content-only questions the structure never routed to. Edge ids are
/// `E_<10-digit ordinal>` in emission order. A terminal node and a closing
/// edge into it are appended when the structure left the graph without
/// either.
pub fn merge_to_core(
    structure: &Structure,
    content: &ContentDoc,
    full_text: &str,
    pages: &[PageSpan],
    build: BuildInfo,
) -> FinalDoc {
    let by_id: BTreeMap<&str, &ContentNode> = content
        .survey_content
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n))
        .collect();

    let mut nodes: Vec<CoreNode> = Vec::with_capacity(structure.nodes.len());
    for (order_index, snode) in structure.nodes.iter().enumerate() {
        let cnode = by_id.get(snode.id.as_str()).copied();
        nodes.push(build_node(
            &snode.id,
            snode.kind,
            order_index,
            snode.block.clone(),
            snode.response_type,
            cnode,
            full_text,
            pages,
            build.method.clone(),
        ));
    }

    // content-only questions the structure never routed to
    let structure_ids = structure.node_id_set();
    let mut order_index = nodes.len();
    for cnode in &content.survey_content.nodes {
        if cnode.id.is_empty() || structure_ids.contains(&cnode.id) {
            continue;
        }
        nodes.push(build_node(
            &cnode.id,
            NodeKind::Question,
            order_index,
            None,
            None,
            Some(cnode),
            full_text,
            pages,
            build.method.clone(),
        ));
        order_index += 1;
    }

    let blocks: BTreeMap<&str, Option<&str>> = structure
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n.block.as_deref()))
        .collect();

    let mut edges: Vec<CoreEdge> = Vec::with_capacity(structure.edges.len());
    for sedge in &structure.edges {
        let (kind, subkind) = classify_edge(&sedge.source, &sedge.target, &sedge.predicate, &blocks);
        edges.push(CoreEdge {
            id: edge_id(edges.len()),
            source: sedge.source.clone(),
            target: sedge.target.clone(),
            predicate: sedge.predicate.clone(),
            kind,
            subkind,
            priority: 0,
        });
    }
    demote_defaults_behind_branches(&mut edges);

    // a graph with questions must end somewhere
    if !nodes.iter().any(|n| n.id == CANON_TERMINAL) {
        let idx = nodes.len();
        nodes.push(CoreNode::terminal(CANON_TERMINAL, idx));
    }
    if !edges.iter().any(|e| e.target == CANON_TERMINAL) {
        if let Some(last) = nodes
            .iter()
            .rev()
            .find(|n| n.kind == NodeKind::Question)
        {
            edges.push(CoreEdge {
                id: edge_id(edges.len()),
                source: last.id.clone(),
                target: CANON_TERMINAL.to_string(),
                predicate: P_TRUE.to_string(),
                kind: EdgeKind::Terminate,
                subkind: EdgeSubkind::TerminalExit,
                priority: 0,
            });
        }
    }

    let mut predicates: BTreeMap<String, CorePredicate> = BTreeMap::new();
    for (id, body) in &structure.predicates {
        predicates.insert(
            id.clone(),
            CorePredicate {
                ast: body.ast.clone(),
                text: body.expr.clone(),
                depends_on: ast::depends_on(&body.ast),
                complexity: ast::complexity(&body.ast),
            },
        );
    }

    let start = structure
        .start
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| nodes.first().map(|n| n.id.clone()))
        .unwrap_or_default();

    debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        predicates = predicates.len(),
        "structure and content merged"
    );

    FinalDoc {
        survey_dag: SurveyDag {
            metadata: Metadata {
                id: structure.id.clone().unwrap_or_else(|| "survey".to_string()),
                title: None,
                version: structure.version.clone().unwrap_or_else(|| "1.0".to_string()),
                build,
            },
            graph: CoreGraph {
                start,
                terminals: vec![CANON_TERMINAL.to_string()],
                nodes,
                edges,
            },
            predicates,
            validation: Default::default(),
            analysis: serde_json::json!({}),
        },
    }
}

fn edge_id(ordinal: usize) -> String {
    format!("E_{:010}", ordinal + 1)
}

#[allow(clippy::too_many_arguments)]
fn build_node(
    id: &str,
    kind: NodeKind,
    order_index: usize,
    block: Option<String>,
    structure_type: Option<ResponseType>,
    content: Option<&ContentNode>,
    full_text: &str,
    pages: &[PageSpan],
    method: String,
) -> CoreNode {
    let text = content.map(|c| c.text.clone()).unwrap_or_default();
    let response_type = content
        .and_then(|c| c.response_type)
        .or(structure_type)
        .unwrap_or(ResponseType::Text);
    let response_options = content.and_then(|c| c.response_options.clone());

    let mut annotations = Vec::new();
    if let Some(labels) = labels_annotation(response_options.as_deref()) {
        annotations.push(labels);
    }

    let mut locators = Vec::new();
    if let Some(page) = page_for_text(&text, full_text, pages) {
        locators.push(Locator { kind: "page".to_string(), value: page.to_string() });
    }
    let provenance = (!method.is_empty()).then(|| Provenance { method, locators });

    CoreNode {
        id: id.to_string(),
        kind,
        order_index,
        block,
        domain: DomainSpec { kind: response_type, values: Vec::new() },
        response_options,
        metadata: NodeMetadata { text, required: false },
        annotations,
        provenance,
    }
}

/// `labels: 1=Yes; 2=No` built from options that carry both code and text.
fn labels_annotation(options: Option<&[surveydag_domain::ResponseOption]>) -> Option<String> {
    let options = options?;
    let pairs: Vec<String> = options
        .iter()
        .filter_map(|o| match o {
            surveydag_domain::ResponseOption::Rich {
                code: Some(code),
                text: Some(text),
            } => Some(format!("{}={}", code.key(), text.trim())),
            _ => None,
        })
        .collect();
    if pairs.is_empty() {
        None
    } else {
        Some(format!("labels: {}", pairs.join("; ")))
    }
}

/// Page containing the question stem, found by locating a stem prefix in
/// the source text.
fn page_for_text(text: &str, full_text: &str, pages: &[PageSpan]) -> Option<usize> {
    if text.is_empty() || pages.is_empty() {
        return None;
    }
    let snippet: String = text.chars().take(LOCATOR_SNIPPET_CHARS).collect();
    let offset = full_text.find(snippet.trim())?;
    page_for_offset(pages, offset)
}

fn classify_edge(
    source: &str,
    target: &str,
    predicate: &str,
    blocks: &BTreeMap<&str, Option<&str>>,
) -> (EdgeKind, EdgeSubkind) {
    if target == CANON_TERMINAL {
        return (EdgeKind::Terminate, EdgeSubkind::TerminalExit);
    }
    if predicate == P_TRUE {
        return (EdgeKind::Fallthrough, EdgeSubkind::Sequence);
    }
    let source_block = blocks.get(source).copied().flatten();
    let target_block = blocks.get(target).copied().flatten();
    match (source_block, target_block) {
        (Some(a), Some(b)) if a != b => (EdgeKind::Branch, EdgeSubkind::BlockTrans),
        _ => (EdgeKind::Branch, EdgeSubkind::Skip),
    }
}

/// When a source has conditional outgoing edges, its unconditional edge is
/// the fallback and must lose the lower-priority-wins tie-break.
fn demote_defaults_behind_branches(edges: &mut [CoreEdge]) {
    let conditional_sources: std::collections::BTreeSet<String> = edges
        .iter()
        .filter(|e| e.predicate != P_TRUE)
        .map(|e| e.source.clone())
        .collect();
    for edge in edges.iter_mut() {
        if edge.predicate == P_TRUE && conditional_sources.contains(&edge.source) {
            edge.priority = 1;
        }
    }
}
