//! Sequential fallback - a safety net for structure passes that found
//! questions but almost no routing
//!
//! A structure document with many nodes and nearly no edges is a stronger
//! signal of extraction failure than of a genuinely edge-free survey. When
//! triggered, questions are chained in document order with unconditional
//! edges, ending in a hop to the canonical terminal. Chaining in list
//! order over distinct nodes cannot create a cycle.

use std::collections::BTreeSet;
use surveydag_domain::{NodeKind, RepairReport, StructureDoc, StructureEdge, CANON_TERMINAL};
use tracing::warn;

/// Whether the edge count is below the trigger threshold
/// `max(1, ceil(min_ratio * question_count))`.
///
/// The denominator counts question nodes only: terminal and junction stubs
/// carry no routing of their own, so a terminal-heavy document does not get
/// a padded denominator that hides missing edges.
pub fn needs_sequential_fallback(doc: &StructureDoc, min_ratio: f64) -> bool {
    let s = &doc.survey_dag_structure;
    let questions = s
        .nodes
        .iter()
        .filter(|n| n.kind == NodeKind::Question)
        .count();
    if questions == 0 {
        return false;
    }
    let threshold = ((min_ratio * questions as f64).ceil() as usize).max(1);
    s.edges.len() < threshold
}

/// Inject sequence edges when [`needs_sequential_fallback`] fires.
///
/// Question nodes are chained in node-list order; a final unconditional
/// edge into the canonical terminal is added when that node exists. Edges
/// whose `(source, target)` pair already exists are not duplicated. The
/// report's `sequential_fallback_injected` counts what was added.
pub fn apply_sequential_fallback(
    doc: StructureDoc,
    min_ratio: f64,
    report: &mut RepairReport,
) -> StructureDoc {
    if !needs_sequential_fallback(&doc, min_ratio) {
        return doc;
    }
    let mut s = doc.survey_dag_structure;

    let existing: BTreeSet<(String, String)> = s
        .edges
        .iter()
        .map(|e| (e.source.clone(), e.target.clone()))
        .collect();
    let questions: Vec<String> = s
        .nodes
        .iter()
        .filter(|n| n.kind == NodeKind::Question)
        .map(|n| n.id.clone())
        .collect();
    let has_terminal = s.nodes.iter().any(|n| n.id == CANON_TERMINAL);

    let mut injected = 0usize;
    for pair in questions.windows(2) {
        let (src, dst) = (&pair[0], &pair[1]);
        if src != dst && !existing.contains(&(src.clone(), dst.clone())) {
            s.edges.push(StructureEdge::unconditional(src.clone(), dst.clone()));
            injected += 1;
        }
    }
    if has_terminal {
        if let Some(last) = questions.last() {
            if !existing.contains(&(last.clone(), CANON_TERMINAL.to_string())) {
                s.edges
                    .push(StructureEdge::unconditional(last.clone(), CANON_TERMINAL));
                injected += 1;
            }
        }
    }

    warn!(
        injected,
        questions = questions.len(),
        "edge count below threshold, sequential fallback applied"
    );
    report.sequential_fallback_injected = injected;
    StructureDoc { survey_dag_structure: s }
}
