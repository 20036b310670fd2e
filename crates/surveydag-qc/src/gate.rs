//! Extraction quality metrics and the early quality gate
//!
//! The gate runs after content extraction and before skip extraction so a
//! run whose content pass clearly failed does not burn oracle calls on
//! predicates it cannot anchor.

use crate::GateConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use surveydag_domain::{is_terminal_alias, ContentDoc, QuestionIndexEntry, StructureDoc,
                       CANON_TERMINAL};
use tracing::{info, warn};

/// Coverage metrics of an extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Questions found by the index pass
    pub indexed_questions: usize,
    /// Questions with a content record
    pub content_nodes: usize,
    /// Distinct non-terminal node ids referenced by structure edges
    pub edge_referenced_ids: usize,
    /// Fraction of indexed questions with content (1.0 when nothing indexed)
    pub content_coverage: f64,
    /// Fraction of edge-referenced ids with content (1.0 when no edges)
    pub edge_coverage: f64,
}

/// Gate decision with the evidence behind it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateOutcome {
    /// Computed metrics
    pub metrics: QualityMetrics,
    /// Accumulated warnings
    pub warnings: Vec<String>,
    /// Whether the pipeline may continue
    pub passed: bool,
}

/// Compute metrics and decide whether the run may continue.
///
/// The gate fails when content coverage drops below `min_coverage` or the
/// warning count exceeds `max_warnings`.
pub fn evaluate_gate(
    index: &[QuestionIndexEntry],
    content: &ContentDoc,
    structure: &StructureDoc,
    config: &GateConfig,
) -> GateOutcome {
    let content_ids = content.id_set();
    let index_ids: BTreeSet<&str> = index.iter().map(|e| e.id.as_str()).collect();

    let covered = index_ids
        .iter()
        .filter(|id| content_ids.contains(**id))
        .count();
    let content_coverage = if index_ids.is_empty() {
        1.0
    } else {
        covered as f64 / index_ids.len() as f64
    };

    let edge_refs: BTreeSet<&str> = structure
        .survey_dag_structure
        .edges
        .iter()
        .flat_map(|e| [e.source.as_str(), e.target.as_str()])
        .filter(|id| *id != CANON_TERMINAL && !is_terminal_alias(id))
        .collect();
    let edge_covered = edge_refs
        .iter()
        .filter(|id| content_ids.contains(**id))
        .count();
    let edge_coverage = if edge_refs.is_empty() {
        1.0
    } else {
        edge_covered as f64 / edge_refs.len() as f64
    };

    let mut warnings = Vec::new();
    if content_coverage < config.warn_coverage {
        warnings.push(format!(
            "content coverage {:.0}% below {:.0}%",
            content_coverage * 100.0,
            config.warn_coverage * 100.0
        ));
    }
    if edge_coverage < config.warn_edge_coverage {
        warnings.push(format!(
            "edge coverage {:.0}% below {:.0}%",
            edge_coverage * 100.0,
            config.warn_edge_coverage * 100.0
        ));
    }
    let near_empty: Vec<&str> = content
        .survey_content
        .nodes
        .iter()
        .filter(|n| n.text.trim().chars().count() < config.min_text_chars)
        .map(|n| n.id.as_str())
        .collect();
    if !near_empty.is_empty() {
        // one aggregate warning, listing at most five offenders
        warnings.push(format!(
            "near-empty content text for {} questions: {:?}",
            near_empty.len(),
            &near_empty[..near_empty.len().min(5)]
        ));
    }
    for node in &content.survey_content.nodes {
        let options = node.response_options.as_ref().map_or(0, Vec::len);
        if options > config.max_options {
            warnings.push(format!("{} has {} options", node.id, options));
        }
    }

    let passed = content_coverage >= config.min_coverage && warnings.len() <= config.max_warnings;
    let metrics = QualityMetrics {
        indexed_questions: index_ids.len(),
        content_nodes: content_ids.len(),
        edge_referenced_ids: edge_refs.len(),
        content_coverage,
        edge_coverage,
    };
    if passed {
        info!(
            coverage = format!("{:.2}", content_coverage),
            warnings = warnings.len(),
            "quality gate passed"
        );
    } else {
        warn!(
            coverage = format!("{:.2}", content_coverage),
            warnings = warnings.len(),
            "quality gate failed"
        );
    }
    GateOutcome { metrics, warnings, passed }
}
