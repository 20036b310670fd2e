//! Repair report and normalization sidecar

use crate::edge::StructureEdge;
use crate::node::RichRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Audit trail of every action the structural repairer and the sequential
/// fallback took. Nothing is dropped without a trace here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepairReport {
    /// Stub nodes synthesized because content proved the question exists
    #[serde(default)]
    pub added_nodes_from_content: Vec<String>,
    /// Edges dropped verbatim because neither endpoint could be healed
    #[serde(default)]
    pub dropped_edges_unknown_endpoints: Vec<StructureEdge>,
    /// Number of edge endpoints rewritten from a terminal alias
    #[serde(default)]
    pub rewired_terminal_edges: usize,
    /// Whether the canonical terminal node had to be synthesized
    #[serde(default)]
    pub ensured_terminal: bool,
    /// Number of edges injected by the sequential fallback (0 = not triggered)
    #[serde(default)]
    pub sequential_fallback_injected: usize,
}

impl RepairReport {
    /// Whether repair changed anything at all.
    pub fn is_noop(&self) -> bool {
        self.added_nodes_from_content.is_empty()
            && self.dropped_edges_unknown_endpoints.is_empty()
            && self.rewired_terminal_edges == 0
            && !self.ensured_terminal
            && self.sequential_fallback_injected == 0
    }
}

/// Round-trip recovery data written alongside the normalized graph.
///
/// Not schema-validated; every lossy-looking rewrite the schema-lossless
/// normalizer performs is recorded here so the rich pre-normalization form
/// can be reconstructed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sidecar {
    /// Old node id -> canonicalized id
    #[serde(default)]
    pub id_map: BTreeMap<String, String>,
    /// Node id -> rich `{code, text}` records its options were flattened from
    #[serde(default)]
    pub option_maps: BTreeMap<String, Vec<RichRecord>>,
    /// Node id -> rich records its domain values were flattened from
    #[serde(default)]
    pub domain_value_maps: BTreeMap<String, Vec<RichRecord>>,
}

impl Sidecar {
    /// Whether normalization was entirely lossless on its own.
    pub fn is_empty(&self) -> bool {
        self.id_map.is_empty() && self.option_maps.is_empty() && self.domain_value_maps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_report_is_noop() {
        assert!(RepairReport::default().is_noop());
    }

    #[test]
    fn test_report_with_drop_is_not_noop() {
        let mut report = RepairReport::default();
        report
            .dropped_edges_unknown_endpoints
            .push(StructureEdge::unconditional("GHOST", "Q2"));
        assert!(!report.is_noop());
    }

    #[test]
    fn test_sidecar_empty() {
        let mut sidecar = Sidecar::default();
        assert!(sidecar.is_empty());
        sidecar.id_map.insert("EMP■7".to_string(), "EMP7".to_string());
        assert!(!sidecar.is_empty());
    }
}
