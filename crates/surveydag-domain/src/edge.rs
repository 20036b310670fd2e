//! Edge shapes - directed, predicate-guarded transitions

use crate::predicate::P_TRUE;
use serde::{Deserialize, Serialize};

/// Edge classification in the final document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Default forward flow
    Fallthrough,
    /// Conditional routing
    Branch,
    /// Exit into a terminal
    Terminate,
}

/// Finer edge classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeSubkind {
    /// Plain question-to-question sequence
    Sequence,
    /// Printed skip instruction
    Skip,
    /// Transition between blocks
    BlockTrans,
    /// Exit to the canonical terminal
    TerminalExit,
}

/// An edge as it appears in structure documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureEdge {
    /// Source node id
    pub source: String,
    /// Target node id
    pub target: String,
    /// Guarding predicate id; unconditional flows use `P_TRUE`
    #[serde(default = "default_predicate")]
    pub predicate: String,
}

fn default_predicate() -> String {
    P_TRUE.to_string()
}

impl StructureEdge {
    /// Unconditional edge between two node ids.
    pub fn unconditional(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            predicate: P_TRUE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_predicate_defaults_to_tautology() {
        let edge: StructureEdge =
            serde_json::from_value(json!({"source": "Q1", "target": "Q2"})).unwrap();
        assert_eq!(edge.predicate, P_TRUE);
    }

    #[test]
    fn test_subkind_snake_case() {
        assert_eq!(
            serde_json::to_value(EdgeSubkind::TerminalExit).unwrap(),
            json!("terminal_exit")
        );
        assert_eq!(
            serde_json::to_value(EdgeSubkind::BlockTrans).unwrap(),
            json!("block_trans")
        );
    }
}
