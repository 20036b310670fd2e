//! Predicate definitions

use crate::ast;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Canonical id of the tautology predicate. Every predicate map the
/// pipeline emits contains it.
pub const P_TRUE: &str = "P_TRUE";

/// A predicate body as carried in structure documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateDef {
    /// Printed condition text, verbatim
    #[serde(default)]
    pub expr: String,
    /// Nested-list expression tree over prior answers
    #[serde(default = "ast::true_ast")]
    pub ast: Value,
    /// Node ids the AST references. Derived, not authoritative; the
    /// assembly recomputes it from `ast`.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl PredicateDef {
    /// The always-true predicate, `ast = ["TRUE"]`.
    pub fn tautology() -> Self {
        Self {
            expr: "Always true".to_string(),
            ast: json!(["TRUE"]),
            depends_on: Vec::new(),
        }
    }

    /// Recompute `depends_on` from the AST.
    pub fn recompute_dependencies(&mut self) {
        self.depends_on = ast::depends_on(&self.ast);
    }
}

impl Default for PredicateDef {
    fn default() -> Self {
        Self::tautology()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tautology_shape() {
        let p = PredicateDef::tautology();
        assert_eq!(p.ast, json!(["TRUE"]));
        assert!(p.depends_on.is_empty());
    }

    #[test]
    fn test_missing_ast_defaults_to_true() {
        let p: PredicateDef = serde_json::from_value(json!({"expr": "Q5 == 2"})).unwrap();
        assert_eq!(p.ast, json!(["TRUE"]));
    }

    #[test]
    fn test_recompute_dependencies() {
        let mut p: PredicateDef = serde_json::from_value(json!({
            "expr": "Q5 == 2 AND Q7 > 1",
            "ast": ["AND", ["==", "Q5", 2], [">", "Q7", 1]],
            "depends_on": ["STALE"]
        }))
        .unwrap();
        p.recompute_dependencies();
        assert_eq!(p.depends_on, vec!["Q5", "Q7"]);
    }
}
