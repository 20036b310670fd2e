//! Predicate AST helpers
//!
//! Predicates are nested JSON arrays of primitives, operator-first:
//! `["==", "Q5", 2]`, `["OR", ["==", "Q4", 1], ["==", "Q4", 2]]`.
//! These helpers derive the fields the data model marks as derived
//! (dependencies, complexity) so they are always recomputable from the AST.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;

/// Comparison operators whose first operand is a node id.
const COMPARISONS: [&str; 7] = ["==", "!=", ">", ">=", "<", "<=", "IN"];

/// Boolean combinators.
const COMBINATORS: [&str; 3] = ["AND", "OR", "NOT"];

/// The `["TRUE"]` tautology AST.
pub fn true_ast() -> Value {
    json!(["TRUE"])
}

/// Derived predicate complexity, classified by operator count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// `["TRUE"]` or `["FALSE"]`
    Trivial,
    /// At most one operator
    Simple,
    /// At most three operators
    Moderate,
    /// More than three operators
    Complex,
}

/// Node ids referenced by the AST, sorted and deduplicated.
pub fn depends_on(ast: &Value) -> Vec<String> {
    let mut deps = BTreeSet::new();
    collect_deps(ast, &mut deps);
    deps.into_iter().collect()
}

fn collect_deps(node: &Value, deps: &mut BTreeSet<String>) {
    let Some(items) = node.as_array() else { return };
    let op = items.first().and_then(Value::as_str);
    if let Some(op) = op {
        if COMPARISONS.contains(&op) {
            if let Some(var) = items.get(1).and_then(Value::as_str) {
                deps.insert(var.to_string());
            }
        }
    }
    for item in items.iter().skip(1) {
        collect_deps(item, deps);
    }
}

/// Classify an AST by counting its operators.
pub fn complexity(ast: &Value) -> Complexity {
    if matches!(ast.as_array().and_then(|a| a.first()).and_then(Value::as_str),
                Some("TRUE") | Some("FALSE"))
        && ast.as_array().map(|a| a.len()) == Some(1)
    {
        return Complexity::Trivial;
    }
    let ops = count_operators(ast);
    match ops {
        0 | 1 => Complexity::Simple,
        2 | 3 => Complexity::Moderate,
        _ => Complexity::Complex,
    }
}

fn count_operators(node: &Value) -> usize {
    let Some(items) = node.as_array() else { return 0 };
    let mut count = 0;
    if let Some(op) = items.first().and_then(Value::as_str) {
        if COMPARISONS.contains(&op) || COMBINATORS.contains(&op) {
            count += 1;
        }
    }
    for item in items.iter().skip(1) {
        count += count_operators(item);
    }
    count
}
