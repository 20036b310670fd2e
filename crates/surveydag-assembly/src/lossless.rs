//! Lossless content merge - no fact from any pass is discarded
//!
//! Unlike the chunk reducer's whole-list heuristic, this merger unions
//! candidate records for the same question at the option level: an option
//! present in any pass survives, keyed by `(code-or-text, lowercased text)`.
//! Used when the content stage re-extracts a question (tightened slice,
//! safety pass) and both records carry partial truth.

use std::collections::{BTreeMap, BTreeSet};
use surveydag_domain::{ContentNode, ResponseOption, ResponseType};
use tracing::debug;

/// Rank for picking the base record among candidates; lower is better.
/// Enum beats set beats number beats boolean beats text beats untyped.
fn rank(rt: Option<ResponseType>) -> u8 {
    match rt {
        Some(ResponseType::Enum) => 0,
        Some(ResponseType::Set) => 1,
        Some(ResponseType::Number) => 2,
        Some(ResponseType::Boolean) => 3,
        Some(ResponseType::Text) => 4,
        None => 5,
    }
}

/// Merge content candidates losslessly. Output is one record per question
/// id, sorted ascending by id.
///
/// Per id: the lowest-rank candidate (first seen on ties) becomes the base;
/// its text is replaced by the longest text among candidates (first seen on
/// ties); options are
/// the true union over all candidates in first-appearance order; a missing
/// universe is filled forward from any candidate that has one; provenance
/// maps are unioned with earlier candidates winning on key conflicts.
pub fn merge_content_nodes(candidates: Vec<ContentNode>) -> Vec<ContentNode> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: BTreeMap<String, Vec<ContentNode>> = BTreeMap::new();
    for node in candidates {
        if node.id.is_empty() {
            continue;
        }
        if !groups.contains_key(&node.id) {
            order.push(node.id.clone());
        }
        groups.entry(node.id.clone()).or_default().push(node);
    }

    let mut merged: Vec<ContentNode> = Vec::new();
    for id in order {
        let group = groups.remove(&id).unwrap_or_default();
        merged.push(merge_group(group));
    }
    merged.sort_by(|a, b| a.id.cmp(&b.id));
    debug!(questions = merged.len(), "content candidates merged");
    merged
}

fn merge_group(group: Vec<ContentNode>) -> ContentNode {
    let base_idx = group
        .iter()
        .enumerate()
        .min_by_key(|(i, n)| (rank(n.response_type), *i))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let mut out = group[base_idx].clone();

    // longest text among all candidates; first seen wins on equal lengths
    if let Some(best) = group
        .iter()
        .map(|n| &n.text)
        .reduce(|cur, t| if t.len() > cur.len() { t } else { cur })
    {
        out.text = best.clone();
    }

    // true option union in first-appearance order
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
    let mut union: Vec<ResponseOption> = Vec::new();
    for node in &group {
        for opt in node.response_options.iter().flatten() {
            if seen.insert(opt.dedupe_key()) {
                union.push(opt.clone());
            }
        }
    }
    if !union.is_empty() {
        out.response_options = Some(union);
    }

    // fill-forward universe from the first candidate that has one
    if out.universe.is_none() {
        out.universe = group.iter().find_map(|n| n.universe.clone());
    }
    if out.universe_ast.is_none() {
        out.universe_ast = group.iter().find_map(|n| n.universe_ast.clone());
    }

    // provenance union, earlier candidates win on conflicts
    let mut provenance: BTreeMap<String, serde_json::Value> = BTreeMap::new();
    for node in &group {
        for (k, v) in node.provenance.iter().flatten() {
            provenance.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
    if !provenance.is_empty() {
        out.provenance = Some(provenance);
    }
    out
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn arb_candidate() -> impl Strategy<Value = ContentNode> {
        (
            "Q[1-3]",
            "[a-z ]{0,40}",
            proptest::collection::vec((1..9i64, "[A-Za-z]{1,8}"), 0..5),
        )
            .prop_map(|(id, text, opts)| {
                let options: Vec<_> = opts
                    .iter()
                    .map(|(code, label)| json!({"code": code, "text": label}))
                    .collect();
                serde_json::from_value(json!({
                    "id": id,
                    "text": text,
                    "response_type": if options.is_empty() { "text" } else { "enum" },
                    "response_options": options
                }))
                .unwrap()
            })
    }

    proptest! {
        /// Property: every distinct option from any candidate survives the merge
        #[test]
        fn test_no_option_is_lost(
            candidates in proptest::collection::vec(arb_candidate(), 1..6)
        ) {
            let input_keys: std::collections::BTreeSet<_> = candidates
                .iter()
                .flat_map(|c| c.response_options.iter().flatten().map(|o| o.dedupe_key()))
                .collect();
            let merged = merge_content_nodes(candidates);
            let output_keys: std::collections::BTreeSet<_> = merged
                .iter()
                .flat_map(|c| c.response_options.iter().flatten().map(|o| o.dedupe_key()))
                .collect();
            for key in input_keys {
                prop_assert!(output_keys.contains(&key), "option {:?} lost in merge", key);
            }
        }

        /// Property: merging merged output changes nothing
        #[test]
        fn test_merge_idempotent(
            candidates in proptest::collection::vec(arb_candidate(), 1..6)
        ) {
            let once = merge_content_nodes(candidates);
            let twice = merge_content_nodes(once.clone());
            prop_assert_eq!(once, twice);
        }
    }
}
