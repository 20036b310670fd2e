//! Trait definitions for external interactions
//!
//! The extraction oracle is the system's only external collaborator. Its
//! output is untrusted and unordered; the extract layer coerces it into the
//! typed candidates the rest of the pipeline operates on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record classes the oracle may emit.
pub mod record_class {
    /// A node candidate from the structure pass
    pub const STRUCTURE_NODE: &str = "structure_node";
    /// An edge candidate from the skip pass
    pub const STRUCTURE_EDGE: &str = "structure_edge";
    /// A predicate candidate from the skip pass
    pub const STRUCTURE_PREDICATE: &str = "structure_predicate";
    /// A full question record from the content pass
    pub const QUESTION_CONTENT: &str = "question_content";
    /// An index record (id, short stem, page guess)
    pub const QUESTION_INDEX: &str = "question_index";
}

/// What a single oracle call is asked to find in its text window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleTask {
    /// Index question ids, short stems, and coarse pages
    QuestionIndex {
        /// Starting page of the window, reported back as `page_guess`
        page_start: usize,
    },
    /// Extract the full content of exactly one question
    QuestionContent {
        /// The question id the call targets
        target_id: String,
    },
    /// Extract explicit skip/branch logic (edges + predicates)
    SkipLogic,
}

/// A single extraction call: a bounded text window plus the task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRequest {
    /// The text window submitted to the oracle
    pub text: String,
    /// What to extract from it
    pub task: OracleTask,
}

/// One untrusted candidate record returned by the oracle.
///
/// `attributes` is left as raw JSON on purpose: the coercion layer in the
/// extract crate maps it into typed candidates, defaulting missing fields
/// and rejecting unknown shapes, so downstream code never sees raw records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    /// Record class tag (see [`record_class`])
    #[serde(default, alias = "extraction_class")]
    pub class: String,
    /// Verbatim source span backing the record, when the oracle found one
    #[serde(default, alias = "extraction_text")]
    pub text: String,
    /// Loosely-typed attribute map
    #[serde(default)]
    pub attributes: Value,
}

/// Trait for extraction oracle operations.
///
/// Implemented by the infrastructure layer (surveydag-oracle). The call is
/// synchronous; the pipeline bridges it onto its worker pool. Zero records
/// is a valid result - a window may simply contain nothing of interest.
pub trait ExtractionOracle {
    /// Error type for oracle operations
    type Error;

    /// Run one extraction call over a text window.
    fn extract(&self, request: &OracleRequest) -> Result<Vec<ExtractionRecord>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_accepts_oracle_field_names() {
        // Oracles emit langextract-style field names
        let rec: ExtractionRecord = serde_json::from_value(json!({
            "extraction_class": "question_index",
            "extraction_text": "Q1. Age?",
            "attributes": {"id": "Q1", "short_text": "Q1. Age?"}
        }))
        .unwrap();
        assert_eq!(rec.class, record_class::QUESTION_INDEX);
        assert_eq!(rec.text, "Q1. Age?");
    }

    #[test]
    fn test_record_tolerates_missing_fields() {
        let rec: ExtractionRecord = serde_json::from_value(json!({})).unwrap();
        assert!(rec.class.is_empty());
        assert!(rec.attributes.is_null());
    }
}
