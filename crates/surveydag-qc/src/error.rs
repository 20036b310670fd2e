//! QC error types

use thiserror::Error;

/// Errors that can occur during QC operations
#[derive(Error, Debug)]
pub enum QcError {
    /// The schema document itself could not be compiled
    #[error("Schema error: {0}")]
    Schema(String),

    /// The final document failed strict schema validation
    #[error("Document failed schema validation: {summary}")]
    InvalidArtifact {
        /// One-line summary of the first violations
        summary: String,
        /// All violation messages, in document order
        violations: Vec<String>,
    },

    /// Serialization error while preparing a document for validation
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
