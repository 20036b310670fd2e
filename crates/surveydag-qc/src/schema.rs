//! Strict JSON Schema validation of the persisted document
//!
//! The bundled Draft-07 schema is the pipeline's single hard contract:
//! everything upstream degrades and repairs, this check either passes or
//! produces an [`QcError::InvalidArtifact`] carrying every violation.

use crate::QcError;
use jsonschema::{Draft, Validator};
use serde_json::Value;
use surveydag_domain::FinalDoc;
use tracing::debug;

/// The schema bundled with the crate.
const BUNDLED_SCHEMA: &str = include_str!("../schemas/survey_dag.schema.json");

/// The bundled strict schema as a JSON value.
pub fn default_schema() -> Value {
    serde_json::from_str(BUNDLED_SCHEMA).expect("bundled schema is valid JSON")
}

/// Compiled Draft-07 validator for final documents.
pub struct SchemaValidator {
    validator: Validator,
}

impl SchemaValidator {
    /// Compile a validator from a schema document.
    pub fn new(schema: &Value) -> Result<Self, QcError> {
        let validator = jsonschema::options()
            .with_draft(Draft::Draft7)
            .build(schema)
            .map_err(|e| QcError::Schema(e.to_string()))?;
        Ok(Self { validator })
    }

    /// Compile the bundled schema.
    pub fn bundled() -> Result<Self, QcError> {
        Self::new(&default_schema())
    }

    /// Validate a final document, collecting every violation.
    pub fn validate(&self, doc: &FinalDoc) -> Result<(), QcError> {
        let instance = serde_json::to_value(doc)?;
        self.validate_value(&instance)
    }

    /// Validate an already-serialized document.
    pub fn validate_value(&self, instance: &Value) -> Result<(), QcError> {
        let violations: Vec<String> = self
            .validator
            .iter_errors(instance)
            .map(|e| format!("{}: {}", e.instance_path, e))
            .collect();
        if violations.is_empty() {
            debug!("document passed strict schema validation");
            return Ok(());
        }
        let summary = violations
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join("; ");
        Err(QcError::InvalidArtifact { summary, violations })
    }
}
