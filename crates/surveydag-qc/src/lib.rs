//! surveydag QC Layer
//!
//! Quality control over extraction output:
//! - the QC report: ten independent structural checks over a final
//!   document, with JSON and markdown renderings
//! - extraction quality metrics and the early quality gate that aborts a
//!   doomed run before the expensive skip-extraction stage
//! - strict JSON Schema validation of the persisted document
//!
//! The report is advisory and never fails; schema validation is the
//! pipeline's single hard-fail point.

#![warn(missing_docs)]

mod config;
mod error;
mod gate;
mod report;
mod schema;

pub use config::GateConfig;
pub use error::QcError;
pub use gate::{evaluate_gate, GateOutcome, QualityMetrics};
pub use report::{report, Issues, QcReport, Summary};
pub use schema::{default_schema, SchemaValidator};
