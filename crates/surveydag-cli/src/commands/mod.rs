//! Command implementations.

pub mod extract;
pub mod qc;

pub use extract::{run_extract, ExtractOutcome};
pub use qc::run_qc;
