//! The qc command - schema-validate and report on an existing DAG document.

use std::fs;

use anyhow::{bail, Context, Result};
use surveydag_domain::FinalDoc;
use surveydag_qc::QcReport;
use tracing::warn;

use crate::cli::QcArgs;
use crate::commands::extract::load_validator;

/// Load a DAG document, run schema validation and the QC report, and print
/// the markdown rendering. Returns the report for inspection.
pub fn run_qc(args: &QcArgs) -> Result<QcReport> {
    let text = fs::read_to_string(&args.dag)
        .with_context(|| format!("reading {}", args.dag.display()))?;
    let dag: FinalDoc = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", args.dag.display()))?;

    let validator = load_validator(args.schema.as_deref())?;
    let schema_ok = match validator.validate(&dag) {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "schema validation failed");
            false
        }
    };

    let report = surveydag_qc::report(&dag);
    println!("{}", report.render_markdown());

    if args.strict && (!schema_ok || !report.is_clean()) {
        bail!(
            "qc failed: schema {} / {} issues",
            if schema_ok { "ok" } else { "invalid" },
            report.issue_count()
        );
    }
    Ok(report)
}
