//! The extract command - full staged pipeline over one source document.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use surveydag_assembly::{
    apply_sequential_fallback, merge_content_nodes, merge_to_core, normalize_predicates,
    reduce_structure_chunks, repair_structure_with_content,
};
use surveydag_domain::{
    BuildInfo, ContentDoc, ExtractionOracle, FinalDoc, StructureDoc, SurveyContent,
};
use surveydag_extract::{chunk_text_by_pages, paginate, ExtractConfig, StageRunner};
use surveydag_oracle::{OracleError, RateLimiter, RetryPolicy};
use surveydag_qc::{evaluate_gate, GateConfig, QcReport, SchemaValidator};

use crate::cli::ExtractArgs;

/// What a completed run produced. Returned for inspection; everything is
/// also on disk under the output directory.
pub struct ExtractOutcome {
    /// The final document, with its validation block filled
    pub dag: FinalDoc,
    /// The QC report over the final document
    pub qc: QcReport,
    /// Whether strict schema validation passed
    pub schema_ok: bool,
    /// Where the final document was written
    pub dag_path: PathBuf,
}

/// Run the staged extraction pipeline with the given oracle.
pub async fn run_extract<O>(args: &ExtractArgs, oracle: O) -> Result<ExtractOutcome>
where
    O: ExtractionOracle<Error = OracleError> + Send + Sync + 'static,
{
    let config = build_config(args)?;

    let outdir = &args.output_dir;
    let chunks_dir = outdir.join("chunks");
    fs::create_dir_all(&chunks_dir)
        .with_context(|| format!("creating output directory {}", chunks_dir.display()))?;

    let full_text = fs::read_to_string(&args.source)
        .with_context(|| format!("reading source {}", args.source.display()))?;
    let spans = paginate(&full_text);
    let windows = chunk_text_by_pages(&full_text, &spans, config.chunk_size, config.overlap);
    info!(pages = spans.len(), windows = windows.len(), "source loaded");

    let runner = StageRunner::new(
        oracle,
        RateLimiter::per_minute(args.calls_per_minute),
        RetryPolicy::default(),
        config,
    )?;

    // Stage 1: index
    let index = runner.index_stage(&windows).await?;
    write_json(&outdir.join("question_index.json"), &json!({ "question_index": index }))?;
    if index.is_empty() {
        bail!("no questions indexed from {}", args.source.display());
    }

    // Stage 2: content, one slice per question
    let content = runner.content_stage(&index, &full_text, &spans).await?;
    let content = ContentDoc {
        survey_content: SurveyContent {
            nodes: merge_content_nodes(content.survey_content.nodes),
        },
    };
    write_json(&outdir.join("content.json"), &content)?;

    // Stage 3: quality gate, before any skip-logic spend
    let gate_config = GateConfig { min_coverage: args.min_coverage, ..GateConfig::default() };
    let gate = evaluate_gate(&index, &content, &StructureDoc::default(), &gate_config);
    write_json(&outdir.join("quality.json"), &gate)?;
    for warning in &gate.warnings {
        warn!(%warning, "quality gate warning");
    }
    if !gate.passed {
        bail!(
            "quality gate failed (coverage {:.1}%, {} warnings); aborting before skip extraction",
            gate.metrics.content_coverage * 100.0,
            gate.warnings.len()
        );
    }

    // Stage 4: skip logic per window
    let struct_chunks = runner.skip_stage(&windows, &index).await?;
    for (idx, chunk) in &struct_chunks {
        write_json(&chunks_dir.join(format!("skips_chunk{idx:03}.json")), chunk)?;
    }
    let structure_raw = reduce_structure_chunks(struct_chunks);
    {
        let s = &structure_raw.survey_dag_structure;
        info!(
            nodes = s.nodes.len(),
            edges = s.edges.len(),
            predicates = s.predicates.len(),
            "skip chunks reduced"
        );
    }

    // Stage 5: repair, fallback, normalize, merge
    let (structure, mut repair) = repair_structure_with_content(structure_raw, &content);
    let mut structure = apply_sequential_fallback(structure, args.min_edge_ratio, &mut repair);
    normalize_predicates(&mut structure);
    write_json(&outdir.join("structure_repair.json"), &json!({ "repair": repair }))?;
    write_json(&outdir.join("structure.json"), &structure)?;

    let build = BuildInfo {
        extractor_version: env!("CARGO_PKG_VERSION").to_string(),
        extracted_at: unix_timestamp(),
        method: "staged".to_string(),
        source_format: "text".to_string(),
        run_id: Uuid::now_v7().to_string(),
        validation_passed: false,
    };
    let mut dag = merge_to_core(
        &structure.survey_dag_structure,
        &content,
        &full_text,
        &spans,
        build,
    );

    let sidecar = surveydag_assembly::coerce_to_schema_lossless(&mut dag);
    write_json(&outdir.join("sidecar.json"), &sidecar)?;

    // Validate, QC, fill the validation block, write the final document
    let validator = load_validator(args.schema.as_deref())?;
    dag.survey_dag
        .validation
        .gates
        .insert("quality_gate".to_string(), serde_json::to_value(&gate)?);

    let schema_result = validator.validate(&dag);
    let schema_ok = schema_result.is_ok();
    dag.survey_dag.metadata.build.validation_passed = schema_ok;
    dag.survey_dag.validation.status = if schema_ok { "PASS" } else { "FAIL" }.to_string();

    let qc = surveydag_qc::report(&dag);
    write_json(&outdir.join("dag_core.qc.json"), &qc)?;
    fs::write(outdir.join("dag_core.qc.md"), qc.render_markdown())?;

    let dag_path = match schema_result {
        Ok(()) => {
            let path = outdir.join("dag_core.json");
            write_json(&path, &dag)?;
            info!(path = %path.display(), "final DAG written");
            path
        }
        Err(err) => {
            let path = outdir.join("dag_core.invalid.json");
            write_json(&path, &json!({ "dag": dag, "validation_error": err.to_string() }))?;
            if args.strict {
                bail!("schema validation failed: {err}");
            }
            warn!(error = %err, path = %path.display(), "schema validation failed, diagnostic written");
            path
        }
    };

    if qc.is_clean() {
        info!("QC clean");
    } else {
        warn!(issues = qc.issue_count(), "QC found issues, see report");
    }

    Ok(ExtractOutcome { dag, qc, schema_ok, dag_path })
}

fn build_config(args: &ExtractArgs) -> Result<ExtractConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            ExtractConfig::from_toml(&text).map_err(|e| anyhow!(e))?
        }
        None => ExtractConfig::default(),
    };
    if let Some(v) = args.chunk_size {
        config.chunk_size = v;
    }
    if let Some(v) = args.overlap {
        config.overlap = v;
    }
    if let Some(v) = args.content_workers {
        config.content_workers = v;
    }
    if let Some(v) = args.skip_workers {
        config.skip_workers = v;
    }
    if let Some(v) = args.slice_before {
        config.slice_before = v;
    }
    if let Some(v) = args.slice_after {
        config.slice_after = v;
    }
    Ok(config)
}

pub(crate) fn load_validator(schema: Option<&Path>) -> Result<SchemaValidator> {
    match schema {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading schema {}", path.display()))?;
            let value = serde_json::from_str(&text)
                .with_context(|| format!("parsing schema {}", path.display()))?;
            Ok(SchemaValidator::new(&value)?)
        }
        None => Ok(SchemaValidator::bundled()?),
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn unix_timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_default()
}
