//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// surveydag - extract a routing DAG from a questionnaire document.
#[derive(Debug, Parser)]
#[command(name = "surveydag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log filter, e.g. `info` or `surveydag=debug`
    #[arg(long, global = true, default_value = "info")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the staged extraction pipeline over a source document
    Extract(ExtractArgs),

    /// Validate and QC an already-built DAG document
    Qc(QcArgs),
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Source document (plain text, form-feed page breaks)
    #[arg(short, long)]
    pub source: PathBuf,

    /// Directory for all run artifacts
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Extraction backend endpoint URL
    #[arg(long, env = "SURVEYDAG_ENDPOINT")]
    pub endpoint: String,

    /// Model identifier passed to the backend
    #[arg(short, long, default_value = "gpt-5-mini")]
    pub model: String,

    /// Bearer token for the backend
    #[arg(long, env = "SURVEYDAG_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Pipeline configuration TOML; CLI flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Pages per skip-logic window
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Pages of overlap between consecutive windows
    #[arg(long)]
    pub overlap: Option<usize>,

    /// Concurrent workers for content extraction
    #[arg(long)]
    pub content_workers: Option<usize>,

    /// Concurrent workers for skip extraction
    #[arg(long)]
    pub skip_workers: Option<usize>,

    /// Characters kept before a question anchor in its slice
    #[arg(long)]
    pub slice_before: Option<usize>,

    /// Characters kept after a question anchor in its slice
    #[arg(long)]
    pub slice_after: Option<usize>,

    /// Oracle call budget per minute
    #[arg(long, default_value_t = 60)]
    pub calls_per_minute: u32,

    /// Minimum edges-per-question ratio before sequential fallback kicks in
    #[arg(long, default_value_t = 0.05)]
    pub min_edge_ratio: f64,

    /// Minimum content coverage required by the quality gate
    #[arg(long, default_value_t = 0.7)]
    pub min_coverage: f64,

    /// Schema file overriding the bundled one
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Abort with a non-zero exit when schema validation fails
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the qc command.
#[derive(Debug, Parser)]
pub struct QcArgs {
    /// DAG document to check
    pub dag: PathBuf,

    /// Schema file overriding the bundled one
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Exit non-zero when the report has issues
    #[arg(long)]
    pub strict: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_command_parses() {
        let cli = Cli::parse_from([
            "surveydag",
            "extract",
            "--source",
            "survey.txt",
            "--endpoint",
            "http://localhost:8080/extract",
            "--chunk-size",
            "6",
            "--strict",
        ]);
        match cli.command {
            Command::Extract(args) => {
                assert_eq!(args.chunk_size, Some(6));
                assert!(args.overlap.is_none());
                assert!(args.strict);
            }
            _ => panic!("expected extract command"),
        }
    }

    #[test]
    fn test_qc_command_parses() {
        let cli = Cli::parse_from(["surveydag", "qc", "dag_core.json"]);
        match cli.command {
            Command::Qc(args) => {
                assert_eq!(args.dag, PathBuf::from("dag_core.json"));
                assert!(!args.strict);
            }
            _ => panic!("expected qc command"),
        }
    }
}
