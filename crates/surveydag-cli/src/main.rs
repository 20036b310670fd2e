//! surveydag CLI - extract and QC survey routing DAGs.

use clap::Parser;
use surveydag_cli::{commands, Cli, Command};
use surveydag_oracle::HttpOracle;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log.clone())),
        )
        .init();

    match cli.command {
        Command::Extract(args) => {
            let mut oracle = HttpOracle::new(&args.endpoint, &args.model)?;
            if let Some(key) = &args.api_key {
                oracle = oracle.with_api_key(key);
            }
            commands::run_extract(&args, oracle).await?;
        }
        Command::Qc(args) => {
            commands::run_qc(&args)?;
        }
    }
    Ok(())
}
