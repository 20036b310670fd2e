//! Error types for the extraction pipeline

use surveydag_oracle::OracleError;
use thiserror::Error;

/// Errors that can occur while running extraction stages
#[derive(Error, Debug)]
pub enum ExtractError {
    /// An oracle call failed after exhausting retries
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// A pipeline worker task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    TaskJoin(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<tokio::task::JoinError> for ExtractError {
    fn from(e: tokio::task::JoinError) -> Self {
        ExtractError::TaskJoin(e.to_string())
    }
}
