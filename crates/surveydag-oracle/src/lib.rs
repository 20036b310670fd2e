//! surveydag Oracle Layer
//!
//! Pluggable implementations of the `ExtractionOracle` trait from
//! `surveydag-domain`, plus the retry and rate-limit plumbing every
//! implementation shares.
//!
//! # Providers
//!
//! - `MockOracle`: deterministic mock for testing
//! - `HttpOracle`: JSON-over-HTTP extraction backend
//!
//! # Examples
//!
//! ```
//! use surveydag_oracle::MockOracle;
//! use surveydag_domain::{ExtractionOracle, OracleRequest, OracleTask};
//!
//! let oracle = MockOracle::empty();
//! let request = OracleRequest {
//!     text: "Q1. Age? ____".to_string(),
//!     task: OracleTask::QuestionIndex { page_start: 1 },
//! };
//! assert!(oracle.extract(&request).unwrap().is_empty());
//! ```

#![warn(missing_docs)]

pub mod http;
pub mod limiter;
pub mod prompt;
pub mod retry;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use surveydag_domain::{ExtractionOracle, ExtractionRecord, OracleRequest};
use thiserror::Error;

pub use http::HttpOracle;
pub use limiter::RateLimiter;
pub use retry::RetryPolicy;

/// Errors that can occur during oracle operations
#[derive(Error, Debug)]
pub enum OracleError {
    /// Network or API communication error (transient, retryable)
    #[error("Communication error: {0}")]
    Communication(String),

    /// Rate limit reported by the backend (transient, retryable)
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Response that could not be parsed into records
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Retry budget exhausted; carries the final error
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Attempts made before giving up
        attempts: usize,
        /// Final error text
        last: String,
    },

    /// Generic error
    #[error("Oracle error: {0}")]
    Other(String),
}

impl OracleError {
    /// Whether a retry could plausibly change the outcome.
    pub fn is_transient(&self) -> bool {
        matches!(self, OracleError::Communication(_) | OracleError::RateLimited)
    }
}

/// Mock extraction oracle for deterministic testing
///
/// Returns pre-configured record sets keyed by window text, without making
/// any network calls. Unknown windows yield the default record set (empty
/// unless configured otherwise).
#[derive(Debug, Clone)]
pub struct MockOracle {
    default_records: Vec<ExtractionRecord>,
    responses: Arc<Mutex<HashMap<String, Vec<ExtractionRecord>>>>,
    errors: Arc<Mutex<HashMap<String, String>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockOracle {
    /// Mock that returns the given records for every window.
    pub fn new(default_records: Vec<ExtractionRecord>) -> Self {
        Self {
            default_records,
            responses: Arc::new(Mutex::new(HashMap::new())),
            errors: Arc::new(Mutex::new(HashMap::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Mock that returns zero records everywhere - a valid oracle result.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Route a specific window text to a specific record set.
    pub fn add_records(&mut self, window_text: impl Into<String>, records: Vec<ExtractionRecord>) {
        self.responses.lock().unwrap().insert(window_text.into(), records);
    }

    /// Route a specific window text to an error.
    pub fn add_error(&mut self, window_text: impl Into<String>, message: impl Into<String>) {
        self.errors.lock().unwrap().insert(window_text.into(), message.into());
    }

    /// Number of extract calls made so far.
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::empty()
    }
}

impl ExtractionOracle for MockOracle {
    type Error = OracleError;

    fn extract(&self, request: &OracleRequest) -> Result<Vec<ExtractionRecord>, Self::Error> {
        *self.call_count.lock().unwrap() += 1;

        if let Some(message) = self.errors.lock().unwrap().get(&request.text) {
            return Err(OracleError::Communication(message.clone()));
        }
        let responses = self.responses.lock().unwrap();
        Ok(responses
            .get(&request.text)
            .cloned()
            .unwrap_or_else(|| self.default_records.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use surveydag_domain::OracleTask;

    fn index_request(text: &str) -> OracleRequest {
        OracleRequest {
            text: text.to_string(),
            task: OracleTask::QuestionIndex { page_start: 1 },
        }
    }

    fn record(class: &str) -> ExtractionRecord {
        ExtractionRecord {
            class: class.to_string(),
            text: String::new(),
            attributes: json!({}),
        }
    }

    #[test]
    fn test_mock_default_records() {
        let oracle = MockOracle::new(vec![record("question_index")]);
        let records = oracle.extract(&index_request("anything")).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_mock_routed_records() {
        let mut oracle = MockOracle::empty();
        oracle.add_records("window A", vec![record("question_index"), record("question_index")]);

        assert_eq!(oracle.extract(&index_request("window A")).unwrap().len(), 2);
        assert!(oracle.extract(&index_request("window B")).unwrap().is_empty());
    }

    #[test]
    fn test_mock_call_count_shared_across_clones() {
        let oracle = MockOracle::empty();
        let clone = oracle.clone();
        oracle.extract(&index_request("w")).unwrap();
        clone.extract(&index_request("w")).unwrap();
        assert_eq!(oracle.call_count(), 2);
    }

    #[test]
    fn test_mock_error_routing() {
        let mut oracle = MockOracle::empty();
        oracle.add_error("bad window", "boom");
        let err = oracle.extract(&index_request("bad window")).unwrap_err();
        assert!(err.is_transient());
    }
}
