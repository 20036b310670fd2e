//! HTTP extraction backend
//!
//! Talks to a hosted extraction API that accepts a prompt and returns a
//! JSON array of tagged records. Responses wrapped in markdown code fences
//! are tolerated. Transient HTTP failures surface as retryable
//! [`OracleError`] variants; garbage payloads coerce to an empty record set
//! per the oracle contract.

use crate::prompt::build_prompt;
use crate::OracleError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use surveydag_domain::{ExtractionOracle, ExtractionRecord, OracleRequest};

/// Default request timeout (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// JSON-over-HTTP extraction oracle.
pub struct HttpOracle {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ExtractRequestBody<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct ExtractResponseBody {
    #[serde(default)]
    output: String,
}

impl HttpOracle {
    /// Create an oracle against an endpoint and model.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| OracleError::Other(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
            client,
        })
    }

    /// Attach a bearer token.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Async extraction call.
    pub async fn extract_records(
        &self,
        request: &OracleRequest,
    ) -> Result<Vec<ExtractionRecord>, OracleError> {
        let prompt = build_prompt(&request.task, &request.text);
        let body = ExtractRequestBody { model: &self.model, prompt: &prompt };

        let mut http = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        let response = http
            .send()
            .await
            .map_err(|e| OracleError::Communication(format!("request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(OracleError::RateLimited);
        }
        if status.is_server_error() {
            return Err(OracleError::Communication(format!("HTTP {status}")));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(OracleError::InvalidResponse(format!("HTTP {status}: {text}")));
        }

        let payload: ExtractResponseBody = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(format!("bad response body: {e}")))?;

        Ok(parse_records(&payload.output))
    }
}

/// Parse an oracle reply into records. Markdown fences are stripped;
/// anything that is not a JSON array of objects coerces to zero records -
/// a malformed reply is a content failure, never a pipeline failure.
pub fn parse_records(output: &str) -> Vec<ExtractionRecord> {
    let json_text = strip_fences(output);
    let Ok(value) = serde_json::from_str::<Value>(json_text) else {
        return Vec::new();
    };
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| serde_json::from_value::<ExtractionRecord>(item.clone()).ok())
        .filter(|record| !record.class.is_empty())
        .collect()
}

fn strip_fences(output: &str) -> &str {
    let trimmed = output.trim();
    if let Some(rest) = trimmed.strip_prefix("```json").or_else(|| trimmed.strip_prefix("```")) {
        rest.trim_start_matches(['\r', '\n'])
            .trim_end_matches('`')
            .trim()
    } else {
        trimmed
    }
}

impl ExtractionOracle for HttpOracle {
    type Error = OracleError;

    fn extract(&self, request: &OracleRequest) -> Result<Vec<ExtractionRecord>, Self::Error> {
        // Blocking wrapper; the pipeline runs oracle calls on its blocking
        // worker pool.
        tokio::runtime::Runtime::new()
            .map_err(|e| OracleError::Other(format!("runtime: {e}")))?
            .block_on(self.extract_records(request))
    }
}
