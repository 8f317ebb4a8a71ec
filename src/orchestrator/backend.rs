//! Where the orchestrator sends comparisons and reads history from.

use serde::Deserialize;
use serde_json::Value;

use crate::{
    catalog::DatasetId,
    errors::{ApiError, ErrorCode},
    http_client::{self, HttpError},
    store::HistoryEntry,
};

use super::{request::CompareRequest, result::CompareResult};

const MAX_HISTORY_BYTES: usize = 8 * 1024 * 1024;
const MAX_COMPARE_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The server answered with a structured error body.
    #[error("{0}")]
    Api(ApiError),
    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },
    #[error("HTTP error: {0}")]
    Transport(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<HttpError> for BackendError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Transport(message) => Self::Transport(message),
            other => Self::InvalidResponse(other.to_string()),
        }
    }
}

impl BackendError {
    /// Structured form shown to the user.
    pub fn into_api_error(self) -> ApiError {
        match self {
            Self::Api(err) => err,
            other => ApiError::new(ErrorCode::UnknownError, other.to_string()),
        }
    }
}

/// Operations the orchestrator needs from the panel server.
pub trait CompareBackend {
    fn history(&self, dataset: DatasetId) -> Result<Vec<HistoryEntry>, BackendError>;
    fn compare(&self, request: &CompareRequest) -> Result<CompareResult, BackendError>;
}

/// Backend talking to a running `dtrees` server over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Debug, Deserialize)]
struct HistoryBody {
    #[serde(default)]
    runs: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
struct CompareBody {
    #[serde(default)]
    success: bool,
    data: Option<CompareResult>,
    error: Option<ApiError>,
}

impl CompareBackend for HttpBackend {
    fn history(&self, dataset: DatasetId) -> Result<Vec<HistoryEntry>, BackendError> {
        let url = format!("{}/history", self.base_url);
        let response = http_client::get(&url, &[("dataset", dataset.as_str())], MAX_HISTORY_BYTES)?;
        if !response.is_success() {
            return Err(BackendError::Status {
                code: response.status,
                body: response.body,
            });
        }
        let parsed: HistoryBody = serde_json::from_str(&response.body)
            .map_err(|err| BackendError::InvalidResponse(format!("{err}: {}", response.body)))?;
        Ok(parsed.runs)
    }

    fn compare(&self, request: &CompareRequest) -> Result<CompareResult, BackendError> {
        let url = format!("{}/compare", self.base_url);
        // Failed comparisons carry their structured error in the body.
        let response = http_client::post_json(&url, request, MAX_COMPARE_BYTES)?;
        parse_compare_body(&response.body)
    }
}

fn parse_compare_body(body: &str) -> Result<CompareResult, BackendError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|err| BackendError::InvalidResponse(format!("{err}: {body}")))?;
    let parsed: CompareBody = serde_json::from_value(value)
        .map_err(|err| BackendError::InvalidResponse(err.to_string()))?;
    match (parsed.success, parsed.data, parsed.error) {
        (true, Some(data), _) => Ok(data),
        (_, _, Some(error)) => Err(BackendError::Api(error)),
        _ => Err(BackendError::Api(ApiError::new(
            ErrorCode::UnknownError,
            "Compare failed",
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::tests::serve_once;

    fn json_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[test]
    fn history_decodes_runs() {
        let body = r#"{"runs":[{"runId":"1700000000","model":"tree","dataset":"Iris","accuracy":0.9,"timestamp":1700000000}]}"#;
        let url = serve_once(json_response("200 OK", body));
        let runs = HttpBackend::new(url).history(DatasetId::Iris).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].name, None);
    }

    #[test]
    fn compare_surfaces_structured_errors() {
        let body = r#"{"success":false,"error":{"message":"Script exited with code 1","code":"SCRIPT_EXECUTION_ERROR","details":"boom"}}"#;
        let url = serve_once(json_response("500 Internal Server Error", body));
        let request = CompareRequest {
            dataset: "Iris".into(),
            models: vec!["1700000000".into()],
            ..CompareRequest::default()
        };
        let err = HttpBackend::new(url).compare(&request).unwrap_err();
        let api = err.into_api_error();
        assert_eq!(api.code, ErrorCode::ScriptExecutionError);
        assert_eq!(api.details.as_deref(), Some("boom"));
    }

    #[test]
    fn compare_body_without_data_is_a_failure() {
        let err = parse_compare_body(r#"{"success":true}"#).unwrap_err();
        assert_eq!(err.into_api_error().message, "Compare failed");
        let err = parse_compare_body("<html>").unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse(_)));
    }

    #[test]
    fn transport_failures_become_unknown_errors() {
        let err = HttpBackend::new("http://127.0.0.1:1")
            .history(DatasetId::Iris)
            .unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
        assert_eq!(err.into_api_error().code, ErrorCode::UnknownError);
    }
}
