//! REST client for the optimization service.
//!
//! Wraps job submission (`POST /optimize`) and the market price lookup
//! (`GET /markets/gems`) using [`reqwest`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use gemggark_core::request::RequestPayload;
use gemggark_core::types::TaskId;
use serde::Deserialize;

use crate::config::ClientConfig;

/// Message shown when the service cannot be reached at all.
const UNREACHABLE_MESSAGE: &str =
    "Could not reach the optimization service. Check that the backend is running.";

/// Submits a formatted request and yields the server-assigned task id.
///
/// Implemented by [`TaskApi`]; the page controller only depends on
/// this trait so hosts and tests can substitute their own transport.
#[async_trait]
pub trait TaskSubmitter: Send + Sync {
    async fn submit(&self, payload: &RequestPayload) -> Result<TaskId, SubmissionError>;
}

/// HTTP client for the optimization service.
pub struct TaskApi {
    client: reqwest::Client,
    api_url: String,
}

/// Response returned by `POST /optimize`.
///
/// `task_id` is optional on purpose: a 2xx response without it is
/// still a failed submission.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub task_id: Option<String>,
}

/// Structured error body, e.g. `{"detail": "invalid configuration"}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Errors from the REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Service error ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    /// A 2xx response body could not be decoded.
    #[error("Malformed response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Why a job submission did not produce a task id.
///
/// `Display` yields the message meant for the user: a generic line for
/// transport failures, the server's own detail for rejections.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("{}", UNREACHABLE_MESSAGE)]
    Unreachable(#[source] reqwest::Error),

    #[error("{detail}")]
    Rejected { status: u16, detail: String },

    #[error("The optimization service did not return a task id.")]
    MissingTaskId,

    #[error("The optimization service sent an unexpected response.")]
    Decode(#[source] reqwest::Error),
}

impl From<ApiError> for SubmissionError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Request(e) => SubmissionError::Unreachable(e),
            ApiError::Rejected { status, detail } => SubmissionError::Rejected { status, detail },
            ApiError::Decode(e) => SubmissionError::Decode(e),
        }
    }
}

impl TaskApi {
    /// Client for the service at `api_url` (e.g. `http://host:8000`),
    /// with reqwest's default timeouts.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }

    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }

    /// Create an API client honouring the configured request timeout.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ApiError::Request)?;
        Ok(Self::with_client(client, config.api_url.clone()))
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Submit an optimization job.
    ///
    /// Sends `POST /optimize` with the payload and returns the task id
    /// from the response body.
    pub async fn submit_job(&self, payload: &RequestPayload) -> Result<TaskId, SubmissionError> {
        let response = self
            .client
            .post(format!("{}/optimize", self.api_url))
            .json(payload)
            .send()
            .await
            .map_err(ApiError::Request)?;

        let body: SubmitResponse = Self::decode_json(response).await?;

        match body.task_id {
            Some(id) if !id.is_empty() => Ok(TaskId::new(id)),
            _ => Err(SubmissionError::MissingTaskId),
        }
    }

    /// Fetch the lowest market price of every gem, keyed by item name.
    ///
    /// Sends `GET /markets/gems`. Items with no listing map to `None`.
    pub async fn fetch_market_prices(&self) -> Result<BTreeMap<String, Option<u64>>, ApiError> {
        let response = self
            .client
            .get(format!("{}/markets/gems", self.api_url))
            .send()
            .await
            .map_err(ApiError::Request)?;

        Self::decode_json(response).await
    }

    // ---- private helpers ----

    /// Map a non-2xx reply to [`ApiError::Rejected`] carrying the
    /// server's `detail`.
    async fn reject_unless_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        // An unreadable body still yields a detail via the status fallback.
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Rejected {
            status: status.as_u16(),
            detail: extract_detail(&body, status.as_u16()),
        })
    }

    async fn decode_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        Self::reject_unless_success(response)
            .await?
            .json::<T>()
            .await
            .map_err(ApiError::Decode)
    }
}

#[async_trait]
impl TaskSubmitter for TaskApi {
    async fn submit(&self, payload: &RequestPayload) -> Result<TaskId, SubmissionError> {
        let result = self.submit_job(payload).await;
        match &result {
            Ok(task_id) => tracing::info!(task_id = %task_id, "Optimization job submitted"),
            Err(e) => tracing::warn!(error = ?e, "Optimization job submission failed"),
        }
        result
    }
}

/// Pull a human-readable detail out of an error body.
///
/// Validation errors carry a list in `detail`; those are forwarded as
/// compact JSON.
fn extract_detail(body: &str, status: u16) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => body.trim().to_string(),
    }
}
