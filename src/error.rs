//! Error types surfaced by the gateway's HTTP handlers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::models::LookupKind;

/// Startup failures; these abort the process.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("invalid upstream URL: {0}")]
    InvalidUpstreamUrl(String),

    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Failures while talking to the upstream lookup service.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream unreachable: {0}")]
    Transport(String),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("upstream response is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("upstream response has an unexpected shape")]
    UnexpectedShape,

    #[error("upstream returned no records")]
    NoRecords,
}

impl UpstreamError {
    /// Only transport failures and upstream 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::Timeout | UpstreamError::Transport(_) => true,
            UpstreamError::Status(code) => *code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else if e.is_decode() {
            UpstreamError::MalformedJson(e.to_string())
        } else if let Some(status) = e.status() {
            UpstreamError::Status(status.as_u16())
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("missing query parameter for {}", .0.path())]
    MissingParameter(LookupKind),

    #[error("{}", .0.invalid_label())]
    InvalidParameter(LookupKind),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingParameter(_) | GatewayError::InvalidParameter(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::Upstream(UpstreamError::NoRecords) => StatusCode::NOT_FOUND,
            GatewayError::Upstream(
                UpstreamError::MalformedJson(_) | UpstreamError::UnexpectedShape,
            ) => StatusCode::BAD_GATEWAY,
            GatewayError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

// client facing bodies never carry upstream error text
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = match &self {
            GatewayError::MissingParameter(kind) => json!({
                "error": "Missing parameter",
                "required": format!("?{}={}", kind.param(), kind.example()),
                "example": format!("{}?{}={}", kind.path(), kind.param(), kind.example()),
            }),
            GatewayError::InvalidParameter(kind) => json!({
                "error": kind.invalid_label(),
                "message": format!("Must be exactly {} digits", kind.digits()),
            }),
            GatewayError::Upstream(UpstreamError::NoRecords) => json!({
                "error": "No records found",
            }),
            GatewayError::Upstream(
                UpstreamError::MalformedJson(_) | UpstreamError::UnexpectedShape,
            ) => json!({
                "error": "Invalid upstream response",
            }),
            GatewayError::Upstream(_) => json!({
                "error": "Service unavailable",
                "message": "Please try again later",
            }),
        };

        (self.status(), Json(body)).into_response()
    }
}
