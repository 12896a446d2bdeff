//! Error types for the webhook router.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Top-level error type for the router.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Forwarding error: {0}")]
    Forward(#[from] ForwardError),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Outcome of a failed forward to the downstream webhook.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// Connection error or timeout.
    #[error("Failed to forward to n8n: {0}")]
    Unreachable(String),

    /// Downstream answered with a status of 300 or above.
    #[error("n8n returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Errors surfaced to the webhook caller.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Forwarding(#[from] ForwardError),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            Self::Forwarding(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(serde_json::json!({ "detail": self.to_string() })),
        )
            .into_response()
    }
}

/// Result type alias for the router.
pub type Result<T> = std::result::Result<T, Error>;
