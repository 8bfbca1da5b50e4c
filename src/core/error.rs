//! Error types and HTTP response mapping.
//!
//! [`GatewayError`] is the terminal error type produced by the request
//! pipeline; provider-level failures live in
//! [`crate::providers::ProviderError`] and only surface here once the
//! fallback chain is exhausted.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::providers::ProviderError;

/// Terminal errors returned to clients.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Missing, invalid, or inactive API key
    #[error("Invalid or missing API key")]
    Auth,

    /// The caller's token bucket is empty
    #[error("Rate limit exceeded. Try again in {retry_after_secs} seconds.")]
    RateLimited { retry_after_secs: u64 },

    /// Malformed request body
    #[error("{0}")]
    Validation(String),

    /// Every provider in the fallback chain failed
    #[error("LLM provider error: {source}")]
    ProvidersExhausted {
        request_id: String,
        #[source]
        source: ProviderError,
    },

    /// Anything else (never carries upstream secrets)
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::Auth => error_response(StatusCode::UNAUTHORIZED, self.to_string()),
            GatewayError::RateLimited { retry_after_secs } => {
                let mut response =
                    error_response(StatusCode::TOO_MANY_REQUESTS, self.to_string());
                if let Ok(value) = retry_after_secs.to_string().parse() {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            GatewayError::Validation(msg) => error_response(StatusCode::BAD_REQUEST, msg),
            GatewayError::ProvidersExhausted {
                ref request_id, ..
            } => error_response(
                StatusCode::BAD_GATEWAY,
                format!("{} (request_id: {})", self, request_id),
            ),
            GatewayError::Internal(_) => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        }
    }
}

fn error_response(status: StatusCode, detail: String) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

/// Convenience type alias for handler results.
pub type Result<T> = std::result::Result<T, GatewayError>;
