//! Request-path error types that map directly onto HTTP responses.
//!
//! Startup and config failures use `anyhow::Error` instead (see `main.rs`
//! and `config.rs`); this type is only for errors a handler or middleware
//! returns to axum.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Taxonomy from the spec's error handling design: each variant carries its
/// fixed status code and, where the spec pins a literal body, that body.
#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("admin auth failure")]
    Unauthorized,
    #[error("missing or invalid parameter: {0}")]
    BadRequest(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("rate limit exceeded")]
    TooManyRequests,
    #[error("no route matches this path")]
    NotFound,
    #[error("no healthy backends found")]
    ServiceUnavailable,
    #[error("upstream transport failure: {0}")]
    BadGateway(String),
    #[error("dlp policy triggered: {0}")]
    DlpBlocked(String),
}

impl IntoResponse for SentinelError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            SentinelError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            SentinelError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            SentinelError::Forbidden(msg) => (StatusCode::FORBIDDEN, format!("Forbidden: {msg}")),
            SentinelError::TooManyRequests => {
                (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests".to_string())
            }
            SentinelError::NotFound => (
                StatusCode::NOT_FOUND,
                "Not Found: No route matches this path".to_string(),
            ),
            SentinelError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service Unavailable: No healthy backends found".to_string(),
            ),
            SentinelError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            SentinelError::DlpBlocked(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        (status, body).into_response()
    }
}
