//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps store errors to HTTP status codes with a JSON body carrying a
//! machine-readable code and message. Internal error details are logged
//! and never returned to the client.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use depot_core::StoreError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND").
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Nothing at this path (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed request path (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The method is not supported here, or the store refused the write (405).
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::MethodNotAllowed(_) => (StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::MethodNotAllowed(_) => tracing::debug!(error = %self, "request refused"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(header::ALLOW, header::HeaderValue::from_static("GET, HEAD, PUT"));
        }
        response
    }
}

/// Convert store errors to API errors.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            StoreError::InvalidPath(_) => Self::BadRequest(err.to_string()),
            StoreError::WriteError { .. } => Self::MethodNotAllowed(err.to_string()),
            StoreError::UpstreamUnavailable { .. }
            | StoreError::CorruptCacheEntry { .. }
            | StoreError::InvalidDocument { .. }
            | StoreError::Io(_) => Self::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::not_found("a/b"), StatusCode::NOT_FOUND),
            (StoreError::InvalidPath("..".into()), StatusCode::BAD_REQUEST),
            (StoreError::write("a/b", "read-only"), StatusCode::METHOD_NOT_ALLOWED),
            (
                StoreError::UpstreamUnavailable {
                    endpoint: "GET x".into(),
                    reason: "timeout".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            let (status, _) = AppError::from(err).status_and_code();
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn method_not_allowed_carries_allow_header() {
        let response = AppError::MethodNotAllowed("DELETE".into()).into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, HEAD, PUT");
    }

    #[tokio::test]
    async fn internal_error_hides_message() {
        let response = AppError::Internal("disk on fire at /var/lib/x".into()).into_response();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert!(!body.error.message.contains("/var/lib/x"));
    }

    #[tokio::test]
    async fn not_found_body_shape() {
        let response = AppError::NotFound("org/missing".into()).into_response();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["error"]["code"], "NOT_FOUND");
        assert!(value["error"]["message"].as_str().unwrap().contains("org/missing"));
        assert!(value["error"].get("details").is_none());
    }
}
