//! Upstream client error types.

use depot_core::StoreError;

/// Errors from upstream repository calls.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Upstream returned a non-2xx status.
    #[error("upstream {endpoint} returned {status}")]
    Status { endpoint: String, status: u16 },
    /// A document could not be parsed.
    #[error("invalid document from {endpoint}: {reason}")]
    InvalidDocument { endpoint: String, reason: String },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

/// 404 and 410 are "does not exist"; everything else means the upstream
/// could not answer.
impl From<RemoteError> for StoreError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::Status { endpoint, status: 404 | 410 } => StoreError::not_found(endpoint),
            RemoteError::InvalidDocument { endpoint, reason } => {
                StoreError::invalid_document(endpoint, reason)
            }
            other => {
                let endpoint = match &other {
                    RemoteError::Http { endpoint, .. } | RemoteError::Status { endpoint, .. } => {
                        endpoint.clone()
                    }
                    _ => "upstream".to_string(),
                };
                StoreError::UpstreamUnavailable {
                    endpoint,
                    reason: other.to_string(),
                }
            }
        }
    }
}
