//! # Error Types
//!
//! `StoreError` is the single error taxonomy for every artifact store,
//! the filesystem projection, and the upstream boundary.
//!
//! ## Recovery
//!
//! - `NotFound`: per-request, surfaced to the client as not-found.
//! - `WriteError`: surfaced to the writer, never fatal.
//! - `UpstreamUnavailable`: recovered by the proxy from its cache when it can,
//!   otherwise escalated to `NotFound`.
//! - `CorruptCacheEntry`: recovered by treating the entry as absent.

use thiserror::Error;

/// Convenience alias for store results.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by artifact stores and the layers around them.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The path or coordinate does not resolve in this store.
    #[error("not found: {path}")]
    NotFound {
        /// Repository path that was looked up.
        path: String,
    },

    /// A write was rejected or could not be completed.
    #[error("write rejected for {path}: {reason}")]
    WriteError {
        /// Repository path of the rejected write.
        path: String,
        /// Why the store refused or failed.
        reason: String,
    },

    /// The configured upstream could not be reached.
    #[error("upstream {endpoint} unavailable: {reason}")]
    UpstreamUnavailable {
        /// Base URL of the upstream.
        endpoint: String,
        /// Transport or status failure.
        reason: String,
    },

    /// Cached content is unreadable or inconsistent with its bookkeeping.
    #[error("corrupt cache entry {path}: {reason}")]
    CorruptCacheEntry {
        /// Repository path of the cached file.
        path: String,
        /// What made the entry unusable.
        reason: String,
    },

    /// A repository path could not be interpreted.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A metadata, catalog or POM document could not be parsed.
    #[error("invalid {document}: {reason}")]
    InvalidDocument {
        /// Kind of document, e.g. `maven-metadata.xml` or `pom`.
        document: String,
        /// Parser message.
        reason: String,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Shorthand for [`StoreError::NotFound`].
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Shorthand for [`StoreError::WriteError`].
    pub fn write(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WriteError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`StoreError::InvalidDocument`].
    pub fn invalid_document(document: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDocument {
            document: document.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error means "does not exist" rather than "failed".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the proxy may fall back to cached content for this error.
    pub fn is_upstream_failure(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. })
    }
}
