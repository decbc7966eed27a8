//! # Application State
//!
//! Shared state for the Axum application: the filesystem view over the
//! configured store and where it is mounted.

use std::sync::Arc;

use depot_store::ArtifactStore;
use depot_vfs::StoreFileSystem;

use crate::config::sanitize_context_path;

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub fs: StoreFileSystem,
    /// Canonical context path (`/` or `/name` without trailing slash).
    pub context_path: String,
    /// Externally visible base URL, when known. The settings document
    /// falls back to the request `Host` header.
    pub public_url: Option<String>,
}

impl AppState {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            fs: StoreFileSystem::new(store),
            context_path: "/".to_string(),
            public_url: None,
        }
    }

    pub fn with_context_path(mut self, context_path: Option<&str>) -> Self {
        self.context_path = sanitize_context_path(context_path);
        self
    }

    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    /// The part of a request path below the context path, with its leading
    /// slash, or `None` when the request is outside the context.
    pub fn strip_context<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.context_path == "/" {
            return Some(path);
        }
        let rest = path.strip_prefix(self.context_path.as_str())?;
        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    /// Context path without trailing slash (empty at the root), for links.
    pub fn context_prefix(&self) -> &str {
        self.context_path.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_store::MemoryStore;

    fn state(context: &str) -> AppState {
        AppState::new(Arc::new(MemoryStore::new())).with_context_path(Some(context))
    }

    #[test]
    fn root_context_passes_everything() {
        assert_eq!(state("/").strip_context("/org/x"), Some("/org/x"));
    }

    #[test]
    fn nested_context_is_stripped() {
        let s = state("repo/");
        assert_eq!(s.context_path, "/repo");
        assert_eq!(s.strip_context("/repo/org/x"), Some("/org/x"));
        assert_eq!(s.strip_context("/repo"), Some("/"));
        assert_eq!(s.strip_context("/repository/org"), None);
        assert_eq!(s.strip_context("/other"), None);
    }
}
