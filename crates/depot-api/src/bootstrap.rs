//! # Store Bootstrap
//!
//! Turns a validated [`DepotConfig`] into the store the server serves.
//!
//! ## Sequence
//!
//! 1. **Validate**: repository list, directories, upstream URLs.
//! 2. **Build members**: one store per configured repository, in order.
//! 3. **Compose**: a single member is served directly; several are wrapped
//!    in a [`CompositeStore`] that writes to the first writable member.

use std::sync::Arc;
use std::time::Duration;

use depot_remote::{RemoteConfig, RemoteRepository};
use depot_store::{
    ArtifactStore, CompositeStore, DiskStore, FreshnessPolicy, MemoryStore, MockStore, ProxyStore,
    Upstream,
};

use crate::config::{expand_home, ConfigError, DepotConfig, RepositoryConfig};

/// Build the store described by `config`.
pub async fn create_store(config: &DepotConfig) -> Result<Arc<dyn ArtifactStore>, ConfigError> {
    config.validate()?;

    let mut members = Vec::with_capacity(config.repositories.len());
    for (index, repo) in config.repositories.iter().enumerate() {
        let store = build_member(index, repo, config.read_only).await?;
        tracing::info!(
            index,
            kind = kind_name(repo),
            writable = store.is_writable(),
            "repository configured"
        );
        members.push(store);
    }

    if members.len() == 1 {
        if let Some(only) = members.pop() {
            return Ok(only);
        }
    }
    Ok(Arc::new(CompositeStore::new(members)))
}

async fn build_member(
    index: usize,
    repo: &RepositoryConfig,
    read_only: bool,
) -> Result<Arc<dyn ArtifactStore>, ConfigError> {
    let store: Arc<dyn ArtifactStore> = match repo {
        RepositoryConfig::Hosted { target } => {
            Arc::new(DiskStore::new(expand_home(target), !read_only))
        }
        RepositoryConfig::Local { source } => Arc::new(DiskStore::new(expand_home(source), false)),
        RepositoryConfig::Mock { source } => Arc::new(
            MockStore::load(expand_home(source))
                .await
                .map_err(|e| ConfigError::Store { index, source: e })?,
        ),
        RepositoryConfig::Memory => {
            if read_only {
                Arc::new(MemoryStore::read_only())
            } else {
                Arc::new(MemoryStore::new())
            }
        }
        RepositoryConfig::Proxy {
            url,
            cache_dir,
            revalidate_after_secs,
            freshness,
            timeout_secs,
        } => {
            let upstream: Option<Arc<dyn Upstream>> = match url {
                Some(url) => {
                    let mut remote = RemoteConfig::new(url.as_str()).map_err(|e| {
                        ConfigError::InvalidUrl {
                            index,
                            reason: e.to_string(),
                        }
                    })?;
                    if let Some(secs) = timeout_secs {
                        remote.timeout_secs = *secs;
                    }
                    let client = RemoteRepository::new(remote).map_err(|e| ConfigError::InvalidUrl {
                        index,
                        reason: e.to_string(),
                    })?;
                    Some(Arc::new(client))
                }
                None => None,
            };
            // The cache itself must accept writes whenever there is an upstream to populate from.
            let backing_writable = upstream.is_some() || !read_only;
            let backing: Arc<dyn ArtifactStore> = match cache_dir {
                Some(dir) => Arc::new(DiskStore::new(expand_home(dir), backing_writable)),
                None if backing_writable => Arc::new(MemoryStore::new()),
                None => Arc::new(MemoryStore::read_only()),
            };
            let policy = FreshnessPolicy {
                comparator: (*freshness).into(),
                revalidate_after: Duration::from_secs(*revalidate_after_secs),
            };
            Arc::new(ProxyStore::new(upstream, backing, policy))
        }
    };
    Ok(store)
}

fn kind_name(repo: &RepositoryConfig) -> &'static str {
    match repo {
        RepositoryConfig::Hosted { .. } => "hosted",
        RepositoryConfig::Local { .. } => "local",
        RepositoryConfig::Mock { .. } => "mock",
        RepositoryConfig::Proxy { .. } => "proxy",
        RepositoryConfig::Memory => "memory",
    }
}
