//! # Caching Proxy Store
//!
//! A [`ProxyStore`] answers from a backing store and keeps it current
//! against an optional [`Upstream`].
//!
//! ## Read path
//!
//! 1. A floating snapshot is pinned to a stamp using upstream metadata.
//! 2. Unless a recent check is still valid under the [`FreshnessPolicy`],
//!    the upstream last-modified is checked and compared with the cache.
//! 3. A missing or stale copy is fetched and written to the backing store.
//! 4. The response is always served from the backing store.
//!
//! An unreachable upstream never hides a cached copy: stale content is
//! served and the failure is logged at `warn`.
//!
//! ## Coalescing
//!
//! Revalidation of one coordinate runs as a single flight. Requests that
//! arrive while a flight is in progress await its outcome instead of
//! probing again. The flight runs on its own task, so a client that
//! disconnects mid-fetch does not abort the cache population.
//!
//! ## Documents
//!
//! While an upstream answers, its `maven-metadata.xml` and archetype
//! catalog are served as-is, with the upstream's own last-modified. The
//! backing store's synthesized documents are used only when there is no
//! upstream, or it has neither a fresh nor a previously fetched copy.
//!
//! Without an upstream the proxy is a transparent wrapper over its backing
//! store, including writes.

mod freshness;
mod upstream;

pub use freshness::{FreshnessComparator, FreshnessPolicy};
pub use upstream::Upstream;

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};

use depot_core::{
    ArchetypeCatalog, Coordinate, GroupPath, Metadata, SnapshotStamp, StoreError, StoreResult,
    CATALOG_FILE, METADATA_FILE,
};

use crate::{path_segments, ArtifactContent, ArtifactReader, ArtifactStore};

// -- Bookkeeping --------------------------------------------------------------

/// What the proxy knows about one cached coordinate.
#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    upstream_last_modified: DateTime<Utc>,
    last_check: Instant,
}

/// Result of one revalidation flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// The backing store holds a copy to serve (possibly stale).
    Cached,
    /// A fresh copy was just written to the backing store.
    Fetched,
    /// Neither the upstream nor the cache has the coordinate.
    Missing,
    /// The upstream failed and nothing is cached.
    Unavailable,
}

impl Outcome {
    fn is_servable(self) -> bool {
        matches!(self, Self::Cached | Self::Fetched)
    }
}

struct Flight {
    id: u64,
    done: Shared<BoxFuture<'static, Outcome>>,
}

#[derive(Debug, Clone)]
enum Document {
    Metadata(Metadata),
    Catalog(ArchetypeCatalog),
}

#[derive(Debug, Clone)]
struct CachedDocument {
    document: Document,
    last_modified: DateTime<Utc>,
    fetched: Instant,
}

struct ProxyInner {
    upstream: Option<Arc<dyn Upstream>>,
    backing: Arc<dyn ArtifactStore>,
    policy: FreshnessPolicy,
    entries: DashMap<Coordinate, CacheEntry>,
    flights: DashMap<Coordinate, Flight>,
    next_flight: AtomicU64,
    documents: DashMap<String, CachedDocument>,
}

// -- ProxyStore ---------------------------------------------------------------

/// Read-through cache in front of an upstream repository.
#[derive(Clone)]
pub struct ProxyStore {
    inner: Arc<ProxyInner>,
}

impl std::fmt::Debug for ProxyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyStore")
            .field("upstream", &self.inner.upstream.as_ref().map(|u| u.endpoint().to_string()))
            .field("policy", &self.inner.policy)
            .field("cached", &self.inner.entries.len())
            .finish()
    }
}

impl ProxyStore {
    pub fn new(
        upstream: Option<Arc<dyn Upstream>>,
        backing: Arc<dyn ArtifactStore>,
        policy: FreshnessPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(ProxyInner {
                upstream,
                backing,
                policy,
                entries: DashMap::new(),
                flights: DashMap::new(),
                next_flight: AtomicU64::new(0),
                documents: DashMap::new(),
            }),
        }
    }

    pub fn has_upstream(&self) -> bool {
        self.inner.upstream.is_some()
    }

    pub fn policy(&self) -> FreshnessPolicy {
        self.inner.policy
    }

    /// Pin a floating snapshot to the stamp the upstream currently serves.
    async fn pin_snapshot(&self, coordinate: &Coordinate) -> Coordinate {
        if !coordinate.is_floating_snapshot() || self.inner.upstream.is_none() {
            return coordinate.clone();
        }
        let Some((metadata, _)) = self.upstream_metadata(&coordinate.version_path()).await else {
            return coordinate.clone();
        };
        let Some(versioning) = metadata.versioning else {
            return coordinate.clone();
        };

        let stamped_value = versioning
            .snapshot_versions
            .iter()
            .find(|sv| sv.classifier == coordinate.classifier && sv.extension == coordinate.extension)
            .map(|sv| sv.value.clone());
        let stamp = match stamped_value {
            Some(value) => value
                .strip_prefix(coordinate.base_version())
                .and_then(|rest| rest.strip_prefix('-'))
                .and_then(SnapshotStamp::parse),
            None => versioning.snapshot.and_then(|s| {
                let timestamp = s.timestamp?;
                SnapshotStamp::parse(&format!("{timestamp}-{}", s.build_number))
            }),
        };
        coordinate.clone().with_stamp(stamp)
    }

    /// Make sure the backing store holds a servable copy of `coordinate`.
    async fn ensure(&self, coordinate: &Coordinate) -> StoreResult<()> {
        if self.inner.upstream.is_none() {
            return Ok(());
        }
        if self.inner.recently_checked(coordinate) {
            return Ok(());
        }
        if self.join_flight(coordinate, false).await.is_servable() {
            Ok(())
        } else {
            Err(StoreError::not_found(coordinate.repository_path()))
        }
    }

    /// Await the in-progress revalidation of `coordinate`, starting one if needed.
    async fn join_flight(&self, coordinate: &Coordinate, force: bool) -> Outcome {
        let done = match self.inner.flights.entry(coordinate.clone()) {
            Entry::Occupied(flight) => flight.get().done.clone(),
            Entry::Vacant(slot) => {
                let id = self.inner.next_flight.fetch_add(1, Ordering::Relaxed);
                let inner = Arc::clone(&self.inner);
                let key = coordinate.clone();
                let task = tokio::spawn(async move {
                    let outcome = inner.revalidate(&key, force).await;
                    inner.flights.remove_if(&key, |_, flight| flight.id == id);
                    outcome
                });
                let done = async move {
                    task.await.unwrap_or_else(|e| {
                        tracing::error!(error = %e, "cache population task failed");
                        Outcome::Unavailable
                    })
                }
                .boxed()
                .shared();
                slot.insert(Flight {
                    id,
                    done: done.clone(),
                });
                done
            }
        };
        done.await
    }

    /// Serve `op` from the backing store, re-fetching once if the cached
    /// copy turns out to be missing or unreadable.
    async fn read_through<T, F, Fut>(&self, coordinate: &Coordinate, op: F) -> StoreResult<T>
    where
        F: Fn(Arc<dyn ArtifactStore>, Coordinate) -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let target = self.pin_snapshot(coordinate).await;
        self.ensure(&target).await?;

        let backing = Arc::clone(&self.inner.backing);
        match op(Arc::clone(&backing), target.clone()).await {
            Err(e @ (StoreError::CorruptCacheEntry { .. } | StoreError::NotFound { .. }))
                if self.inner.upstream.is_some() =>
            {
                if matches!(e, StoreError::CorruptCacheEntry { .. }) {
                    tracing::warn!(coordinate = %target, error = %e, "discarding unreadable cache entry");
                }
                self.inner.entries.remove(&target);
                if self.join_flight(&target, true).await.is_servable() {
                    op(backing, target).await
                } else {
                    Err(StoreError::not_found(target.repository_path()))
                }
            }
            Err(StoreError::CorruptCacheEntry { path, reason }) => {
                tracing::warn!(path = %path, reason = %reason, "unreadable entry in backing store");
                Err(StoreError::not_found(path))
            }
            other => other,
        }
    }

    async fn upstream_metadata(&self, path: &str) -> Option<(Metadata, DateTime<Utc>)> {
        let upstream = self.inner.upstream.as_ref()?;
        let key = format!("{}/{METADATA_FILE}", path_segments(path).join("/"));
        if let Some((Document::Metadata(m), modified)) = self.inner.cached_document(&key, true) {
            return Some((m, modified));
        }
        match upstream.metadata(path).await {
            Ok((metadata, modified)) => {
                self.inner
                    .store_document(key, Document::Metadata(metadata.clone()), modified);
                Some((metadata, modified))
            }
            Err(e) => {
                if !e.is_not_found() {
                    tracing::warn!(path, error = %e, "upstream metadata unavailable");
                }
                match self.inner.cached_document(&key, false) {
                    Some((Document::Metadata(m), modified)) => Some((m, modified)),
                    _ => None,
                }
            }
        }
    }

    async fn upstream_catalog(&self) -> Option<(ArchetypeCatalog, DateTime<Utc>)> {
        let upstream = self.inner.upstream.as_ref()?;
        let key = CATALOG_FILE.to_string();
        if let Some((Document::Catalog(c), modified)) = self.inner.cached_document(&key, true) {
            return Some((c, modified));
        }
        match upstream.catalog().await {
            Ok((catalog, modified)) => {
                self.inner
                    .store_document(key, Document::Catalog(catalog.clone()), modified);
                Some((catalog, modified))
            }
            Err(e) => {
                if !e.is_not_found() {
                    tracing::warn!(error = %e, "upstream catalog unavailable");
                }
                match self.inner.cached_document(&key, false) {
                    Some((Document::Catalog(c), modified)) => Some((c, modified)),
                    _ => None,
                }
            }
        }
    }

    fn check_writable(&self, path: impl Into<String>) -> StoreResult<()> {
        if self.inner.upstream.is_some() {
            Err(StoreError::write(path, "proxy repositories are read-only"))
        } else {
            Ok(())
        }
    }
}

impl ProxyInner {
    /// A cached coordinate whose last upstream check is still valid.
    fn recently_checked(&self, coordinate: &Coordinate) -> bool {
        self.entries
            .get(coordinate)
            .is_some_and(|entry| !self.policy.must_revalidate(entry.last_check.elapsed()))
    }

    fn record(&self, coordinate: &Coordinate, upstream_last_modified: DateTime<Utc>) {
        self.entries.insert(
            coordinate.clone(),
            CacheEntry {
                upstream_last_modified,
                last_check: Instant::now(),
            },
        );
    }

    /// Probe the upstream and bring the backing copy up to date.
    async fn revalidate(&self, coordinate: &Coordinate, force: bool) -> Outcome {
        let Some(upstream) = self.upstream.clone() else {
            return Outcome::Cached;
        };

        let cached = if force {
            None
        } else {
            match self.backing.last_modified(coordinate).await {
                Ok(modified) => Some(modified),
                Err(e) => {
                    if !e.is_not_found() {
                        tracing::warn!(coordinate = %coordinate, error = %e, "treating cache entry as absent");
                    }
                    None
                }
            }
        };
        let entry = self.entries.get(coordinate).map(|e| *e);

        if let (Some(_), Some(entry)) = (cached, entry) {
            if !self.policy.must_revalidate(entry.last_check.elapsed()) {
                return Outcome::Cached;
            }
        }

        let remote = match upstream.last_modified(coordinate).await {
            Ok(remote) => remote,
            Err(e) if cached.is_some() => {
                tracing::warn!(
                    coordinate = %coordinate,
                    upstream = upstream.endpoint(),
                    error = %e,
                    "upstream check failed, serving cached copy"
                );
                return Outcome::Cached;
            }
            Err(e) if e.is_not_found() => return Outcome::Missing,
            Err(e) => {
                tracing::warn!(coordinate = %coordinate, error = %e, "upstream unavailable");
                return Outcome::Unavailable;
            }
        };

        let reference = entry.map(|e| e.upstream_last_modified).or(cached);
        let stale = match (cached, reference) {
            (Some(_), Some(reference)) => self.policy.comparator.needs_fetch(remote, reference),
            _ => true,
        };
        if !stale {
            tracing::debug!(coordinate = %coordinate, "cached copy is current");
            self.record(coordinate, remote);
            return Outcome::Cached;
        }

        match self.populate(upstream.as_ref(), coordinate).await {
            Ok(()) => {
                self.record(coordinate, remote);
                Outcome::Fetched
            }
            Err(e) if cached.is_some() => {
                tracing::warn!(coordinate = %coordinate, error = %e, "refresh failed, serving cached copy");
                Outcome::Cached
            }
            Err(e) if e.is_not_found() => Outcome::Missing,
            Err(e) => {
                tracing::warn!(coordinate = %coordinate, error = %e, "could not populate cache");
                Outcome::Unavailable
            }
        }
    }

    async fn populate(&self, upstream: &dyn Upstream, coordinate: &Coordinate) -> StoreResult<()> {
        let content = upstream.fetch(coordinate).await?;
        let size = content.size;
        self.backing.set(coordinate, content.reader).await?;
        tracing::info!(
            coordinate = %coordinate,
            size,
            upstream = upstream.endpoint(),
            "cached artifact from upstream"
        );
        Ok(())
    }

    /// A previously fetched document; with `fresh_only`, only within the
    /// revalidation window.
    fn cached_document(&self, key: &str, fresh_only: bool) -> Option<(Document, DateTime<Utc>)> {
        let cached = self.documents.get(key)?;
        if fresh_only && self.policy.must_revalidate(cached.fetched.elapsed()) {
            return None;
        }
        Some((cached.document.clone(), cached.last_modified))
    }

    fn store_document(&self, key: String, document: Document, last_modified: DateTime<Utc>) {
        self.documents.insert(
            key,
            CachedDocument {
                document,
                last_modified,
                fetched: Instant::now(),
            },
        );
    }
}

#[async_trait]
impl ArtifactStore for ProxyStore {
    async fn list_group_segments(&self, prefix: &GroupPath) -> BTreeSet<String> {
        self.inner.backing.list_group_segments(prefix).await
    }

    async fn list_names(&self, group: &GroupPath) -> BTreeSet<String> {
        self.inner.backing.list_names(group).await
    }

    async fn list_versions(&self, group: &GroupPath, name: &str) -> BTreeSet<String> {
        self.inner.backing.list_versions(group, name).await
    }

    async fn list_artifacts(
        &self,
        group: &GroupPath,
        name: &str,
        version: &str,
    ) -> BTreeSet<Coordinate> {
        self.inner.backing.list_artifacts(group, name, version).await
    }

    async fn get(&self, coordinate: &Coordinate) -> StoreResult<ArtifactContent> {
        self.read_through(coordinate, |backing, c| async move { backing.get(&c).await })
            .await
    }

    async fn last_modified(&self, coordinate: &Coordinate) -> StoreResult<DateTime<Utc>> {
        self.read_through(coordinate, |backing, c| async move {
            backing.last_modified(&c).await
        })
        .await
    }

    async fn size(&self, coordinate: &Coordinate) -> StoreResult<u64> {
        self.read_through(coordinate, |backing, c| async move { backing.size(&c).await })
            .await
    }

    async fn set(&self, coordinate: &Coordinate, content: ArtifactReader) -> StoreResult<()> {
        self.check_writable(coordinate.repository_path())?;
        self.inner.backing.set(coordinate, content).await
    }

    async fn set_metadata(&self, path: &str, metadata: &Metadata) -> StoreResult<()> {
        self.check_writable(path)?;
        self.inner.backing.set_metadata(path, metadata).await
    }

    async fn metadata(&self, path: &str) -> StoreResult<Metadata> {
        match self.upstream_metadata(path).await {
            Some((remote, _)) => Ok(remote),
            None => self.inner.backing.metadata(path).await,
        }
    }

    async fn metadata_last_modified(&self, path: &str) -> StoreResult<DateTime<Utc>> {
        match self.upstream_metadata(path).await {
            Some((_, modified)) => Ok(modified),
            None => self.inner.backing.metadata_last_modified(path).await,
        }
    }

    async fn catalog(&self) -> StoreResult<ArchetypeCatalog> {
        match self.upstream_catalog().await {
            Some((remote, _)) => Ok(remote),
            None => self.inner.backing.catalog().await,
        }
    }

    async fn catalog_last_modified(&self) -> StoreResult<DateTime<Utc>> {
        match self.upstream_catalog().await {
            Some((_, modified)) => Ok(modified),
            None => self.inner.backing.catalog_last_modified().await,
        }
    }

    fn is_writable(&self) -> bool {
        self.inner.upstream.is_none() && self.inner.backing.is_writable()
    }
}
