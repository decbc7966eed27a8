//! The remote side of a proxy store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use depot_core::{ArchetypeCatalog, Coordinate, Metadata, StoreResult};

use crate::ArtifactContent;

/// A repository the proxy can check and fetch from.
///
/// There is no listing operation: remote repositories are only ever asked
/// about coordinates and documents by name. Implementations report a
/// missing resource as `NotFound` and transport failures as
/// `UpstreamUnavailable`.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Human-readable identity for logs, usually the base URL.
    fn endpoint(&self) -> &str;

    async fn last_modified(&self, coordinate: &Coordinate) -> StoreResult<DateTime<Utc>>;

    async fn fetch(&self, coordinate: &Coordinate) -> StoreResult<ArtifactContent>;

    /// The document at `path` with its last-modified (or fetch) time.
    async fn metadata(&self, path: &str) -> StoreResult<(Metadata, DateTime<Utc>)>;

    async fn catalog(&self) -> StoreResult<(ArchetypeCatalog, DateTime<Utc>)>;
}
