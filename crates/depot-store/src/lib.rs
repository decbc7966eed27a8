//! # depot-store — Artifact Store Abstraction
//!
//! Everything the server hands out comes from an [`ArtifactStore`]. The
//! trait covers listing the repository tree, reading and writing artifact
//! files, and the two synthesized documents (`maven-metadata.xml` per
//! path, `archetype-catalog.xml` per store).
//!
//! ## Implementations
//!
//! | Type               | Backing                                              |
//! |--------------------|------------------------------------------------------|
//! | [`MemoryStore`]    | Nested maps under a `parking_lot::RwLock`            |
//! | [`DiskStore`]      | Repository-layout directory tree, atomic writes      |
//! | [`MockStore`]      | Read-only memory store seeded from a directory       |
//! | [`CompositeStore`] | Ordered members, first match wins                    |
//! | [`ProxyStore`]     | Optional [`Upstream`] plus a backing cache store     |
//!
//! ## Sharing
//!
//! Stores are `Send + Sync` and shared as `Arc<dyn ArtifactStore>`. No
//! implementation holds a synchronous lock across an `.await`.

pub mod composite;
pub mod disk;
mod jar;
pub mod memory;
pub mod mock;
pub mod proxy;
pub mod synth;

use std::collections::BTreeSet;
use std::fmt;
use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncReadExt};

use depot_core::{ArchetypeCatalog, Coordinate, GroupPath, Metadata, StoreResult};

pub use composite::CompositeStore;
pub use disk::DiskStore;
pub use memory::MemoryStore;
pub use mock::MockStore;
pub use proxy::{FreshnessComparator, FreshnessPolicy, ProxyStore, Upstream};

/// A one-shot byte stream.
pub type ArtifactReader = Box<dyn AsyncRead + Send + Unpin>;

/// An open artifact: its bytes plus the facts needed to serve them.
pub struct ArtifactContent {
    pub reader: ArtifactReader,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

impl ArtifactContent {
    /// Content backed by an in-memory buffer.
    pub fn from_bytes(bytes: Bytes, last_modified: DateTime<Utc>) -> Self {
        Self {
            size: bytes.len() as u64,
            reader: Box::new(Cursor::new(bytes)),
            last_modified,
        }
    }

    /// Drain the reader into memory.
    pub async fn into_bytes(mut self) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.size.min(16 * 1024 * 1024) as usize);
        self.reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

impl fmt::Debug for ArtifactContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactContent")
            .field("size", &self.size)
            .field("last_modified", &self.last_modified)
            .finish_non_exhaustive()
    }
}

/// A repository of coordinate-addressed artifacts.
///
/// Listings never fail: a prefix with no children yields an empty set.
/// Reads fail with `NotFound` when the coordinate does not resolve. A
/// floating snapshot coordinate resolves to the newest stamped file.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Group segments directly below `prefix` (root segments for the root).
    async fn list_group_segments(&self, prefix: &GroupPath) -> BTreeSet<String>;

    /// Artifact names directly under `group`.
    async fn list_names(&self, group: &GroupPath) -> BTreeSet<String>;

    /// Versions of `group:name`.
    async fn list_versions(&self, group: &GroupPath, name: &str) -> BTreeSet<String>;

    /// Files of one version.
    async fn list_artifacts(
        &self,
        group: &GroupPath,
        name: &str,
        version: &str,
    ) -> BTreeSet<Coordinate>;

    /// Open the content of an artifact.
    async fn get(&self, coordinate: &Coordinate) -> StoreResult<ArtifactContent>;

    async fn last_modified(&self, coordinate: &Coordinate) -> StoreResult<DateTime<Utc>>;

    async fn size(&self, coordinate: &Coordinate) -> StoreResult<u64>;

    /// Write or overwrite an artifact.
    async fn set(&self, coordinate: &Coordinate, content: ArtifactReader) -> StoreResult<()>;

    /// Store an uploaded metadata document for `path`.
    async fn set_metadata(&self, path: &str, metadata: &Metadata) -> StoreResult<()>;

    /// The metadata document for a slash-separated repository path.
    async fn metadata(&self, path: &str) -> StoreResult<Metadata>;

    async fn metadata_last_modified(&self, path: &str) -> StoreResult<DateTime<Utc>>;

    async fn catalog(&self) -> StoreResult<ArchetypeCatalog>;

    async fn catalog_last_modified(&self) -> StoreResult<DateTime<Utc>>;

    /// Whether `set` can succeed at all.
    fn is_writable(&self) -> bool;
}

/// Read a whole `AsyncRead` into memory.
pub(crate) async fn read_all(mut reader: ArtifactReader) -> StoreResult<Bytes> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(Bytes::from(buf))
}

/// Normalize a repository path to its slash-separated segments.
pub(crate) fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn content_from_bytes_reports_size() {
        let content = ArtifactContent::from_bytes(Bytes::from_static(b"abc"), depot_core::time::now());
        assert_eq!(content.size, 3);
        assert_eq!(content.into_bytes().await.unwrap(), b"abc");
    }

    #[test]
    fn path_segments_ignore_empty_parts() {
        assert_eq!(path_segments("/org//example/"), vec!["org", "example"]);
        assert!(path_segments("/").is_empty());
    }
}
