//! # Composite Store
//!
//! An ordered list of member stores presented as one repository.
//!
//! - Listings are the union of every member's listing.
//! - Reads go to the first member that resolves the coordinate.
//! - Writes go to one designated member; without one, writes fail.
//! - Metadata and catalogs are merged across members.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use depot_core::{ArchetypeCatalog, Coordinate, GroupPath, Metadata, StoreError, StoreResult};

use crate::{ArtifactContent, ArtifactReader, ArtifactStore};

/// Several stores behind one interface, first match wins.
#[derive(Clone)]
pub struct CompositeStore {
    members: Vec<Arc<dyn ArtifactStore>>,
    writable: Option<usize>,
}

impl std::fmt::Debug for CompositeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeStore")
            .field("members", &self.members.len())
            .field("writable", &self.writable)
            .finish()
    }
}

impl CompositeStore {
    /// Members in priority order; the first writable member receives writes.
    pub fn new(members: Vec<Arc<dyn ArtifactStore>>) -> Self {
        let writable = members.iter().position(|m| m.is_writable());
        Self { members, writable }
    }

    /// Designate the member at `index` for writes, or none.
    pub fn with_writable_member(mut self, index: Option<usize>) -> Self {
        self.writable = index.filter(|i| *i < self.members.len());
        self
    }

    pub fn members(&self) -> &[Arc<dyn ArtifactStore>] {
        &self.members
    }

    fn write_target(&self, path: &str) -> StoreResult<&Arc<dyn ArtifactStore>> {
        self.writable
            .and_then(|i| self.members.get(i))
            .ok_or_else(|| StoreError::write(path, "no writable repository configured"))
    }

    /// First successful result of `op` across members, in order.
    async fn first_match<'a, T, F, Fut>(&'a self, path: String, op: F) -> StoreResult<T>
    where
        F: Fn(&'a Arc<dyn ArtifactStore>) -> Fut,
        Fut: std::future::Future<Output = StoreResult<T>>,
    {
        for (index, member) in self.members.iter().enumerate() {
            match op(member).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    tracing::warn!(member = index, path = %path, error = %e, "member lookup failed");
                }
            }
        }
        Err(StoreError::not_found(path))
    }
}

#[async_trait]
impl ArtifactStore for CompositeStore {
    async fn list_group_segments(&self, prefix: &GroupPath) -> BTreeSet<String> {
        let mut all = BTreeSet::new();
        for member in &self.members {
            all.extend(member.list_group_segments(prefix).await);
        }
        all
    }

    async fn list_names(&self, group: &GroupPath) -> BTreeSet<String> {
        let mut all = BTreeSet::new();
        for member in &self.members {
            all.extend(member.list_names(group).await);
        }
        all
    }

    async fn list_versions(&self, group: &GroupPath, name: &str) -> BTreeSet<String> {
        let mut all = BTreeSet::new();
        for member in &self.members {
            all.extend(member.list_versions(group, name).await);
        }
        all
    }

    async fn list_artifacts(
        &self,
        group: &GroupPath,
        name: &str,
        version: &str,
    ) -> BTreeSet<Coordinate> {
        let mut all = BTreeSet::new();
        for member in &self.members {
            all.extend(member.list_artifacts(group, name, version).await);
        }
        all
    }

    async fn get(&self, coordinate: &Coordinate) -> StoreResult<ArtifactContent> {
        self.first_match(coordinate.repository_path(), |m| m.get(coordinate))
            .await
    }

    async fn last_modified(&self, coordinate: &Coordinate) -> StoreResult<DateTime<Utc>> {
        self.first_match(coordinate.repository_path(), |m| m.last_modified(coordinate))
            .await
    }

    async fn size(&self, coordinate: &Coordinate) -> StoreResult<u64> {
        self.first_match(coordinate.repository_path(), |m| m.size(coordinate))
            .await
    }

    async fn set(&self, coordinate: &Coordinate, content: ArtifactReader) -> StoreResult<()> {
        self.write_target(&coordinate.repository_path())?
            .set(coordinate, content)
            .await
    }

    async fn set_metadata(&self, path: &str, metadata: &Metadata) -> StoreResult<()> {
        self.write_target(path)?.set_metadata(path, metadata).await
    }

    async fn metadata(&self, path: &str) -> StoreResult<Metadata> {
        let mut merged: Option<Metadata> = None;
        for member in &self.members {
            match member.metadata(path).await {
                Ok(metadata) => match merged.as_mut() {
                    Some(m) => m.merge(&metadata),
                    None => merged = Some(metadata),
                },
                Err(e) if e.is_not_found() => {}
                Err(e) => tracing::warn!(path, error = %e, "member metadata failed"),
            }
        }
        merged.ok_or_else(|| StoreError::not_found(path))
    }

    async fn metadata_last_modified(&self, path: &str) -> StoreResult<DateTime<Utc>> {
        let mut newest = None;
        for member in &self.members {
            if let Ok(modified) = member.metadata_last_modified(path).await {
                newest = newest.max(Some(modified));
            }
        }
        newest.ok_or_else(|| StoreError::not_found(path))
    }

    async fn catalog(&self) -> StoreResult<ArchetypeCatalog> {
        let mut merged = ArchetypeCatalog::default();
        for member in &self.members {
            match member.catalog().await {
                Ok(catalog) => merged.merge(&catalog),
                Err(e) => tracing::warn!(error = %e, "member catalog failed"),
            }
        }
        Ok(merged)
    }

    async fn catalog_last_modified(&self) -> StoreResult<DateTime<Utc>> {
        let mut newest = None;
        for member in &self.members {
            if let Ok(modified) = member.catalog_last_modified().await {
                newest = newest.max(Some(modified));
            }
        }
        newest.ok_or_else(|| StoreError::not_found(depot_core::CATALOG_FILE))
    }

    fn is_writable(&self) -> bool {
        self.writable.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use bytes::Bytes;
    use chrono::TimeZone;

    fn group() -> GroupPath {
        GroupPath::from_dotted("org.example")
    }

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, second).single().unwrap()
    }

    #[tokio::test]
    async fn first_member_wins_for_reads() {
        let a = MemoryStore::read_only();
        let b = MemoryStore::new();
        let c = Coordinate::new(group(), "lib", "1.0", "jar");
        a.insert(c.clone(), Bytes::from_static(b"from-a"), at(1));
        b.insert(c.clone(), Bytes::from_static(b"from-b"), at(2));

        let composite = CompositeStore::new(vec![Arc::new(a), Arc::new(b)]);
        let content = composite.get(&c).await.unwrap();
        assert_eq!(content.into_bytes().await.unwrap(), b"from-a");
        assert_eq!(composite.last_modified(&c).await.unwrap(), at(1));
    }

    #[tokio::test]
    async fn listings_are_unioned() {
        let a = MemoryStore::new();
        let b = MemoryStore::new();
        a.insert(Coordinate::new(group(), "x", "1", "jar"), Bytes::new(), at(1));
        b.insert(Coordinate::new(group(), "y", "1", "jar"), Bytes::new(), at(1));
        b.insert(Coordinate::new(group(), "x", "2", "jar"), Bytes::new(), at(1));

        let composite = CompositeStore::new(vec![Arc::new(a), Arc::new(b)]);
        let names = composite.list_names(&group()).await;
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["x", "y"]);
        let versions = composite.list_versions(&group(), "x").await;
        assert_eq!(versions.into_iter().collect::<Vec<_>>(), vec!["1", "2"]);
    }

    #[tokio::test]
    async fn writes_go_to_first_writable_member() {
        let ro = Arc::new(MemoryStore::read_only());
        let rw = Arc::new(MemoryStore::new());
        let composite = CompositeStore::new(vec![ro.clone(), rw.clone()]);
        let c = Coordinate::new(group(), "lib", "1.0", "jar");
        composite.set(&c, Box::new(&b"data"[..])).await.unwrap();

        assert!(ro.get(&c).await.is_err());
        assert!(rw.get(&c).await.is_ok());
    }

    #[tokio::test]
    async fn without_writable_member_writes_fail() {
        let composite = CompositeStore::new(vec![Arc::new(MemoryStore::read_only())]);
        assert!(!composite.is_writable());
        let c = Coordinate::new(group(), "lib", "1.0", "jar");
        let err = composite.set(&c, Box::new(&b"data"[..])).await.unwrap_err();
        assert!(matches!(err, StoreError::WriteError { .. }));
    }

    #[tokio::test]
    async fn metadata_is_merged_across_members() {
        let a = MemoryStore::new();
        let b = MemoryStore::new();
        a.insert(Coordinate::pom(group(), "lib", "1.0"), Bytes::from_static(b"<project/>"), at(1));
        b.insert(Coordinate::pom(group(), "lib", "1.10"), Bytes::from_static(b"<project/>"), at(5));
        b.insert(Coordinate::pom(group(), "lib", "1.2"), Bytes::from_static(b"<project/>"), at(3));

        let composite = CompositeStore::new(vec![Arc::new(a), Arc::new(b)]);
        let versioning = composite.metadata("org/example/lib").await.unwrap().versioning.unwrap();
        assert_eq!(versioning.versions, vec!["1.0", "1.2", "1.10"]);
        assert_eq!(versioning.latest.as_deref(), Some("1.10"));
        assert_eq!(composite.metadata_last_modified("org/example/lib").await.unwrap(), at(5));
        assert!(composite.metadata("org/none").await.unwrap_err().is_not_found());
    }
}
