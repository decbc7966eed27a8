//! # In-Memory Store
//!
//! Content lives in nested ordered maps (group → name → version →
//! coordinate), so every listing is a sorted key scan. The whole tree sits
//! behind one `parking_lot::RwLock`; guards are dropped before any `.await`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use depot_core::{
    time, ArchetypeCatalog, Coordinate, GroupPath, Metadata, StoreError, StoreResult,
};

use crate::{read_all, synth, ArtifactContent, ArtifactReader, ArtifactStore};

type Versions = BTreeMap<String, BTreeMap<Coordinate, Content>>;

#[derive(Debug, Clone)]
struct Content {
    bytes: Bytes,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    contents: BTreeMap<GroupPath, BTreeMap<String, Versions>>,
    /// Uploaded `maven-metadata.xml` documents, keyed by normalized path.
    metadata: HashMap<String, (Metadata, DateTime<Utc>)>,
}

/// Artifact store held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    writable: bool,
    created: DateTime<Utc>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// An empty writable store.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            writable: true,
            created: time::now(),
        }
    }

    /// An empty store that rejects client writes.
    pub fn read_only() -> Self {
        Self {
            writable: false,
            ..Self::new()
        }
    }

    /// Insert content regardless of the writable flag. Used to seed fixtures.
    pub fn insert(&self, coordinate: Coordinate, bytes: Bytes, last_modified: DateTime<Utc>) {
        let mut state = self.state.write();
        state
            .contents
            .entry(coordinate.group.clone())
            .or_default()
            .entry(coordinate.name.clone())
            .or_default()
            .entry(coordinate.version.clone())
            .or_default()
            .insert(
                coordinate,
                Content {
                    bytes,
                    last_modified: time::truncate_to_seconds(last_modified),
                },
            );
    }

    /// Record a metadata document regardless of the writable flag.
    pub fn insert_metadata(&self, path: &str, metadata: Metadata, last_modified: DateTime<Utc>) {
        self.state
            .write()
            .metadata
            .insert(normalize(path), (metadata, time::truncate_to_seconds(last_modified)));
    }

    /// Exact match, or the newest stamp for a floating snapshot.
    fn lookup(&self, coordinate: &Coordinate) -> Option<(Coordinate, Content)> {
        let state = self.state.read();
        let files = state
            .contents
            .get(&coordinate.group)?
            .get(&coordinate.name)?
            .get(&coordinate.version)?;
        if let Some(content) = files.get(coordinate) {
            return Some((coordinate.clone(), content.clone()));
        }
        files
            .iter()
            .filter(|(c, _)| coordinate.selects(c))
            .max_by_key(|(c, _)| c.stamp)
            .map(|(c, content)| (c.clone(), content.clone()))
    }

    fn uploaded_metadata(&self, path: &str) -> Option<(Metadata, DateTime<Utc>)> {
        self.state.read().metadata.get(&normalize(path)).cloned()
    }

    fn check_writable(&self, path: impl Into<String>) -> StoreResult<()> {
        if self.writable {
            Ok(())
        } else {
            Err(StoreError::write(path, "store is read-only"))
        }
    }
}

fn normalize(path: &str) -> String {
    crate::path_segments(path).join("/")
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn list_group_segments(&self, prefix: &GroupPath) -> BTreeSet<String> {
        let state = self.state.read();
        state
            .contents
            .keys()
            .filter_map(|group| group.segment_below(prefix))
            .map(str::to_string)
            .collect()
    }

    async fn list_names(&self, group: &GroupPath) -> BTreeSet<String> {
        let state = self.state.read();
        state
            .contents
            .get(group)
            .map(|names| names.keys().cloned().collect())
            .unwrap_or_default()
    }

    async fn list_versions(&self, group: &GroupPath, name: &str) -> BTreeSet<String> {
        let state = self.state.read();
        state
            .contents
            .get(group)
            .and_then(|names| names.get(name))
            .map(|versions| versions.keys().cloned().collect())
            .unwrap_or_default()
    }

    async fn list_artifacts(
        &self,
        group: &GroupPath,
        name: &str,
        version: &str,
    ) -> BTreeSet<Coordinate> {
        let state = self.state.read();
        state
            .contents
            .get(group)
            .and_then(|names| names.get(name))
            .and_then(|versions| versions.get(version))
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    async fn get(&self, coordinate: &Coordinate) -> StoreResult<ArtifactContent> {
        let (_, content) = self
            .lookup(coordinate)
            .ok_or_else(|| StoreError::not_found(coordinate.repository_path()))?;
        Ok(ArtifactContent::from_bytes(content.bytes, content.last_modified))
    }

    async fn last_modified(&self, coordinate: &Coordinate) -> StoreResult<DateTime<Utc>> {
        self.lookup(coordinate)
            .map(|(_, content)| content.last_modified)
            .ok_or_else(|| StoreError::not_found(coordinate.repository_path()))
    }

    async fn size(&self, coordinate: &Coordinate) -> StoreResult<u64> {
        self.lookup(coordinate)
            .map(|(_, content)| content.bytes.len() as u64)
            .ok_or_else(|| StoreError::not_found(coordinate.repository_path()))
    }

    async fn set(&self, coordinate: &Coordinate, content: ArtifactReader) -> StoreResult<()> {
        self.check_writable(coordinate.repository_path())?;
        let bytes = read_all(content)
            .await
            .map_err(|e| StoreError::write(coordinate.repository_path(), e.to_string()))?;
        tracing::debug!(coordinate = %coordinate, size = bytes.len(), "stored artifact in memory");
        self.insert(coordinate.clone(), bytes, time::now());
        Ok(())
    }

    async fn set_metadata(&self, path: &str, metadata: &Metadata) -> StoreResult<()> {
        self.check_writable(path)?;
        self.insert_metadata(path, metadata.clone(), time::now());
        Ok(())
    }

    async fn metadata(&self, path: &str) -> StoreResult<Metadata> {
        let uploaded = self.uploaded_metadata(path);
        let synthesized = synth::metadata_for(self, path).await;
        match (uploaded, synthesized) {
            (Some((mut uploaded, _)), Ok((synthesized, _))) => {
                uploaded.merge(&synthesized);
                Ok(uploaded)
            }
            (Some((uploaded, _)), Err(_)) => Ok(uploaded),
            (None, result) => result.map(|(metadata, _)| metadata),
        }
    }

    async fn metadata_last_modified(&self, path: &str) -> StoreResult<DateTime<Utc>> {
        let uploaded = self.uploaded_metadata(path).map(|(_, modified)| modified);
        let synthesized = synth::metadata_for(self, path).await.ok().map(|(_, m)| m);
        uploaded
            .max(synthesized)
            .ok_or_else(|| StoreError::not_found(path))
    }

    async fn catalog(&self) -> StoreResult<ArchetypeCatalog> {
        Ok(synth::catalog_for(self, self.created).await.0)
    }

    async fn catalog_last_modified(&self) -> StoreResult<DateTime<Utc>> {
        Ok(synth::catalog_for(self, self.created).await.1)
    }

    fn is_writable(&self) -> bool {
        self.writable
    }
}
