//! # On-Disk Store
//!
//! A repository-layout directory tree:
//!
//! ```text
//! {root}/{group/path}/{name}/{version}/{file}
//! ```
//!
//! Group segments, names and versions are all plain subdirectories, so the
//! listing at each level is a directory scan. Artifact coordinates are
//! recovered by parsing the file names of a version directory.
//!
//! Writes go to a temporary file in the destination directory and are
//! renamed into place, so a reader never observes a half-written file and
//! an interrupted write leaves nothing behind under the final name.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;

use depot_core::{
    time, ArchetypeCatalog, Coordinate, GroupPath, Metadata, StoreError, StoreResult,
    CATALOG_FILE, METADATA_FILE,
};

use crate::{synth, ArtifactContent, ArtifactReader, ArtifactStore};

/// Artifact store over a directory in repository layout.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
    writable: bool,
    created: DateTime<Utc>,
}

impl DiskStore {
    /// A store rooted at `root`. The directory need not exist yet.
    pub fn new(root: impl Into<PathBuf>, writable: bool) -> Self {
        Self {
            root: root.into(),
            writable,
            created: time::now(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn group_dir(&self, group: &GroupPath) -> PathBuf {
        let mut dir = self.root.clone();
        dir.extend(group.segments());
        dir
    }

    fn version_dir(&self, group: &GroupPath, name: &str, version: &str) -> PathBuf {
        self.group_dir(group).join(name).join(version)
    }

    fn file_path(&self, coordinate: &Coordinate) -> PathBuf {
        self.version_dir(&coordinate.group, &coordinate.name, &coordinate.version)
            .join(coordinate.file_name())
    }

    fn metadata_file(&self, path: &str) -> PathBuf {
        let mut file = self.root.clone();
        file.extend(crate::path_segments(path));
        file.join(METADATA_FILE)
    }

    /// The on-disk file a coordinate resolves to.
    async fn resolve(&self, coordinate: &Coordinate) -> StoreResult<(PathBuf, std::fs::Metadata)> {
        let exact = self.file_path(coordinate);
        match tokio::fs::metadata(&exact).await {
            Ok(meta) if meta.is_file() => return Ok((exact, meta)),
            Ok(_) => return Err(StoreError::not_found(coordinate.repository_path())),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(corrupt(coordinate, e)),
        }
        if !coordinate.is_floating_snapshot() {
            return Err(StoreError::not_found(coordinate.repository_path()));
        }

        let newest = self
            .list_artifacts(&coordinate.group, &coordinate.name, &coordinate.version)
            .await
            .into_iter()
            .filter(|c| coordinate.selects(c))
            .max_by_key(|c| c.stamp)
            .ok_or_else(|| StoreError::not_found(coordinate.repository_path()))?;
        let path = self.file_path(&newest);
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| corrupt(&newest, e))?;
        Ok((path, meta))
    }

    fn check_writable(&self, path: impl Into<String>) -> StoreResult<()> {
        if self.writable {
            Ok(())
        } else {
            Err(StoreError::write(path, "store is read-only"))
        }
    }

    async fn read_document(&self, file: &Path) -> Option<(String, DateTime<Utc>)> {
        let meta = tokio::fs::metadata(file).await.ok()?;
        let modified = meta.modified().ok().map(time::from_system_time)?;
        match tokio::fs::read_to_string(file).await {
            Ok(text) => Some((text, modified)),
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "unreadable document on disk");
                None
            }
        }
    }

    async fn stored_metadata(&self, path: &str) -> Option<(Metadata, DateTime<Utc>)> {
        let file = self.metadata_file(path);
        let (text, modified) = self.read_document(&file).await?;
        match Metadata::from_xml(&text) {
            Ok(metadata) => Some((metadata, modified)),
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "ignoring malformed metadata");
                None
            }
        }
    }

    async fn stored_catalog(&self) -> Option<(ArchetypeCatalog, DateTime<Utc>)> {
        let file = self.root.join(CATALOG_FILE);
        let (text, modified) = self.read_document(&file).await?;
        match ArchetypeCatalog::from_xml(&text) {
            Ok(catalog) => Some((catalog, modified)),
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "ignoring malformed catalog");
                None
            }
        }
    }
}

// -- Filesystem helpers -------------------------------------------------------

fn corrupt(coordinate: &Coordinate, e: std::io::Error) -> StoreError {
    StoreError::CorruptCacheEntry {
        path: coordinate.repository_path(),
        reason: e.to_string(),
    }
}

/// Subdirectory (or plain file) names of `dir`; empty when `dir` is missing.
async fn dir_entries(dir: &Path, want_dirs: bool) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                tracing::debug!(dir = %dir.display(), error = %e, "cannot list directory");
            }
            return names;
        }
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let Ok(file_type) = entry.file_type().await else {
            continue;
        };
        if file_type.is_dir() != want_dirs {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                names.insert(name.to_string());
            }
        }
    }
    names
}

/// Copy `content` to `dest` via a sibling temporary file.
async fn write_atomically(dest: &Path, mut content: ArtifactReader) -> std::io::Result<u64> {
    let dir = dest
        .parent()
        .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "destination has no parent"))?;
    tokio::fs::create_dir_all(dir).await?;

    let file_name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("artifact");
    let temp = dir.join(format!(".{file_name}.{}.part", uuid::Uuid::new_v4()));

    let result = async {
        let mut file = tokio::fs::File::create(&temp).await?;
        let written = tokio::io::copy(&mut content, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp, dest).await?;
        Ok::<u64, std::io::Error>(written)
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&temp).await;
    }
    result
}

#[async_trait]
impl ArtifactStore for DiskStore {
    async fn list_group_segments(&self, prefix: &GroupPath) -> BTreeSet<String> {
        dir_entries(&self.group_dir(prefix), true).await
    }

    async fn list_names(&self, group: &GroupPath) -> BTreeSet<String> {
        if group.is_root() {
            return BTreeSet::new();
        }
        dir_entries(&self.group_dir(group), true).await
    }

    async fn list_versions(&self, group: &GroupPath, name: &str) -> BTreeSet<String> {
        if group.is_root() {
            return BTreeSet::new();
        }
        dir_entries(&self.group_dir(group).join(name), true).await
    }

    async fn list_artifacts(
        &self,
        group: &GroupPath,
        name: &str,
        version: &str,
    ) -> BTreeSet<Coordinate> {
        dir_entries(&self.version_dir(group, name, version), false)
            .await
            .iter()
            .filter_map(|file| Coordinate::from_file_name(group, name, version, file))
            .collect()
    }

    async fn get(&self, coordinate: &Coordinate) -> StoreResult<ArtifactContent> {
        let (path, meta) = self.resolve(coordinate).await?;
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| corrupt(coordinate, e))?;
        let last_modified = meta
            .modified()
            .map(time::from_system_time)
            .map_err(|e| corrupt(coordinate, e))?;
        Ok(ArtifactContent {
            reader: Box::new(file),
            size: meta.len(),
            last_modified,
        })
    }

    async fn last_modified(&self, coordinate: &Coordinate) -> StoreResult<DateTime<Utc>> {
        let (_, meta) = self.resolve(coordinate).await?;
        meta.modified()
            .map(time::from_system_time)
            .map_err(|e| corrupt(coordinate, e))
    }

    async fn size(&self, coordinate: &Coordinate) -> StoreResult<u64> {
        let (_, meta) = self.resolve(coordinate).await?;
        Ok(meta.len())
    }

    async fn set(&self, coordinate: &Coordinate, content: ArtifactReader) -> StoreResult<()> {
        let repository_path = coordinate.repository_path();
        self.check_writable(&repository_path)?;
        let dest = self.file_path(coordinate);
        let written = write_atomically(&dest, content)
            .await
            .map_err(|e| StoreError::write(&repository_path, e.to_string()))?;
        tracing::debug!(path = %dest.display(), size = written, "wrote artifact to disk");
        Ok(())
    }

    async fn set_metadata(&self, path: &str, metadata: &Metadata) -> StoreResult<()> {
        self.check_writable(path)?;
        let dest = self.metadata_file(path);
        let xml = metadata.to_xml().into_bytes();
        write_atomically(&dest, Box::new(std::io::Cursor::new(xml)))
            .await
            .map_err(|e| StoreError::write(path, e.to_string()))?;
        Ok(())
    }

    async fn metadata(&self, path: &str) -> StoreResult<Metadata> {
        let stored = self.stored_metadata(path).await;
        let synthesized = synth::metadata_for(self, path).await;
        match (stored, synthesized) {
            (Some((mut stored, _)), Ok((synthesized, _))) => {
                stored.merge(&synthesized);
                Ok(stored)
            }
            (Some((stored, _)), Err(_)) => Ok(stored),
            (None, result) => result.map(|(metadata, _)| metadata),
        }
    }

    async fn metadata_last_modified(&self, path: &str) -> StoreResult<DateTime<Utc>> {
        let stored = self.stored_metadata(path).await.map(|(_, m)| m);
        let synthesized = synth::metadata_for(self, path).await.ok().map(|(_, m)| m);
        stored
            .max(synthesized)
            .ok_or_else(|| StoreError::not_found(path))
    }

    async fn catalog(&self) -> StoreResult<ArchetypeCatalog> {
        let (mut catalog, _) = synth::catalog_for(self, self.created).await;
        if let Some((stored, _)) = self.stored_catalog().await {
            let mut merged = stored;
            merged.merge(&catalog);
            catalog = merged;
        }
        Ok(catalog)
    }

    async fn catalog_last_modified(&self) -> StoreResult<DateTime<Utc>> {
        let (_, synthesized) = synth::catalog_for(self, self.created).await;
        let stored = self.stored_catalog().await.map(|(_, m)| m);
        Ok(stored.map_or(synthesized, |s| s.max(synthesized)))
    }

    fn is_writable(&self) -> bool {
        self.writable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::SnapshotStamp;

    fn group() -> GroupPath {
        GroupPath::from_dotted("org.example")
    }

    fn reader(bytes: &'static [u8]) -> ArtifactReader {
        Box::new(bytes)
    }

    #[tokio::test]
    async fn write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path(), true);
        let c = Coordinate::new(group(), "lib", "1.0", "jar").with_classifier(Some("sources"));
        store.set(&c, reader(b"content")).await.unwrap();

        assert!(dir.path().join("org/example/lib/1.0/lib-1.0-sources.jar").is_file());
        let content = store.get(&c).await.unwrap();
        assert_eq!(content.size, 7);
        assert_eq!(content.into_bytes().await.unwrap(), b"content");
        assert_eq!(store.list_artifacts(&group(), "lib", "1.0").await.len(), 1);
    }

    #[tokio::test]
    async fn no_temp_files_remain_after_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path(), true);
        let c = Coordinate::new(group(), "lib", "1.0", "jar");
        store.set(&c, reader(b"a")).await.unwrap();
        store.set(&c, reader(b"bb")).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("org/example/lib/1.0"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["lib-1.0.jar"]);
        assert_eq!(store.size(&c).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn listings_follow_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path(), true);
        store
            .set(&Coordinate::new(group(), "lib", "1.0", "jar"), reader(b"x"))
            .await
            .unwrap();
        store
            .set(&Coordinate::new(group(), "lib", "2.0", "pom"), reader(b"x"))
            .await
            .unwrap();

        let roots = store.list_group_segments(&GroupPath::root()).await;
        assert_eq!(roots.into_iter().collect::<Vec<_>>(), vec!["org"]);
        let versions = store.list_versions(&group(), "lib").await;
        assert_eq!(versions.into_iter().collect::<Vec<_>>(), vec!["1.0", "2.0"]);
        assert!(store.list_versions(&group(), "missing").await.is_empty());
        assert!(store
            .list_group_segments(&GroupPath::from_dotted("no.such"))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn read_only_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path(), false);
        let err = store
            .set(&Coordinate::new(group(), "lib", "1.0", "jar"), reader(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::WriteError { .. }));
        assert!(!dir.path().join("org").exists());
    }

    #[tokio::test]
    async fn stamped_snapshots_are_recovered_from_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let version_dir = dir.path().join("org/example/lib/1.0-SNAPSHOT");
        std::fs::create_dir_all(&version_dir).unwrap();
        std::fs::write(version_dir.join("lib-1.0-20240101.000001-1.jar"), b"one").unwrap();
        std::fs::write(version_dir.join("lib-1.0-20240101.000002-2.jar"), b"two").unwrap();
        std::fs::write(version_dir.join("unrelated.txt"), b"?").unwrap();

        let store = DiskStore::new(dir.path(), false);
        let artifacts = store.list_artifacts(&group(), "lib", "1.0-SNAPSHOT").await;
        assert_eq!(artifacts.len(), 2);
        assert!(artifacts.iter().all(|c| c.stamp.is_some()));

        let floating = Coordinate::new(group(), "lib", "1.0-SNAPSHOT", "jar");
        let content = store.get(&floating).await.unwrap();
        assert_eq!(content.into_bytes().await.unwrap(), b"two");

        let stamp = SnapshotStamp::parse("20240101.000001-1").unwrap();
        let first = floating.with_stamp(Some(stamp));
        assert_eq!(store.size(&first).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn stored_metadata_is_served_and_merged() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path(), true);
        store
            .set(&Coordinate::pom(group(), "lib", "1.0"), reader(b"<project/>"))
            .await
            .unwrap();
        let uploaded = Metadata {
            group_id: Some("org.example".into()),
            artifact_id: Some("lib".into()),
            versioning: Some(depot_core::Versioning {
                versions: vec!["0.9".into()],
                ..Default::default()
            }),
            ..Metadata::default()
        };
        store.set_metadata("org/example/lib", &uploaded).await.unwrap();
        assert!(dir.path().join("org/example/lib/maven-metadata.xml").is_file());

        let metadata = store.metadata("org/example/lib").await.unwrap();
        let versions = metadata.versioning.unwrap().versions;
        assert_eq!(versions, vec!["0.9", "1.0"]);
    }

    #[tokio::test]
    async fn directory_in_place_of_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("org/example/lib/1.0/lib-1.0.jar")).unwrap();
        let store = DiskStore::new(dir.path(), false);
        let err = store
            .get(&Coordinate::new(group(), "lib", "1.0", "jar"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
