//! The filesystem view over an [`ArtifactStore`].

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::io::AsyncReadExt;

use depot_core::{
    time, ChecksumAlgorithm, Coordinate, Metadata, StoreError, StoreResult, CATALOG_FILE,
    METADATA_FILE,
};
use depot_store::{ArtifactContent, ArtifactReader, ArtifactStore};

use crate::entry::{Entry, EntryStat, FileKind};
use crate::path::VfsPath;

/// Checksum siblings advertised in directory listings.
const LISTED_CHECKSUMS: [ChecksumAlgorithm; 2] = [ChecksumAlgorithm::Md5, ChecksumAlgorithm::Sha1];

const HASH_CHUNK: usize = 64 * 1024;

/// Presents a store as a tree of directories and files.
#[derive(Clone)]
pub struct StoreFileSystem {
    store: Arc<dyn ArtifactStore>,
}

impl std::fmt::Debug for StoreFileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreFileSystem")
            .field("writable", &self.store.is_writable())
            .finish_non_exhaustive()
    }
}

impl StoreFileSystem {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    // -- Listing ------------------------------------------------------------

    /// Children of a directory, sorted by name. Empty when nothing is there.
    pub async fn list(&self, dir: &VfsPath) -> Vec<Entry> {
        let mut entries: BTreeMap<String, Entry> = BTreeMap::new();
        let mut insert = |entry: Entry| {
            entries.entry(entry.name().to_string()).or_insert(entry);
        };

        if dir.is_root() {
            for segment in self.store.list_group_segments(&dir.as_group()).await {
                insert(Entry::Directory(dir.join(&segment)));
            }
            if self.store.catalog().await.is_ok_and(|c| !c.is_empty()) {
                insert(Entry::File {
                    path: dir.join(CATALOG_FILE),
                    kind: FileKind::Catalog,
                });
            }
        } else {
            if self.store.metadata_last_modified(&dir.relative()).await.is_ok() {
                insert(Entry::File {
                    path: dir.join(METADATA_FILE),
                    kind: FileKind::Metadata(dir.clone()),
                });
            }

            let group = dir.as_group();
            for segment in self.store.list_group_segments(&group).await {
                insert(Entry::Directory(dir.join(&segment)));
            }
            for name in self.store.list_names(&group).await {
                insert(Entry::Directory(dir.join(&name)));
            }

            if let (Some(group), Some(name)) = (dir.group_without_last(1), dir.from_end(0)) {
                for version in self.store.list_versions(&group, name).await {
                    insert(Entry::Directory(dir.join(&version)));
                }
            }

            if let (Some(group), Some(name), Some(version)) =
                (dir.group_without_last(2), dir.from_end(1), dir.from_end(0))
            {
                for coordinate in self.store.list_artifacts(&group, name, version).await {
                    insert(Entry::File {
                        path: dir.join(&coordinate.file_name()),
                        kind: FileKind::Artifact(coordinate),
                    });
                }
            }
        }

        let siblings: Vec<Entry> = entries
            .values()
            .filter_map(|entry| match entry {
                Entry::File { path, kind } if !is_checksum_name(path.name()) => {
                    Some((path, kind))
                }
                _ => None,
            })
            .flat_map(|(path, kind)| {
                LISTED_CHECKSUMS
                    .iter()
                    .map(move |algorithm| Entry::checksum(path, kind, *algorithm))
            })
            .collect();
        for sibling in siblings {
            entries.entry(sibling.name().to_string()).or_insert(sibling);
        }

        entries.into_values().collect()
    }

    // -- Lookup -------------------------------------------------------------

    /// Resolve a path to an entry.
    pub async fn lookup(&self, path: &VfsPath) -> StoreResult<Entry> {
        if path.is_root() {
            return Ok(Entry::Directory(VfsPath::root()));
        }
        if let Some(kind) = self.resolve_file(path).await? {
            return Ok(Entry::File {
                path: path.clone(),
                kind,
            });
        }
        if path.name() == "favicon.ico" {
            return Err(StoreError::not_found(path.to_string()));
        }
        if self.list(path).await.is_empty() {
            return Err(StoreError::not_found(path.to_string()));
        }
        Ok(Entry::Directory(path.clone()))
    }

    async fn resolve_file(&self, path: &VfsPath) -> StoreResult<Option<FileKind>> {
        if let Some(kind) = self.resolve_stored(path).await? {
            return Ok(Some(kind));
        }
        let Some((base, algorithm)) = ChecksumAlgorithm::split_file_name(path.name()) else {
            return Ok(None);
        };
        let underlying = path.parent().unwrap_or_default().join(base);
        Ok(self
            .resolve_stored(&underlying)
            .await?
            .map(|kind| FileKind::Checksum {
                of: Box::new(kind),
                algorithm,
            }))
    }

    /// Everything except synthesized checksums.
    async fn resolve_stored(&self, path: &VfsPath) -> StoreResult<Option<FileKind>> {
        let name = path.name();
        let parent = path.parent().unwrap_or_default();

        if name == "favicon.ico" {
            return Ok(None);
        }
        if name == METADATA_FILE {
            return Ok(self
                .store
                .metadata_last_modified(&parent.relative())
                .await
                .is_ok()
                .then(|| FileKind::Metadata(parent)));
        }
        if name == CATALOG_FILE && parent.is_root() {
            return Ok(Some(FileKind::Catalog));
        }
        if path.len() < 4 {
            return Ok(None);
        }
        // A stored file wins over a synthesized checksum of the same name.
        let Ok(coordinate) = Coordinate::from_repository_path(&path.relative()) else {
            return Ok(None);
        };
        match self.store.last_modified(&coordinate).await {
            Ok(_) => Ok(Some(FileKind::Artifact(coordinate))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    // -- Attributes ---------------------------------------------------------

    pub async fn stat(&self, entry: &Entry) -> StoreResult<EntryStat> {
        match entry {
            Entry::Directory(_) => Ok(EntryStat {
                size: None,
                last_modified: time::now(),
            }),
            Entry::File { kind, .. } => self.stat_file(kind).await,
        }
    }

    async fn stat_file(&self, kind: &FileKind) -> StoreResult<EntryStat> {
        let (size, last_modified) = match kind {
            FileKind::Artifact(c) => (self.store.size(c).await?, self.store.last_modified(c).await?),
            FileKind::Metadata(dir) => {
                let path = dir.relative();
                let xml = self.store.metadata(&path).await?.to_xml();
                (xml.len() as u64, self.store.metadata_last_modified(&path).await?)
            }
            FileKind::Catalog => {
                let xml = self.store.catalog().await?.to_xml();
                (xml.len() as u64, self.store.catalog_last_modified().await?)
            }
            FileKind::Checksum { of, algorithm } => {
                (algorithm.hex_len(), self.stored_last_modified(of).await?)
            }
        };
        Ok(EntryStat {
            size: Some(size),
            last_modified,
        })
    }

    async fn stored_last_modified(&self, kind: &FileKind) -> StoreResult<DateTime<Utc>> {
        match kind {
            FileKind::Artifact(c) => self.store.last_modified(c).await,
            FileKind::Metadata(dir) => self.store.metadata_last_modified(&dir.relative()).await,
            FileKind::Catalog => self.store.catalog_last_modified().await,
            FileKind::Checksum { .. } => Err(nested_checksum()),
        }
    }

    // -- Content ------------------------------------------------------------

    /// Open a file entry for reading.
    pub async fn open(&self, entry: &Entry) -> StoreResult<ArtifactContent> {
        match entry {
            Entry::Directory(path) => Err(StoreError::InvalidPath(format!(
                "{path} is a directory"
            ))),
            Entry::File { kind, .. } => self.open_file(kind).await,
        }
    }

    async fn open_file(&self, kind: &FileKind) -> StoreResult<ArtifactContent> {
        match kind {
            FileKind::Checksum { of, algorithm } => {
                let mut content = self.open_stored(of).await?;
                let mut hasher = algorithm.hasher();
                let mut buf = vec![0u8; HASH_CHUNK];
                loop {
                    let n = content.reader.read(&mut buf).await?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buf[..n]);
                }
                Ok(ArtifactContent::from_bytes(
                    Bytes::from(hasher.finalize_hex()),
                    content.last_modified,
                ))
            }
            other => self.open_stored(other).await,
        }
    }

    async fn open_stored(&self, kind: &FileKind) -> StoreResult<ArtifactContent> {
        match kind {
            FileKind::Artifact(c) => self.store.get(c).await,
            FileKind::Metadata(dir) => {
                let path = dir.relative();
                let xml = self.store.metadata(&path).await?.to_xml();
                let modified = self.store.metadata_last_modified(&path).await?;
                Ok(ArtifactContent::from_bytes(Bytes::from(xml), modified))
            }
            FileKind::Catalog => {
                let xml = self.store.catalog().await?.to_xml();
                let modified = self.store.catalog_last_modified().await?;
                Ok(ArtifactContent::from_bytes(Bytes::from(xml), modified))
            }
            FileKind::Checksum { .. } => Err(nested_checksum()),
        }
    }

    // -- Writes -------------------------------------------------------------

    /// Store a file named `name` in directory `dir`.
    pub async fn put(&self, dir: &VfsPath, name: &str, mut content: ArtifactReader) -> StoreResult<()> {
        let target = dir.join(name);

        if name == METADATA_FILE {
            let mut xml = String::new();
            content.read_to_string(&mut xml).await?;
            let metadata = Metadata::from_xml(&xml)
                .map_err(|e| StoreError::write(target.to_string(), e.to_string()))?;
            return self.store.set_metadata(&dir.relative(), &metadata).await;
        }

        // Digests of synthesized documents are recomputed on every read.
        if let Some((base, _)) = ChecksumAlgorithm::split_file_name(name) {
            if base == METADATA_FILE || base == CATALOG_FILE {
                tokio::io::copy(&mut content, &mut tokio::io::sink()).await?;
                tracing::debug!(path = %target, "discarded uploaded document checksum");
                return Ok(());
            }
        }

        let coordinate = match (dir.group_without_last(2), dir.from_end(1), dir.from_end(0)) {
            (Some(group), Some(artifact), Some(version)) if !group.is_root() => {
                Coordinate::from_file_name(&group, artifact, version, name)
            }
            _ => None,
        };
        match coordinate {
            Some(coordinate) => self.store.set(&coordinate, content).await,
            None => Err(StoreError::write(
                target.to_string(),
                "not an artifact, metadata or checksum file name",
            )),
        }
    }
}

fn nested_checksum() -> StoreError {
    StoreError::InvalidPath("checksum of a checksum".into())
}

fn is_checksum_name(name: &str) -> bool {
    ChecksumAlgorithm::split_file_name(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use depot_core::GroupPath;
    use depot_store::MemoryStore;
    use std::io::Cursor;

    fn jar() -> Coordinate {
        Coordinate::new(GroupPath::from_dotted("org.example"), "lib", "1.0", "jar")
    }

    fn seeded() -> (MemoryStore, StoreFileSystem) {
        let store = MemoryStore::new();
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single().unwrap();
        store.insert(jar(), Bytes::from_static(b"jar"), at);
        store.insert(
            Coordinate::pom(GroupPath::from_dotted("org.example"), "lib", "1.0"),
            Bytes::from_static(b"<project/>"),
            at,
        );
        let fs = StoreFileSystem::new(Arc::new(store.clone()));
        (store, fs)
    }

    fn path(raw: &str) -> VfsPath {
        VfsPath::parse(raw).unwrap()
    }

    fn names(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(Entry::name).collect()
    }

    #[tokio::test]
    async fn version_listing_has_files_and_checksums() {
        let (_, fs) = seeded();
        let entries = fs.list(&path("org/example/lib/1.0")).await;
        assert_eq!(
            names(&entries),
            vec![
                "lib-1.0.jar",
                "lib-1.0.jar.md5",
                "lib-1.0.jar.sha1",
                "lib-1.0.pom",
                "lib-1.0.pom.md5",
                "lib-1.0.pom.sha1",
            ]
        );
    }

    #[tokio::test]
    async fn artifact_listing_has_metadata_and_versions() {
        let (_, fs) = seeded();
        let entries = fs.list(&path("org/example/lib")).await;
        let names = names(&entries);
        assert!(names.contains(&"1.0"));
        assert!(names.contains(&"maven-metadata.xml"));
        assert!(names.contains(&"maven-metadata.xml.sha1"));
        assert!(entries.iter().any(|e| e.name() == "1.0" && e.is_directory()));
    }

    #[tokio::test]
    async fn root_lists_group_segments() {
        let (_, fs) = seeded();
        let entries = fs.list(&VfsPath::root()).await;
        assert_eq!(names(&entries), vec!["org"]);
    }

    #[tokio::test]
    async fn lookup_kinds() {
        let (_, fs) = seeded();
        assert!(fs.lookup(&path("org/example")).await.unwrap().is_directory());
        assert!(matches!(
            fs.lookup(&path("org/example/lib/1.0/lib-1.0.jar")).await.unwrap(),
            Entry::File { kind: FileKind::Artifact(_), .. }
        ));
        assert!(matches!(
            fs.lookup(&path("org/example/lib/1.0/lib-1.0.jar.sha1")).await.unwrap(),
            Entry::File { kind: FileKind::Checksum { algorithm: ChecksumAlgorithm::Sha1, .. }, .. }
        ));
        assert!(matches!(
            fs.lookup(&path("org/example/lib/maven-metadata.xml")).await.unwrap(),
            Entry::File { kind: FileKind::Metadata(_), .. }
        ));
        assert!(matches!(
            fs.lookup(&path("archetype-catalog.xml")).await.unwrap(),
            Entry::File { kind: FileKind::Catalog, .. }
        ));
    }

    #[tokio::test]
    async fn lookup_misses() {
        let (_, fs) = seeded();
        for miss in [
            "favicon.ico",
            "org/example/lib/1.0/lib-2.0.jar",
            "org/example/lib/1.0/lib-2.0.jar.md5",
            "com/nothing",
            "org/example/missing/maven-metadata.xml",
        ] {
            let err = fs.lookup(&path(miss)).await.unwrap_err();
            assert!(err.is_not_found(), "{miss}: {err}");
        }
    }

    #[tokio::test]
    async fn checksum_content_and_stat() {
        let (_, fs) = seeded();
        let entry = fs.lookup(&path("org/example/lib/1.0/lib-1.0.jar.md5")).await.unwrap();
        let stat = fs.stat(&entry).await.unwrap();
        assert_eq!(stat.size, Some(32));
        assert_eq!(
            stat.last_modified,
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single().unwrap()
        );
        let body = fs.open(&entry).await.unwrap().into_bytes().await.unwrap();
        assert_eq!(body, ChecksumAlgorithm::Md5.digest_hex(b"jar").into_bytes());
    }

    #[tokio::test]
    async fn metadata_stat_matches_content() {
        let (_, fs) = seeded();
        let entry = fs.lookup(&path("org/example/lib/maven-metadata.xml")).await.unwrap();
        let stat = fs.stat(&entry).await.unwrap();
        let body = fs.open(&entry).await.unwrap().into_bytes().await.unwrap();
        assert_eq!(stat.size, Some(body.len() as u64));
        assert!(String::from_utf8(body).unwrap().contains("<version>1.0</version>"));
    }

    #[tokio::test]
    async fn directory_stat_has_no_size() {
        let (_, fs) = seeded();
        let stat = fs.stat(&Entry::Directory(path("org"))).await.unwrap();
        assert_eq!(stat.size, None);
        assert!(fs.open(&Entry::Directory(path("org"))).await.is_err());
    }

    #[tokio::test]
    async fn put_artifact_then_read_back() {
        let (_, fs) = seeded();
        let dir = path("org/example/lib/2.0");
        fs.put(&dir, "lib-2.0-sources.jar", Box::new(Cursor::new(b"src".to_vec())))
            .await
            .unwrap();
        let entry = fs.lookup(&dir.join("lib-2.0-sources.jar")).await.unwrap();
        let body = fs.open(&entry).await.unwrap().into_bytes().await.unwrap();
        assert_eq!(body, b"src");
    }

    #[tokio::test]
    async fn put_metadata_is_parsed() {
        let (store, fs) = seeded();
        let xml = "<metadata><groupId>org.example</groupId><artifactId>lib</artifactId>\
                   <versioning><versions><version>0.9</version></versions></versioning></metadata>";
        fs.put(&path("org/example/lib"), METADATA_FILE, Box::new(Cursor::new(xml.as_bytes().to_vec())))
            .await
            .unwrap();
        let versions = store.metadata("org/example/lib").await.unwrap().versioning.unwrap().versions;
        assert!(versions.contains(&"0.9".to_string()));
        assert!(versions.contains(&"1.0".to_string()));
    }

    #[tokio::test]
    async fn put_rejects_garbage() {
        let (_, fs) = seeded();
        let err = fs
            .put(&path("org"), "notes.txt", Box::new(Cursor::new(Vec::new())))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::WriteError { .. }));

        let err = fs
            .put(&path("org/example/lib"), METADATA_FILE, Box::new(Cursor::new(b"<html/>".to_vec())))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::WriteError { .. }));
    }

    #[tokio::test]
    async fn put_metadata_checksum_is_accepted() {
        let (_, fs) = seeded();
        fs.put(
            &path("org/example/lib"),
            "maven-metadata.xml.sha1",
            Box::new(Cursor::new(b"0000".to_vec())),
        )
        .await
        .unwrap();
    }
}
