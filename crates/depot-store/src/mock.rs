//! # Mock Store
//!
//! Test fixtures are kept as a directory in repository layout. A
//! [`MockStore`] walks that directory once at construction and serves a
//! read-only in-memory copy, so fixtures can be edited on disk without
//! the server ever writing to them.
//!
//! ## Fixture conventions
//!
//! | On disk                                      | Served as                          |
//! |----------------------------------------------|------------------------------------|
//! | `{name}-{version}.pom` with no jar beside it  | An empty jar (`jar` packaging)     |
//! | the same, with `maven-plugin` packaging      | A jar carrying `plugin.xml`        |
//! | a directory named like a jar file            | That directory packed into a jar   |
//! | `archetype-catalog.xml` at the root          | The store's archetype catalog      |

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use depot_core::{
    time, ArchetypeCatalog, Coordinate, GroupPath, Metadata, PomSummary, StoreError, StoreResult,
    CATALOG_FILE, METADATA_FILE,
};

use crate::{jar, ArtifactContent, ArtifactReader, ArtifactStore, MemoryStore};

/// Read-only store seeded from a repository-layout directory.
#[derive(Debug, Clone)]
pub struct MockStore {
    source: PathBuf,
    inner: MemoryStore,
    catalog: Option<(ArchetypeCatalog, DateTime<Utc>)>,
}

/// A POM found while loading, kept until every file has been seen.
struct LoadedPom {
    coordinate: Coordinate,
    summary: PomSummary,
    modified: DateTime<Utc>,
}

impl MockStore {
    /// Load every artifact and metadata file below `source`.
    pub async fn load(source: impl Into<PathBuf>) -> StoreResult<Self> {
        let source = source.into();
        let inner = MemoryStore::read_only();
        let mut poms = Vec::new();
        let mut loaded = 0usize;

        let mut pending = vec![source.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    if pack_directory(&inner, &source, &path).await? {
                        loaded += 1;
                    } else {
                        pending.push(path);
                    }
                    continue;
                }
                // the root catalog is read separately
                let root_catalog = dir == source && entry.file_name() == CATALOG_FILE;
                if file_type.is_file()
                    && !root_catalog
                    && seed(&inner, &source, &path, &mut poms).await?
                {
                    loaded += 1;
                }
            }
        }

        for pom in &poms {
            if synthesize_jar(&inner, pom).await? {
                loaded += 1;
            }
        }

        let catalog = load_catalog(&source.join(CATALOG_FILE)).await?;

        tracing::info!(
            source = %source.display(),
            files = loaded,
            catalog = catalog.is_some(),
            "loaded mock repository"
        );
        Ok(Self {
            source,
            inner,
            catalog,
        })
    }

    /// Directory the fixtures were loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Components of `path` below `root`.
fn repository_path(root: &Path, path: &Path) -> Option<Vec<String>> {
    let relative = path.strip_prefix(root).ok()?;
    Some(
        relative
            .components()
            .filter_map(|c| c.as_os_str().to_str().map(str::to_string))
            .collect(),
    )
}

async fn modified_at(path: &Path) -> StoreResult<DateTime<Utc>> {
    Ok(tokio::fs::metadata(path)
        .await?
        .modified()
        .map(time::from_system_time)
        .unwrap_or_else(|_| time::now()))
}

/// Add one file to the store; returns whether it was recognized.
async fn seed(
    store: &MemoryStore,
    root: &Path,
    file: &Path,
    poms: &mut Vec<LoadedPom>,
) -> StoreResult<bool> {
    let Some(relative) = repository_path(root, file) else {
        return Ok(false);
    };
    let repository_path = relative.join("/");
    let modified = modified_at(file).await?;

    if relative.last().map(String::as_str) == Some(METADATA_FILE) {
        let text = tokio::fs::read_to_string(file).await?;
        match Metadata::from_xml(&text) {
            Ok(metadata) => {
                let dir = relative[..relative.len() - 1].join("/");
                store.insert_metadata(&dir, metadata, modified);
                return Ok(true);
            }
            Err(e) => {
                tracing::warn!(path = %repository_path, error = %e, "skipping malformed metadata");
                return Ok(false);
            }
        }
    }

    let Ok(coordinate) = Coordinate::from_repository_path(&repository_path) else {
        tracing::debug!(path = %repository_path, "ignoring file outside repository layout");
        return Ok(false);
    };
    let bytes = tokio::fs::read(file).await?;

    if coordinate.extension == "pom" && coordinate.classifier.is_none() {
        let summary = std::str::from_utf8(&bytes)
            .map_err(|e| StoreError::invalid_document("pom", e.to_string()))
            .and_then(PomSummary::parse);
        match summary {
            Ok(summary) => poms.push(LoadedPom {
                coordinate: coordinate.clone(),
                summary,
                modified,
            }),
            Err(e) => {
                tracing::warn!(path = %repository_path, error = %e, "could not parse pom");
            }
        }
    }

    store.insert(coordinate, Bytes::from(bytes), modified);
    Ok(true)
}

/// Pack `dir` into a jar when its name is a jar file name in repository
/// layout; returns false for ordinary directories.
async fn pack_directory(store: &MemoryStore, root: &Path, dir: &Path) -> StoreResult<bool> {
    let Some(relative) = repository_path(root, dir) else {
        return Ok(false);
    };
    let coordinate = match Coordinate::from_repository_path(&relative.join("/")) {
        Ok(c) if c.extension == "jar" => c,
        _ => return Ok(false),
    };

    let mut entries = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let mut listing = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = listing.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                if let Some(name) = repository_path(dir, &path) {
                    entries.push((name.join("/"), tokio::fs::read(&path).await?));
                }
            }
        }
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    tracing::debug!(
        path = %coordinate.repository_path(),
        entries = entries.len(),
        "packed directory into jar"
    );
    let modified = modified_at(dir).await?;
    store.insert(coordinate, jar::pack(entries)?, modified);
    Ok(true)
}

/// Give a POM without a main jar an empty one, for `jar` and
/// `maven-plugin` packaging only.
async fn synthesize_jar(store: &MemoryStore, pom: &LoadedPom) -> StoreResult<bool> {
    let main = Coordinate {
        extension: "jar".to_string(),
        ..pom.coordinate.clone()
    };
    if store.last_modified(&main).await.is_ok() {
        return Ok(false);
    }
    let bytes = if pom.summary.is_maven_plugin() {
        jar::empty_plugin(&main.group, &main.name, main.base_version())?
    } else if pom.summary.packaging == "jar" {
        jar::empty()?
    } else {
        return Ok(false);
    };
    tracing::debug!(path = %main.repository_path(), "synthesized empty jar");
    store.insert(main, bytes, pom.modified);
    Ok(true)
}

/// Parse the root catalog if present; a malformed one is skipped.
async fn load_catalog(path: &Path) -> StoreResult<Option<(ArchetypeCatalog, DateTime<Utc>)>> {
    match tokio::fs::metadata(path).await {
        Ok(m) if m.is_file() => {}
        _ => return Ok(None),
    }
    let text = tokio::fs::read_to_string(path).await?;
    match ArchetypeCatalog::from_xml(&text) {
        Ok(catalog) => Ok(Some((catalog, modified_at(path).await?))),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping malformed archetype catalog");
            Ok(None)
        }
    }
}

#[async_trait]
impl ArtifactStore for MockStore {
    async fn list_group_segments(&self, prefix: &GroupPath) -> BTreeSet<String> {
        self.inner.list_group_segments(prefix).await
    }

    async fn list_names(&self, group: &GroupPath) -> BTreeSet<String> {
        self.inner.list_names(group).await
    }

    async fn list_versions(&self, group: &GroupPath, name: &str) -> BTreeSet<String> {
        self.inner.list_versions(group, name).await
    }

    async fn list_artifacts(
        &self,
        group: &GroupPath,
        name: &str,
        version: &str,
    ) -> BTreeSet<Coordinate> {
        self.inner.list_artifacts(group, name, version).await
    }

    async fn get(&self, coordinate: &Coordinate) -> StoreResult<ArtifactContent> {
        self.inner.get(coordinate).await
    }

    async fn last_modified(&self, coordinate: &Coordinate) -> StoreResult<DateTime<Utc>> {
        self.inner.last_modified(coordinate).await
    }

    async fn size(&self, coordinate: &Coordinate) -> StoreResult<u64> {
        self.inner.size(coordinate).await
    }

    async fn set(&self, coordinate: &Coordinate, _content: ArtifactReader) -> StoreResult<()> {
        Err(StoreError::write(
            coordinate.repository_path(),
            "mock repositories are read-only",
        ))
    }

    async fn set_metadata(&self, path: &str, _metadata: &Metadata) -> StoreResult<()> {
        Err(StoreError::write(path, "mock repositories are read-only"))
    }

    async fn metadata(&self, path: &str) -> StoreResult<Metadata> {
        self.inner.metadata(path).await
    }

    async fn metadata_last_modified(&self, path: &str) -> StoreResult<DateTime<Utc>> {
        self.inner.metadata_last_modified(path).await
    }

    async fn catalog(&self) -> StoreResult<ArchetypeCatalog> {
        match &self.catalog {
            Some((catalog, _)) => Ok(catalog.clone()),
            None => self.inner.catalog().await,
        }
    }

    async fn catalog_last_modified(&self) -> StoreResult<DateTime<Utc>> {
        match &self.catalog {
            Some((_, modified)) => Ok(*modified),
            None => self.inner.catalog_last_modified().await,
        }
    }

    fn is_writable(&self) -> bool {
        false
    }
}
