//! # Document Synthesis
//!
//! Builds `maven-metadata.xml` and `archetype-catalog.xml` content from a
//! store's listings. Every store that does not persist these documents
//! derives them here, so a write is reflected on the next read without
//! any bookkeeping.
//!
//! A metadata path is interpreted at up to three levels at once and the
//! results are combined:
//!
//! | Interpretation of `a/b/c`          | Contributes                   |
//! |------------------------------------|-------------------------------|
//! | group `a.b.c`                      | `plugins`                     |
//! | group `a.b`, artifact `c`          | identity and `versioning`     |
//! | group `a`, artifact `b`, snapshot `c` | `snapshot`, `snapshotVersions` |

use chrono::{DateTime, Utc};

use depot_core::metadata::{Plugin, Snapshot, SnapshotVersion, Versioning};
use depot_core::{
    time, Archetype, ArchetypeCatalog, ChecksumAlgorithm, Coordinate, GroupPath, MavenVersion,
    Metadata, PomSummary, StoreError, StoreResult, SNAPSHOT_SUFFIX,
};

use crate::{path_segments, ArtifactStore};

/// Synthesize the metadata document for `path` and its last-modified time.
pub async fn metadata_for<S>(store: &S, path: &str) -> StoreResult<(Metadata, DateTime<Utc>)>
where
    S: ArtifactStore + ?Sized,
{
    let segments = path_segments(path);
    if segments.is_empty() {
        return Err(StoreError::not_found(path));
    }

    let mut metadata = Metadata::default();
    let mut newest: Option<DateTime<Utc>> = None;

    let group = GroupPath::from_path(path);
    for (plugin, modified) in group_plugins(store, &group).await {
        metadata.plugins.push(plugin);
        newest = newest.max(Some(modified));
    }

    let n = segments.len();
    let snapshot_level = if n >= 3 && segments[n - 1].ends_with(SNAPSHOT_SUFFIX) {
        let group = GroupPath::from_path(&segments[..n - 2].join("/"));
        snapshot_versioning(store, &group, segments[n - 2], segments[n - 1]).await
    } else {
        None
    };

    if let Some((versioning, modified)) = snapshot_level {
        let group = GroupPath::from_path(&segments[..n - 2].join("/"));
        metadata.group_id = Some(group.to_dotted());
        metadata.artifact_id = Some(segments[n - 2].to_string());
        metadata.version = Some(segments[n - 1].to_string());
        metadata.versioning = Some(versioning);
        newest = newest.max(Some(modified));
    } else if n >= 2 {
        let group = GroupPath::from_path(&segments[..n - 1].join("/"));
        if let Some((versioning, modified)) = artifact_versioning(store, &group, segments[n - 1]).await {
            metadata.group_id = Some(group.to_dotted());
            metadata.artifact_id = Some(segments[n - 1].to_string());
            metadata.versioning = Some(versioning);
            newest = newest.max(Some(modified));
        }
    }

    match newest {
        Some(modified) if !metadata.is_empty() => Ok((metadata, modified)),
        _ => Err(StoreError::not_found(path)),
    }
}

/// Synthesize the archetype catalog. An empty catalog reports `created`.
pub async fn catalog_for<S>(store: &S, created: DateTime<Utc>) -> (ArchetypeCatalog, DateTime<Utc>)
where
    S: ArtifactStore + ?Sized,
{
    let mut catalog = ArchetypeCatalog::default();
    let mut newest: Option<DateTime<Utc>> = None;
    let mut pending = vec![GroupPath::root()];

    while let Some(group) = pending.pop() {
        for segment in store.list_group_segments(&group).await.into_iter().rev() {
            pending.push(group.child(&segment));
        }
        if group.is_root() {
            continue;
        }
        for name in store.list_names(&group).await {
            for version in store.list_versions(&group, &name).await {
                let pom = Coordinate::pom(group.clone(), &name, &version);
                let Some((summary, modified)) = read_pom(store, &pom).await else {
                    continue;
                };
                if summary.is_archetype() {
                    catalog.archetypes.push(Archetype {
                        group_id: group.to_dotted(),
                        artifact_id: name.clone(),
                        version: version.clone(),
                        repository: None,
                        description: summary.description.or(summary.name),
                    });
                    newest = newest.max(Some(modified));
                }
            }
        }
    }

    (catalog, newest.unwrap_or(created))
}

// -- Levels -------------------------------------------------------------------

async fn group_plugins<S>(store: &S, group: &GroupPath) -> Vec<(Plugin, DateTime<Utc>)>
where
    S: ArtifactStore + ?Sized,
{
    let mut plugins = Vec::new();
    if group.is_root() {
        return plugins;
    }
    for name in store.list_names(group).await {
        let mut versions: Vec<String> = store.list_versions(group, &name).await.into_iter().collect();
        versions.sort_by_key(|v| std::cmp::Reverse(MavenVersion::parse(v)));

        for version in versions {
            let pom = Coordinate::pom(group.clone(), &name, &version);
            let Some((summary, modified)) = read_pom(store, &pom).await else {
                continue;
            };
            if summary.is_maven_plugin() {
                plugins.push((
                    Plugin {
                        name: summary.name.clone(),
                        prefix: summary.plugin_prefix(&name),
                        artifact_id: name.clone(),
                    },
                    modified,
                ));
            }
            break;
        }
    }
    plugins
}

async fn artifact_versioning<S>(
    store: &S,
    group: &GroupPath,
    name: &str,
) -> Option<(Versioning, DateTime<Utc>)>
where
    S: ArtifactStore + ?Sized,
{
    let mut versions = Vec::new();
    let mut latest: Option<(DateTime<Utc>, MavenVersion)> = None;
    let mut release: Option<(DateTime<Utc>, MavenVersion)> = None;
    let mut updated: Option<DateTime<Utc>> = None;

    for version in store.list_versions(group, name).await {
        let newest = newest_file(store, group, name, &version).await;
        let pom = Coordinate::pom(group.clone(), name, &version);
        // latest/release follow the POM; a version without one falls back to its newest file
        let Some(deployed) = store.last_modified(&pom).await.ok().or(newest) else {
            continue;
        };
        updated = updated.max(newest.max(Some(deployed)));

        let key = (deployed, MavenVersion::parse(&version));
        if latest.as_ref().map_or(true, |l| key > *l) {
            latest = Some(key.clone());
        }
        if !version.ends_with(SNAPSHOT_SUFFIX) && release.as_ref().map_or(true, |r| key > *r) {
            release = Some(key);
        }
        versions.push(version);
    }

    let (_, latest) = latest?;
    let updated = updated?;
    depot_core::sort_versions(&mut versions);
    Some((
        Versioning {
            latest: Some(latest.as_str().to_string()),
            release: release.map(|(_, v)| v.as_str().to_string()),
            versions,
            last_updated: Some(updated),
            ..Versioning::default()
        },
        updated,
    ))
}

async fn snapshot_versioning<S>(
    store: &S,
    group: &GroupPath,
    name: &str,
    version: &str,
) -> Option<(Versioning, DateTime<Utc>)>
where
    S: ArtifactStore + ?Sized,
{
    let mut newest: Option<DateTime<Utc>> = None;
    let mut current: Option<depot_core::SnapshotStamp> = None;
    let mut files: Vec<(Coordinate, DateTime<Utc>)> = Vec::new();

    for coordinate in store.list_artifacts(group, name, version).await {
        if is_checksum_file(&coordinate) {
            continue;
        }
        let Ok(modified) = store.last_modified(&coordinate).await else {
            continue;
        };
        newest = newest.max(Some(modified));
        if coordinate.stamp > current {
            current = coordinate.stamp;
        }
        // newest deployment per (classifier, extension)
        match files.iter_mut().find(|(c, _)| {
            c.classifier == coordinate.classifier && c.extension == coordinate.extension
        }) {
            Some(existing) if coordinate.stamp > existing.0.stamp => {
                *existing = (coordinate, modified)
            }
            Some(_) => {}
            None => files.push((coordinate, modified)),
        }
    }

    let updated = newest?;
    let snapshot = match current {
        Some(stamp) => Snapshot {
            timestamp: Some(stamp.timestamp_string()),
            build_number: stamp.build_number.max(1),
            local_copy: false,
        },
        None => Snapshot {
            timestamp: None,
            build_number: 1,
            local_copy: true,
        },
    };
    let snapshot_versions = files
        .into_iter()
        .map(|(c, modified)| SnapshotVersion {
            value: c.file_version(),
            classifier: c.classifier,
            extension: c.extension,
            updated: Some(time::format_last_updated(modified)),
        })
        .collect();

    Some((
        Versioning {
            snapshot: Some(snapshot),
            last_updated: Some(updated),
            snapshot_versions,
            ..Versioning::default()
        },
        updated,
    ))
}

// -- Helpers ------------------------------------------------------------------

/// Read and summarize a POM; unreadable or malformed POMs are skipped.
async fn read_pom<S>(store: &S, pom: &Coordinate) -> Option<(PomSummary, DateTime<Utc>)>
where
    S: ArtifactStore + ?Sized,
{
    let content = store.get(pom).await.ok()?;
    let modified = content.last_modified;
    let bytes = match content.into_bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(coordinate = %pom, error = %e, "skipping unreadable POM");
            return None;
        }
    };
    match PomSummary::parse(&String::from_utf8_lossy(&bytes)) {
        Ok(summary) => Some((summary, modified)),
        Err(e) => {
            tracing::debug!(coordinate = %pom, error = %e, "skipping malformed POM");
            None
        }
    }
}

async fn newest_file<S>(store: &S, group: &GroupPath, name: &str, version: &str) -> Option<DateTime<Utc>>
where
    S: ArtifactStore + ?Sized,
{
    let mut newest = None;
    for coordinate in store.list_artifacts(group, name, version).await {
        if let Ok(modified) = store.last_modified(&coordinate).await {
            newest = newest.max(Some(modified));
        }
    }
    newest
}

/// Checksum files stored next to artifacts (`lib-1.0.jar.sha1`).
pub(crate) fn is_checksum_file(coordinate: &Coordinate) -> bool {
    ChecksumAlgorithm::split_file_name(&coordinate.extension).is_some()
        || coordinate.extension.ends_with(".asc")
}
