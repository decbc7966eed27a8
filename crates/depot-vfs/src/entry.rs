//! Entries of the projection.

use chrono::{DateTime, Utc};

use depot_core::{ChecksumAlgorithm, Coordinate};

use crate::path::VfsPath;

/// What a file entry is backed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    /// An artifact held by the store.
    Artifact(Coordinate),
    /// `maven-metadata.xml` for the given directory path.
    Metadata(VfsPath),
    /// The root `archetype-catalog.xml`.
    Catalog,
    /// Hex digest of another file.
    Checksum {
        of: Box<FileKind>,
        algorithm: ChecksumAlgorithm,
    },
}

/// A node in the projected tree. Never cached; recomputed on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Directory(VfsPath),
    File { path: VfsPath, kind: FileKind },
}

impl Entry {
    pub fn path(&self) -> &VfsPath {
        match self {
            Self::Directory(path) | Self::File { path, .. } => path,
        }
    }

    pub fn name(&self) -> &str {
        self.path().name()
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    /// The checksum sibling of a file entry.
    pub(crate) fn checksum(path: &VfsPath, kind: &FileKind, algorithm: ChecksumAlgorithm) -> Self {
        let name = format!("{}.{}", path.name(), algorithm.extension());
        let sibling = path.parent().unwrap_or_default().join(&name);
        Self::File {
            path: sibling,
            kind: FileKind::Checksum {
                of: Box::new(kind.clone()),
                algorithm,
            },
        }
    }
}

/// Size and timestamp of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStat {
    /// `None` for directories.
    pub size: Option<u64>,
    pub last_modified: DateTime<Utc>,
}
