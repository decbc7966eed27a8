//! Normalized repository paths.

use std::fmt;

use depot_core::{GroupPath, StoreError};

/// A path inside the projection, as a list of non-empty segments.
///
/// Empty segments and `.` are dropped; `..` is rejected so a request can
/// never name anything outside the repository root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VfsPath(Vec<String>);

impl VfsPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let mut segments = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => {}
                ".." => return Err(StoreError::InvalidPath(raw.to_string())),
                s if s.contains('\\') || s.contains('\0') => {
                    return Err(StoreError::InvalidPath(raw.to_string()))
                }
                s => segments.push(s.to_string()),
            }
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last segment; empty at the root.
    pub fn name(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or("")
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn join(&self, segment: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Self(segments)
    }

    /// Slash-separated form without leading slash (`org/example`).
    pub fn relative(&self) -> String {
        self.0.join("/")
    }

    /// The whole path read as a group.
    pub fn as_group(&self) -> GroupPath {
        GroupPath::from_path(&self.relative())
    }

    /// The first `len - n` segments read as a group.
    pub fn group_without_last(&self, n: usize) -> Option<GroupPath> {
        if self.0.len() < n {
            return None;
        }
        Some(GroupPath::from_path(&self.0[..self.0.len() - n].join("/")))
    }

    /// The segment `n` places from the end (0 = last).
    pub fn from_end(&self, n: usize) -> Option<&str> {
        self.0.len().checked_sub(n + 1).map(|i| self.0[i].as_str())
    }
}

impl fmt::Display for VfsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.relative())
    }
}
