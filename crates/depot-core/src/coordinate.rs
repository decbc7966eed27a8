//! # Artifact Coordinates
//!
//! A [`Coordinate`] addresses one artifact file:
//!
//! ```text
//! {group/path}/{name}/{version}/{name}-{version}[-{classifier}].{extension}
//! ```
//!
//! Snapshot versions (`1.0-SNAPSHOT`) may carry a [`SnapshotStamp`], in which
//! case the file name uses the stamped form `1.0-20240305.070809-3` instead
//! of `1.0-SNAPSHOT`. A snapshot coordinate without a stamp is *floating*:
//! stores resolve it to the newest stamped file they hold.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::time;
use crate::SNAPSHOT_SUFFIX;

// -- GroupPath ----------------------------------------------------------------

/// A group identifier as an ordered list of segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupPath(Vec<String>);

impl GroupPath {
    /// The empty (root) group path.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse dotted form (`org.example.tools`).
    pub fn from_dotted(dotted: &str) -> Self {
        Self::from_segments(dotted.split('.'))
    }

    /// Parse slash form (`org/example/tools`); leading/trailing slashes ignored.
    pub fn from_path(path: &str) -> Self {
        Self::from_segments(path.split('/'))
    }

    fn from_segments<'a>(segments: impl Iterator<Item = &'a str>) -> Self {
        Self(
            segments
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Segments from outermost to innermost.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// True for the empty path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Same as [`GroupPath::is_root`].
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `org.example.tools`
    pub fn to_dotted(&self) -> String {
        self.0.join(".")
    }

    /// `org/example/tools`
    pub fn to_path(&self) -> String {
        self.0.join("/")
    }

    /// This path extended by one segment.
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Self(segments)
    }

    /// This path without its last segment; `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// The innermost segment.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Whether `self` equals `prefix` or lies below it.
    pub fn starts_with(&self, prefix: &GroupPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// The segment directly below `prefix`, if `self` lies strictly below it.
    pub fn segment_below(&self, prefix: &GroupPath) -> Option<&str> {
        if self.0.len() > prefix.0.len() && self.starts_with(prefix) {
            Some(self.0[prefix.0.len()].as_str())
        } else {
            None
        }
    }
}

impl fmt::Display for GroupPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dotted())
    }
}

// -- SnapshotStamp ------------------------------------------------------------

/// Timestamp and build number of a deployed snapshot file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotStamp {
    /// UTC, second precision.
    pub timestamp: DateTime<Utc>,
    /// Deployment counter, starting at 1.
    pub build_number: u32,
}

impl SnapshotStamp {
    /// Truncates `timestamp` to whole seconds.
    pub fn new(timestamp: DateTime<Utc>, build_number: u32) -> Self {
        Self {
            timestamp: time::truncate_to_seconds(timestamp),
            build_number,
        }
    }

    /// `yyyyMMdd.HHmmss`
    pub fn timestamp_string(&self) -> String {
        time::format_snapshot_timestamp(self.timestamp)
    }

    /// Parse `yyyyMMdd.HHmmss-N`.
    pub fn parse(s: &str) -> Option<Self> {
        let (stamp, build) = s.split_once('-')?;
        if stamp.len() != 15 || !build.chars().all(|c| c.is_ascii_digit()) || build.is_empty() {
            return None;
        }
        let timestamp = time::parse_snapshot_timestamp(stamp)?;
        let build_number = build.parse().ok()?;
        Some(Self {
            timestamp,
            build_number,
        })
    }
}

impl fmt::Display for SnapshotStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.timestamp_string(), self.build_number)
    }
}

// -- Coordinate ---------------------------------------------------------------

/// Address of a single artifact file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    /// The groupId as path segments.
    pub group: GroupPath,
    /// The artifactId.
    pub name: String,
    /// Declared version, `-SNAPSHOT` included for snapshots.
    pub version: String,
    /// E.g. `sources`; never the empty string.
    pub classifier: Option<String>,
    /// File type, e.g. `jar`, `pom`, `tar.gz`.
    pub extension: String,
    /// Present only for stamped snapshot files.
    pub stamp: Option<SnapshotStamp>,
}

impl Coordinate {
    /// A coordinate without classifier or snapshot stamp.
    pub fn new(
        group: GroupPath,
        name: impl Into<String>,
        version: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            group,
            name: name.into(),
            version: version.into(),
            classifier: None,
            extension: extension.into(),
            stamp: None,
        }
    }

    /// Set the classifier; an empty one clears it.
    pub fn with_classifier(mut self, classifier: Option<impl Into<String>>) -> Self {
        self.classifier = classifier.map(Into::into).filter(|c: &String| !c.is_empty());
        self
    }

    /// Pin (or, with `None`, float) a snapshot deployment.
    pub fn with_stamp(mut self, stamp: Option<SnapshotStamp>) -> Self {
        self.stamp = stamp;
        self
    }

    /// The POM coordinate of the same version.
    pub fn pom(group: GroupPath, name: &str, version: &str) -> Self {
        Self::new(group, name, version, "pom")
    }

    /// Whether the version ends in `-SNAPSHOT`.
    pub fn is_snapshot(&self) -> bool {
        self.version.ends_with(SNAPSHOT_SUFFIX)
    }

    /// A snapshot coordinate that names no particular deployment.
    pub fn is_floating_snapshot(&self) -> bool {
        self.is_snapshot() && self.stamp.is_none()
    }

    /// Version without the `-SNAPSHOT` suffix.
    pub fn base_version(&self) -> &str {
        self.version
            .strip_suffix(SNAPSHOT_SUFFIX)
            .unwrap_or(&self.version)
    }

    /// The version as it appears in the file name.
    pub fn file_version(&self) -> String {
        match (&self.stamp, self.is_snapshot()) {
            (Some(stamp), true) => format!("{}-{}", self.base_version(), stamp),
            _ => self.version.clone(),
        }
    }

    /// `{name}-{file_version}[-{classifier}].{extension}`
    pub fn file_name(&self) -> String {
        let mut out = format!("{}-{}", self.name, self.file_version());
        if let Some(classifier) = &self.classifier {
            out.push('-');
            out.push_str(classifier);
        }
        out.push('.');
        out.push_str(&self.extension);
        out
    }

    /// Path of the version directory: `{group/path}/{name}/{version}`.
    pub fn version_path(&self) -> String {
        format!("{}/{}/{}", self.group.to_path(), self.name, self.version)
    }

    /// Full repository path of the file.
    pub fn repository_path(&self) -> String {
        format!("{}/{}", self.version_path(), self.file_name())
    }

    /// Same coordinate with the stamp removed.
    pub fn floating(&self) -> Self {
        let mut c = self.clone();
        c.stamp = None;
        c
    }

    /// Whether this (possibly floating) coordinate selects `candidate`:
    /// identical, or a floating snapshot matching any stamp of the same file.
    pub fn selects(&self, candidate: &Coordinate) -> bool {
        if self == candidate {
            return true;
        }
        self.is_floating_snapshot() && candidate.floating() == *self
    }

    /// Interpret a file name found in the directory of `group/name/version`.
    ///
    /// Accepts `{name}-{version}[-{classifier}].{ext}`, and for snapshot
    /// versions `{name}-{base}-{yyyyMMdd.HHmmss-N}[-{classifier}].{ext}`.
    /// The classifier runs up to the first `.`; the extension is the rest.
    pub fn from_file_name(
        group: &GroupPath,
        name: &str,
        version: &str,
        file_name: &str,
    ) -> Option<Self> {
        let after_name = file_name.strip_prefix(name)?.strip_prefix('-')?;

        let (stamp, rest) = match after_name.strip_prefix(version) {
            Some(rest) => (None, rest),
            None => {
                let base = version.strip_suffix(SNAPSHOT_SUFFIX)?;
                let after_base = after_name.strip_prefix(base)?.strip_prefix('-')?;
                // yyyyMMdd.HHmmss-N
                let stamp_end = stamp_length(after_base)?;
                let stamp = SnapshotStamp::parse(&after_base[..stamp_end])?;
                (Some(stamp), &after_base[stamp_end..])
            }
        };

        let (classifier, extension) = if let Some(ext) = rest.strip_prefix('.') {
            (None, ext)
        } else {
            let tail = rest.strip_prefix('-')?;
            let dot = tail.find('.')?;
            (Some(&tail[..dot]), &tail[dot + 1..])
        };
        if extension.is_empty() || extension.contains('/') {
            return None;
        }
        if classifier.is_some_and(str::is_empty) {
            return None;
        }

        Some(
            Coordinate::new(group.clone(), name, version, extension)
                .with_classifier(classifier)
                .with_stamp(stamp),
        )
    }

    /// Parse a full repository path `{group}/{name}/{version}/{file}`.
    pub fn from_repository_path(path: &str) -> Result<Self, StoreError> {
        let trimmed = path.trim_matches('/');
        let parts: Vec<&str> = trimmed.split('/').collect();
        if parts.len() < 4 || parts.iter().any(|p| p.is_empty()) {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        let file = parts[parts.len() - 1];
        let version = parts[parts.len() - 2];
        let name = parts[parts.len() - 3];
        let group = GroupPath::from_segments(parts[..parts.len() - 3].iter().copied());
        Self::from_file_name(&group, name, version, file)
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))
    }
}

/// Length of a leading `yyyyMMdd.HHmmss-N` token.
fn stamp_length(s: &str) -> Option<usize> {
    if s.len() < 17 || s.as_bytes().get(15) != Some(&b'-') {
        return None;
    }
    let digits = s[16..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    Some(16 + digits)
}

impl PartialOrd for Coordinate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Group (dotted form) first, then file name; remaining fields only break
/// ties. Segments break dotted-form ties, so `a.b` and `a`/`b` stay distinct
/// and `Ord` agrees with `Eq`.
impl Ord for Coordinate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.group
            .to_dotted()
            .cmp(&other.group.to_dotted())
            .then_with(|| self.group.cmp(&other.group))
            .then_with(|| self.file_name().cmp(&other.file_name()))
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.version.cmp(&other.version))
            .then_with(|| self.classifier.cmp(&other.classifier))
            .then_with(|| self.extension.cmp(&other.extension))
            .then_with(|| self.stamp.cmp(&other.stamp))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        write!(f, ":{}", self.extension)?;
        if let Some(stamp) = &self.stamp {
            write!(f, "@{stamp}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn group() -> GroupPath {
        GroupPath::from_dotted("org.example")
    }

    #[test]
    fn dotted_segment_does_not_collapse_groups() {
        let nested = Coordinate::new(GroupPath::from_path("a/b"), "lib", "1.0", "jar");
        let dotted = Coordinate::new(GroupPath::from_path("a.b"), "lib", "1.0", "jar");
        assert_ne!(nested, dotted);
        assert_ne!(nested.cmp(&dotted), Ordering::Equal);

        let set: std::collections::BTreeSet<_> = [nested, dotted].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn coordinate_json_keeps_group_segments() {
        let c = Coordinate::new(group(), "lib", "1.0", "jar");
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["group"], serde_json::json!(["org", "example"]));
        let back: Coordinate = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }

    fn stamp() -> SnapshotStamp {
        SnapshotStamp::new(Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).single().unwrap(), 3)
    }

    #[test]
    fn group_path_forms() {
        let g = GroupPath::from_path("/org/example/tools/");
        assert_eq!(g.to_dotted(), "org.example.tools");
        assert_eq!(g.to_path(), "org/example/tools");
        assert_eq!(g, GroupPath::from_dotted("org.example.tools"));
        assert_eq!(g.parent(), Some(GroupPath::from_dotted("org.example")));
        assert!(GroupPath::root().parent().is_none());
        assert_eq!(g.segment_below(&GroupPath::from_dotted("org")), Some("example"));
        assert_eq!(g.segment_below(&g), None);
        assert!(GroupPath::from_dotted("").is_root());
    }

    #[test]
    fn release_file_name() {
        let c = Coordinate::new(group(), "lib", "1.0", "jar");
        assert_eq!(c.file_name(), "lib-1.0.jar");
        assert_eq!(c.repository_path(), "org/example/lib/1.0/lib-1.0.jar");
        assert!(!c.is_snapshot());
    }

    #[test]
    fn classified_file_name() {
        let c = Coordinate::new(group(), "lib", "1.0", "jar").with_classifier(Some("sources"));
        assert_eq!(c.file_name(), "lib-1.0-sources.jar");
    }

    #[test]
    fn stamped_snapshot_file_name() {
        let c = Coordinate::new(group(), "lib", "1.0-SNAPSHOT", "jar").with_stamp(Some(stamp()));
        assert_eq!(c.file_name(), "lib-1.0-20240305.070809-3.jar");
        assert!(c.is_snapshot());
        assert!(!c.is_floating_snapshot());
        assert!(c.floating().is_floating_snapshot());
    }

    #[test]
    fn parses_release_names() {
        let c = Coordinate::from_file_name(&group(), "lib", "1.0", "lib-1.0-tests.tar.gz").unwrap();
        assert_eq!(c.classifier.as_deref(), Some("tests"));
        assert_eq!(c.extension, "tar.gz");

        let c = Coordinate::from_file_name(&group(), "lib", "1.0", "lib-1.0.pom").unwrap();
        assert_eq!(c.classifier, None);
        assert_eq!(c.extension, "pom");
    }

    #[test]
    fn parses_snapshot_names() {
        let c = Coordinate::from_file_name(&group(), "lib", "1.0-SNAPSHOT", "lib-1.0-SNAPSHOT.jar")
            .unwrap();
        assert!(c.stamp.is_none());

        let c = Coordinate::from_file_name(
            &group(),
            "lib",
            "1.0-SNAPSHOT",
            "lib-1.0-20240305.070809-3-javadoc.jar",
        )
        .unwrap();
        assert_eq!(c.stamp, Some(stamp()));
        assert_eq!(c.classifier.as_deref(), Some("javadoc"));
    }

    #[test]
    fn rejects_foreign_names() {
        assert!(Coordinate::from_file_name(&group(), "lib", "1.0", "other-1.0.jar").is_none());
        assert!(Coordinate::from_file_name(&group(), "lib", "1.0", "lib-2.0.jar").is_none());
        assert!(Coordinate::from_file_name(&group(), "lib", "1.0", "lib-1.0").is_none());
        assert!(Coordinate::from_file_name(&group(), "lib", "1.0", "lib-1.0-.jar").is_none());
        assert!(Coordinate::from_file_name(&group(), "lib", "1.0", "maven-metadata.xml").is_none());
    }

    #[test]
    fn repository_path_round_trip() {
        let c = Coordinate::from_repository_path("/org/example/lib/1.0/lib-1.0.jar").unwrap();
        assert_eq!(c.group, group());
        assert_eq!(c.repository_path(), "org/example/lib/1.0/lib-1.0.jar");
        assert!(Coordinate::from_repository_path("lib/1.0/lib-1.0.jar").is_err());
    }

    #[test]
    fn floating_snapshot_selects_stamped() {
        let floating = Coordinate::new(group(), "lib", "1.0-SNAPSHOT", "jar");
        let stamped = floating.clone().with_stamp(Some(stamp()));
        assert!(floating.selects(&stamped));
        assert!(!stamped.selects(&floating));
        let other = Coordinate::new(group(), "lib", "1.0-SNAPSHOT", "pom").with_stamp(Some(stamp()));
        assert!(!floating.selects(&other));
    }

    #[test]
    fn ordering_by_group_then_name() {
        let a = Coordinate::new(GroupPath::from_dotted("a"), "z", "1", "jar");
        let b = Coordinate::new(GroupPath::from_dotted("b"), "a", "1", "jar");
        assert!(a < b);
        let c = Coordinate::new(GroupPath::from_dotted("a"), "y", "1", "jar");
        assert!(c < a);
    }

    proptest! {
        #[test]
        fn file_name_parses_back(
            name in "[a-z][a-z0-9]{0,8}",
            version in "[0-9]{1,2}\\.[0-9]{1,2}",
            classifier in proptest::option::of("[a-z]{1,6}"),
            extension in "[a-z]{1,3}(\\.[a-z]{1,2})?",
        ) {
            let c = Coordinate::new(group(), name.clone(), version.clone(), extension)
                .with_classifier(classifier);
            let parsed = Coordinate::from_file_name(&group(), &name, &version, &c.file_name());
            prop_assert_eq!(parsed, Some(c));
        }
    }
}
