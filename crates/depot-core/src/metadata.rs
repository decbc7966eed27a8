//! # Repository Metadata (`maven-metadata.xml`)
//!
//! One document type serves three levels of the repository tree:
//!
//! | Level                        | Populated fields                               |
//! |------------------------------|------------------------------------------------|
//! | group (`org/example`)        | `plugins`                                      |
//! | artifact (`org/example/lib`) | `groupId`, `artifactId`, `versioning`          |
//! | snapshot version             | the above plus `version`, `snapshot`, `snapshotVersions` |
//!
//! [`Metadata::merge`] combines documents from several stores (composite
//! stores, proxy plus backing cache).

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::time;
use crate::version::{compare_versions, sort_versions};
use crate::xml::{self, Element, XmlWriter};
use crate::METADATA_FILE;

/// Root of a metadata document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// `groupId`
    pub group_id: Option<String>,
    /// `artifactId`
    pub artifact_id: Option<String>,
    /// Set only on snapshot-version metadata.
    pub version: Option<String>,
    /// Absent on group-level metadata.
    pub versioning: Option<Versioning>,
    /// Group-level plugin prefixes.
    pub plugins: Vec<Plugin>,
}

/// Version bookkeeping for an artifact or snapshot version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Versioning {
    /// Most recently deployed version.
    pub latest: Option<String>,
    /// Most recently deployed non-snapshot version.
    pub release: Option<String>,
    /// Current snapshot deployment.
    pub snapshot: Option<Snapshot>,
    /// Oldest first, Maven order.
    pub versions: Vec<String>,
    /// Written as `lastUpdated` (`yyyyMMddHHmmss`).
    pub last_updated: Option<DateTime<Utc>>,
    /// One entry per (classifier, extension).
    pub snapshot_versions: Vec<SnapshotVersion>,
}

/// The current deployment of a snapshot version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// `yyyyMMdd.HHmmss`
    pub timestamp: Option<String>,
    /// `buildNumber`
    pub build_number: u32,
    /// `localCopy`: set when no stamped deployment exists.
    pub local_copy: bool,
}

/// One deployed file of a snapshot version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotVersion {
    /// Classifier of the file, if any.
    pub classifier: Option<String>,
    /// File extension.
    pub extension: String,
    /// File version, e.g. `1.0-20240305.070809-3`.
    pub value: String,
    /// `yyyyMMddHHmmss`
    pub updated: Option<String>,
}

/// A plugin listed in group-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plugin {
    /// Display name from the plugin's POM.
    pub name: Option<String>,
    /// Goal prefix, e.g. `compiler`.
    pub prefix: String,
    /// The plugin's artifactId.
    pub artifact_id: String,
}

impl Metadata {
    /// Whether the document carries nothing worth serving.
    pub fn is_empty(&self) -> bool {
        self.group_id.is_none()
            && self.artifact_id.is_none()
            && self.version.is_none()
            && self.versioning.is_none()
            && self.plugins.is_empty()
    }

    /// The canonical XML form.
    pub fn to_xml(&self) -> String {
        let mut w = XmlWriter::new();
        w.start("metadata");
        w.opt_text("groupId", self.group_id.as_deref());
        w.opt_text("artifactId", self.artifact_id.as_deref());
        w.opt_text("version", self.version.as_deref());
        if let Some(v) = &self.versioning {
            w.start("versioning");
            w.opt_text("latest", v.latest.as_deref());
            w.opt_text("release", v.release.as_deref());
            if let Some(s) = &v.snapshot {
                w.start("snapshot");
                w.opt_text("timestamp", s.timestamp.as_deref());
                if s.build_number > 0 {
                    w.text("buildNumber", &s.build_number.to_string());
                }
                if s.local_copy {
                    w.text("localCopy", "true");
                }
                w.end();
            }
            if !v.versions.is_empty() {
                w.start("versions");
                for version in &v.versions {
                    w.text("version", version);
                }
                w.end();
            }
            if let Some(last_updated) = v.last_updated {
                w.text("lastUpdated", &time::format_last_updated(last_updated));
            }
            if !v.snapshot_versions.is_empty() {
                w.start("snapshotVersions");
                for sv in &v.snapshot_versions {
                    w.start("snapshotVersion");
                    w.opt_text("classifier", sv.classifier.as_deref());
                    w.text("extension", &sv.extension);
                    w.text("value", &sv.value);
                    w.opt_text("updated", sv.updated.as_deref());
                    w.end();
                }
                w.end();
            }
            w.end();
        }
        if !self.plugins.is_empty() {
            w.start("plugins");
            for p in &self.plugins {
                w.start("plugin");
                w.opt_text("name", p.name.as_deref());
                w.text("prefix", &p.prefix);
                w.text("artifactId", &p.artifact_id);
                w.end();
            }
            w.end();
        }
        w.finish()
    }

    /// Parse a metadata document.
    pub fn from_xml(input: &str) -> Result<Self, StoreError> {
        let root = xml::parse(METADATA_FILE, input)?;
        if root.name != "metadata" {
            return Err(StoreError::invalid_document(
                METADATA_FILE,
                format!("unexpected root element <{}>", root.name),
            ));
        }
        Ok(Self {
            group_id: root.child_text("groupId"),
            artifact_id: root.child_text("artifactId"),
            version: root.child_text("version"),
            versioning: root.child("versioning").map(read_versioning),
            plugins: root
                .child("plugins")
                .map(|plugins| {
                    plugins
                        .children_named("plugin")
                        .filter_map(|p| {
                            Some(Plugin {
                                name: p.child_text("name"),
                                prefix: p.child_text("prefix")?,
                                artifact_id: p.child_text("artifactId")?,
                            })
                        })
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    /// Fold `other` into `self`.
    ///
    /// Identity fields fill gaps only. Versions are unioned and re-sorted.
    /// `latest`, `release` and `lastUpdated` come from whichever side was
    /// updated more recently; the snapshot with the higher build number wins;
    /// snapshot versions and plugins are deduplicated.
    pub fn merge(&mut self, other: &Metadata) {
        if self.group_id.is_none() {
            self.group_id = other.group_id.clone();
        }
        if self.artifact_id.is_none() {
            self.artifact_id = other.artifact_id.clone();
        }
        if self.version.is_none() {
            self.version = other.version.clone();
        }

        for plugin in &other.plugins {
            if !self.plugins.iter().any(|p| p.prefix == plugin.prefix) {
                self.plugins.push(plugin.clone());
            }
        }

        let Some(theirs) = &other.versioning else {
            return;
        };
        if self.versioning.is_none() {
            self.versioning = Some(theirs.clone());
            return;
        }
        let Some(ours) = self.versioning.as_mut() else {
            return;
        };

        for version in &theirs.versions {
            if !ours.versions.contains(version) {
                ours.versions.push(version.clone());
            }
        }
        sort_versions(&mut ours.versions);

        let theirs_newer = match (theirs.last_updated, ours.last_updated) {
            (Some(t), Some(o)) => t > o,
            (Some(_), None) => true,
            _ => false,
        };
        if theirs_newer {
            ours.last_updated = theirs.last_updated;
            if theirs.latest.is_some() {
                ours.latest = theirs.latest.clone();
            }
            if theirs.release.is_some() {
                ours.release = theirs.release.clone();
            }
        } else {
            if ours.latest.is_none() {
                ours.latest = theirs.latest.clone();
            }
            if ours.release.is_none() {
                ours.release = theirs.release.clone();
            }
        }

        match (&ours.snapshot, &theirs.snapshot) {
            (None, Some(s)) => ours.snapshot = Some(s.clone()),
            (Some(o), Some(t)) if t.build_number > o.build_number => {
                ours.snapshot = Some(t.clone())
            }
            _ => {}
        }

        for sv in &theirs.snapshot_versions {
            match ours
                .snapshot_versions
                .iter_mut()
                .find(|o| o.classifier == sv.classifier && o.extension == sv.extension)
            {
                Some(existing) => {
                    if sv.updated > existing.updated {
                        *existing = sv.clone();
                    }
                }
                None => ours.snapshot_versions.push(sv.clone()),
            }
        }
    }
}

impl Versioning {
    /// Newest version in Maven order.
    pub fn newest_version(&self) -> Option<&str> {
        self.versions
            .iter()
            .max_by(|a, b| compare_versions(a, b))
            .map(String::as_str)
    }
}

fn read_versioning(e: &Element) -> Versioning {
    Versioning {
        latest: e.child_text("latest"),
        release: e.child_text("release"),
        snapshot: e.child("snapshot").map(|s| Snapshot {
            timestamp: s.child_text("timestamp"),
            build_number: s
                .child_text("buildNumber")
                .and_then(|n| n.parse().ok())
                .unwrap_or(0),
            local_copy: s.child_text("localCopy").is_some_and(|v| v == "true"),
        }),
        versions: e
            .child("versions")
            .map(|vs| {
                vs.children_named("version")
                    .map(|v| v.text.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
        last_updated: e
            .child_text("lastUpdated")
            .and_then(|s| time::parse_last_updated(&s)),
        snapshot_versions: e
            .child("snapshotVersions")
            .map(|svs| {
                svs.children_named("snapshotVersion")
                    .filter_map(|sv| {
                        Some(SnapshotVersion {
                            classifier: sv.child_text("classifier"),
                            extension: sv.child_text("extension")?,
                            value: sv.child_text("value")?,
                            updated: sv.child_text("updated"),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, hour, 0, 0).single().unwrap()
    }

    fn artifact_metadata(versions: &[&str], latest: &str, updated: DateTime<Utc>) -> Metadata {
        Metadata {
            group_id: Some("org.example".into()),
            artifact_id: Some("lib".into()),
            versioning: Some(Versioning {
                latest: Some(latest.into()),
                release: Some(latest.into()),
                versions: versions.iter().map(|v| v.to_string()).collect(),
                last_updated: Some(updated),
                ..Versioning::default()
            }),
            ..Metadata::default()
        }
    }

    #[test]
    fn xml_round_trip() {
        let mut m = artifact_metadata(&["1.0", "1.1"], "1.1", at(3));
        m.plugins.push(Plugin {
            name: Some("Example Plugin".into()),
            prefix: "example".into(),
            artifact_id: "example-maven-plugin".into(),
        });
        if let Some(v) = m.versioning.as_mut() {
            v.snapshot = Some(Snapshot {
                timestamp: Some("20240102.030000".into()),
                build_number: 2,
                local_copy: false,
            });
            v.snapshot_versions.push(SnapshotVersion {
                classifier: Some("sources".into()),
                extension: "jar".into(),
                value: "1.1-20240102.030000-2".into(),
                updated: Some("20240102030000".into()),
            });
        }
        let xml = m.to_xml();
        assert!(xml.contains("<lastUpdated>20240102030000</lastUpdated>"));
        assert_eq!(Metadata::from_xml(&xml).unwrap(), m);
    }

    #[test]
    fn parse_rejects_wrong_root() {
        let err = Metadata::from_xml("<project/>").unwrap_err();
        assert!(err.to_string().contains("unexpected root"));
    }

    #[test]
    fn empty_document() {
        assert!(Metadata::default().is_empty());
        let parsed = Metadata::from_xml("<metadata></metadata>").unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn merge_unions_versions_in_maven_order() {
        let mut a = artifact_metadata(&["1.0", "1.10"], "1.10", at(1));
        let b = artifact_metadata(&["1.2", "1.0"], "1.2", at(2));
        a.merge(&b);
        let v = a.versioning.unwrap();
        assert_eq!(v.versions, vec!["1.0", "1.2", "1.10"]);
        // b was updated more recently, so its latest wins.
        assert_eq!(v.latest.as_deref(), Some("1.2"));
        assert_eq!(v.last_updated, Some(at(2)));
    }

    #[test]
    fn merge_keeps_newer_side() {
        let mut a = artifact_metadata(&["2.0"], "2.0", at(5));
        let b = artifact_metadata(&["1.0"], "1.0", at(1));
        a.merge(&b);
        let v = a.versioning.unwrap();
        assert_eq!(v.latest.as_deref(), Some("2.0"));
        assert_eq!(v.last_updated, Some(at(5)));
    }

    #[test]
    fn merge_prefers_higher_build_number() {
        let snap = |n| Metadata {
            versioning: Some(Versioning {
                snapshot: Some(Snapshot {
                    timestamp: None,
                    build_number: n,
                    local_copy: false,
                }),
                ..Versioning::default()
            }),
            ..Metadata::default()
        };
        let mut a = snap(2);
        a.merge(&snap(5));
        assert_eq!(a.versioning.unwrap().snapshot.unwrap().build_number, 5);

        let mut b = snap(7);
        b.merge(&snap(5));
        assert_eq!(b.versioning.unwrap().snapshot.unwrap().build_number, 7);
    }

    #[test]
    fn merge_dedupes_plugins_by_prefix() {
        let plugin = Plugin {
            name: None,
            prefix: "x".into(),
            artifact_id: "x-maven-plugin".into(),
        };
        let mut a = Metadata {
            plugins: vec![plugin.clone()],
            ..Metadata::default()
        };
        a.merge(&Metadata {
            plugins: vec![plugin],
            ..Metadata::default()
        });
        assert_eq!(a.plugins.len(), 1);
    }

    #[test]
    fn newest_version_uses_maven_order() {
        let m = artifact_metadata(&["1.9", "1.10", "1.10-SNAPSHOT"], "1.10", at(1));
        assert_eq!(m.versioning.unwrap().newest_version(), Some("1.10"));
    }
}
