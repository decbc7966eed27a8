#![deny(missing_docs)]
//! # depot-core — Foundational Types for depot
//!
//! Every other crate in the workspace depends on `depot-core`; it depends on
//! nothing internal. It defines how artifacts are addressed, how versions
//! order, and what the two synthesized repository documents look like.
//!
//! ## Contents
//!
//! | Module         | Purpose                                                    |
//! |----------------|------------------------------------------------------------|
//! | [`coordinate`] | `GroupPath`, `Coordinate`, snapshot stamps, file names     |
//! | [`version`]    | Maven version ordering                                     |
//! | [`metadata`]   | `maven-metadata.xml` model, XML form, merge rules          |
//! | [`catalog`]    | `archetype-catalog.xml` model                              |
//! | [`pom`]        | Minimal POM reading (packaging, name, goal prefix)         |
//! | [`checksum`]   | MD5 / SHA-1 / SHA-256 checksum siblings                    |
//! | [`time`]       | HTTP dates, `lastUpdated` and snapshot timestamp formats   |
//! | [`xml`]        | Small XML writer and element-tree reader                   |
//! | [`error`]      | `StoreError`, the error taxonomy shared by all stores      |
//!
//! ## Crate Policy
//!
//! - No dependencies on other `depot-*` crates.
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests.

pub mod catalog;
pub mod checksum;
pub mod coordinate;
pub mod error;
pub mod metadata;
pub mod pom;
pub mod time;
pub mod version;
pub mod xml;

pub use catalog::{Archetype, ArchetypeCatalog};
pub use checksum::{ChecksumAlgorithm, Checksummer};
pub use coordinate::{Coordinate, GroupPath, SnapshotStamp};
pub use error::{StoreError, StoreResult};
pub use metadata::{Metadata, Plugin, Snapshot, SnapshotVersion, Versioning};
pub use pom::PomSummary;
pub use version::{compare_versions, sort_versions, MavenVersion};

/// File name of the per-path repository metadata document.
pub const METADATA_FILE: &str = "maven-metadata.xml";

/// File name of the repository-wide archetype catalog.
pub const CATALOG_FILE: &str = "archetype-catalog.xml";

/// Version suffix marking a floating snapshot.
pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";
