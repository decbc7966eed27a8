//! # depot-vfs — Repository Filesystem View
//!
//! Projects an [`ArtifactStore`](depot_store::ArtifactStore) onto the
//! directory tree Maven clients expect, the shape served over HTTP.
//!
//! ## Tree
//!
//! | Path                                          | Entry                        |
//! |-----------------------------------------------|------------------------------|
//! | `/`                                           | root group segments          |
//! | `/archetype-catalog.xml`                      | [`FileKind::Catalog`]        |
//! | `/{group…}/`                                  | group segments and names     |
//! | `/{group…}/{name}/`                           | versions                     |
//! | `/{group…}/{name}/{version}/{file}`           | [`FileKind::Artifact`]       |
//! | `…/maven-metadata.xml`                        | [`FileKind::Metadata`]       |
//! | `…/{file}.md5`, `.sha1`, `.sha256`            | [`FileKind::Checksum`]       |
//!
//! Nothing is cached here. Every call asks the store again, so the view
//! always reflects the current contents.

pub mod entry;
pub mod path;
pub mod projection;

pub use entry::{Entry, EntryStat, FileKind};
pub use path::VfsPath;
pub use projection::StoreFileSystem;
