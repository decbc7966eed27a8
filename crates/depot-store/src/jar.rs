//! Jar archives for mock repositories: empty placeholders for POMs that
//! ship no main artifact, and exploded directories packed on load.

use std::io::{Cursor, Write};

use bytes::Bytes;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use depot_core::{GroupPath, StoreError, StoreResult};

const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

const MANIFEST: &str = "Manifest-Version: 1.0\r\n\
                        Archiver-Version: 1.0\r\n\
                        Created-By: depot mock repository\r\n\r\n";

/// A jar holding nothing but a manifest.
pub(crate) fn empty() -> StoreResult<Bytes> {
    pack(Vec::new())
}

/// A jar whose `plugin.xml` names the plugin, enough for Maven to resolve it.
pub(crate) fn empty_plugin(group: &GroupPath, name: &str, version: &str) -> StoreResult<Bytes> {
    let descriptor = format!(
        "<plugin><groupId>{}</groupId><artifactId>{name}</artifactId><version>{version}</version></plugin>",
        group.to_dotted()
    );
    pack(vec![(
        "META-INF/maven/plugin.xml".to_string(),
        descriptor.into_bytes(),
    )])
}

/// Pack `(entry name, contents)` pairs. A manifest is written first unless
/// the entries bring their own.
pub(crate) fn pack(entries: Vec<(String, Vec<u8>)>) -> StoreResult<Bytes> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    if !entries.iter().any(|(name, _)| name == MANIFEST_PATH) {
        writer.start_file(MANIFEST_PATH, options).map_err(archive_error)?;
        writer.write_all(MANIFEST.as_bytes())?;
    }
    for (name, contents) in entries {
        writer.start_file(name, options).map_err(archive_error)?;
        writer.write_all(&contents)?;
    }

    let cursor = writer.finish().map_err(archive_error)?;
    Ok(Bytes::from(cursor.into_inner()))
}

fn archive_error(e: zip::result::ZipError) -> StoreError {
    StoreError::Io(std::io::Error::other(e))
}
