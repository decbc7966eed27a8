//! # Checksum Siblings
//!
//! Every file served from a repository has digest siblings
//! (`lib-1.0.jar.sha1`, `lib-1.0.jar.md5`, `lib-1.0.jar.sha256`) holding
//! the lowercase hex digest of the file's content.
//!
//! [`Checksummer`] hashes incrementally so content can be streamed through
//! it without buffering the whole artifact.

use md5::Md5;
use sha1::Sha1;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Supported checksum algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// `.md5`
    Md5,
    /// `.sha1`
    Sha1,
    /// `.sha256`
    Sha256,
}

impl ChecksumAlgorithm {
    /// Every algorithm a listing advertises.
    pub const ALL: [ChecksumAlgorithm; 3] = [Self::Md5, Self::Sha1, Self::Sha256];

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }

    /// Length of the hex digest.
    pub fn hex_len(&self) -> u64 {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Sha256 => 64,
        }
    }

    /// Split `name.ext` into (`name`, algorithm) for a checksum file name.
    pub fn split_file_name(file_name: &str) -> Option<(&str, ChecksumAlgorithm)> {
        let (base, ext) = file_name.rsplit_once('.')?;
        if base.is_empty() {
            return None;
        }
        let algorithm = Self::ALL.into_iter().find(|a| a.extension() == ext)?;
        Some((base, algorithm))
    }

    /// A fresh incremental hasher.
    pub fn hasher(&self) -> Checksummer {
        match self {
            Self::Md5 => Checksummer::Md5(Md5::new()),
            Self::Sha1 => Checksummer::Sha1(Sha1::new()),
            Self::Sha256 => Checksummer::Sha256(Sha256::new()),
        }
    }

    /// Hex digest of an in-memory buffer.
    pub fn digest_hex(&self, data: &[u8]) -> String {
        let mut hasher = self.hasher();
        hasher.update(data);
        hasher.finalize_hex()
    }
}

impl std::fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Incremental hasher for one algorithm.
#[derive(Clone)]
pub enum Checksummer {
    /// MD5 state.
    Md5(Md5),
    /// SHA-1 state.
    Sha1(Sha1),
    /// SHA-256 state.
    Sha256(Sha256),
}

impl std::fmt::Debug for Checksummer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let algorithm = match self {
            Self::Md5(_) => ChecksumAlgorithm::Md5,
            Self::Sha1(_) => ChecksumAlgorithm::Sha1,
            Self::Sha256(_) => ChecksumAlgorithm::Sha256,
        };
        f.debug_tuple("Checksummer").field(&algorithm).finish()
    }
}

impl Checksummer {
    /// Feed the next chunk of content.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
        }
    }

    /// Lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        match self {
            Self::Md5(h) => to_hex(&h.finalize()),
            Self::Sha1(h) => to_hex(&h.finalize()),
            Self::Sha256(h) => to_hex(&h.finalize()),
        }
    }
}

/// Render bytes as lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithms_serialize_as_extensions() {
        for alg in ChecksumAlgorithm::ALL {
            let json = serde_json::to_string(&alg).unwrap();
            assert_eq!(json, format!("\"{}\"", alg.extension()));
        }
    }

    #[test]
    fn known_digests_of_empty_input() {
        assert_eq!(
            ChecksumAlgorithm::Md5.digest_hex(b""),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            ChecksumAlgorithm::Sha1.digest_hex(b""),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
        assert_eq!(
            ChecksumAlgorithm::Sha256.digest_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn incremental_matches_one_shot() {
        for algorithm in ChecksumAlgorithm::ALL {
            let mut h = algorithm.hasher();
            h.update(b"hello ");
            h.update(b"world");
            let hex = h.finalize_hex();
            assert_eq!(hex, algorithm.digest_hex(b"hello world"));
            assert_eq!(hex.len() as u64, algorithm.hex_len());
        }
    }

    #[test]
    fn split_checksum_names() {
        assert_eq!(
            ChecksumAlgorithm::split_file_name("lib-1.0.jar.sha1"),
            Some(("lib-1.0.jar", ChecksumAlgorithm::Sha1))
        );
        assert_eq!(
            ChecksumAlgorithm::split_file_name("maven-metadata.xml.md5"),
            Some(("maven-metadata.xml", ChecksumAlgorithm::Md5))
        );
        assert_eq!(ChecksumAlgorithm::split_file_name("lib-1.0.jar"), None);
        assert_eq!(ChecksumAlgorithm::split_file_name(".sha1"), None);
    }
}
