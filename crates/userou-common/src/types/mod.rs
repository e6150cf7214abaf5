//! Common types used across userou

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::checksum::compute_file_checksum;
use crate::error::{Result, UserouError};

/// Checksum algorithm type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// Digest published by data.gov.ua for registry archives
    Sha1,
    Sha256,
}

impl std::fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumAlgorithm::Sha1 => write!(f, "sha1"),
            ChecksumAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

impl std::str::FromStr for ChecksumAlgorithm {
    type Err = UserouError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(ChecksumAlgorithm::Sha1),
            "sha256" | "sha-256" => Ok(ChecksumAlgorithm::Sha256),
            other => Err(UserouError::Parse(format!("Unknown checksum algorithm: {}", other))),
        }
    }
}

/// Metadata for a file on local disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub path: PathBuf,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
    /// Hex digest, present only when an algorithm was requested
    pub checksum: Option<String>,
}

impl FileMetadata {
    /// Stat a file and optionally hash its contents
    pub fn inspect(path: impl AsRef<Path>, algorithm: Option<ChecksumAlgorithm>) -> Result<Self> {
        let path = path.as_ref();
        let stat = std::fs::metadata(path)?;
        let modified_at = stat.modified().map(DateTime::<Utc>::from)?;

        let checksum = match algorithm {
            Some(algorithm) => Some(compute_file_checksum(path, algorithm)?),
            None => None,
        };

        Ok(Self {
            path: path.to_path_buf(),
            size: stat.len(),
            modified_at,
            checksum,
        })
    }

    /// File name component, lossily converted
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Lowercased extension, if any
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_checksum_algorithm_from_str() {
        assert_eq!("SHA1".parse::<ChecksumAlgorithm>().unwrap(), ChecksumAlgorithm::Sha1);
        assert_eq!("sha-256".parse::<ChecksumAlgorithm>().unwrap(), ChecksumAlgorithm::Sha256);
        assert!("md5".parse::<ChecksumAlgorithm>().is_err());
    }

    #[test]
    fn test_inspect_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("17-ufop.zip");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"hello world").unwrap();
        drop(file);

        let meta = FileMetadata::inspect(&path, Some(ChecksumAlgorithm::Sha1)).unwrap();
        assert_eq!(meta.size, 11);
        assert_eq!(meta.file_name(), "17-ufop.zip");
        assert_eq!(meta.extension().as_deref(), Some("zip"));
        assert_eq!(
            meta.checksum.as_deref(),
            Some("2aae6c35c94fcfb415dbe95f408b9ce91ee846ed")
        );
    }

    #[test]
    fn test_inspect_without_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("UO.xml");
        std::fs::write(&path, "<DATA/>").unwrap();

        let meta = FileMetadata::inspect(&path, None).unwrap();
        assert!(meta.checksum.is_none());
        assert_eq!(meta.size, 7);
    }
}
