//! Source file provenance
//!
//! The dataset portal (data.gov.ua, a CKAN instance) describes each published
//! archive through `resource_show`. A saved response can be passed to the CLI;
//! without one, metadata is read from the file itself.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use userou_common::types::{ChecksumAlgorithm, FileMetadata};

use crate::error::{IngestError, Result};

/// One row of the `source_metadata` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub title: String,
    pub created: String,
    pub mime: String,
    pub format: String,
    pub size: i64,
    /// SHA-1 of the source, kept only when verification ran
    pub hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResourceShowResponse {
    success: bool,
    #[serde(default)]
    result: Option<Resource>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    name: String,
    #[serde(default)]
    mimetype: Option<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    size: Option<serde_json::Value>,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    archiver: Option<Archiver>,
}

#[derive(Debug, Deserialize)]
struct Archiver {
    #[serde(default)]
    updated: Option<String>,
    #[serde(default)]
    hash: Option<String>,
}

impl SourceMetadata {
    /// Parse a `resource_show` response (or its bare `result` object)
    pub fn from_resource_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;

        let resource: Resource = if value.get("success").is_some() {
            let response: ResourceShowResponse = serde_json::from_value(value)?;
            if !response.success {
                let message = response
                    .error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "portal reported failure".to_string());
                return Err(IngestError::metadata(message));
            }
            response
                .result
                .ok_or_else(|| IngestError::metadata("response has no result"))?
        } else {
            serde_json::from_value(value)?
        };

        let archiver = resource.archiver.unwrap_or(Archiver {
            updated: None,
            hash: None,
        });
        let created = archiver
            .updated
            .or(resource.created)
            .map(|ts| declared_date(&ts))
            .ok_or_else(|| IngestError::metadata("resource has no creation date"))?;

        Ok(Self {
            title: resource.name,
            created,
            mime: resource.mimetype.unwrap_or_else(|| "application/zip".to_string()),
            format: resource.format.unwrap_or_else(|| "ZIP".to_string()),
            size: resource.size.as_ref().and_then(size_value).unwrap_or(0),
            hash: archiver.hash.filter(|h| !h.trim().is_empty()),
        })
    }

    /// Load a saved `resource_show` response from disk
    pub fn from_resource_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_resource_json(&json)
    }

    /// Describe a local file; hashes it with SHA-1 when `with_hash` is set
    pub fn from_file(path: impl AsRef<Path>, with_hash: bool) -> Result<Self> {
        let algorithm = with_hash.then_some(ChecksumAlgorithm::Sha1);
        let file = FileMetadata::inspect(path, algorithm)?;
        let extension = file.extension();

        let (mime, format) = match extension.as_deref() {
            Some("zip") => ("application/zip", "ZIP"),
            Some("gz") => ("application/gzip", "GZ"),
            Some("xml") => ("application/xml", "XML"),
            _ => ("application/octet-stream", "BIN"),
        };

        Ok(Self {
            title: file.file_name(),
            created: file.modified_at.format("%Y-%m-%dT%H:%M").to_string(),
            mime: mime.to_string(),
            format: format.to_string(),
            size: i64::try_from(file.size).unwrap_or(i64::MAX),
            hash: file.checksum,
        })
    }

    /// Drop the hash; it is only recorded when verification is enabled
    pub fn without_hash(mut self) -> Self {
        self.hash = None;
        self
    }

    /// Creation date part (`YYYY-MM-DD`), used to name the output database
    pub fn created_date(&self) -> &str {
        self.created.split('T').next().unwrap_or(&self.created)
    }
}

/// Normalize a portal timestamp
///
/// `21.03.2018 17:19` becomes `2018-03-21T17:19`; ISO timestamps keep only the date.
pub fn declared_date(timestamp: &str) -> String {
    let timestamp = timestamp.trim();
    if let Ok(parsed) = NaiveDateTime::parse_from_str(timestamp, "%d.%m.%Y %H:%M") {
        return parsed.format("%Y-%m-%dT%H:%M").to_string();
    }
    timestamp
        .split('T')
        .next()
        .unwrap_or(timestamp)
        .to_string()
}

fn size_value(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
