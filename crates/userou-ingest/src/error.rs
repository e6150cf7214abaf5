//! Error types for registry ingestion
//!
//! Every failure is fatal. The variants record how far the damage reaches:
//! structural and parse errors stop the current document, persistence errors
//! mean the schema or data shape is wrong for the whole run. The pipeline
//! commits already accepted records before surfacing either kind.

use thiserror::Error;
use userou_common::UserouError;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// Record shape violates the fixed positional layout
    #[error("Malformed <{tag}> record: {message}")]
    Structural { tag: String, message: String },

    /// Source bytes are not well-formed XML
    #[error("Invalid XML at byte {position}: {message}")]
    Parse { position: u64, message: String },

    /// SQLite rejected a statement or failed to commit
    #[error("Database error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// Stopped by Ctrl+C or SIGTERM after committing the open batch
    #[error("Interrupted by user after {records} records; processed records were saved")]
    Interrupted { records: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Source metadata could not be read or interpreted
    #[error("Invalid source metadata: {0}")]
    Metadata(String),

    #[error(transparent)]
    Common(#[from] UserouError),
}

impl IngestError {
    pub fn structural(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Structural {
            tag: tag.into(),
            message: message.into(),
        }
    }

    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    /// Whether the error only concerns the document being decoded
    pub fn is_document_scoped(&self) -> bool {
        matches!(self, Self::Structural { .. } | Self::Parse { .. })
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Metadata(err.to_string())
    }
}
