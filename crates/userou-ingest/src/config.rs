//! Ingestion configuration
//!
//! Settings come from `USEROU_*` environment variables (a `.env` file is
//! honoured by the binary) and are then overridden by command-line flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::error::{IngestError, Result};
use crate::registry::models::EntityKind;

// ============================================================================
// Schema and Cadence Constants
// ============================================================================

/// Records accepted between commits when nothing else is requested.
pub const DEFAULT_COMMIT_INTERVAL: u64 = 2000;

/// Smaller intervals are refused; each commit costs a journal sync.
pub const MIN_COMMIT_INTERVAL: u64 = 2000;

/// Records between liveness markers.
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// Element that wraps one registry entry in both document kinds.
pub const RECORD_TAG: &str = "RECORD";

/// Trailing container holding a legal person's founders.
pub const FOUNDERS_TAG: &str = "FOUNDERS";

// ============================================================================
// Commit Interval
// ============================================================================

/// Rejected commit interval
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("commit interval {0} is too small, the minimum is {MIN_COMMIT_INTERVAL}")]
    CommitIntervalTooSmall(i64),

    #[error("commit interval {0} is zero or negative")]
    CommitIntervalNotPositive(i64),
}

/// Number of accepted records between durability checkpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInterval(u64);

impl CommitInterval {
    /// Check a requested interval without substituting anything
    pub fn try_new(requested: i64) -> std::result::Result<Self, ConfigError> {
        if requested <= 0 {
            return Err(ConfigError::CommitIntervalNotPositive(requested));
        }
        let requested = requested as u64;
        if requested < MIN_COMMIT_INTERVAL {
            return Err(ConfigError::CommitIntervalTooSmall(requested as i64));
        }
        Ok(Self(requested))
    }

    /// Accept a requested interval, falling back to the default with a warning
    pub fn from_requested(requested: i64) -> Self {
        match Self::try_new(requested) {
            Ok(interval) => interval,
            Err(err) => {
                warn!(
                    requested,
                    default = DEFAULT_COMMIT_INTERVAL,
                    "{}; committing every {} records instead",
                    err,
                    DEFAULT_COMMIT_INTERVAL
                );
                Self::default()
            },
        }
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl Default for CommitInterval {
    fn default() -> Self {
        Self(DEFAULT_COMMIT_INTERVAL)
    }
}

impl std::fmt::Display for CommitInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Ingest Configuration
// ============================================================================

/// Main ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Output SQLite file; derived from the source creation date when unset
    pub database: Option<PathBuf>,
    pub commit_interval: CommitInterval,
    /// Entity kinds to load; documents of other kinds are skipped
    pub entity_kinds: Vec<EntityKind>,
    pub record_tag: String,
    /// Verify the archive's SHA-1 before extraction
    pub verify_checksum: bool,
    /// Extraction directory; the system temp dir when unset
    pub work_dir: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            database: None,
            commit_interval: CommitInterval::default(),
            entity_kinds: vec![EntityKind::LegalPerson],
            record_tag: RECORD_TAG.to_string(),
            verify_checksum: false,
            work_dir: None,
        }
    }
}

impl IngestConfig {
    /// Load configuration from environment variables
    ///
    /// - `USEROU_DATABASE`: output SQLite path
    /// - `USEROU_COMMIT_INTERVAL`: records between commits (minimum 2000)
    /// - `USEROU_FOP`: also load natural-person entrepreneurs (true/false)
    /// - `USEROU_CHECK_SHA1`: verify archive checksum (true/false)
    /// - `USEROU_WORK_DIR`: extraction directory
    /// - `USEROU_RECORD_TAG`: record element name
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("USEROU_DATABASE") {
            config.database = Some(PathBuf::from(path));
        }

        if let Ok(interval) = std::env::var("USEROU_COMMIT_INTERVAL") {
            let requested: i64 = interval.trim().parse().map_err(|_| {
                IngestError::Common(userou_common::UserouError::Config(format!(
                    "USEROU_COMMIT_INTERVAL must be an integer, got '{}'",
                    interval
                )))
            })?;
            config.commit_interval = CommitInterval::from_requested(requested);
        }

        if std::env::var("USEROU_FOP")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false)
        {
            config = config.with_entrepreneurs(true);
        }

        config.verify_checksum = std::env::var("USEROU_CHECK_SHA1")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(false);

        if let Ok(dir) = std::env::var("USEROU_WORK_DIR") {
            config.work_dir = Some(PathBuf::from(dir));
        }

        if let Ok(tag) = std::env::var("USEROU_RECORD_TAG") {
            config.record_tag = tag;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.record_tag.trim().is_empty() {
            return Err(config_error("record tag must not be empty"));
        }
        if self.entity_kinds.is_empty() {
            return Err(config_error("at least one entity kind must be requested"));
        }
        if let Some(dir) = &self.work_dir {
            if !dir.is_dir() {
                return Err(config_error(format!(
                    "work directory {} does not exist",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    /// Include or drop natural-person entrepreneurs
    pub fn with_entrepreneurs(mut self, include: bool) -> Self {
        self.entity_kinds.retain(|kind| *kind != EntityKind::Entrepreneur);
        if include {
            self.entity_kinds.push(EntityKind::Entrepreneur);
        }
        self
    }

    pub fn wants(&self, kind: EntityKind) -> bool {
        self.entity_kinds.contains(&kind)
    }

    /// Directory for extracted documents
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Output database path, naming it after the source date when unset
    pub fn database_path(&self, created: &str) -> PathBuf {
        match &self.database {
            Some(path) => path.clone(),
            None => default_database_name(created),
        }
    }
}

/// `edr_3_<date>.sqlite` in the current directory
pub fn default_database_name(created: &str) -> PathBuf {
    let date = created.split('T').next().unwrap_or(created);
    Path::new(".").join(format!("edr_3_{}.sqlite", date))
}

fn config_error(msg: impl Into<String>) -> IngestError {
    IngestError::Common(userou_common::UserouError::Config(msg.into()))
}
