//! Registry record models
//!
//! A record moves through three shapes: [`RawElement`] straight out of the
//! decoder, [`StructuredRecord`] after positional extraction, and
//! [`EnrichedRecord`] once the derived attributes are attached.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::metadata::SourceMetadata;

// ============================================================================
// Entity Kind
// ============================================================================

/// Entity-kind discriminator, stored as `facemode`
///
/// Ordering follows load order: legal persons first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Юридична особа (UO document)
    LegalPerson,
    /// Фізична особа-підприємець (FOP document)
    Entrepreneur,
}

impl EntityKind {
    /// Value of the `facemode` column
    pub fn facemode(self) -> i64 {
        match self {
            EntityKind::LegalPerson => 0,
            EntityKind::Entrepreneur => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::LegalPerson => "legal_person",
            EntityKind::Entrepreneur => "entrepreneur",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    /// Accepts the historical one-letter codes as well (`u`, `f`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "u" | "uo" | "legal" | "legal_person" => Ok(EntityKind::LegalPerson),
            "f" | "fop" | "entrepreneur" => Ok(EntityKind::Entrepreneur),
            other => Err(format!("unknown entity kind: {}", other)),
        }
    }
}

// ============================================================================
// Raw Element
// ============================================================================

/// One element subtree as read from the document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawElement {
    pub tag: String,
    /// Character data preceding the first child element
    pub text: Option<String>,
    pub children: Vec<RawElement>,
}

impl RawElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Leaf element with text content
    pub fn leaf(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: Some(text.into()),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: RawElement) -> Self {
        self.children.push(child);
        self
    }
}

// ============================================================================
// Structured Records
// ============================================================================

/// Legal person fields in document order, plus founders
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LegalPerson {
    pub full_name: Option<String>,
    pub short_name: Option<String>,
    pub tin: Option<String>,
    pub address: Option<String>,
    pub chief_officer: Option<String>,
    pub activity: Option<String>,
    pub status: Option<String>,
    /// One entry per child of the founders container; `None` for an empty child
    pub founders: Vec<Option<String>>,
}

/// Entrepreneur fields in document order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Entrepreneur {
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub activity: Option<String>,
    pub status: Option<String>,
}

/// Extracted record of either kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructuredRecord {
    LegalPerson(LegalPerson),
    Entrepreneur(Entrepreneur),
}

impl StructuredRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            StructuredRecord::LegalPerson(_) => EntityKind::LegalPerson,
            StructuredRecord::Entrepreneur(_) => EntityKind::Entrepreneur,
        }
    }

    /// Positional fields in document order
    pub fn fields(&self) -> Vec<Option<&str>> {
        match self {
            StructuredRecord::LegalPerson(p) => vec![
                p.full_name.as_deref(),
                p.short_name.as_deref(),
                p.tin.as_deref(),
                p.address.as_deref(),
                p.chief_officer.as_deref(),
                p.activity.as_deref(),
                p.status.as_deref(),
            ],
            StructuredRecord::Entrepreneur(e) => vec![
                e.full_name.as_deref(),
                e.address.as_deref(),
                e.activity.as_deref(),
                e.status.as_deref(),
            ],
        }
    }

    pub fn founders(&self) -> &[Option<String>] {
        match self {
            StructuredRecord::LegalPerson(p) => &p.founders,
            StructuredRecord::Entrepreneur(_) => &[],
        }
    }

    /// Name whose patronymic suffix decides the sex attribute
    pub fn person_name(&self) -> Option<&str> {
        match self {
            StructuredRecord::LegalPerson(p) => p.chief_officer.as_deref(),
            StructuredRecord::Entrepreneur(e) => e.full_name.as_deref(),
        }
    }

    pub fn activity(&self) -> Option<&str> {
        match self {
            StructuredRecord::LegalPerson(p) => p.activity.as_deref(),
            StructuredRecord::Entrepreneur(e) => e.activity.as_deref(),
        }
    }

    pub fn status(&self) -> Option<&str> {
        match self {
            StructuredRecord::LegalPerson(p) => p.status.as_deref(),
            StructuredRecord::Entrepreneur(e) => e.status.as_deref(),
        }
    }
}

// ============================================================================
// Derived Attributes
// ============================================================================

/// Sex inferred from name morphology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    /// Stored code, as used by existing consumers of the database
    pub fn code(self) -> &'static str {
        match self {
            Sex::Female => "Ж",
            Sex::Male => "Ч",
        }
    }
}

/// Attributes computed from extracted fields
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Derived {
    pub sex: Option<Sex>,
    pub classification_code: Option<String>,
    pub active: Option<bool>,
}

/// Record ready for persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub record: StructuredRecord,
    pub derived: Derived,
}

impl EnrichedRecord {
    pub fn kind(&self) -> EntityKind {
        self.record.kind()
    }
}

// ============================================================================
// Pipeline Inputs and Outputs
// ============================================================================

/// One already-extracted XML document to ingest
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub kind: EntityKind,
    /// Provenance row written before the main pass; archives attach it to one document only
    pub metadata: Option<SourceMetadata>,
}

impl SourceDocument {
    pub fn new(path: impl Into<PathBuf>, kind: EntityKind) -> Self {
        Self {
            path: path.into(),
            kind,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Per-document outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub path: PathBuf,
    pub kind: EntityKind,
    pub records: u64,
}

/// Outcome of a complete run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub records_processed: u64,
    pub elapsed: std::time::Duration,
    pub documents: Vec<DocumentSummary>,
}
