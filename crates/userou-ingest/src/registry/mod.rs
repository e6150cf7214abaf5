//! Unified State Register (ЄДР) ingestion
//!
//! Streams the UO (legal person) and FOP (entrepreneur) XML documents into a
//! SQLite database: one record at a time, in bounded memory, with periodic
//! commits so an interrupted load leaves a usable prefix.

pub mod decoder;
pub mod derive;
pub mod extractor;
pub mod metadata;
pub mod models;
pub mod pipeline;
pub mod schema;
pub mod storage;

pub use decoder::{FileDecoder, RecordDecoder};
pub use derive::enrich;
pub use extractor::extract;
pub use metadata::SourceMetadata;
pub use models::{
    Derived, DocumentSummary, EnrichedRecord, EntityKind, Entrepreneur, LegalPerson, RawElement,
    RunSummary, Sex, SourceDocument, StructuredRecord,
};
pub use pipeline::{run, InterruptFlag, Pipeline, ProgressCounter};
pub use storage::{BatchWriter, RegistryStore};
