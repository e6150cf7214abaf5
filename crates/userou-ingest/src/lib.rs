//! Userou Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Loads the Ukrainian Unified State Register of legal entities and
//! individual entrepreneurs (ЄДР) into SQLite.
//!
//! # Sources
//!
//! - **UO**: legal persons, with chief officer and founders
//! - **FOP**: natural-person entrepreneurs
//!
//! Both arrive as multi-gigabyte XML documents, usually inside one ZIP
//! archive published on data.gov.ua.
//!
//! # Example
//!
//! ```no_run
//! use userou_ingest::registry::{self, EntityKind, SourceDocument};
//!
//! fn main() -> userou_ingest::Result<()> {
//!     let documents = [SourceDocument::new("17.1-EX_XML_EDR_UO.xml", EntityKind::LegalPerson)];
//!     let (records, elapsed) =
//!         registry::run("edr.sqlite", &documents, &[EntityKind::LegalPerson], 2000)?;
//!     println!("{} records in {:?}", records, elapsed);
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod progress;
pub mod registry;

pub use config::{CommitInterval, IngestConfig};
pub use error::{IngestError, Result};
