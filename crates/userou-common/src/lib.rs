//! Userou Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling, logging and file utilities for the userou workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`UserouError`] and the [`Result`] alias
//! - **Checksums**: archive integrity verification (SHA-1 as published by the
//!   dataset portal, SHA-256 for local bookkeeping)
//! - **Logging**: `tracing` subscriber setup shared by every binary
//! - **Types**: file metadata captured before ingestion
//!
//! # Example
//!
//! ```no_run
//! use userou_common::checksum::compute_file_checksum;
//! use userou_common::types::ChecksumAlgorithm;
//!
//! fn fingerprint(path: &str) -> userou_common::Result<String> {
//!     compute_file_checksum(path, ChecksumAlgorithm::Sha1)
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, UserouError};
