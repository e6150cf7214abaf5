//! Pipeline coordinator
//!
//! Drives decode → extract → derive → write over each source document in
//! turn, legal persons first. Commits happen every commit interval, at the end
//! of each document, and whenever a pass stops early, so the database is always
//! a prefix of the input. Indexes are built only after every document loaded.

use indicatif::ProgressBar;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::decoder::FileDecoder;
use super::derive::enrich;
use super::extractor::extract;
use super::models::{DocumentSummary, EntityKind, RunSummary, SourceDocument};
use super::storage::{BatchWriter, RegistryStore};
use crate::config::{CommitInterval, IngestConfig, PROGRESS_INTERVAL};
use crate::error::{IngestError, Result};

// ============================================================================
// Shared Handles
// ============================================================================

/// Records processed so far, readable from other threads during a run
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter(Arc<AtomicU64>);

impl ProgressCounter {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Cooperative stop request, checked before each record
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct Pipeline {
    store: RegistryStore,
    config: IngestConfig,
    progress: ProgressCounter,
    interrupt: InterruptFlag,
    progress_bar: ProgressBar,
}

impl Pipeline {
    pub fn new(store: RegistryStore, config: &IngestConfig) -> Self {
        Self {
            store,
            config: config.clone(),
            progress: ProgressCounter::default(),
            interrupt: InterruptFlag::default(),
            progress_bar: ProgressBar::hidden(),
        }
    }

    /// Show progress markers on a terminal spinner
    pub fn with_progress_bar(mut self, progress_bar: ProgressBar) -> Self {
        self.progress_bar = progress_bar;
        self
    }

    /// Share a stop flag created before the pipeline, e.g. by a signal watcher
    pub fn with_interrupt(mut self, interrupt: InterruptFlag) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn progress(&self) -> ProgressCounter {
        self.progress.clone()
    }

    pub fn interrupt_handle(&self) -> InterruptFlag {
        self.interrupt.clone()
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Load every requested document into the store
    pub fn run(&mut self, documents: &[SourceDocument]) -> Result<RunSummary> {
        let started = Instant::now();

        let (mut ordered, skipped): (Vec<&SourceDocument>, Vec<&SourceDocument>) =
            documents.iter().partition(|doc| self.config.wants(doc.kind));
        for document in skipped {
            info!(
                path = %document.path.display(),
                kind = %document.kind,
                "Skipping document, entity kind not requested"
            );
        }
        ordered.sort_by_key(|doc| doc.kind);

        for metadata in ordered.iter().filter_map(|doc| doc.metadata.as_ref()) {
            self.store.record_source(metadata)?;
        }

        let mut writer = BatchWriter::new(&self.store, self.config.commit_interval);
        let mut summaries = Vec::with_capacity(ordered.len());

        for document in ordered {
            info!(path = %document.path.display(), kind = %document.kind, "Loading document");
            let outcome = self.load_document(&mut writer, document);
            let committed = writer.commit();

            let records = match (outcome, committed) {
                (Ok(records), Ok(_)) => records,
                (Err(err), Ok(_)) => {
                    self.progress_bar.abandon();
                    return Err(err);
                },
                (Ok(_), Err(err)) => return Err(err),
                (Err(err), Err(commit_err)) => {
                    error!(error = %commit_err, "Failed to commit accepted records");
                    return Err(err);
                },
            };

            info!(path = %document.path.display(), records, "Document loaded");
            summaries.push(DocumentSummary {
                path: document.path.clone(),
                kind: document.kind,
                records,
            });
        }

        self.progress_bar.set_message("Creating indexes");
        self.store.create_indexes()?;
        self.progress_bar.finish_and_clear();

        Ok(RunSummary {
            records_processed: self.progress.get(),
            elapsed: started.elapsed(),
            documents: summaries,
        })
    }

    fn load_document(&self, writer: &mut BatchWriter<'_>, document: &SourceDocument) -> Result<u64> {
        let mut decoder = FileDecoder::from_path(&document.path, &self.config.record_tag)?;
        let mut records = 0;

        loop {
            if self.interrupt.is_raised() {
                let processed = self.progress.get();
                warn!(records = processed, "Interrupted, committing accepted records");
                return Err(IngestError::Interrupted { records: processed });
            }

            let Some(element) = decoder.next_record()? else {
                break;
            };
            let record = extract(element, document.kind)?;
            writer.write(&enrich(record))?;
            records += 1;

            let total = self.progress.increment();
            if writer.checkpoint_due() {
                writer.commit()?;
            }
            if total % PROGRESS_INTERVAL == 0 {
                info!(records = total, "Progress");
                self.progress_bar.set_message(format!("{} records", total));
            }
        }

        Ok(records)
    }
}

/// Open (or create) `database` and load `documents` into it
///
/// Returns the number of records processed and the elapsed time. Commit
/// intervals below the minimum fall back to the default.
pub fn run(
    database: impl AsRef<Path>,
    documents: &[SourceDocument],
    kinds: &[EntityKind],
    commit_interval: i64,
) -> Result<(u64, Duration)> {
    let config = IngestConfig {
        database: Some(database.as_ref().to_path_buf()),
        commit_interval: CommitInterval::from_requested(commit_interval),
        entity_kinds: kinds.to_vec(),
        ..IngestConfig::default()
    };
    config.validate()?;

    let store = RegistryStore::open(database)?;
    let summary = Pipeline::new(store, &config).run(documents)?;
    Ok((summary.records_processed, summary.elapsed))
}
