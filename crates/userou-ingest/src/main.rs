//! Userou Ingest - ЄДР register loader

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::signal;
use tracing::{error, info, warn};
use userou_common::logging::{init_logging, LogConfig, LogLevel};
use userou_ingest::archive;
use userou_ingest::progress::{create_spinner, report};
use userou_ingest::registry::{
    EntityKind, InterruptFlag, Pipeline, RegistryStore, RunSummary, SourceDocument, SourceMetadata,
};
use userou_ingest::{CommitInterval, IngestConfig, IngestError};

/// Exit status after Ctrl+C, as a shell would report it
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "userou-ingest")]
#[command(author, version, about = "Load the ЄДР (UO/FOP) register into SQLite")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load already extracted XML documents
    Load {
        /// Legal person (UO) document
        #[arg(short, long, env = "USEROU_LEGAL")]
        legal: PathBuf,

        /// Entrepreneur (FOP) document
        #[arg(short, long, env = "USEROU_ENTREPRENEURS")]
        entrepreneurs: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Verify, extract and load a register archive
    Archive {
        /// ZIP archive as published on data.gov.ua
        archive: PathBuf,

        /// Also load natural-person entrepreneurs
        #[arg(long, env = "USEROU_FOP")]
        fop: bool,

        /// Verify the archive SHA-1 before extraction
        #[arg(long, env = "USEROU_CHECK_SHA1")]
        checksha1: bool,

        /// Expected SHA-1; taken from --metainfo when omitted
        #[arg(long)]
        sha1: Option<String>,

        /// Extract into the current directory instead of the work directory
        #[arg(long)]
        curdir: bool,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output SQLite database (default: ./edr_3_<created>.sqlite)
    #[arg(short, long, env = "USEROU_DATABASE")]
    database: Option<PathBuf>,

    /// Records per transaction (minimum 2000)
    #[arg(short, long, env = "USEROU_COMMIT_INTERVAL", allow_negative_numbers = true)]
    commit: Option<i64>,

    /// Saved data.gov.ua resource_show response describing the source
    #[arg(short, long)]
    metainfo: Option<PathBuf>,
}

impl OutputArgs {
    fn apply(&self, config: &mut IngestConfig) {
        if let Some(database) = &self.database {
            config.database = Some(database.clone());
        }
        if let Some(commit) = self.commit {
            config.commit_interval = CommitInterval::from_requested(commit);
        }
    }

    fn declared_metadata(&self) -> userou_ingest::Result<Option<SourceMetadata>> {
        self.metainfo
            .as_deref()
            .map(SourceMetadata::from_resource_file)
            .transpose()
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("parse_edr")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let config = IngestConfig::from_env().context("Invalid USEROU_* configuration")?;

    let interrupt = InterruptFlag::default();
    tokio::spawn(watch_signals(interrupt.clone()));

    let command = cli.command;
    let outcome = tokio::task::spawn_blocking(move || ingest(command, config, interrupt))
        .await
        .context("Ingestion task panicked")?;

    match outcome {
        Ok(summary) => {
            for document in &summary.documents {
                info!(path = %document.path.display(), kind = %document.kind, records = document.records, "Loaded");
            }
            println!("{}", report(summary.records_processed, summary.elapsed));
            Ok(ExitCode::SUCCESS)
        },
        Err(IngestError::Interrupted { records }) => {
            warn!(records, "Interrupted by user; processed records were saved");
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        },
        Err(err) => {
            error!(error = %err, "Ingestion failed");
            Err(err.into())
        },
    }
}

/// Raise the interrupt flag on Ctrl+C or SIGTERM
async fn watch_signals(interrupt: InterruptFlag) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping after the current record");
        },
        _ = terminate => {
            info!("Received terminate signal, stopping after the current record");
        },
    }

    interrupt.raise();
}

fn ingest(
    command: Command,
    mut config: IngestConfig,
    interrupt: InterruptFlag,
) -> userou_ingest::Result<RunSummary> {
    match command {
        Command::Load {
            legal,
            entrepreneurs,
            output,
        } => {
            output.apply(&mut config);
            if entrepreneurs.is_some() {
                config = config.with_entrepreneurs(true);
            }
            config.validate()?;

            let mut documents = vec![SourceDocument::new(&legal, EntityKind::LegalPerson)];
            if let Some(path) = entrepreneurs {
                documents.push(SourceDocument::new(path, EntityKind::Entrepreneur));
            }

            match output.declared_metadata()? {
                Some(declared) => {
                    let declared = if config.verify_checksum {
                        declared
                    } else {
                        declared.without_hash()
                    };
                    documents[0].metadata = Some(declared);
                },
                None => {
                    for document in &mut documents {
                        document.metadata =
                            Some(SourceMetadata::from_file(&document.path, config.verify_checksum)?);
                    }
                },
            }

            load(&documents, &config, interrupt)
        },
        Command::Archive {
            archive: archive_path,
            fop,
            checksha1,
            sha1,
            curdir,
            output,
        } => {
            output.apply(&mut config);
            if fop {
                config = config.with_entrepreneurs(true);
            }
            config.verify_checksum |= checksha1;
            if curdir {
                config.work_dir = Some(std::env::current_dir()?);
            }
            config.validate()?;

            let mut metadata = match output.declared_metadata()? {
                Some(declared) => declared,
                None => SourceMetadata::from_file(&archive_path, false)?,
            };

            if config.verify_checksum {
                let expected = sha1.or_else(|| metadata.hash.clone()).ok_or_else(|| {
                    IngestError::metadata("no SHA-1 to verify against; pass --sha1 or --metainfo")
                })?;
                archive::verify_archive(&archive_path, &expected)?;
                metadata.hash = Some(expected.to_lowercase());
            } else {
                metadata = metadata.without_hash();
            }

            let work_dir = config.work_dir();
            let mut extracted = archive::extract_documents(&archive_path, &work_dir, &config.entity_kinds)?;
            if let Some(first) = extracted.documents.first_mut() {
                first.metadata = Some(metadata);
            }

            let outcome = if interrupt.is_raised() {
                Err(IngestError::Interrupted { records: 0 })
            } else {
                load(&extracted.documents, &config, interrupt)
            };

            if let Err(err) = extracted.cleanup() {
                warn!(error = %err, dir = %work_dir.display(), "Failed to remove extracted documents");
            }
            outcome
        },
    }
}

fn load(
    documents: &[SourceDocument],
    config: &IngestConfig,
    interrupt: InterruptFlag,
) -> userou_ingest::Result<RunSummary> {
    let created = documents
        .iter()
        .find_map(|doc| doc.metadata.as_ref())
        .map(|meta| meta.created_date().to_string())
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());
    let database = config.database_path(&created);
    info!(database = %database.display(), commit_interval = %config.commit_interval, "Writing registry database");

    let store = RegistryStore::open(&database)?;
    let mut pipeline = Pipeline::new(store, config)
        .with_interrupt(interrupt)
        .with_progress_bar(create_spinner(&spinner_message(documents)));

    pipeline.run(documents)
}

fn spinner_message(documents: &[SourceDocument]) -> String {
    let names: Vec<String> = documents
        .iter()
        .filter_map(|doc| doc.path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    format!("Loading {}", names.join(", "))
}
