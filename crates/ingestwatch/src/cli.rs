//! Command line front end.
//!
//! Every command first runs startup recovery, so a job left over from a
//! previous run is resumed or recorded before anything else touches the
//! active-job pointer.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::config::{load_config, Config};
use crate::error::IngestError;
use crate::job::Job;
use crate::lifecycle::{LifecycleEvent, LifecycleManager, RecoveryOutcome};
use crate::service::HttpJobService;
use crate::status::label;
use crate::store::{HistoryEntry, StateStore};

#[derive(Debug, Parser)]
#[command(name = "ingestwatch", version, about = "Submit and follow indexing jobs")]
pub struct Cli {
    /// Path to a JSON config file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Submit a folder for indexing and follow its progress
    Submit {
        path: String,
        project: String,
        /// Return right after submission
        #[arg(long)]
        detach: bool,
    },
    /// Follow the job left over from a previous run
    Resume,
    /// Show recently finished jobs
    History,
    /// Forget all finished jobs
    ClearHistory,
}

/// Builds the manager from the config and runs the command.
pub async fn run(cli: Cli) -> Result<(), IngestError> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    let store = match config.resolved_database_path() {
        Some(path) => StateStore::open(&path),
        None => {
            warn!("No home directory found, job state will not be persisted");
            StateStore::disabled()
        }
    };
    let service = Arc::new(HttpJobService::new(&config.service)?);
    let manager = LifecycleManager::from_config(service, store, &config);

    execute(&manager, cli.command).await
}

/// Recovers any unfinished job, then runs `command` against `manager`.
pub async fn execute(manager: &LifecycleManager, command: Commands) -> Result<(), IngestError> {
    let resumed = match manager.recover_on_startup().await {
        RecoveryOutcome::NothingToRecover => None,
        RecoveryOutcome::Finalized(job) => {
            println!("Job {} finished while away", job.job_id);
            print_summary(&job);
            None
        }
        RecoveryOutcome::Discarded { job_id, error } => {
            info!("Dropped job {}: {}", job_id, error);
            println!("Job {} is no longer known to the service", job_id);
            None
        }
        RecoveryOutcome::Resumed(job) => Some(job),
    };
    // A terminal event from recovery must not end `follow`.
    let events = manager.subscribe();

    match command {
        Commands::Submit {
            path,
            project,
            detach,
        } => {
            if let Some(previous) = &resumed {
                println!(
                    "Job {} is still running and will no longer be followed",
                    previous.job_id
                );
            }
            let job = manager.submit(&path, &project).await?;
            println!("Submitted job {} ({})", job.job_id, label(&job.status));
            if detach {
                return Ok(());
            }
            follow(events).await
        }
        Commands::Resume => match resumed {
            Some(job) => {
                println!("Resumed job {}", job.job_id);
                print_progress(&job);
                follow(events).await
            }
            None => {
                println!("No unfinished job");
                Ok(())
            }
        },
        Commands::History => {
            let entries = manager.history();
            if entries.is_empty() {
                println!("No finished jobs");
            }
            for entry in &entries {
                print_history_entry(entry);
            }
            Ok(())
        }
        Commands::ClearHistory => {
            manager.clear_history();
            println!("History cleared");
            Ok(())
        }
    }
}

async fn follow(mut events: broadcast::Receiver<LifecycleEvent>) -> Result<(), IngestError> {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(LifecycleEvent::Progress(job)) => print_progress(&job),
                Ok(LifecycleEvent::Terminal(job)) => {
                    print_summary(&job);
                    return Ok(());
                }
                Ok(LifecycleEvent::PollFailed { job_id, error }) => {
                    eprintln!("Lost contact with job {}; run `ingestwatch resume` later", job_id);
                    return Err(error.into());
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Skipped {} progress updates", skipped);
                }
                Err(RecvError::Closed) => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => {
                println!("Stopped following; the job keeps running. Use `ingestwatch resume` to pick it up.");
                return Ok(());
            }
        }
    }
}

fn print_progress(job: &Job) {
    let current = job.progress.current_file.as_deref().unwrap_or("");
    println!(
        "{} {:>3.0}% ({}/{}) {}",
        label(&job.status),
        job.progress.percent,
        job.progress.processed_files,
        job.progress.total_files,
        current
    );
}

fn print_summary(job: &Job) {
    let stats = job.stats.unwrap_or_default();
    println!(
        "{}: job {} indexed {} documents into {} chunks",
        label(&job.status),
        job.job_id,
        stats.documents,
        stats.chunks
    );
    for error in job.errors.iter().flatten() {
        println!("  {}: {}", error.file, error.error);
    }
}

fn print_history_entry(entry: &HistoryEntry) {
    let finished = entry
        .completed_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{}  {:<9}  {}  {}  {}/{} files, {} docs, {} chunks, {} errors",
        finished,
        label(&entry.status),
        entry.project,
        entry.path,
        entry.files_processed,
        entry.total_files,
        entry.documents,
        entry.chunks,
        entry.error_count
    );
}
