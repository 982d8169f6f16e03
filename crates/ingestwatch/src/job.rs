//! The tracked job and the status snapshots the job service reports for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::{FileError, JobProgress, JobStats, JobStatus};

/// A job as reported by the job service, either on creation or on a status
/// request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub job_id: String,
    pub status: JobStatus,
    /// Absent when the service omits it, typically on a terminal response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<JobProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<JobStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FileError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobSnapshot {
    /// Creates a snapshot with only an id and a status.
    pub fn new(job_id: &str, status: JobStatus) -> Self {
        Self {
            job_id: job_id.to_string(),
            status,
            progress: None,
            path: None,
            project: None,
            stats: None,
            errors: None,
            started_at: None,
            completed_at: None,
        }
    }
}

/// The job currently tracked by the lifecycle manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: String,
    pub path: String,
    pub project: String,
    pub status: JobStatus,
    pub progress: JobProgress,
    /// Set once the job has completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<JobStats>,
    /// Set once the job is terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FileError>>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Builds a job from the first snapshot the service returned for it.
    ///
    /// `path` and `project` are the submission parameters; the snapshot's own
    /// values are used when present (a status response during recovery may
    /// carry them), otherwise the fallbacks apply.
    pub fn from_snapshot(snapshot: &JobSnapshot, path: &str, project: &str) -> Self {
        Self {
            job_id: snapshot.job_id.clone(),
            path: snapshot.path.clone().unwrap_or_else(|| path.to_string()),
            project: snapshot
                .project
                .clone()
                .unwrap_or_else(|| project.to_string()),
            status: snapshot.status.clone(),
            progress: snapshot.progress.clone().unwrap_or_default().clamped(),
            stats: None,
            errors: None,
            started_at: snapshot.started_at.unwrap_or_else(Utc::now),
            completed_at: None,
        }
    }

    /// Replaces the mutable fields with the latest snapshot.
    ///
    /// A snapshot without progress keeps the last progress seen.
    pub fn apply_progress(&mut self, snapshot: &JobSnapshot) {
        self.status = snapshot.status.clone();
        if let Some(progress) = &snapshot.progress {
            self.progress = progress.clone().clamped();
        }
    }

    /// Applies a terminal snapshot: status, progress, completion time,
    /// results and per-file errors.
    pub fn finalize(&mut self, snapshot: &JobSnapshot) {
        self.apply_progress(snapshot);
        self.completed_at = Some(snapshot.completed_at.unwrap_or_else(Utc::now));
        if matches!(self.status, JobStatus::Completed) {
            self.stats = Some(snapshot.stats.unwrap_or_default());
        }
        self.errors = Some(snapshot.errors.clone().unwrap_or_default());
    }

    /// Returns true if this job is finished (completed or failed).
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Number of per-file errors reported, zero while non-terminal.
    pub fn error_count(&self) -> usize {
        self.errors.as_ref().map_or(0, Vec::len)
    }
}
