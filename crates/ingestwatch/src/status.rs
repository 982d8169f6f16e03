//! Job status vocabulary and progress fields reported by the job service.

use serde::{Deserialize, Serialize};

/// Status of a job as reported by the job service.
///
/// Values the client does not recognise are kept verbatim in `Other` and are
/// treated as non-terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Started,
    Running,
    Completed,
    Failed,
    Other(String),
}

impl JobStatus {
    /// Returns the wire representation of the status.
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Started => "started",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Other(raw) => raw,
        }
    }

    /// Returns true for `completed` and `failed`; no transitions follow these.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "started" => JobStatus::Started,
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Other(raw),
        }
    }
}

impl From<&str> for JobStatus {
    fn from(raw: &str) -> Self {
        JobStatus::from(raw.to_string())
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable label for a status.
pub fn label(status: &JobStatus) -> String {
    match status {
        JobStatus::Started => "Preparing files…".to_string(),
        JobStatus::Running => "Indexing files…".to_string(),
        JobStatus::Completed => "Completed".to_string(),
        JobStatus::Failed => "Failed".to_string(),
        JobStatus::Other(raw) => capitalize(raw),
    }
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Progress of a running job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    /// Completion percentage, 0 to 100.
    #[serde(default)]
    pub percent: f64,
    #[serde(default)]
    pub total_files: u64,
    #[serde(default)]
    pub processed_files: u64,
    /// File currently being processed, if the service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
}

impl JobProgress {
    /// Returns a copy with `percent` clamped into 0..=100.
    pub fn clamped(mut self) -> Self {
        self.percent = if self.percent.is_nan() {
            0.0
        } else {
            self.percent.clamp(0.0, 100.0)
        };
        self
    }
}

/// Output counts of a completed job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    #[serde(default)]
    pub documents: u64,
    #[serde(default)]
    pub chunks: u64,
}

/// A per-file failure reported for a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub file: String,
    pub error: String,
}
