use std::path::PathBuf;
use thiserror::Error;

use crate::service::ServiceError;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Job service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum LifecycleError {
    /// The job service rejected or could not receive the submission.
    #[error("Job submission failed: {0}")]
    Submission(#[source] ServiceError),

    #[error("Job '{job_id}' is not finished (status '{status}')")]
    NotTerminal { job_id: String, status: String },
}

pub type Result<T> = std::result::Result<T, IngestError>;
