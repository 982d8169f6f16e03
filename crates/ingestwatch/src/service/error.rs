//! Job service error types.

use thiserror::Error;

/// Errors returned by a [`JobService`](super::JobService).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The request did not reach the service or the connection failed,
    /// including timeouts.
    #[error("Request to job service failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("Job service returned {status}: {body}")]
    Http { status: u16, body: String },

    /// The service does not know the job.
    #[error("Job '{0}' not found")]
    NotFound(String),

    /// The response body could not be decoded.
    #[error("Failed to decode job service response: {0}")]
    Decode(String),

    /// The configured base URL cannot be used.
    #[error("Invalid job service URL '{0}'")]
    InvalidUrl(String),

    /// The HTTP client could not be created.
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),
}

impl ServiceError {
    /// Returns true if the failure happened before a response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, ServiceError::Transport(_))
    }
}
