//! The remote job service this client submits to and polls.

use async_trait::async_trait;

use crate::job::JobSnapshot;

pub mod error;
pub mod http;

pub use error::ServiceError;
pub use http::HttpJobService;

/// Remote service that runs indexing jobs.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Submits a new job and returns its initial snapshot.
    async fn create_job(&self, path: &str, project: &str) -> Result<JobSnapshot, ServiceError>;

    /// Returns the current snapshot of a job. Unknown ids yield
    /// [`ServiceError::NotFound`].
    async fn get_job_status(&self, job_id: &str) -> Result<JobSnapshot, ServiceError>;
}
