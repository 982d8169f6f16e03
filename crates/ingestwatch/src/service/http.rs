//! HTTP implementation of the job service client.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Serialize;

use super::{JobService, ServiceError};
use crate::config::ServiceConfig;
use crate::job::JobSnapshot;

/// Maximum length for error bodies carried in errors and logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

fn truncate_body(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY_LENGTH {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &body[..end])
    } else {
        body.to_string()
    }
}

#[derive(Debug, Serialize)]
struct CreateJobRequest<'a> {
    path: &'a str,
    project: &'a str,
}

/// Job service reached over HTTP/JSON.
///
/// - `POST {base}/api/index` with `{"path", "project"}` creates a job.
/// - `GET {base}/api/index/{job_id}` returns its status.
pub struct HttpJobService {
    client: Client,
    base_url: Url,
}

impl HttpJobService {
    /// Creates a client for the service at `config.base_url`.
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|_| ServiceError::InvalidUrl(config.base_url.clone()))?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::InvalidUrl(config.base_url.clone()));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ServiceError::ClientBuild(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ServiceError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn read_snapshot(
        response: Response,
        job_id: Option<&str>,
    ) -> Result<JobSnapshot, ServiceError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(job_id) = job_id {
                return Err(ServiceError::NotFound(job_id.to_string()));
            }
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Http {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl JobService for HttpJobService {
    async fn create_job(&self, path: &str, project: &str) -> Result<JobSnapshot, ServiceError> {
        let url = self.endpoint(&["api", "index"])?;
        info!("Submitting indexing job for {} (project {})", path, project);

        let response = self
            .client
            .post(url)
            .json(&CreateJobRequest { path, project })
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        Self::read_snapshot(response, None).await
    }

    async fn get_job_status(&self, job_id: &str) -> Result<JobSnapshot, ServiceError> {
        let url = self.endpoint(&["api", "index", job_id])?;
        debug!("Requesting status of job {}", job_id);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        Self::read_snapshot(response, Some(job_id)).await
    }
}
