//! Contains the data models for API requests and responses.

use crate::print_job::{Job, JobId, JobState};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Returned after an image has been accepted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub job_id: JobId,
    pub filename: String,
    pub size: u64,
}

impl From<&Job> for UploadResponse {
    fn from(job: &Job) -> Self {
        Self {
            success: true,
            job_id: job.id,
            filename: job.filename.clone(),
            size: job.size,
        }
    }
}

/// Returned once a print request has run to completion.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintResponse {
    pub accepted: bool,
    pub job_id: JobId,
    pub state: JobState,
}

/// Polling view of a job.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: JobId,
    pub state: JobState,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            state: job.state,
            message: format!("Job is {}", job.state),
            error_detail: job.error_detail,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
