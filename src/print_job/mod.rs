// src/print_job/mod.rs
//! Print job data model and lifecycle.
//!
//! A job is created when an image is uploaded, moves to `Printing` when a
//! print is requested and ends in `Completed` or `Failed` once the printer
//! service answers. The [`registry::JobRegistry`] owns every job and is the
//! only place a state is written; the [`controller::PrintJobController`]
//! drives the transitions.

pub mod controller;
pub mod registry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub use controller::PrintJobController;
pub use registry::{JobRegistry, Retention};

#[derive(Debug, Error)]
pub enum PrintJobError {
    #[error("{0}")]
    Validation(String),
    #[error("Job not found: {0}")]
    NotFound(String),
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Job registry is full ({0} jobs)")]
    Capacity(usize),
    #[error("Job {0} already exists")]
    DuplicateJob(JobId),
    #[error("Print task failed: {0}")]
    PrintTask(String),
}

/// Opaque job identifier, issued once per upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = PrintJobError;

    /// Anything that is not a UUID can never have been issued, so it is
    /// reported as an unknown job.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(JobId)
            .map_err(|_| PrintJobError::NotFound(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Uploaded,
    Printing,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Forward edges of the lifecycle: `Uploaded -> Printing -> {Completed, Failed}`.
    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Uploaded, JobState::Printing)
                | (JobState::Printing, JobState::Completed)
                | (JobState::Printing, JobState::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Uploaded => "uploaded",
            JobState::Printing => "printing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image that has been written to the upload directory.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub job_id: JobId,
    pub path: PathBuf,
    pub filename: String,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub image_path: PathBuf,
    pub filename: String,
    pub size: u64,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Only set once the job has reached `Failed`.
    pub error_detail: Option<String>,
}

impl Job {
    pub fn new(image: StoredImage) -> Self {
        let now = Utc::now();
        Self {
            id: image.job_id,
            image_path: image.path,
            filename: image.filename,
            size: image.size,
            state: JobState::Uploaded,
            created_at: now,
            updated_at: now,
            error_detail: None,
        }
    }
}

/// Outcome reported by the printer service for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintResult {
    pub success: bool,
    pub detail: String,
}

impl PrintResult {
    pub fn ok(detail: impl Into<String>) -> Self {
        Self { success: true, detail: detail.into() }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self { success: false, detail: detail.into() }
    }
}
