// src/print_job/registry.rs
use super::{Job, JobId, JobState, PrintJobError, StoredImage};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// A job behind its own lock. `None` marks a job that eviction has claimed
/// but not yet unlinked from the map.
type Slot = Arc<Mutex<Option<Job>>>;

/// How long jobs stay in the registry once nothing more will happen to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    /// Age after the last update at which a completed or failed job is dropped.
    pub finished: Duration,
    /// Age at which an upload that was never printed is dropped.
    pub unprinted: Duration,
}

impl Retention {
    /// Whether `job` may be dropped at `now`. Printing jobs never expire.
    pub fn is_expired(&self, job: &Job, now: DateTime<Utc>) -> bool {
        let limit = match job.state {
            JobState::Printing => return false,
            JobState::Uploaded => self.unprinted,
            JobState::Completed | JobState::Failed => self.finished,
        };
        (now - job.updated_at)
            .to_std()
            .map(|age| age >= limit)
            .unwrap_or(false)
    }
}

/// In-memory store of every live job.
///
/// The outer map lock is only held long enough to look up, insert or unlink
/// an entry. Each job sits behind its own mutex, so a state check and the
/// write that follows it happen under one lock without stalling other jobs.
#[derive(Debug)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Slot>>,
    max_jobs: usize,
}

impl JobRegistry {
    pub fn new(max_jobs: usize) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            max_jobs,
        }
    }

    /// Register a freshly stored image as an `Uploaded` job.
    pub async fn create(&self, image: StoredImage) -> Result<Job, PrintJobError> {
        let mut jobs = self.jobs.write().await;
        if jobs.len() >= self.max_jobs {
            tracing::warn!("Registry full ({} jobs), rejecting upload", jobs.len());
            return Err(PrintJobError::Capacity(self.max_jobs));
        }
        if jobs.contains_key(&image.job_id) {
            return Err(PrintJobError::DuplicateJob(image.job_id));
        }
        let job = Job::new(image);
        jobs.insert(job.id, Arc::new(Mutex::new(Some(job.clone()))));
        tracing::debug!("Registered job {}", job.id);
        Ok(job)
    }

    /// Snapshot of a job.
    pub async fn get(&self, id: &JobId) -> Result<Job, PrintJobError> {
        let slot = self.slot(id).await?;
        let guard = slot.lock().await;
        guard.clone().ok_or_else(|| PrintJobError::NotFound(id.to_string()))
    }

    /// Move a job from `from` to `to`.
    ///
    /// Fails with `InvalidTransition` when the job is not currently in
    /// `from`, or when `from -> to` is not a forward edge of the lifecycle.
    /// `detail` is recorded as the error detail when `to` is `Failed` and
    /// ignored otherwise.
    pub async fn transition(
        &self,
        id: &JobId,
        from: JobState,
        to: JobState,
        detail: Option<String>,
    ) -> Result<Job, PrintJobError> {
        if !from.can_transition_to(to) {
            return Err(PrintJobError::InvalidTransition(format!(
                "{} -> {} is not allowed",
                from, to
            )));
        }
        let slot = self.slot(id).await?;
        let mut guard = slot.lock().await;
        let job = guard
            .as_mut()
            .ok_or_else(|| PrintJobError::NotFound(id.to_string()))?;
        if job.state != from {
            return Err(PrintJobError::InvalidTransition(format!(
                "job {} is {}, expected {}",
                id, job.state, from
            )));
        }
        job.state = to;
        job.updated_at = Utc::now();
        if to == JobState::Failed {
            job.error_detail = Some(detail.unwrap_or_else(|| "unknown error".to_string()));
        }
        tracing::info!("Job {}: {} -> {}", id, from, to);
        Ok(job.clone())
    }

    /// Remove every job that `retention` says has expired at `now`.
    ///
    /// Each job is claimed under its own lock, so a concurrent `transition`
    /// either lands before the claim (and the job is re-judged in its new
    /// state) or finds the job gone. The map write lock is only taken to
    /// unlink the claimed entries.
    pub async fn evict_expired(&self, retention: Retention, now: DateTime<Utc>) -> Vec<Job> {
        let slots: Vec<Slot> = self.jobs.read().await.values().cloned().collect();
        let mut expired = Vec::new();
        for slot in slots {
            let mut guard = slot.lock().await;
            if guard.as_ref().is_some_and(|job| retention.is_expired(job, now)) {
                expired.extend(guard.take());
            }
        }
        if !expired.is_empty() {
            let mut jobs = self.jobs.write().await;
            for job in &expired {
                jobs.remove(&job.id);
            }
        }
        expired
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    async fn slot(&self, id: &JobId) -> Result<Slot, PrintJobError> {
        let jobs = self.jobs.read().await;
        jobs.get(id)
            .cloned()
            .ok_or_else(|| PrintJobError::NotFound(id.to_string()))
    }
}
