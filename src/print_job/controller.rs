// src/print_job/controller.rs
use super::{Job, JobId, JobRegistry, JobState, PrintJobError, PrintResult, Retention};
use crate::printer_client::PrinterClient;
use crate::storage::ImageStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Drives jobs through upload, print and status queries.
pub struct PrintJobController {
    storage: ImageStore,
    registry: Arc<JobRegistry>,
    printer: Arc<dyn PrinterClient>,
    print_timeout: Duration,
    retention: Retention,
}

impl PrintJobController {
    pub fn new(
        storage: ImageStore,
        registry: JobRegistry,
        printer: Arc<dyn PrinterClient>,
        print_timeout: Duration,
        retention: Retention,
    ) -> Self {
        Self {
            storage,
            registry: Arc::new(registry),
            printer,
            print_timeout,
            retention,
        }
    }

    pub fn storage(&self) -> &ImageStore {
        &self.storage
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Store an uploaded image and register it as a new `Uploaded` job.
    pub async fn handle_upload(&self, bytes: &[u8], filename: &str) -> Result<Job, PrintJobError> {
        let image = self.storage.store(bytes, filename).await?;
        let job_id = image.job_id;
        match self.registry.create(image).await {
            Ok(job) => {
                tracing::info!("Job {} uploaded ({}, {} bytes)", job.id, job.filename, job.size);
                Ok(job)
            }
            Err(e) => {
                // No job owns the file, so it must not outlive this call.
                if let Err(cleanup) = self.storage.remove(&job_id).await {
                    tracing::error!("Failed to remove orphaned upload for {}: {}", job_id, cleanup);
                }
                Err(e)
            }
        }
    }

    /// Print a job and wait for the printer service to answer.
    ///
    /// Only the caller that moves the job out of `Uploaded` gets to submit
    /// it; every other caller sees `InvalidTransition`. Printer failures are
    /// not errors here: they leave the job `Failed` and are returned as such.
    ///
    /// Once the job is `Printing`, the submission and the terminal write run
    /// on their own task. Dropping the returned future (a client hanging up)
    /// does not strand the job.
    pub async fn handle_print(&self, id: &JobId) -> Result<Job, PrintJobError> {
        self.registry.get(id).await?;
        let job = self
            .registry
            .transition(id, JobState::Uploaded, JobState::Printing, None)
            .await
            .inspect_err(|e| tracing::warn!("Print request for job {} rejected: {}", id, e))?;

        let task = tokio::spawn(finish_print(
            self.registry.clone(),
            self.printer.clone(),
            self.print_timeout,
            job,
        ));
        task.await.map_err(|e| {
            tracing::error!("Print task for job {} did not finish: {}", id, e);
            PrintJobError::PrintTask(e.to_string())
        })?
    }

    /// Current view of a job. Never waits on an in-flight print.
    pub async fn handle_status(&self, id: &JobId) -> Result<Job, PrintJobError> {
        self.registry.get(id).await
    }

    /// Evict finished jobs and abandoned uploads past their retention and
    /// delete their images.
    pub async fn sweep(&self) -> usize {
        let evicted = self.registry.evict_expired(self.retention, Utc::now()).await;
        for job in &evicted {
            if let Err(e) = self.storage.remove(&job.id).await {
                tracing::warn!("Failed to delete image for evicted job {}: {}", job.id, e);
            }
        }
        if !evicted.is_empty() {
            tracing::info!("Evicted {} expired job(s)", evicted.len());
        }
        evicted.len()
    }
}

/// Submit a `Printing` job and record how it ended.
async fn finish_print(
    registry: Arc<JobRegistry>,
    printer: Arc<dyn PrinterClient>,
    print_timeout: Duration,
    job: Job,
) -> Result<Job, PrintJobError> {
    let result = match tokio::time::timeout(print_timeout, printer.submit(&job)).await {
        Ok(result) => result,
        Err(_) => PrintResult::failed(format!(
            "Print request timed out after {}s",
            print_timeout.as_secs_f64()
        )),
    };

    if result.success {
        registry
            .transition(&job.id, JobState::Printing, JobState::Completed, None)
            .await
    } else {
        tracing::warn!("Job {} failed: {}", job.id, result.detail);
        registry
            .transition(&job.id, JobState::Printing, JobState::Failed, Some(result.detail))
            .await
    }
}
