//! Client for the external printer service.
//!
//! Every submission ends in a [`PrintResult`]; transport errors, timeouts and
//! non-success statuses are folded into a failed result instead of being
//! returned as errors. No retries are attempted.

use crate::config::PrinterConfig;
use crate::print_job::{Job, PrintResult};
use crate::storage::ImageFormat;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::path::PathBuf;
use thiserror::Error;

/// Multipart field name the printer service reads the image from.
pub const IMAGE_FIELD: &str = "imgf";

#[derive(Debug, Error)]
pub enum PrinterError {
    #[error("Failed to read image '{path}': {source}")]
    Image {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to connect to print service: {0}")]
    Unavailable(#[from] reqwest::Error),
    #[error("Print service returned error: {0}")]
    Rejected(StatusCode),
}

impl From<PrinterError> for PrintResult {
    fn from(err: PrinterError) -> Self {
        PrintResult::failed(err.to_string())
    }
}

/// Anything that can physically print a job's image.
#[async_trait]
pub trait PrinterClient: Send + Sync {
    async fn submit(&self, job: &Job) -> PrintResult;
}

pub struct HttpPrinterClient {
    client: Client,
    base_url: String,
    endpoints: Vec<String>,
}

impl HttpPrinterClient {
    pub fn new(config: &PrinterConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_host.trim_end_matches('/').to_string(),
            endpoints: config.endpoints.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Pick one of the configured endpoints at random.
    fn target_url(&self) -> String {
        if self.endpoints.is_empty() {
            return self.base_url.clone();
        }
        let index = rand::random_range(0..self.endpoints.len());
        format!("{}/{}", self.base_url, self.endpoints[index].trim_start_matches('/'))
    }

    async fn try_submit(&self, job: &Job) -> Result<String, PrinterError> {
        let bytes = tokio::fs::read(&job.image_path)
            .await
            .map_err(|source| PrinterError::Image { path: job.image_path.clone(), source })?;
        let mime = ImageFormat::sniff(&bytes)
            .map(ImageFormat::mime_type)
            .unwrap_or("application/octet-stream");
        let part = Part::bytes(bytes).file_name(job.filename.clone()).mime_str(mime)?;
        let form = Form::new().part(IMAGE_FIELD, part);

        let url = self.target_url();
        tracing::info!("Submitting job {} to {}", job.id, url);
        let response = self.client.post(&url).multipart(form).send().await?;

        // Only a plain 200 means the printer took the job.
        let status = response.status();
        if status != StatusCode::OK {
            return Err(PrinterError::Rejected(status));
        }
        let body = response.text().await.unwrap_or_default();
        let body = body.trim();
        if body.is_empty() {
            Ok("Print job completed successfully".to_string())
        } else {
            Ok(body.chars().take(200).collect())
        }
    }
}

#[async_trait]
impl PrinterClient for HttpPrinterClient {
    async fn submit(&self, job: &Job) -> PrintResult {
        match self.try_submit(job).await {
            Ok(detail) => PrintResult::ok(detail),
            Err(e) => {
                tracing::warn!("Print of job {} failed: {}", job.id, e);
                e.into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_detail() {
        let result: PrintResult = PrinterError::Rejected(StatusCode::INTERNAL_SERVER_ERROR).into();
        assert!(!result.success);
        assert_eq!(result.detail, "Print service returned error: 500 Internal Server Error");
    }

    #[test]
    fn test_target_url_uses_configured_endpoints() {
        let config = PrinterConfig {
            api_host: "http://printer-api:8080/".to_string(),
            ..PrinterConfig::default()
        };
        let client = HttpPrinterClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://printer-api:8080");
        for _ in 0..20 {
            let url = client.target_url();
            assert!(url == "http://printer-api:8080/0" || url == "http://printer-api:8080/1");
        }

        let config = PrinterConfig { endpoints: vec![], ..config };
        let client = HttpPrinterClient::new(&config).unwrap();
        assert_eq!(client.target_url(), "http://printer-api:8080");
    }
}
