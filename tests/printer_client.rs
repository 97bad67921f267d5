//! HTTP printer client against a mock printer service

use chrono::Utc;
use print_relay::config::PrinterConfig;
use print_relay::printer_client::{HttpPrinterClient, PrinterClient};
use print_relay::{Job, JobId, JobState};
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{body_string_contains, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3, 4];

fn job_for(path: &Path) -> Job {
    let now = Utc::now();
    Job {
        id: JobId::new(),
        image_path: path.to_path_buf(),
        filename: "receipt.png".to_string(),
        size: PNG.len() as u64,
        state: JobState::Printing,
        created_at: now,
        updated_at: now,
        error_detail: None,
    }
}

fn client_for(api_host: &str, timeout_secs: u64) -> HttpPrinterClient {
    HttpPrinterClient::new(&PrinterConfig {
        api_host: api_host.to_string(),
        timeout_secs,
        connect_timeout_secs: 1,
        ..PrinterConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_submit_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/[01]$"))
        .and(body_string_contains("name=\"imgf\""))
        .and(body_string_contains("filename=\"receipt.png\""))
        .respond_with(ResponseTemplate::new(200).set_body_string("printed"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let image = dir.path().join("job.png");
    // Plain text keeps the whole multipart body matchable as a string.
    std::fs::write(&image, b"not really a png").unwrap();

    let result = client_for(&server.uri(), 5).submit(&job_for(&image)).await;
    assert!(result.success, "unexpected failure: {}", result.detail);
    assert_eq!(result.detail, "printed");
}

#[tokio::test]
async fn test_submit_server_error_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let image = dir.path().join("job.png");
    std::fs::write(&image, PNG).unwrap();

    let result = client_for(&server.uri(), 5).submit(&job_for(&image)).await;
    assert!(!result.success);
    assert_eq!(result.detail, "Print service returned error: 500 Internal Server Error");
}

#[tokio::test]
async fn test_submit_non_200_success_codes_are_failures() {
    for (code, detail) in [
        (202, "Print service returned error: 202 Accepted"),
        (204, "Print service returned error: 204 No Content"),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(code))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let image = dir.path().join("job.png");
        std::fs::write(&image, PNG).unwrap();

        let result = client_for(&server.uri(), 5).submit(&job_for(&image)).await;
        assert!(!result.success, "{} should not count as printed", code);
        assert_eq!(result.detail, detail);
    }
}

#[tokio::test]
async fn test_submit_timeout_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let image = dir.path().join("job.png");
    std::fs::write(&image, PNG).unwrap();

    let result = client_for(&server.uri(), 1).submit(&job_for(&image)).await;
    assert!(!result.success);
    assert!(result.detail.starts_with("Failed to connect to print service"));
}

#[tokio::test]
async fn test_submit_unreachable_host_is_failure() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("job.png");
    std::fs::write(&image, PNG).unwrap();

    let result = client_for("http://127.0.0.1:9", 2).submit(&job_for(&image)).await;
    assert!(!result.success);
    assert!(result.detail.starts_with("Failed to connect to print service"));
}

#[tokio::test]
async fn test_submit_missing_image_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let result = client_for(&server.uri(), 5)
        .submit(&job_for(&dir.path().join("gone.png")))
        .await;
    assert!(!result.success);
    assert!(result.detail.starts_with("Failed to read image"));
}
