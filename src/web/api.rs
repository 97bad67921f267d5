//! Defines the Axum API routes and handlers.

use crate::print_job::{JobId, PrintJobController, PrintJobError};
use crate::web::models::{JobStatusResponse, PrintResponse, UploadResponse};
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

/// Multipart field the browser sends the image in.
pub const UPLOAD_FIELD: &str = "image";

/// Room left in the request body for multipart framing on top of the image.
const MULTIPART_OVERHEAD: usize = 2 * 1024 * 1024;

/// Helper to create a JSON error response with a message and status code
fn json_error(message: &str, status: StatusCode) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn error_response(err: &PrintJobError) -> Response {
    let status = match err {
        PrintJobError::Validation(_) => StatusCode::BAD_REQUEST,
        PrintJobError::NotFound(_) => StatusCode::NOT_FOUND,
        PrintJobError::InvalidTransition(_) => StatusCode::CONFLICT,
        PrintJobError::Capacity(_) => StatusCode::SERVICE_UNAVAILABLE,
        PrintJobError::Storage(_) | PrintJobError::DuplicateJob(_) | PrintJobError::PrintTask(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    json_error(&err.to_string(), status)
}

fn multipart_error(err: MultipartError) -> Response {
    tracing::warn!("Rejected multipart upload: {}", err);
    json_error(&err.body_text(), err.status())
}

pub struct AppStateInner {
    pub controller: PrintJobController,
}
pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    pub fn new(controller: PrintJobController) -> AppState {
        Arc::new(Self { controller })
    }
}

/// Creates the Axum router with all the API endpoints.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.controller.storage().max_bytes() + MULTIPART_OVERHEAD;
    Router::new()
        .route("/api/upload", post(upload_image))
        .route("/api/print/{job_id}", post(print_image))
        .route("/api/status/{job_id}", get(job_status))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

struct ImageUpload {
    filename: String,
    bytes: Bytes,
}

/// Pull the image part out of the form. Fields other than `image` are
/// skipped unless they carry a filename.
async fn read_image_field(multipart: &mut Multipart) -> Result<Option<ImageUpload>, Response> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) && field.file_name().is_none() {
            continue;
        }
        if let Some(content_type) = field.content_type() {
            if !content_type.starts_with("image/") {
                tracing::warn!("Invalid content type: {}", content_type);
                return Err(json_error(
                    "Invalid file type. Only images are allowed.",
                    StatusCode::BAD_REQUEST,
                ));
            }
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(Some(ImageUpload { filename, bytes }));
    }
    Ok(None)
}

/// POST /api/upload
async fn upload_image(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let upload = match read_image_field(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => return json_error("No image file provided.", StatusCode::BAD_REQUEST),
        Err(response) => return response,
    };
    tracing::info!("Received file: {}, size: {}", upload.filename, upload.bytes.len());
    match state.controller.handle_upload(&upload.bytes, &upload.filename).await {
        Ok(job) => (StatusCode::OK, Json(UploadResponse::from(&job))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /api/print/{job_id} -- responds once the printer service has answered
async fn print_image(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
    let id = match job_id.parse::<JobId>() {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    match state.controller.handle_print(&id).await {
        Ok(job) => (
            StatusCode::OK,
            Json(PrintResponse { accepted: true, job_id: job.id, state: job.state }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /api/status/{job_id}
async fn job_status(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
    let id = match job_id.parse::<JobId>() {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };
    match state.controller.handle_status(&id).await {
        Ok(job) => (StatusCode::OK, Json(JobStatusResponse::from(job))).into_response(),
        Err(e) => error_response(&e),
    }
}
