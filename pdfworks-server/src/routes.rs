//! Request routing and the merge endpoint.

use std::sync::Arc;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pdfworks::config::{MEGABYTE, MergeLimits};
use pdfworks::error::format_megabytes;
use pdfworks::io::PdfWriter;
use pdfworks::merge::{FileFailure, MergeCoordinator, MergeOutcome, UploadBatch, UploadedFile};
use pdfworks::PdfWorksError;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;

/// Path of the merge endpoint.
pub const MERGE_PATH: &str = "/api/pdf/merge";
/// Path of the health check.
pub const HEALTH_PATH: &str = "/health";
/// Multipart field carrying the uploads.
pub const FILES_FIELD: &str = "files";

const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong!";
const NOT_MULTIPART_MESSAGE: &str = "Expected multipart/form-data with a boundary";

const X_PROCESSING_TIME: HeaderName = HeaderName::from_static("x-processing-time");
const X_TOTAL_PAGES: HeaderName = HeaderName::from_static("x-total-pages");
const X_TOTAL_FILES: HeaderName = HeaderName::from_static("x-total-files");
const X_FAILED_FILES: HeaderName = HeaderName::from_static("x-failed-files");

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FileFailure>>,
    #[serde(rename = "actualSize", skip_serializing_if = "Option::is_none")]
    actual_size: Option<String>,
}

impl ErrorBody {
    fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            actual_size: None,
        }
    }

    fn into_response(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthLimits {
    max_file_upload: String,
    max_files: String,
    total_size: String,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
    limits: HealthLimits,
}

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    coordinator: Arc<MergeCoordinator>,
    body_limit: u64,
}

impl AppState {
    /// Build the state for `config`.
    pub fn new(config: &ServerConfig) -> Self {
        let coordinator = MergeCoordinator::new(config.limits)
            .with_writer(PdfWriter::with_options(config.compression.into()));
        Self {
            coordinator: Arc::new(coordinator),
            body_limit: config.body_limit(),
        }
    }

    fn limits(&self) -> &MergeLimits {
        self.coordinator.limits()
    }
}

/// Build the application router.
///
/// # Routes
///
/// - `POST /api/pdf/merge` - merge the uploaded `files` into one PDF
/// - `GET /health` - liveness and upload limits
///
/// Every response allows any origin and exposes the merge headers.
pub fn app(config: &ServerConfig) -> Router {
    let body_limit = usize::try_from(config.body_limit()).unwrap_or(usize::MAX);

    Router::new()
        .route(MERGE_PATH, post(merge))
        .route(HEALTH_PATH, get(health))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors())
        .with_state(AppState::new(config))
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([
            header::CONTENT_DISPOSITION,
            X_PROCESSING_TIME,
            X_TOTAL_PAGES,
            X_TOTAL_FILES,
            X_FAILED_FILES,
        ])
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    let limits = state.limits();
    Json(Health {
        status: "ok",
        version: pdfworks::VERSION,
        limits: HealthLimits {
            max_file_upload: format!("{} per file", format_megabytes(limits.max_file_size)),
            max_files: format!("{} files", limits.max_files),
            total_size: format!("{} per request", format_megabytes(limits.max_total_size)),
        },
    })
}

async fn not_found() -> Response {
    ErrorBody::message("Not found").into_response(StatusCode::NOT_FOUND)
}

async fn merge(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    // an announced body over the cap is a batch rejection, answered unread
    if let Some(length) = content_length(&headers) {
        if length > state.body_limit {
            warn!(length, limit = state.body_limit, "request body over the upload cap");
            return error_response(&batch_too_large(length, state.limits()));
        }
    }

    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!(reason = %rejection.body_text(), "not a multipart upload");
            return ErrorBody::message(NOT_MULTIPART_MESSAGE).into_response(StatusCode::BAD_REQUEST);
        }
    };

    let batch = match collect_uploads(multipart, state.limits()).await {
        Ok(batch) => batch,
        Err(response) => return response,
    };

    match state.coordinator.merge(batch).await {
        Ok(outcome) => merged(outcome),
        Err(e) => error_response(&e),
    }
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

fn batch_too_large(total: u64, limits: &MergeLimits) -> PdfWorksError {
    PdfWorksError::BatchTooLarge {
        total,
        max: limits.max_total_size,
    }
}

/// Read the `files` parts of the form in order; other fields are skipped.
async fn collect_uploads(mut multipart: Multipart, limits: &MergeLimits) -> Result<UploadBatch, Response> {
    let mut batch = UploadBatch::default();
    let mut received: u64 = 0;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_failure(&e, received, limits)),
        };

        let field_name = field.name().unwrap_or_default().to_string();
        if field_name != FILES_FIELD {
            debug!(field = %field_name, "ignoring form field");
            continue;
        }
        let name = field
            .file_name()
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("file{}.pdf", batch.file_count() + 1));
        let content_type = field.content_type().map(str::to_string);

        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => return Err(multipart_failure(&e, received, limits)),
        };
        received += data.len() as u64;
        debug!(file = %name, content_type = ?content_type, bytes = data.len(), "upload received");
        batch.push(UploadedFile::new(name, data.to_vec()));
    }
    Ok(batch)
}

/// A body cut off by the size cap is a batch rejection; anything else is a
/// malformed form.
fn multipart_failure(err: &MultipartError, received: u64, limits: &MergeLimits) -> Response {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!(received, "streamed body hit the upload cap");
        return error_response(&batch_too_large(received.max(limits.max_total_size.saturating_add(1)), limits));
    }
    debug!(reason = %err.body_text(), "malformed multipart body");
    ErrorBody::message(format!("Malformed multipart body: {}", err.body_text()))
        .into_response(StatusCode::BAD_REQUEST)
}

fn merged(outcome: MergeOutcome) -> Response {
    info!(
        pages = outcome.total_pages,
        files = outcome.files_processed,
        elapsed = %outcome.processing_time_header(),
        "sending merged document"
    );
    let failed = outcome.failures.len();
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, "attachment; filename=merged.pdf".to_string()),
        (X_PROCESSING_TIME, outcome.processing_time_header()),
        (X_TOTAL_PAGES, outcome.total_pages.to_string()),
        (X_TOTAL_FILES, outcome.files_processed.to_string()),
    ];

    let mut response = (StatusCode::OK, headers, outcome.bytes).into_response();
    if failed > 0 {
        response.headers_mut().insert(X_FAILED_FILES, HeaderValue::from(failed));
    }
    response
}

/// JSON answer for a failed merge. Internal errors are logged and masked.
fn error_response(err: &PdfWorksError) -> Response {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(kind = err.kind(), "merge failed: {}", err);
        return ErrorBody::message(INTERNAL_ERROR_MESSAGE).into_response(status);
    }
    if err.is_admission_rejection() {
        info!(kind = err.kind(), "upload rejected: {}", err);
    }

    let body = match err {
        PdfWorksError::NoValidFiles { failures } => ErrorBody {
            details: Some(failures.clone()),
            ..ErrorBody::message(err.to_string())
        },
        PdfWorksError::BatchTooLarge { total, .. } => ErrorBody {
            actual_size: Some(format!("{:.2} MB", *total as f64 / MEGABYTE as f64)),
            ..ErrorBody::message(err.to_string())
        },
        _ => ErrorBody::message(err.to_string()),
    };
    body.into_response(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, Bytes, to_bytes};
    use axum::http::Request;
    use pdfworks::testing;
    use serde_json::Value;
    use tower::ServiceExt;

    const BOUNDARY: &str = "pdfworks-test-boundary";

    fn small_limits() -> ServerConfig {
        ServerConfig {
            limits: MergeLimits {
                max_file_size: MEGABYTE,
                max_total_size: MEGABYTE,
                ..MergeLimits::default()
            },
            ..ServerConfig::default()
        }
    }

    fn form(files: &[(&str, Vec<u8>)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload(files: &[(&str, Vec<u8>)]) -> Request<Body> {
        let body = form(files);
        Request::post(MERGE_PATH)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(config: &ServerConfig, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = app(config).oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body)
    }

    fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn json(body: &Bytes) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_merge_success_headers() {
        let request = upload(&[("a.pdf", testing::sample_pdf(2)), ("b.pdf", testing::sample_pdf(1))]);
        let (status, headers, body) = send(&ServerConfig::default(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(header_str(&headers, "content-type"), Some("application/pdf"));
        assert_eq!(
            header_str(&headers, "content-disposition"),
            Some("attachment; filename=merged.pdf")
        );
        assert_eq!(header_str(&headers, "x-total-pages"), Some("3"));
        assert_eq!(header_str(&headers, "x-total-files"), Some("2"));
        assert_eq!(header_str(&headers, "x-failed-files"), None);
        assert!(header_str(&headers, "x-processing-time").unwrap().ends_with('s'));
        assert!(body.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn test_cors_headers_on_cross_origin_request() {
        let mut request = upload(&[("a.pdf", testing::sample_pdf(1)), ("b.pdf", testing::sample_pdf(1))]);
        request
            .headers_mut()
            .insert(header::ORIGIN, HeaderValue::from_static("http://localhost:3000"));
        let (status, headers, _) = send(&ServerConfig::default(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(header_str(&headers, "access-control-allow-origin"), Some("*"));
        let exposed = header_str(&headers, "access-control-expose-headers").unwrap();
        assert!(exposed.contains("x-total-pages"));
        assert!(exposed.contains("x-processing-time"));
    }

    #[tokio::test]
    async fn test_merge_skips_corrupt_file() {
        let request = upload(&[
            ("three.pdf", testing::sample_pdf(3)),
            ("broken.pdf", testing::corrupt_pdf()),
            ("two.pdf", testing::sample_pdf(2)),
        ]);
        let (status, headers, _) = send(&ServerConfig::default(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(header_str(&headers, "x-total-pages"), Some("5"));
        assert_eq!(header_str(&headers, "x-total-files"), Some("2"));
        assert_eq!(header_str(&headers, "x-failed-files"), Some("1"));
    }

    #[tokio::test]
    async fn test_too_few_files() {
        let (status, _, body) = send(&ServerConfig::default(), upload(&[("a.pdf", testing::sample_pdf(1))])).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["error"], "Please upload at least 2 PDF files");
    }

    #[tokio::test]
    async fn test_no_valid_files_lists_details() {
        let request = upload(&[("x.pdf", testing::garbage_bytes()), ("y.pdf", testing::corrupt_pdf())]);
        let (status, _, body) = send(&ServerConfig::default(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body = json(&body);
        assert_eq!(body["error"], "No valid PDF files could be processed");
        assert_eq!(body["details"][0]["file"], "x.pdf");
        assert_eq!(body["details"][1]["file"], "y.pdf");
        assert_eq!(body["details"][1]["error"], "Invalid PDF file or corrupt content");
    }

    #[tokio::test]
    async fn test_batch_too_large_reports_actual_size() {
        let chunk = vec![b'x'; 600 * 1024];
        let (status, _, body) = send(&small_limits(), upload(&[("a.pdf", chunk.clone()), ("b.pdf", chunk)])).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body = json(&body);
        assert_eq!(body["error"], "Total size exceeds 1MB limit");
        assert_eq!(body["actualSize"], "1.17 MB");
    }

    #[tokio::test]
    async fn test_announced_length_over_cap_is_batch_rejection() {
        // body cap is 1MB of uploads plus 1MB of framing
        let request = Request::post(MERGE_PATH)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .header(header::CONTENT_LENGTH, 3 * MEGABYTE)
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&small_limits(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body = json(&body);
        assert_eq!(body["error"], "Total size exceeds 1MB limit");
        assert_eq!(body["actualSize"], "3.00 MB");
    }

    #[tokio::test]
    async fn test_streamed_body_over_cap_is_batch_rejection() {
        let chunk = vec![b'x'; 1200 * 1024];
        let body = form(&[("a.pdf", chunk.clone()), ("b.pdf", chunk)]);
        // no Content-Length, so the cap trips while streaming
        let request = Request::post(MERGE_PATH)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap();
        let (status, _, body) = send(&small_limits(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body = json(&body);
        assert_eq!(body["error"], "Total size exceeds 1MB limit");
        assert!(body["actualSize"].is_string());
    }

    #[tokio::test]
    async fn test_not_multipart() {
        let request = Request::post(MERGE_PATH).body(Body::empty()).unwrap();
        let (status, _, body) = send(&ServerConfig::default(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["error"], NOT_MULTIPART_MESSAGE);
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::get(HEALTH_PATH).body(Body::empty()).unwrap();
        let (status, _, body) = send(&ServerConfig::default(), request).await;

        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], pdfworks::VERSION);
        assert_eq!(body["limits"]["maxFileUpload"], "100MB per file");
        assert_eq!(body["limits"]["maxFiles"], "60 files");
        assert_eq!(body["limits"]["totalSize"], "500MB per request");
    }

    #[tokio::test]
    async fn test_routing_errors() {
        let config = ServerConfig::default();

        let (status, _, body) = send(&config, Request::get("/nowhere").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json(&body)["error"], "Not found");

        let (status, _, _) = send(&config, Request::get(MERGE_PATH).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let preflight = Request::options(MERGE_PATH)
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = send(&config, preflight).await;
        assert!(status.is_success());
        assert_eq!(header_str(&headers, "access-control-allow-origin"), Some("*"));
    }

    #[tokio::test]
    async fn test_internal_errors_are_masked() {
        let response = error_response(&PdfWorksError::serialization("xref table exploded"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(json(&body)["error"], INTERNAL_ERROR_MESSAGE);
    }
}
