//! HTTP surface for the book summarizer.
//!
//! A compact Axum router with a handful of endpoints:
//!
//! - `POST /api/summary/generate` – Summarize direct text (`{"text": ...}`), a stored book
//!   (`{"book_id": ...}`), or an uploaded file (`multipart/form-data` with a `file` field; PDFs
//!   are converted to text first). Optional `max_length` / `min_length` bound the summary.
//! - `POST /api/summary/extract` – Return the text extracted from an uploaded PDF.
//! - `GET /metrics` – Pipeline counters.
//! - `GET /commands` – Machine-readable command catalog.
//! - `GET /health` – Liveness probe.
//!
//! Requests that time out on the client side are not cancelled here; generation runs to
//! completion.

use crate::processing::{SummarizeError, SummaryApi, SummaryOptions};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the summarization API surface.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: SummaryApi + 'static,
{
    Router::new()
        .route("/api/summary/generate", post(generate_summary::<S>))
        .route("/api/summary/extract", post(extract_text::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(service)
}

/// JSON body for `POST /api/summary/generate`.
#[derive(Deserialize)]
struct GenerateRequest {
    /// Stored book to summarize; takes precedence over `text`. `0` counts as absent.
    #[serde(default)]
    book_id: Option<u64>,
    /// Raw text to summarize.
    #[serde(default)]
    text: Option<String>,
    #[serde(flatten)]
    options: SummaryOptions,
}

#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

#[derive(Serialize)]
struct BookSummaryResponse {
    message: &'static str,
    book_id: u64,
    summary: String,
}

/// Summarize text, a stored book, or an uploaded file.
async fn generate_summary<S>(
    State(service): State<Arc<S>>,
    request: Request,
) -> Result<Response, AppError>
where
    S: SummaryApi,
{
    if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        let upload = read_upload(multipart).await?;
        let text = upload_text(service.as_ref(), upload.file).await?;
        let summary = service.summarize(&text, upload.options).await?;
        tracing::info!(source = "upload", "Summary request completed");
        return Ok(Json(SummaryResponse { summary }).into_response());
    }

    let Json(body) = Json::<GenerateRequest>::from_request(request, &())
        .await
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    if let Some(book_id) = body.book_id.filter(|id| *id != 0) {
        let record = service.summarize_book(book_id, body.options).await?;
        tracing::info!(book_id, source = "book", "Summary request completed");
        return Ok(Json(BookSummaryResponse {
            message: "Summary generated successfully",
            book_id,
            summary: record.summary,
        })
        .into_response());
    }

    match body.text.filter(|text| !text.is_empty()) {
        Some(text) => {
            let summary = service.summarize(&text, body.options).await?;
            tracing::info!(source = "text", "Summary request completed");
            Ok(Json(SummaryResponse { summary }).into_response())
        }
        None => Err(AppError::BadRequest("book_id or text required".into())),
    }
}

#[derive(Serialize)]
struct ExtractResponse {
    text: String,
    characters: usize,
}

/// Extract text from an uploaded PDF without summarizing it.
async fn extract_text<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Result<Json<ExtractResponse>, AppError>
where
    S: SummaryApi,
{
    let upload = read_upload(multipart).await?;
    let text = service.extract_pdf_text(upload.file.bytes).await?;
    Ok(Json(ExtractResponse {
        characters: text.chars().count(),
        text,
    }))
}

struct UploadedFile {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

struct Upload {
    file: UploadedFile,
    options: SummaryOptions,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    let mut file = None;
    let mut options = SummaryOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| AppError::BadRequest(error.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|error| AppError::BadRequest(error.body_text()))?;
                file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "max_length" | "min_length" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|error| AppError::BadRequest(error.body_text()))?;
                let value = raw
                    .trim()
                    .parse()
                    .map_err(|_| AppError::BadRequest(format!("{name} must be an integer")))?;
                if name == "max_length" {
                    options.max_length = Some(value);
                } else {
                    options.min_length = Some(value);
                }
            }
            _ => tracing::debug!(field = %name, "Ignoring unknown multipart field"),
        }
    }

    let file = file.ok_or_else(|| AppError::BadRequest("file field required".into()))?;
    Ok(Upload { file, options })
}

/// Convert an upload to plain text, routing PDFs through the extractor.
async fn upload_text<S>(service: &S, file: UploadedFile) -> Result<String, AppError>
where
    S: SummaryApi + ?Sized,
{
    if looks_like_pdf(&file) {
        tracing::debug!(
            file_name = ?file.file_name,
            bytes = file.bytes.len(),
            "Extracting PDF upload"
        );
        return Ok(service.extract_pdf_text(file.bytes).await?);
    }
    Ok(String::from_utf8_lossy(&file.bytes).into_owned())
}

fn looks_like_pdf(file: &UploadedFile) -> bool {
    file.content_type.as_deref() == Some("application/pdf")
        || file
            .file_name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().ends_with(".pdf"))
        || file.bytes.starts_with(b"%PDF")
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

/// Return the pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: SummaryApi,
{
    Json(service.metrics_snapshot())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by clients.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "generate_summary",
                method: "POST",
                path: "/api/summary/generate",
                description: "Summarize raw text, a stored book, or a multipart file upload (PDF or plain text). Response returns { \"summary\": string }.",
                request_example: Some(json!({
                    "text": "Document contents",
                    "max_length": 150,
                    "min_length": 40
                })),
            },
            CommandDescriptor {
                name: "extract_text",
                method: "POST",
                path: "/api/summary/extract",
                description: "Extract plain text from an uploaded PDF (multipart field `file`), reading at most the configured page count.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return summarization counters useful for observability dashboards.",
                request_example: None,
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/health",
                description: "Liveness probe.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    BadRequest(String),
    Pipeline(SummarizeError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Pipeline(SummarizeError::BookNotFound(_)) => {
                (StatusCode::NOT_FOUND, "Book not found".to_string())
            }
            Self::Pipeline(error) => {
                tracing::error!(error = %error, "Summary request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<SummarizeError> for AppError {
    fn from(inner: SummarizeError) -> Self {
        Self::Pipeline(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{SummarizeError, SummaryApi, SummaryOptions};
    use crate::storage::SummaryRecord;
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Text(String, SummaryOptions),
        Book(u64),
        Pdf(usize),
    }

    #[derive(Default)]
    struct StubSummaryService {
        calls: Mutex<Vec<Call>>,
    }

    impl StubSummaryService {
        async fn recorded_calls(&self) -> Vec<Call> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl SummaryApi for StubSummaryService {
        async fn summarize(
            &self,
            text: &str,
            options: SummaryOptions,
        ) -> Result<String, SummarizeError> {
            self.calls
                .lock()
                .await
                .push(Call::Text(text.to_string(), options));
            Ok("Stub summary.".into())
        }

        async fn summarize_book(
            &self,
            book_id: u64,
            _options: SummaryOptions,
        ) -> Result<SummaryRecord, SummarizeError> {
            self.calls.lock().await.push(Call::Book(book_id));
            if book_id == 404 {
                return Err(SummarizeError::BookNotFound(book_id));
            }
            Ok(SummaryRecord::new(book_id, "Book summary.".into(), 10, false))
        }

        async fn extract_pdf_text(&self, bytes: Vec<u8>) -> Result<String, SummarizeError> {
            self.calls.lock().await.push(Call::Pdf(bytes.len()));
            Ok("Extracted page text".into())
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                summaries_generated: 4,
                ..MetricsSnapshot::default()
            }
        }
    }

    fn app() -> (Arc<StubSummaryService>, Router) {
        let service = Arc::new(StubSummaryService::default());
        (service.clone(), create_router(service, 1024 * 1024))
    }

    async fn post_json(app: Router, payload: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/summary/generate")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");
        read_json(response).await
    }

    async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&body).expect("json body"))
    }

    fn multipart_request(
        uri: &str,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Request<Body> {
        let boundary = "X-BOOK-SUMMARIZER-BOUNDARY";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"max_length\"\r\n\r\n90\r\n\
                 --{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    #[tokio::test]
    async fn commands_catalog_exposes_generate_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let generate = commands
            .iter()
            .find(|cmd| cmd.name == "generate_summary")
            .expect("generate command present");

        assert_eq!(generate.method, "POST");
        assert_eq!(generate.path, "/api/summary/generate");
        assert!(commands.len() >= 3);
    }

    #[tokio::test]
    async fn text_request_returns_summary() {
        let (service, app) = app();
        let (status, json) = post_json(
            app,
            json!({ "text": "Call me Ishmael.", "max_length": 60, "min_length": 25 }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["summary"], "Stub summary.");
        assert_eq!(
            service.recorded_calls().await,
            vec![Call::Text(
                "Call me Ishmael.".into(),
                SummaryOptions {
                    max_length: Some(60),
                    min_length: Some(25),
                }
            )]
        );
    }

    #[tokio::test]
    async fn book_request_reports_book_id() {
        let (service, app) = app();
        let (status, json) = post_json(app, json!({ "book_id": 12, "text": "ignored" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["book_id"], 12);
        assert_eq!(json["summary"], "Book summary.");
        assert_eq!(json["message"], "Summary generated successfully");
        assert_eq!(service.recorded_calls().await, vec![Call::Book(12)]);
    }

    #[tokio::test]
    async fn zero_book_id_falls_through_to_text() {
        let (service, app) = app();
        let (status, json) =
            post_json(app, json!({ "book_id": 0, "text": "Call me Ishmael." })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["summary"], "Stub summary.");
        assert_eq!(
            service.recorded_calls().await,
            vec![Call::Text(
                "Call me Ishmael.".into(),
                SummaryOptions::default()
            )]
        );
    }

    #[tokio::test]
    async fn unknown_book_is_not_found() {
        let (_, app) = app();
        let (status, json) = post_json(app, json!({ "book_id": 404 })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Book not found");
    }

    #[tokio::test]
    async fn missing_input_is_bad_request() {
        let (service, app) = app();
        let (status, json) = post_json(app, json!({ "text": "" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "book_id or text required");
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn pdf_upload_is_extracted_then_summarized() {
        let (service, app) = app();
        let response = app
            .oneshot(multipart_request(
                "/api/summary/generate",
                "book.pdf",
                "application/pdf",
                b"%PDF-1.5 fake",
            ))
            .await
            .expect("router response");
        let (status, json) = read_json(response).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["summary"], "Stub summary.");
        assert_eq!(
            service.recorded_calls().await,
            vec![
                Call::Pdf(13),
                Call::Text(
                    "Extracted page text".into(),
                    SummaryOptions {
                        max_length: Some(90),
                        min_length: None,
                    }
                ),
            ]
        );
    }

    #[tokio::test]
    async fn plain_text_upload_skips_pdf_extraction() {
        let (service, app) = app();
        let response = app
            .oneshot(multipart_request(
                "/api/summary/generate",
                "notes.txt",
                "text/plain",
                b"Chapter one begins.",
            ))
            .await
            .expect("router response");
        let (status, _) = read_json(response).await;

        assert_eq!(status, StatusCode::OK);
        let calls = service.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        assert!(matches!(&calls[0], Call::Text(text, _) if text == "Chapter one begins."));
    }

    #[tokio::test]
    async fn extract_route_returns_text() {
        let (_, app) = app();
        let response = app
            .oneshot(multipart_request(
                "/api/summary/extract",
                "book.pdf",
                "application/pdf",
                b"%PDF-1.5 fake",
            ))
            .await
            .expect("router response");
        let (status, json) = read_json(response).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["text"], "Extracted page text");
        assert_eq!(json["characters"], 19);
    }

    #[tokio::test]
    async fn metrics_route_serializes_snapshot() {
        let (_, app) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        let (status, json) = read_json(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["summaries_generated"], 4);
    }
}
