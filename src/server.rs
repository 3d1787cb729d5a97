//! HTTP server for the image-resizer service.
//!
//! Provides endpoints for:
//! - `POST /upload` - Upload an image, receive it back with resized renditions
//! - `GET /health` - Health check
//!
//! ## Upload form
//!
//! `multipart/form-data` with a required `file` part and optional text parts
//! `sizes`, `customSizes`, `custom` and `format`. Unknown parts are skipped.
//!
//! ## Errors
//!
//! Every failure is a JSON body `{"error": "...", "kind": "..."}`. Upload
//! faults are 400 (or the status axum assigns to a multipart failure, e.g.
//! 413 past the body limit); encoding and internal failures are 500.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{Field, MultipartError, MultipartRejection},
    },
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServiceConfig;
use crate::process::{self, ProcessError, ProcessOptions, Upload};
use crate::sizes::SizeDirectives;
use crate::types::ResponseDocument;

/// Shared state for the HTTP server.
pub struct AppState {
    pub config: ServiceConfig,
    pub options: ProcessOptions,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        let options = ProcessOptions::from_images_config(&config.images);
        Self { config, options }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// The `file` part of an upload form, plus the directive parts.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<FilePart>,
    directives: SizeDirectives,
}

#[derive(Debug)]
struct FilePart {
    bytes: Bytes,
    content_type: String,
    filename: String,
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub enum AppError {
    MissingFile,
    Multipart(MultipartError),
    NotMultipart(MultipartRejection),
    Process(ProcessError),
    Internal(String),
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Multipart(err)
    }
}

impl From<MultipartRejection> for AppError {
    fn from(err: MultipartRejection) -> Self {
        AppError::NotMultipart(err)
    }
}

impl From<ProcessError> for AppError {
    fn from(err: ProcessError) -> Self {
        AppError::Process(err)
    }
}

impl AppError {
    /// Status, machine-readable kind and client-facing message.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::MissingFile => (
                StatusCode::BAD_REQUEST,
                "missing_file",
                "invalid file upload: no \"file\" part".to_string(),
            ),
            AppError::Multipart(err) => (err.status(), "multipart", err.body_text()),
            AppError::NotMultipart(err) => (err.status(), "multipart", err.body_text()),
            AppError::Process(err) if err.is_client_fault() => {
                (StatusCode::BAD_REQUEST, err.kind(), err.to_string())
            }
            AppError::Process(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.kind(), err.to_string()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = self.parts();

        if status.is_server_error() {
            match &self {
                AppError::Internal(detail) => error!(kind, error = %detail, "Upload failed"),
                _ => error!(kind, error = %message, "Upload failed"),
            }
        } else {
            warn!(kind, status = status.as_u16(), error = %message, "Upload rejected");
        }

        let body = serde_json::json!({ "error": message, "kind": kind });
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /upload - Process an uploaded image
async fn upload_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ResponseDocument>, AppError> {
    let form = read_form(multipart?).await?;
    let file = form.file.ok_or(AppError::MissingFile)?;

    info!(
        filename = %file.filename,
        content_type = %file.content_type,
        bytes = file.bytes.len(),
        sizes = ?form.directives.sizes,
        custom_sizes = ?form.directives.custom_sizes,
        format = ?form.directives.format,
        "Received upload"
    );

    let options = state.options;
    let directives = form.directives;
    let document = tokio::task::spawn_blocking(move || {
        let upload = Upload {
            bytes: &file.bytes,
            content_type: &file.content_type,
            filename: &file.filename,
        };
        process::process_upload(upload, &directives, &options)
    })
    .await
    .map_err(|e| AppError::Internal(format!("processing task failed: {e}")))??;

    info!(
        filename = %document.filename,
        mime = %document.mime_type,
        renditions = document.resized.len(),
        "Upload processed"
    );
    Ok(Json(document))
}

/// Drain the multipart stream, keeping the first `file` part that carries a filename.
async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" if form.file.is_none() && field.file_name().is_some() => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.file = Some(FilePart {
                    bytes,
                    content_type,
                    filename,
                });
            }
            "sizes" => keep_first(&mut form.directives.sizes, field).await?,
            "customSizes" => keep_first(&mut form.directives.custom_sizes, field).await?,
            "custom" => keep_first(&mut form.directives.custom, field).await?,
            "format" => keep_first(&mut form.directives.format, field).await?,
            _ => {}
        }
    }

    Ok(form)
}

/// A repeated text part keeps its first value.
async fn keep_first(slot: &mut Option<String>, field: Field<'_>) -> Result<(), MultipartError> {
    if slot.is_none() {
        *slot = Some(field.text().await?);
    }
    Ok(())
}

/// GET /health - Health check
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "image-resizer".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Router and lifecycle
// =============================================================================

fn security_headers() -> [(HeaderName, HeaderValue); 5] {
    [
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
        (header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block")),
        (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
        (
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'self'"),
        ),
    ]
}

/// CORS for one configured origin, with credentials.
///
/// `*` allows any origin; browsers refuse credentials with a wildcard, so
/// none are offered in that case.
fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origin == "*" {
        return Ok(cors.allow_origin(AllowOrigin::any()));
    }
    Ok(cors
        .allow_origin(HeaderValue::from_str(origin)?)
        .allow_credentials(true))
}

/// Build the HTTP router with CORS, security headers, body limit, timeout and tracing.
pub fn build_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let server = &state.config.server;
    let cors = cors_layer(&server.cors_origin)?;

    let mut router = Router::new()
        .route("/upload", post(upload_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )));

    for (name, value) in security_headers() {
        router = router.layer(SetResponseHeaderLayer::overriding(name, value));
    }

    Ok(router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Start the HTTP server and run until SIGINT/SIGTERM, then drain in-flight requests.
pub async fn start_server(config: ServiceConfig) -> anyhow::Result<()> {
    let port = config.server.port;
    let app = build_router(Arc::new(AppState::new(config)))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port = port, "Starting image-resizer HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
