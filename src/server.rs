//! HTTP service for browser-hosted clients.
//!
//! Exposes one [`Session`] over a JSON API so a page macro can drive the
//! same load / run / analyze / export / save flow as the CLI.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/catalog` | AI actions, target languages, export formats |
//! | `GET`  | `/spaces` | Spaces from the backend directory |
//! | `GET`  | `/spaces/{key}/pages` | Page titles in a space |
//! | `GET`  | `/session` | Current session state and busy flag |
//! | `POST` | `/session/page` | Load a page by key and title or by hosting-page URL, resetting all outputs |
//! | `POST` | `/session/run` | Run the pipeline for the given selections |
//! | `POST` | `/session/impact` | Analyze the latest output |
//! | `POST` | `/session/export` | Render the export and return its bytes |
//! | `POST` | `/session/save` | Write the latest output to the loaded page, a named page, or the page in a URL |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "busy", "message": "another operation is still in progress" } }
//! ```
//!
//! Error codes: `bad_request` (400), `missing_input` (400), `no_document` (400),
//! `no_change` (400), `nothing_to_save` (400), `busy` (409), `backend_error` (502).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the page macro can
//! call the service from the wiki's origin.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use code_assistant_core::{
    AssistError, Backend, ExportFormat, ImpactReport, PipelineOutputs, PipelineSelection,
    SourceDocument, Space,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::catalog::{catalog, Catalog};
use crate::client::HttpBackend;
use crate::config::{Config, ExportConfig};
use crate::session::{PageRef, Session, SessionState};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Export defaults applied when a request leaves them out.
    export: Arc<ExportConfig>,
    session: Arc<Session>,
}

impl AppState {
    pub fn new(export: ExportConfig, session: Arc<Session>) -> Self {
        Self {
            export: Arc::new(export),
            session,
        }
    }
}

/// Starts the HTTP service against the configured backend.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let backend = HttpBackend::new(&config.backend)?;
    println!("Using backend {}", backend.base_url());
    run_server_with_backend(config, Arc::new(backend)).await
}

/// Starts the HTTP service with any [`Backend`] implementation.
pub async fn run_server_with_backend(
    config: &Config,
    backend: Arc<dyn Backend>,
) -> anyhow::Result<()> {
    let state = AppState::new(config.export.clone(), Arc::new(Session::new(backend)));
    let app = router(state);

    println!("Code assistant listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router with all routes and the CORS layer.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/catalog", get(handle_catalog))
        .route("/spaces", get(handle_spaces))
        .route("/spaces/{key}/pages", get(handle_pages))
        .route("/session", get(handle_session))
        .route("/session/page", post(handle_load_page))
        .route("/session/run", post(handle_run))
        .route("/session/impact", post(handle_impact))
        .route("/session/export", post(handle_export))
        .route("/session/save", post(handle_save))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<AssistError> for AppError {
    fn from(err: AssistError) -> Self {
        let (status, code) = match &err {
            AssistError::MissingInput => (StatusCode::BAD_REQUEST, "missing_input"),
            AssistError::NoDocument => (StatusCode::BAD_REQUEST, "no_document"),
            AssistError::NoChange => (StatusCode::BAD_REQUEST, "no_change"),
            AssistError::NothingToSave => (StatusCode::BAD_REQUEST, "nothing_to_save"),
            AssistError::Busy => (StatusCode::CONFLICT, "busy"),
            AssistError::TransformService(_)
            | AssistError::ImpactService(_)
            | AssistError::Directory(_)
            | AssistError::Export(_)
            | AssistError::Persistence(_) => (StatusCode::BAD_GATEWAY, "backend_error"),
        };
        if status == StatusCode::BAD_GATEWAY {
            tracing::warn!(error = %err, "backend call failed");
        }
        AppError {
            status,
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /catalog ============

async fn handle_catalog() -> Json<Catalog> {
    Json(catalog())
}

// ============ Directory ============

#[derive(Serialize)]
struct SpacesResponse {
    spaces: Vec<Space>,
}

async fn handle_spaces(State(state): State<AppState>) -> Result<Json<SpacesResponse>, AppError> {
    let spaces = state.session.backend().list_spaces().await?;
    Ok(Json(SpacesResponse { spaces }))
}

#[derive(Serialize)]
struct PagesResponse {
    pages: Vec<String>,
}

async fn handle_pages(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<PagesResponse>, AppError> {
    let pages = state.session.backend().list_pages(&key).await?;
    Ok(Json(PagesResponse { pages }))
}

// ============ Session ============

#[derive(Serialize)]
struct SessionResponse {
    busy: bool,
    #[serde(flatten)]
    state: SessionState,
}

async fn handle_session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(SessionResponse {
        busy: state.session.is_busy(),
        state: state.session.snapshot().await,
    })
}

/// Names a page either directly or through the hosting page's URL.
///
/// `page_url` wins when present; its query string is read with
/// [`PageRef::from_page_url`].
#[derive(Deserialize, Default)]
struct PageSelector {
    #[serde(default)]
    page_url: Option<String>,
    #[serde(default)]
    space_key: Option<String>,
    #[serde(default)]
    page_title: Option<String>,
}

impl PageSelector {
    fn resolve(self) -> Result<Option<PageRef>, AppError> {
        let non_empty = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        match (
            self.page_url,
            non_empty(self.space_key),
            non_empty(self.page_title),
        ) {
            (Some(url), _, _) => PageRef::from_page_url(&url)
                .map(Some)
                .map_err(|e| bad_request(e.to_string())),
            (None, Some(space_key), Some(page_title)) => Ok(Some(PageRef {
                space_key,
                page_title,
            })),
            (None, None, None) => Ok(None),
            _ => Err(bad_request("space_key and page_title must be given together")),
        }
    }
}

async fn handle_load_page(
    State(state): State<AppState>,
    Json(req): Json<PageSelector>,
) -> Result<Json<SourceDocument>, AppError> {
    let page = req
        .resolve()?
        .ok_or_else(|| bad_request("page_url or space_key and page_title are required"))?;
    let document = state
        .session
        .load_page(&page.space_key, &page.page_title)
        .await?;
    Ok(Json(document))
}

async fn handle_run(
    State(state): State<AppState>,
    Json(selection): Json<PipelineSelection>,
) -> Result<Json<PipelineOutputs>, AppError> {
    Ok(Json(state.session.run(&selection).await?))
}

async fn handle_impact(State(state): State<AppState>) -> Result<Json<ImpactReport>, AppError> {
    Ok(Json(state.session.analyze_impact().await?))
}

#[derive(Deserialize, Default)]
struct ExportRequest {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

/// Returns the rendered bytes as an attachment named `{filename}.{format}`.
async fn handle_export(
    State(state): State<AppState>,
    Json(req): Json<ExportRequest>,
) -> Result<Response, AppError> {
    let format = match req.format.as_deref() {
        Some(raw) => raw.parse::<ExportFormat>().map_err(bad_request)?,
        None => state.export.format().map_err(|e| bad_request(e.to_string()))?,
    };
    let filename = req
        .filename
        .unwrap_or_else(|| state.export.default_filename.clone());
    let file = state.session.export(format, &filename).await?;

    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

#[derive(Serialize)]
struct SaveResponse {
    saved: PageRef,
}

async fn handle_save(
    State(state): State<AppState>,
    Json(req): Json<PageSelector>,
) -> Result<Json<SaveResponse>, AppError> {
    let saved = state.session.save(req.resolve()?).await?;
    Ok(Json(SaveResponse { saved }))
}
