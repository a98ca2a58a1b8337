//! HTTP client for the AI backend.
//!
//! [`HttpBackend`] implements every collaborator trait from
//! `code_assistant_core` over one shared `reqwest::Client`.
//!
//! # Endpoints
//!
//! | Method | Path | Used by |
//! |--------|------|---------|
//! | `GET`  | `/spaces` | [`DirectoryService::list_spaces`] |
//! | `GET`  | `/pages?space_key=K` | [`DirectoryService::list_pages`] |
//! | `POST` | `/code-assistant` | [`TransformService::transform`] |
//! | `POST` | `/export` | [`ExportService::export`] |
//! | `POST` | `/save-to-confluence` | [`PersistenceService::save`] |
//!
//! Failures are opaque: a transport error or any non-2xx status becomes the
//! matching [`AssistError`] variant carrying the status and body text.
//! Nothing is retried.

use std::time::Duration;

use async_trait::async_trait;
use code_assistant_core::{
    AssistError, DirectoryService, ExportFormat, ExportService, PersistenceService, Result,
    Space, TransformRequest, TransformResult, TransformService,
};
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;

#[derive(Deserialize)]
struct SpacesResponse {
    spaces: Vec<Space>,
}

#[derive(Deserialize)]
struct PagesResponse {
    pages: Vec<String>,
}

#[derive(Serialize)]
struct ExportRequest<'a> {
    content: &'a str,
    format: ExportFormat,
    filename: &'a str,
}

#[derive(Serialize)]
struct SaveRequest<'a> {
    space_key: &'a str,
    page_title: &'a str,
    content: &'a str,
}

/// Backend client shared by the CLI and the HTTP service.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Sends a request and returns the successful response, mapping any
/// failure through `kind`.
async fn send(
    request: reqwest::RequestBuilder,
    kind: fn(String) -> AssistError,
) -> Result<reqwest::Response> {
    let response = request.send().await.map_err(|e| kind(e.to_string()))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(kind(format!("backend returned {}: {}", status, body)))
}

#[async_trait]
impl TransformService for HttpBackend {
    async fn transform(&self, request: &TransformRequest) -> Result<TransformResult> {
        tracing::debug!(
            space = %request.space_key,
            page = %request.page_title,
            language = %request.target_language,
            instruction_len = request.instruction.len(),
            "POST /code-assistant"
        );
        let response = send(
            self.client.post(self.url("/code-assistant")).json(request),
            AssistError::TransformService,
        )
        .await?;
        response
            .json::<TransformResult>()
            .await
            .map_err(|e| AssistError::TransformService(format!("invalid response: {}", e)))
    }
}

#[async_trait]
impl DirectoryService for HttpBackend {
    async fn list_spaces(&self) -> Result<Vec<Space>> {
        let response = send(self.client.get(self.url("/spaces")), AssistError::Directory).await?;
        let body: SpacesResponse = response
            .json()
            .await
            .map_err(|e| AssistError::Directory(format!("invalid response: {}", e)))?;
        Ok(body.spaces)
    }

    async fn list_pages(&self, space_key: &str) -> Result<Vec<String>> {
        let response = send(
            self.client
                .get(self.url("/pages"))
                .query(&[("space_key", space_key)]),
            AssistError::Directory,
        )
        .await?;
        let body: PagesResponse = response
            .json()
            .await
            .map_err(|e| AssistError::Directory(format!("invalid response: {}", e)))?;
        Ok(body.pages)
    }
}

#[async_trait]
impl ExportService for HttpBackend {
    async fn export(&self, content: &str, format: ExportFormat, filename: &str) -> Result<Vec<u8>> {
        let body = ExportRequest {
            content,
            format,
            filename,
        };
        let response = send(
            self.client.post(self.url("/export")).json(&body),
            AssistError::Export,
        )
        .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AssistError::Export(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl PersistenceService for HttpBackend {
    async fn save(&self, space_key: &str, page_title: &str, content: &str) -> Result<()> {
        let body = SaveRequest {
            space_key,
            page_title,
            content,
        };
        send(
            self.client.post(self.url("/save-to-confluence")).json(&body),
            AssistError::Persistence,
        )
        .await?;
        Ok(())
    }
}
