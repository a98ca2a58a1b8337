//! Collaborator abstractions.
//!
//! The core never talks to the network itself. The shell crate implements
//! these traits over HTTP; tests implement them in memory.
//!
//! All traits are async (via `async-trait`) and must be `Send + Sync` so a
//! single backend can be shared across sessions and request handlers.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ExportFormat, SourceDocument, Space, TransformRequest, TransformResult};

/// The external service that performs every AI transformation.
///
/// Failures must be reported as
/// [`AssistError::TransformService`](crate::AssistError::TransformService).
/// Callers that need a different error kind remap it.
#[async_trait]
pub trait TransformService: Send + Sync {
    async fn transform(&self, request: &TransformRequest) -> Result<TransformResult>;
}

/// Renders content into a downloadable file.
#[async_trait]
pub trait ExportService: Send + Sync {
    async fn export(&self, content: &str, format: ExportFormat, filename: &str) -> Result<Vec<u8>>;
}

/// Writes content back into a page of the host workspace.
#[async_trait]
pub trait PersistenceService: Send + Sync {
    async fn save(&self, space_key: &str, page_title: &str, content: &str) -> Result<()>;
}

/// Lists spaces and the pages inside them.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    async fn list_spaces(&self) -> Result<Vec<Space>>;
    async fn list_pages(&self, space_key: &str) -> Result<Vec<String>>;
}

/// Every collaborator behind one handle.
///
/// Implemented for any type that implements all four traits, so a session
/// can hold a single `Arc<dyn Backend>`.
pub trait Backend: TransformService + DirectoryService + ExportService + PersistenceService {}

impl<T> Backend for T where
    T: TransformService + DirectoryService + ExportService + PersistenceService
{
}

/// Loads a page as a [`SourceDocument`].
///
/// Issues one transformation call with an empty instruction and no target
/// language; the service answers with the page's original code and summary.
pub async fn load_document<S: TransformService + ?Sized>(
    service: &S,
    space_key: &str,
    page_title: &str,
) -> Result<SourceDocument> {
    let request = TransformRequest::new(space_key, page_title, "", "");
    let result = service.transform(&request).await?;
    Ok(SourceDocument {
        space_key: space_key.to_string(),
        page_title: page_title.to_string(),
        original_code: result.original_code,
        summary: result.summary.unwrap_or_default(),
    })
}
