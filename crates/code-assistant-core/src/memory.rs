//! In-memory collaborators for tests and offline use.
//!
//! [`ScriptedTransformService`] replays queued responses in order and
//! records every request it receives. [`InMemoryWorkspace`] serves a fixed
//! set of spaces and pages and keeps saved content in a map.
//! [`MemoryBackend`] combines the two.
//!
//! Shared state sits behind `std::sync::Mutex`; a poisoned lock is recovered rather than
//! propagated since the guarded data is plain values.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{AssistError, Result};
use crate::models::{ExportFormat, Space, TransformRequest, TransformResult};
use crate::service::{DirectoryService, ExportService, PersistenceService, TransformService};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Transformation service that answers from a queue.
///
/// Once the queue is empty every call fails with
/// [`AssistError::TransformService`].
#[derive(Default)]
pub struct ScriptedTransformService {
    responses: Mutex<VecDeque<Result<TransformResult>>>,
    requests: Mutex<Vec<TransformRequest>>,
}

impl ScriptedTransformService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response.
    pub fn respond(self, result: TransformResult) -> Self {
        lock(&self.responses).push_back(Ok(result));
        self
    }

    /// Queues a transformation failure.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.fail_with(AssistError::TransformService(message.into()))
    }

    /// Queues an arbitrary error.
    pub fn fail_with(self, err: AssistError) -> Self {
        lock(&self.responses).push_back(Err(err));
        self
    }

    /// Queues a response while the service is shared.
    pub fn push(&self, response: Result<TransformResult>) {
        lock(&self.responses).push_back(response);
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<TransformRequest> {
        lock(&self.requests).clone()
    }

    /// Number of queued responses not yet consumed.
    pub fn pending(&self) -> usize {
        lock(&self.responses).len()
    }
}

#[async_trait]
impl TransformService for ScriptedTransformService {
    async fn transform(&self, request: &TransformRequest) -> Result<TransformResult> {
        lock(&self.requests).push(request.clone());
        lock(&self.responses).pop_front().unwrap_or_else(|| {
            Err(AssistError::TransformService(
                "no scripted response left".to_string(),
            ))
        })
    }
}

/// Spaces, pages, and saved content held in memory.
#[derive(Default)]
pub struct InMemoryWorkspace {
    spaces: Vec<Space>,
    pages: BTreeMap<String, Vec<String>>,
    saved: Mutex<BTreeMap<(String, String), String>>,
}

impl InMemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a space with its page titles.
    pub fn with_space(mut self, key: &str, name: &str, pages: &[&str]) -> Self {
        self.spaces.push(Space {
            key: key.to_string(),
            name: name.to_string(),
        });
        self.pages.insert(
            key.to_string(),
            pages.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    /// Content last saved to a page, if any.
    pub fn saved(&self, space_key: &str, page_title: &str) -> Option<String> {
        lock(&self.saved)
            .get(&(space_key.to_string(), page_title.to_string()))
            .cloned()
    }
}

#[async_trait]
impl DirectoryService for InMemoryWorkspace {
    async fn list_spaces(&self) -> Result<Vec<Space>> {
        Ok(self.spaces.clone())
    }

    async fn list_pages(&self, space_key: &str) -> Result<Vec<String>> {
        self.pages
            .get(space_key)
            .cloned()
            .ok_or_else(|| AssistError::Directory(format!("unknown space: {}", space_key)))
    }
}

#[async_trait]
impl PersistenceService for InMemoryWorkspace {
    async fn save(&self, space_key: &str, page_title: &str, content: &str) -> Result<()> {
        let known = self
            .pages
            .get(space_key)
            .map(|pages| pages.iter().any(|p| p == page_title))
            .unwrap_or(false);
        if !known {
            return Err(AssistError::Persistence(format!(
                "page not found: {}/{}",
                space_key, page_title
            )));
        }
        lock(&self.saved).insert(
            (space_key.to_string(), page_title.to_string()),
            content.to_string(),
        );
        Ok(())
    }
}

#[async_trait]
impl ExportService for InMemoryWorkspace {
    /// Returns the content as UTF-8 bytes regardless of format.
    async fn export(&self, content: &str, _format: ExportFormat, _filename: &str) -> Result<Vec<u8>> {
        Ok(content.as_bytes().to_vec())
    }
}

/// A scripted transformation service and an in-memory workspace behind
/// one [`Backend`](crate::Backend).
#[derive(Default)]
pub struct MemoryBackend {
    pub scripted: ScriptedTransformService,
    pub workspace: InMemoryWorkspace,
}

impl MemoryBackend {
    pub fn new(scripted: ScriptedTransformService, workspace: InMemoryWorkspace) -> Self {
        Self {
            scripted,
            workspace,
        }
    }
}

#[async_trait]
impl TransformService for MemoryBackend {
    async fn transform(&self, request: &TransformRequest) -> Result<TransformResult> {
        self.scripted.transform(request).await
    }
}

#[async_trait]
impl DirectoryService for MemoryBackend {
    async fn list_spaces(&self) -> Result<Vec<Space>> {
        self.workspace.list_spaces().await
    }

    async fn list_pages(&self, space_key: &str) -> Result<Vec<String>> {
        self.workspace.list_pages(space_key).await
    }
}

#[async_trait]
impl ExportService for MemoryBackend {
    async fn export(&self, content: &str, format: ExportFormat, filename: &str) -> Result<Vec<u8>> {
        self.workspace.export(content, format, filename).await
    }
}

#[async_trait]
impl PersistenceService for MemoryBackend {
    async fn save(&self, space_key: &str, page_title: &str, content: &str) -> Result<()> {
        self.workspace.save(space_key, page_title, content).await
    }
}
