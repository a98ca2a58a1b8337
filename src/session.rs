//! Assistant session state.
//!
//! A [`Session`] owns everything one user works on: the loaded page, the
//! pipeline outputs, the last impact report, and a busy flag. Operations
//! that call the backend claim the flag first and fail with
//! [`AssistError::Busy`] while another one is in flight, so two runs can
//! never interleave writes to the output slots.
//!
//! The state lock is only held to read or replace state, never across a
//! backend call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use code_assistant_core::{
    impact, orchestrator, service, AssistError, Backend, ExportFormat, ImpactReport,
    PipelineOutputs, PipelineSelection, Result, SourceDocument,
};
use serde::Serialize;
use tokio::sync::Mutex;

/// Everything a session knows, reset as one unit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionState {
    pub document: Option<SourceDocument>,
    pub outputs: PipelineOutputs,
    pub impact: Option<ImpactReport>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl SessionState {
    /// Text offered for export: the preferred output, else the original code.
    pub fn export_content(&self) -> Option<&str> {
        self.outputs.export_candidate().or_else(|| {
            self.document
                .as_ref()
                .map(|d| d.original_code.as_str())
                .filter(|code| !code.is_empty())
        })
    }
}

/// A page in the host workspace, named by space key and title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub space_key: String,
    pub page_title: String,
}

impl PageRef {
    /// Reads the space and page from the hosting page's query string.
    /// Used both to pick the page to load and to choose where to save.
    ///
    /// Accepts `space`, `spaceKey`, or `space_key` for the space and
    /// `page`, `pageTitle`, or `page_title` for the page.
    pub fn from_page_url(url: &str) -> anyhow::Result<Self> {
        let url = reqwest::Url::parse(url)
            .map_err(|e| anyhow::anyhow!("invalid page URL '{}': {}", url, e))?;
        let find = |names: &[&str]| {
            url.query_pairs()
                .find(|(k, v)| names.contains(&k.as_ref()) && !v.trim().is_empty())
                .map(|(_, v)| v.trim().to_string())
        };
        match (
            find(&["space", "spaceKey", "space_key"]),
            find(&["page", "pageTitle", "page_title"]),
        ) {
            (Some(space_key), Some(page_title)) => Ok(Self {
                space_key,
                page_title,
            }),
            _ => anyhow::bail!("Confluence space or page not specified in page URL"),
        }
    }
}

/// The last path component of a user-supplied export name, trimmed.
/// Falls back to `code` when nothing usable is left.
fn export_stem(filename: &str) -> &str {
    std::path::Path::new(filename.trim())
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("code")
}

/// A rendered export ready to be written to disk.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    /// `{filename}.{format}`
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub struct Session {
    backend: Arc<dyn Backend>,
    state: Mutex<SessionState>,
    busy: AtomicBool,
}

/// Releases the busy flag when dropped, on success and on failure.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Session {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            state: Mutex::new(SessionState::default()),
            busy: AtomicBool::new(false),
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn claim(&self) -> Result<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AssistError::Busy)?;
        Ok(BusyGuard(&self.busy))
    }

    /// A copy of the current state.
    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Loads a page and resets every derived output.
    ///
    /// On failure the previously loaded page and its outputs are kept.
    pub async fn load_page(&self, space_key: &str, page_title: &str) -> Result<SourceDocument> {
        let _busy = self.claim()?;
        let document = service::load_document(self.backend.as_ref(), space_key, page_title).await?;
        tracing::info!(
            space = %space_key,
            page = %page_title,
            lines = document.original_code.split('\n').count(),
            "page loaded"
        );

        let mut state = self.state.lock().await;
        *state = SessionState {
            document: Some(document.clone()),
            loaded_at: Some(Utc::now()),
            ..SessionState::default()
        };
        Ok(document)
    }

    /// Runs one pipeline against the loaded page.
    ///
    /// All output slots are cleared before anything else happens. They stay
    /// empty if the run fails.
    pub async fn run(&self, selection: &PipelineSelection) -> Result<PipelineOutputs> {
        let _busy = self.claim()?;
        let base = {
            let mut state = self.state.lock().await;
            let base = state.document.clone().ok_or(AssistError::NoDocument)?;
            state.outputs.clear();
            base
        };

        let outputs = orchestrator::run(self.backend.as_ref(), &base, selection).await?;
        tracing::info!(slots = ?outputs.populated(), "pipeline run complete");

        self.state.lock().await.outputs = outputs.clone();
        Ok(outputs)
    }

    /// Analyzes the latest output against the loaded page's original code.
    ///
    /// The new report replaces the previous one only on success.
    pub async fn analyze_impact(&self) -> Result<ImpactReport> {
        let _busy = self.claim()?;
        let (document, candidate) = {
            let state = self.state.lock().await;
            let document = state
                .document
                .clone()
                .filter(|d| !d.original_code.is_empty())
                .ok_or(AssistError::NoDocument)?;
            let candidate = state.outputs.latest().unwrap_or_default().to_string();
            (document, candidate)
        };

        let report = impact::analyze(
            self.backend.as_ref(),
            &document.original_code,
            &candidate,
            &document.space_key,
            &document.page_title,
        )
        .await?;
        tracing::info!(
            pct = report.metrics.percentage_changed,
            risk = %report.risk.level,
            "impact analysis complete"
        );

        let mut state = self.state.lock().await;
        state.impact = Some(report.clone());
        state.analyzed_at = Some(Utc::now());
        Ok(report)
    }

    /// Renders the export content through the backend.
    pub async fn export(&self, format: ExportFormat, filename: &str) -> Result<ExportedFile> {
        let content = self
            .snapshot()
            .await
            .export_content()
            .map(str::to_string)
            .ok_or(AssistError::NoDocument)?;
        let filename = export_stem(filename);
        let bytes = self.backend.export(&content, format, filename).await?;
        Ok(ExportedFile {
            file_name: format!("{}.{}", filename, format),
            bytes,
        })
    }

    /// Writes the latest output back into the host workspace.
    ///
    /// `target` defaults to the loaded page.
    pub async fn save(&self, target: Option<PageRef>) -> Result<PageRef> {
        let state = self.snapshot().await;
        let content = state
            .outputs
            .latest()
            .map(str::to_string)
            .ok_or(AssistError::NothingToSave)?;
        let target = match target {
            Some(target) => target,
            None => {
                let document = state.document.as_ref().ok_or(AssistError::NoDocument)?;
                PageRef {
                    space_key: document.space_key.clone(),
                    page_title: document.page_title.clone(),
                }
            }
        };
        self.backend
            .save(&target.space_key, &target.page_title, &content)
            .await?;
        tracing::info!(space = %target.space_key, page = %target.page_title, "content saved");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use code_assistant_core::memory::{InMemoryWorkspace, MemoryBackend, ScriptedTransformService};
    use code_assistant_core::{OutputSlot, TransformResult};

    fn page(code: &str) -> TransformResult {
        TransformResult {
            original_code: code.to_string(),
            summary: Some("a page".to_string()),
            ..Default::default()
        }
    }

    fn modified(code: &str) -> TransformResult {
        TransformResult {
            modified_code: Some(code.to_string()),
            ..Default::default()
        }
    }

    fn session(scripted: ScriptedTransformService) -> Session {
        let workspace = InMemoryWorkspace::new().with_space("ENG", "Engineering", &["Parser"]);
        Session::new(Arc::new(MemoryBackend::new(scripted, workspace)))
    }

    #[tokio::test]
    async fn run_without_page_is_no_document() {
        let s = session(ScriptedTransformService::new());
        let err = s
            .run(&PipelineSelection::new("x", "", ""))
            .await
            .unwrap_err();
        assert_eq!(err, AssistError::NoDocument);
        assert!(!s.is_busy());
    }

    #[tokio::test]
    async fn load_then_run_then_analyze() {
        let s = session(
            ScriptedTransformService::new()
                .respond(page("a\nb\nc"))
                .respond(modified("a\nb\nc\nd\ne"))
                .respond(modified("## Recommendations\nAdd tests.")),
        );

        let doc = s.load_page("ENG", "Parser").await.unwrap();
        assert_eq!(doc.summary, "a page");

        let outputs = s
            .run(&PipelineSelection::new("", "", "Refactor Structure"))
            .await
            .unwrap();
        assert_eq!(outputs.populated(), vec![OutputSlot::AiAction]);

        let report = s.analyze_impact().await.unwrap();
        assert_eq!(report.metrics.percentage_changed, 40);
        assert_eq!(report.recommendations, "Add tests.");

        let state = s.snapshot().await;
        assert!(state.impact.is_some());
        assert!(state.analyzed_at.is_some());
    }

    #[tokio::test]
    async fn failed_run_leaves_outputs_cleared() {
        let s = session(
            ScriptedTransformService::new()
                .respond(page("x = 1"))
                .respond(modified("x = 2"))
                .respond(TransformResult {
                    converted_code: Some("let x = 1;".into()),
                    ..Default::default()
                })
                .fail("backend down"),
        );
        s.load_page("ENG", "Parser").await.unwrap();
        s.run(&PipelineSelection::new("bump", "", "")).await.unwrap();
        assert_eq!(s.snapshot().await.outputs.modification_output, "x = 2");

        let err = s
            .run(&PipelineSelection::new("bump", "rust", "Optimize Performance"))
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::TransformService(_)));
        assert!(s.snapshot().await.outputs.is_empty());
        assert!(!s.is_busy());
    }

    #[tokio::test]
    async fn new_page_resets_outputs_and_report() {
        let s = session(
            ScriptedTransformService::new()
                .respond(page("a"))
                .respond(modified("a\nb"))
                .respond(modified("narrative"))
                .respond(page("z")),
        );
        s.load_page("ENG", "Parser").await.unwrap();
        s.run(&PipelineSelection::new("grow", "", "")).await.unwrap();
        s.analyze_impact().await.unwrap();

        s.load_page("ENG", "Parser").await.unwrap();
        let state = s.snapshot().await;
        assert_eq!(state.document.unwrap().original_code, "z");
        assert!(state.outputs.is_empty());
        assert!(state.impact.is_none());
    }

    #[tokio::test]
    async fn failed_page_load_keeps_previous_page() {
        let s = session(
            ScriptedTransformService::new()
                .respond(page("keep me"))
                .fail("timeout"),
        );
        s.load_page("ENG", "Parser").await.unwrap();
        assert!(s.load_page("ENG", "Other").await.is_err());
        let state = s.snapshot().await;
        assert_eq!(state.document.unwrap().original_code, "keep me");
    }

    #[tokio::test]
    async fn analyze_without_change_is_no_change() {
        let s = session(ScriptedTransformService::new().respond(page("same")));
        s.load_page("ENG", "Parser").await.unwrap();
        assert_eq!(s.analyze_impact().await.unwrap_err(), AssistError::NoChange);
    }

    #[tokio::test]
    async fn failed_analysis_keeps_previous_report() {
        let s = session(
            ScriptedTransformService::new()
                .respond(page("a"))
                .respond(modified("a\nb"))
                .respond(modified("first"))
                .fail("down"),
        );
        s.load_page("ENG", "Parser").await.unwrap();
        s.run(&PipelineSelection::new("grow", "", "")).await.unwrap();
        s.analyze_impact().await.unwrap();

        let err = s.analyze_impact().await.unwrap_err();
        assert!(matches!(err, AssistError::ImpactService(_)));
        assert_eq!(s.snapshot().await.impact.unwrap().summary, "first");
    }

    #[tokio::test]
    async fn busy_flag_rejects_overlapping_operations() {
        let s = session(ScriptedTransformService::new());
        let guard = s.claim().unwrap();
        assert!(s.is_busy());
        assert_eq!(
            s.run(&PipelineSelection::new("x", "", "")).await.unwrap_err(),
            AssistError::Busy
        );
        assert_eq!(
            s.load_page("ENG", "Parser").await.unwrap_err(),
            AssistError::Busy
        );
        drop(guard);
        assert!(!s.is_busy());
    }

    #[tokio::test]
    async fn save_defaults_to_loaded_page() {
        let workspace = InMemoryWorkspace::new().with_space("ENG", "Engineering", &["Parser"]);
        let backend = Arc::new(MemoryBackend::new(
            ScriptedTransformService::new()
                .respond(page("old"))
                .respond(modified("new")),
            workspace,
        ));
        let s = Session::new(backend.clone());

        s.load_page("ENG", "Parser").await.unwrap();
        assert_eq!(s.save(None).await.unwrap_err(), AssistError::NothingToSave);

        s.run(&PipelineSelection::new("update", "", "")).await.unwrap();
        let target = s.save(None).await.unwrap();
        assert_eq!(target.page_title, "Parser");
        assert_eq!(backend.workspace.saved("ENG", "Parser").as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn empty_direct_result_leaves_nothing_to_save() {
        let workspace = InMemoryWorkspace::new().with_space("ENG", "Engineering", &["Parser"]);
        let backend = Arc::new(MemoryBackend::new(
            ScriptedTransformService::new()
                .respond(page("orig"))
                .respond(TransformResult {
                    original_code: "orig".to_string(),
                    modified_code: Some(String::new()),
                    ..Default::default()
                }),
            workspace,
        ));
        let s = Session::new(backend.clone());

        s.load_page("ENG", "Parser").await.unwrap();
        let outputs = s.run(&PipelineSelection::new("rename", "", "")).await.unwrap();
        assert!(outputs.is_empty());
        assert_eq!(s.save(None).await.unwrap_err(), AssistError::NothingToSave);
        assert_eq!(backend.workspace.saved("ENG", "Parser"), None);
    }

    #[test]
    fn export_stem_drops_directories() {
        assert_eq!(export_stem("../escaped"), "escaped");
        assert_eq!(export_stem("a/b/report"), "report");
        assert_eq!(export_stem(" parser "), "parser");
        assert_eq!(export_stem(".."), "code");
        assert_eq!(export_stem("out/"), "out");
        assert_eq!(export_stem("   "), "code");
    }

    #[test]
    fn page_ref_from_page_url() {
        let t = PageRef::from_page_url(
            "https://wiki.example.com/macro?spaceKey=ENG&pageTitle=Release%20Notes",
        )
        .unwrap();
        assert_eq!(t.space_key, "ENG");
        assert_eq!(t.page_title, "Release Notes");

        let t = PageRef::from_page_url("http://x/?space=OPS&page=Runbook+One").unwrap();
        assert_eq!(t.page_title, "Runbook One");

        assert!(PageRef::from_page_url("http://x/?space=OPS").is_err());
        assert!(PageRef::from_page_url("not a url").is_err());
    }

    #[tokio::test]
    async fn export_falls_back_to_original_code() {
        let s = session(ScriptedTransformService::new().respond(page("fn main() {}")));
        assert_eq!(
            s.export(ExportFormat::Txt, "").await.unwrap_err(),
            AssistError::NoDocument
        );
        s.load_page("ENG", "Parser").await.unwrap();
        let file = s.export(ExportFormat::Markdown, "").await.unwrap();
        assert_eq!(file.file_name, "code.markdown");
        assert_eq!(file.bytes, b"fn main() {}");
    }
}
