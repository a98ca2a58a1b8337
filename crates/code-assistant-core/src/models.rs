//! Core data models shared by the orchestrator, the impact heuristic, and
//! the shell crate.
//!
//! All types serialize with `serde` so the HTTP client and the JSON API can
//! use them directly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A page of source code loaded from the host workspace.
///
/// Immutable once loaded. Selecting another page replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub space_key: String,
    pub page_title: String,
    pub original_code: String,
    pub summary: String,
}

/// One request to the transformation service.
///
/// `instruction` empty and `target_language` set means conversion only;
/// a non-empty `instruction` requests a modification; both empty returns
/// the page's original code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRequest {
    pub space_key: String,
    pub page_title: String,
    pub instruction: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_language: String,
}

impl TransformRequest {
    pub fn new(
        space_key: impl Into<String>,
        page_title: impl Into<String>,
        instruction: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            space_key: space_key.into(),
            page_title: page_title.into(),
            instruction: instruction.into(),
            target_language: target_language.into(),
        }
    }
}

/// Response of a single transformation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformResult {
    #[serde(default)]
    pub original_code: String,
    #[serde(default)]
    pub converted_code: Option<String>,
    #[serde(default)]
    pub modified_code: Option<String>,
    /// Only populated by the page-load call.
    #[serde(default)]
    pub summary: Option<String>,
}

impl TransformResult {
    /// The text a pipeline stage consumes or writes.
    ///
    /// Tries `modified_code`, then `converted_code`, then `original_code`
    /// and returns the first non-empty one. Every stage boundary goes
    /// through this helper so all pipeline shapes agree on the order.
    pub fn best_text(&self) -> Option<&str> {
        non_empty(self.modified_code.as_deref())
            .or_else(|| non_empty(self.converted_code.as_deref()))
            .or_else(|| non_empty(Some(self.original_code.as_str())))
    }

    /// `converted_code` if the service returned a non-empty one.
    pub fn converted(&self) -> Option<&str> {
        non_empty(self.converted_code.as_deref())
    }

    /// `modified_code` if the service returned a non-empty one.
    pub fn modified(&self) -> Option<&str> {
        non_empty(self.modified_code.as_deref())
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Which output slot family a pipeline run writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSlot {
    AiAction,
    Modification,
    Conversion,
    Processed,
}

/// Results of one pipeline run.
///
/// After a run completes at most one slot holds content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutputs {
    pub ai_action_output: String,
    pub modification_output: String,
    pub conversion_output: String,
    /// Legacy slot. Not written by any pipeline shape; kept so clients
    /// reading the older field still deserialize.
    pub processed_code: String,
}

impl PipelineOutputs {
    /// Outputs with a single slot populated.
    pub fn with(slot: OutputSlot, text: impl Into<String>) -> Self {
        let mut outputs = Self::default();
        outputs.set(slot, text);
        outputs
    }

    pub fn set(&mut self, slot: OutputSlot, text: impl Into<String>) {
        let text = text.into();
        match slot {
            OutputSlot::AiAction => self.ai_action_output = text,
            OutputSlot::Modification => self.modification_output = text,
            OutputSlot::Conversion => self.conversion_output = text,
            OutputSlot::Processed => self.processed_code = text,
        }
    }

    pub fn get(&self, slot: OutputSlot) -> &str {
        match slot {
            OutputSlot::AiAction => &self.ai_action_output,
            OutputSlot::Modification => &self.modification_output,
            OutputSlot::Conversion => &self.conversion_output,
            OutputSlot::Processed => &self.processed_code,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.populated().is_empty()
    }

    /// Slots currently holding content, in priority order.
    pub fn populated(&self) -> Vec<OutputSlot> {
        [
            OutputSlot::AiAction,
            OutputSlot::Modification,
            OutputSlot::Conversion,
            OutputSlot::Processed,
        ]
        .into_iter()
        .filter(|slot| !self.get(*slot).is_empty())
        .collect()
    }

    /// The most recent transformation result: AI action, then
    /// modification, then conversion, then the legacy slot.
    pub fn latest(&self) -> Option<&str> {
        self.populated().first().map(|slot| self.get(*slot))
    }

    /// Content offered for export: modification, then conversion, then AI
    /// action, then the legacy slot.
    pub fn export_candidate(&self) -> Option<&str> {
        [
            OutputSlot::Modification,
            OutputSlot::Conversion,
            OutputSlot::AiAction,
            OutputSlot::Processed,
        ]
        .into_iter()
        .map(|slot| self.get(slot))
        .find(|text| !text.is_empty())
    }
}

/// A space in the host workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub key: String,
    pub name: String,
}

/// File formats the export service can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Markdown,
    Pdf,
    Docx,
    Txt,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Markdown,
        ExportFormat::Pdf,
        ExportFormat::Docx,
        ExportFormat::Txt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "markdown",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
            ExportFormat::Txt => "txt",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "Markdown",
            ExportFormat::Pdf => "PDF",
            ExportFormat::Docx => "Word Document",
            ExportFormat::Txt => "Plain Text",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "pdf" => Ok(ExportFormat::Pdf),
            "docx" => Ok(ExportFormat::Docx),
            "txt" | "text" => Ok(ExportFormat::Txt),
            other => Err(format!(
                "unknown export format '{}': expected markdown, pdf, docx, or txt",
                other
            )),
        }
    }
}

/// Target languages offered for conversion.
pub const TARGET_LANGUAGES: &[&str] = &[
    "javascript",
    "typescript",
    "python",
    "java",
    "csharp",
    "go",
    "rust",
    "php",
    "yang",
    "cpp",
    "c",
    "swift",
    "kotlin",
    "scala",
    "ruby",
    "perl",
    "bash",
    "powershell",
    "sql",
    "html",
    "css",
    "xml",
    "json",
    "yaml",
    "toml",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn result(original: &str, converted: Option<&str>, modified: Option<&str>) -> TransformResult {
        TransformResult {
            original_code: original.to_string(),
            converted_code: converted.map(str::to_string),
            modified_code: modified.map(str::to_string),
            summary: None,
        }
    }

    #[test]
    fn best_text_prefers_modified() {
        let r = result("orig", Some("conv"), Some("mod"));
        assert_eq!(r.best_text(), Some("mod"));
    }

    #[test]
    fn best_text_skips_empty_fields() {
        let r = result("orig", Some("conv"), Some(""));
        assert_eq!(r.best_text(), Some("conv"));

        let r = result("orig", Some(""), None);
        assert_eq!(r.best_text(), Some("orig"));

        let r = result("", None, None);
        assert_eq!(r.best_text(), None);
    }

    #[test]
    fn transform_result_tolerates_missing_fields() {
        let r: TransformResult =
            serde_json::from_str(r#"{"original_code": "x", "converted_code": null}"#).unwrap();
        assert_eq!(r.original_code, "x");
        assert!(r.converted_code.is_none());
        assert!(r.modified_code.is_none());
    }

    #[test]
    fn transform_request_omits_empty_language() {
        let req = TransformRequest::new("ENG", "Page", "do it", "");
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("target_language").is_none());

        let req = TransformRequest::new("ENG", "Page", "", "rust");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["target_language"], "rust");
    }

    #[test]
    fn latest_and_export_use_different_priorities() {
        let mut outputs = PipelineOutputs::default();
        outputs.set(OutputSlot::AiAction, "act");
        outputs.set(OutputSlot::Modification, "mod");
        assert_eq!(outputs.latest(), Some("act"));
        assert_eq!(outputs.export_candidate(), Some("mod"));
    }

    #[test]
    fn clear_empties_every_slot() {
        let mut outputs = PipelineOutputs::with(OutputSlot::Processed, "legacy");
        outputs.set(OutputSlot::Conversion, "conv");
        assert_eq!(outputs.populated().len(), 2);
        outputs.clear();
        assert!(outputs.is_empty());
        assert_eq!(outputs.latest(), None);
    }

    #[test]
    fn export_format_parsing() {
        assert_eq!("markdown".parse::<ExportFormat>(), Ok(ExportFormat::Markdown));
        assert_eq!("MD".parse::<ExportFormat>(), Ok(ExportFormat::Markdown));
        assert_eq!("docx".parse::<ExportFormat>(), Ok(ExportFormat::Docx));
        assert!("html".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Pdf.to_string(), "pdf");
    }
}
