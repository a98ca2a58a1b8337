//! Impact heuristic.
//!
//! Compares an original text with a candidate by line position, derives
//! size-based metrics and a three-tier risk level, then asks the
//! transformation service for a narrative analysis.
//!
//! # Metrics
//!
//! Added and removed counts come from the difference in line counts only:
//!
//! ```text
//! added   = max(0, |candidate| - |original|)
//! removed = max(0, |original| - |candidate|)
//! pct     = round(100 * (added + removed) / max(|original|, |candidate|))
//! ```
//!
//! An edit in the middle of a file that keeps the line count unchanged
//! scores 0%. The diff is index-aligned, not a minimal edit script.
//!
//! # Risk tiers
//!
//! | pct | level | score |
//! |-----|-------|-------|
//! | > 30 | high | `min(10, round(pct / 10))` |
//! | 11..=30 | medium | `min(8, round(pct / 8))` |
//! | 0..=10 | low | `min(5, round(pct / 5))` |
//!
//! Scores never drop below 1.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AssistError, Result};
use crate::models::TransformRequest;
use crate::service::TransformService;

const ANALYSIS_DONE: &str = "Impact analysis completed successfully.";
const RECOMMENDATIONS_HEADING: &str = "## Recommendations\n";

/// Size-based change metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactMetrics {
    pub lines_added: usize,
    pub lines_removed: usize,
    /// Always 1: one page is analyzed at a time.
    pub files_changed: usize,
    pub percentage_changed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub score: u32,
    pub factors: Vec<String>,
}

/// One line of the positional diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum DiffLine {
    Unchanged(String),
    Removed(String),
    Added(String),
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffLine::Unchanged(line) => write!(f, "  {}", line),
            DiffLine::Removed(line) => write!(f, "- {}", line),
            DiffLine::Added(line) => write!(f, "+ {}", line),
        }
    }
}

/// Result of one impact analysis. Always built whole; never merged with a
/// previous report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub diff: Vec<DiffLine>,
    pub metrics: ImpactMetrics,
    /// Narrative returned by the service.
    pub summary: String,
    /// Body of the narrative's "## Recommendations" section, or empty.
    pub recommendations: String,
    pub risk: RiskAssessment,
}

impl ImpactReport {
    /// The diff rendered one tagged line per row.
    pub fn diff_text(&self) -> String {
        render_diff(&self.diff)
    }
}

/// Locally computed part of an analysis, before the narrative call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAnalysis {
    pub diff: Vec<DiffLine>,
    pub metrics: ImpactMetrics,
    pub risk: RiskAssessment,
}

/// Computes diff, metrics, and risk for a candidate.
///
/// Fails with [`AssistError::NoChange`] if the candidate is empty or equal
/// to the original.
pub fn assess(original: &str, candidate: &str) -> Result<LocalAnalysis> {
    if candidate.is_empty() || candidate == original {
        return Err(AssistError::NoChange);
    }
    let old_lines: Vec<&str> = original.split('\n').collect();
    let new_lines: Vec<&str> = candidate.split('\n').collect();

    let metrics = compute_metrics(&old_lines, &new_lines);
    let diff = positional_diff(&old_lines, &new_lines);
    let risk = assess_risk(&metrics);
    Ok(LocalAnalysis {
        diff,
        metrics,
        risk,
    })
}

/// Runs the full analysis, including the narrative call.
///
/// The report is only returned when every part succeeds. A failed narrative
/// call maps to [`AssistError::ImpactService`].
pub async fn analyze<S: TransformService + ?Sized>(
    service: &S,
    original: &str,
    candidate: &str,
    space_key: &str,
    page_title: &str,
) -> Result<ImpactReport> {
    let local = assess(original, candidate)?;
    tracing::debug!(
        pct = local.metrics.percentage_changed,
        level = %local.risk.level,
        "local impact computed; requesting narrative"
    );

    let request = TransformRequest::new(
        space_key,
        page_title,
        analysis_prompt(original, candidate),
        "",
    );
    let result = service
        .transform(&request)
        .await
        .map_err(|e| AssistError::ImpactService(e.to_string()))?;

    let summary = result
        .modified()
        .or_else(|| Some(result.original_code.as_str()).filter(|s| !s.is_empty()))
        .unwrap_or(ANALYSIS_DONE)
        .to_string();
    let recommendations = extract_recommendations(&summary).unwrap_or_default();

    Ok(ImpactReport {
        diff: local.diff,
        metrics: local.metrics,
        summary,
        recommendations,
        risk: local.risk,
    })
}

fn compute_metrics(old_lines: &[&str], new_lines: &[&str]) -> ImpactMetrics {
    let lines_added = new_lines.len().saturating_sub(old_lines.len());
    let lines_removed = old_lines.len().saturating_sub(new_lines.len());
    let total = old_lines.len().max(new_lines.len());
    let percentage_changed = if total > 0 {
        round_ratio((lines_added + lines_removed) as f64 * 100.0, total as f64)
    } else {
        0
    };
    ImpactMetrics {
        lines_added,
        lines_removed,
        files_changed: 1,
        percentage_changed,
    }
}

/// Index-aligned diff. Missing lines compare as empty strings, and empty
/// sides of a changed pair are not emitted.
pub fn positional_diff(old_lines: &[&str], new_lines: &[&str]) -> Vec<DiffLine> {
    let max = old_lines.len().max(new_lines.len());
    let mut out = Vec::with_capacity(max);
    for i in 0..max {
        let old = old_lines.get(i).copied().unwrap_or("");
        let new = new_lines.get(i).copied().unwrap_or("");
        if old != new {
            if !old.is_empty() {
                out.push(DiffLine::Removed(old.to_string()));
            }
            if !new.is_empty() {
                out.push(DiffLine::Added(new.to_string()));
            }
        } else {
            out.push(DiffLine::Unchanged(old.to_string()));
        }
    }
    out
}

pub fn render_diff(diff: &[DiffLine]) -> String {
    diff.iter()
        .map(|line| line.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Maps a percentage to a risk level and score.
pub fn classify_risk(percentage: u32) -> (RiskLevel, u32) {
    let pct = percentage as f64;
    let (level, score) = if percentage > 30 {
        (RiskLevel::High, round_ratio(pct, 10.0).min(10))
    } else if percentage > 10 {
        (RiskLevel::Medium, round_ratio(pct, 8.0).min(8))
    } else {
        (RiskLevel::Low, round_ratio(pct, 5.0).min(5))
    };
    (level, score.max(1))
}

fn assess_risk(metrics: &ImpactMetrics) -> RiskAssessment {
    let (level, score) = classify_risk(metrics.percentage_changed);
    RiskAssessment {
        level,
        score,
        factors: vec![
            format!(
                "Code changes affect {}% of the original content",
                metrics.percentage_changed
            ),
            format!(
                "{} lines added, {} lines removed",
                metrics.lines_added, metrics.lines_removed
            ),
            "Changes may impact functionality and require testing".to_string(),
            "Review recommended before deployment".to_string(),
        ],
    }
}

// Half-up rounding for non-negative ratios.
fn round_ratio(numerator: f64, denominator: f64) -> u32 {
    (numerator / denominator).round() as u32
}

/// Prompt for the narrative analysis, embedding both texts verbatim.
pub fn analysis_prompt(original: &str, candidate: &str) -> String {
    format!(
        "Analyze the impact of the following code changes. Provide a detailed analysis in this exact format:

## Impact Analysis
[Describe what was changed and how it affects the codebase]

## Risk Assessment
[Identify potential risks and their severity levels]

## Recommendations
[Provide specific suggestions for improvement, testing, or deployment]

Original Code:
{}

Modified Code:
{}

Please provide a structured analysis with clear sections as specified above.",
        original, candidate
    )
}

/// Body of the first "## Recommendations" section, up to the next line
/// starting with "##" or the end of text, trimmed.
pub fn extract_recommendations(narrative: &str) -> Option<String> {
    let start = narrative.find(RECOMMENDATIONS_HEADING)? + RECOMMENDATIONS_HEADING.len();
    let rest = &narrative[start..];
    let body = match rest.find("\n##") {
        Some(end) => &rest[..end],
        None => rest,
    };
    Some(body.trim().to_string())
}
