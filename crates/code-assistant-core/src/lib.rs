//! # Code Assistant Core
//!
//! Runtime-free logic for the Code Assistant: the data model, the AI action
//! catalog, pipeline planning and orchestration, the impact heuristic, and
//! the collaborator traits the shell crate implements over HTTP.
//!
//! This crate has no tokio, HTTP client, or filesystem dependencies.
//!
//! ```text
//!  selections ──▶ PipelineSelection::plan() ──▶ orchestrator::execute()
//!                                                   │  1..3 sequential
//!                                                   ▼  transform() calls
//!                                             PipelineOutputs
//!                                                   │
//!  original + latest output ──▶ impact::analyze() ──▶ ImpactReport
//! ```

pub mod actions;
pub mod error;
pub mod impact;
pub mod memory;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod service;

pub use actions::{AiAction, NO_ACTION_SENTINEL};
pub use error::{AssistError, Result};
pub use impact::{DiffLine, ImpactMetrics, ImpactReport, RiskAssessment, RiskLevel};
pub use models::{
    ExportFormat, OutputSlot, PipelineOutputs, SourceDocument, Space, TransformRequest,
    TransformResult, TARGET_LANGUAGES,
};
pub use pipeline::{PipelinePlan, PipelineSelection, PipelineShape, StageKind};
pub use service::{
    Backend, DirectoryService, ExportService, PersistenceService, TransformService,
};
