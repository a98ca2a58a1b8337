//! Error taxonomy for the Code Assistant.
//!
//! Every variant is non-fatal to a session: callers report it and keep the
//! session interactive. Nothing here is retried automatically.

/// Errors raised by the orchestrator, the impact heuristic, and the
/// collaborator services.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssistError {
    /// No instruction, target language, or AI action was selected.
    #[error(
        "please provide a modification instruction, select a target language, or choose an AI action"
    )]
    MissingInput,

    /// An operation needs a loaded page but none is selected.
    #[error("please select a space and page with code content")]
    NoDocument,

    /// Another operation on the same session has not settled yet.
    #[error("another operation is still in progress")]
    Busy,

    /// A pipeline stage call to the transformation service failed.
    #[error("failed to process code: {0}")]
    TransformService(String),

    /// Impact analysis was requested with no detected change.
    #[error("no changes detected to analyze impact")]
    NoChange,

    /// The narrative impact-analysis call failed.
    #[error("failed to analyze impact: {0}")]
    ImpactService(String),

    /// Listing spaces or pages failed.
    #[error("directory lookup failed: {0}")]
    Directory(String),

    /// The export service failed to render the content.
    #[error("failed to export file: {0}")]
    Export(String),

    /// Writing content back into the host document failed.
    #[error("failed to save to Confluence: {0}")]
    Persistence(String),

    /// A save was requested but there is no content to write.
    #[error("there is no content to save")]
    NothingToSave,
}

impl AssistError {
    /// Returns `true` for errors the user fixes by changing their input
    /// rather than by retrying.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            AssistError::MissingInput
                | AssistError::NoDocument
                | AssistError::NoChange
                | AssistError::NothingToSave
        )
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, AssistError>;
