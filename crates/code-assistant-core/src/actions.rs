//! The AI action catalog.
//!
//! An AI action is a named prompt template that wraps the code it is
//! applied to. Names are matched exactly; an unknown name has no prompt
//! and the orchestrator treats it as a no-op.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder shown at the top of the action menu. Never a real action.
pub const NO_ACTION_SENTINEL: &str = "Select action...";

/// Canned code transformations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiAction {
    #[serde(rename = "Optimize Performance")]
    OptimizePerformance,
    #[serde(rename = "Generate Documentation")]
    GenerateDocumentation,
    #[serde(rename = "Refactor Structure")]
    RefactorStructure,
    #[serde(rename = "Identify dead code")]
    IdentifyDeadCode,
    #[serde(rename = "Add Logging Statements")]
    AddLoggingStatements,
    /// Available by name but not offered in the menu.
    #[serde(rename = "Summarize Code")]
    SummarizeCode,
}

impl AiAction {
    pub const ALL: [AiAction; 6] = [
        AiAction::OptimizePerformance,
        AiAction::GenerateDocumentation,
        AiAction::RefactorStructure,
        AiAction::IdentifyDeadCode,
        AiAction::AddLoggingStatements,
        AiAction::SummarizeCode,
    ];

    /// Actions offered in the menu, in display order.
    pub const MENU: [AiAction; 5] = [
        AiAction::OptimizePerformance,
        AiAction::GenerateDocumentation,
        AiAction::RefactorStructure,
        AiAction::IdentifyDeadCode,
        AiAction::AddLoggingStatements,
    ];

    /// Looks up an action by its display name.
    pub fn from_name(name: &str) -> Option<AiAction> {
        AiAction::ALL.into_iter().find(|a| a.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AiAction::OptimizePerformance => "Optimize Performance",
            AiAction::GenerateDocumentation => "Generate Documentation",
            AiAction::RefactorStructure => "Refactor Structure",
            AiAction::IdentifyDeadCode => "Identify dead code",
            AiAction::AddLoggingStatements => "Add Logging Statements",
            AiAction::SummarizeCode => "Summarize Code",
        }
    }

    /// Builds the instruction sent to the transformation service, with
    /// `code` embedded verbatim.
    pub fn prompt(&self, code: &str) -> String {
        let lead = match self {
            AiAction::SummarizeCode => {
                "Summarize the following code in clear and concise language:"
            }
            AiAction::OptimizePerformance => {
                "Optimize the following code for performance without changing its functionality, return only the updated code:"
            }
            AiAction::GenerateDocumentation => {
                "Generate inline documentation and function-level comments for the following code, return only the updated code by commenting the each line of the code.:"
            }
            AiAction::RefactorStructure => {
                "Refactor the following code to improve structure, readability, and modularity, return only the updated code:"
            }
            AiAction::IdentifyDeadCode => {
                "Analyze the following code for any unsued code or dead code, return only the updated code by removing the dead code:"
            }
            AiAction::AddLoggingStatements => {
                "Add appropriate logging statements to the following code for better traceability and debugging. Return only the updated code:"
            }
        };
        format!("{}\n\n{}", lead, code)
    }
}

impl fmt::Display for AiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether the raw menu value counts as a selected action.
///
/// Any non-empty value other than the sentinel counts, including names
/// with no prompt mapping.
pub fn is_action_selected(raw: &str) -> bool {
    !raw.is_empty() && raw != NO_ACTION_SENTINEL
}
