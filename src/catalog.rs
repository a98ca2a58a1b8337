//! Static choices offered to a user: AI actions, target languages, and
//! export formats.

use code_assistant_core::{AiAction, ExportFormat, NO_ACTION_SENTINEL, TARGET_LANGUAGES};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FormatChoice {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    /// Placeholder entry meaning "no action".
    pub no_action: &'static str,
    pub actions: Vec<&'static str>,
    pub languages: Vec<&'static str>,
    pub formats: Vec<FormatChoice>,
}

/// The menu as shown to users. `Summarize Code` is accepted by name but
/// not listed.
pub fn catalog() -> Catalog {
    Catalog {
        no_action: NO_ACTION_SENTINEL,
        actions: AiAction::MENU.iter().map(AiAction::name).collect(),
        languages: TARGET_LANGUAGES.to_vec(),
        formats: ExportFormat::ALL
            .iter()
            .map(|f| FormatChoice {
                value: f.as_str(),
                label: f.label(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_lists_five_actions_and_four_formats() {
        let c = catalog();
        assert_eq!(c.actions.len(), 5);
        assert!(!c.actions.contains(&"Summarize Code"));
        assert_eq!(c.formats.len(), 4);
        assert_eq!(c.formats[0].value, "markdown");
        assert_eq!(c.no_action, "Select action...");
    }
}
