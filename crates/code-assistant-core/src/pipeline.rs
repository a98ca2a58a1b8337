//! Pipeline selection.
//!
//! Turns the three optional user inputs into exactly one [`PipelinePlan`].
//! The plan is a plain value so the priority order can be tested without
//! a transformation service or any session state.
//!
//! | language | instruction | action | plan |
//! |----------|-------------|--------|------|
//! | yes | yes | yes | [`PipelinePlan::ConvertModifyAct`] |
//! | yes | yes | no  | [`PipelinePlan::ConvertModify`] |
//! | yes | no  | yes | [`PipelinePlan::ConvertAct`] |
//! | yes | no  | no  | [`PipelinePlan::Direct`] (convert) |
//! | no  | yes | no  | [`PipelinePlan::Direct`] (modify) |
//! | no  | yes | yes | [`PipelinePlan::ActOnly`], instruction ignored |
//! | no  | no  | yes | [`PipelinePlan::ActOnly`] |
//! | no  | no  | no  | [`AssistError::MissingInput`] |

use serde::{Deserialize, Serialize};

use crate::actions::{is_action_selected, AiAction};
use crate::error::{AssistError, Result};
use crate::models::OutputSlot;

/// Raw user selections for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSelection {
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub target_language: String,
    #[serde(default)]
    pub ai_action: String,
}

impl PipelineSelection {
    pub fn new(
        instruction: impl Into<String>,
        target_language: impl Into<String>,
        ai_action: impl Into<String>,
    ) -> Self {
        Self {
            instruction: instruction.into(),
            target_language: target_language.into(),
            ai_action: ai_action.into(),
        }
    }

    pub fn has_instruction(&self) -> bool {
        !self.instruction.trim().is_empty()
    }

    /// Any non-empty language counts; it is passed through untrimmed.
    pub fn has_target_language(&self) -> bool {
        !self.target_language.is_empty()
    }

    pub fn has_ai_action(&self) -> bool {
        is_action_selected(&self.ai_action)
    }

    /// Picks the pipeline for these selections.
    pub fn plan(&self) -> Result<PipelinePlan> {
        let language = self.target_language.clone();
        let instruction = self.instruction.clone();
        let action = || RequestedAction::from_name(&self.ai_action);

        let plan = match (
            self.has_target_language(),
            self.has_instruction(),
            self.has_ai_action(),
        ) {
            (true, true, true) => PipelinePlan::ConvertModifyAct {
                language,
                instruction,
                action: action(),
            },
            (true, true, false) => PipelinePlan::ConvertModify {
                language,
                instruction,
            },
            (true, false, true) => PipelinePlan::ConvertAct {
                language,
                action: action(),
            },
            (true, false, false) => PipelinePlan::Direct(DirectCall::Convert { language }),
            (false, true, false) => PipelinePlan::Direct(DirectCall::Modify { instruction }),
            (false, true, true) => {
                tracing::warn!(
                    action = %self.ai_action,
                    "modification instruction ignored: an AI action without a target language runs on the original code"
                );
                PipelinePlan::ActOnly { action: action() }
            }
            (false, false, true) => PipelinePlan::ActOnly { action: action() },
            (false, false, false) => return Err(AssistError::MissingInput),
        };
        Ok(plan)
    }
}

/// The AI action named by the user, which may have no prompt mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedAction {
    Known(AiAction),
    Unmapped(String),
}

impl RequestedAction {
    pub fn from_name(name: &str) -> Self {
        match AiAction::from_name(name) {
            Some(action) => RequestedAction::Known(action),
            None => RequestedAction::Unmapped(name.to_string()),
        }
    }

    pub fn known(&self) -> Option<AiAction> {
        match self {
            RequestedAction::Known(action) => Some(*action),
            RequestedAction::Unmapped(_) => None,
        }
    }
}

/// A single service call with exactly one of the two fields set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectCall {
    Convert { language: String },
    Modify { instruction: String },
}

/// One stage of a pipeline, i.e. one service round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Convert,
    Modify,
    Act,
    Direct,
}

/// Pipeline shape without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineShape {
    ConvertModifyAct,
    ConvertModify,
    ConvertAct,
    Direct,
    ActOnly,
}

/// The pipeline chosen for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelinePlan {
    ConvertModifyAct {
        language: String,
        instruction: String,
        action: RequestedAction,
    },
    ConvertModify {
        language: String,
        instruction: String,
    },
    ConvertAct {
        language: String,
        action: RequestedAction,
    },
    Direct(DirectCall),
    ActOnly {
        action: RequestedAction,
    },
}

impl PipelinePlan {
    pub fn shape(&self) -> PipelineShape {
        match self {
            PipelinePlan::ConvertModifyAct { .. } => PipelineShape::ConvertModifyAct,
            PipelinePlan::ConvertModify { .. } => PipelineShape::ConvertModify,
            PipelinePlan::ConvertAct { .. } => PipelineShape::ConvertAct,
            PipelinePlan::Direct(_) => PipelineShape::Direct,
            PipelinePlan::ActOnly { .. } => PipelineShape::ActOnly,
        }
    }

    /// Service calls in execution order.
    pub fn stages(&self) -> Vec<StageKind> {
        match self {
            PipelinePlan::ConvertModifyAct { .. } => {
                vec![StageKind::Convert, StageKind::Modify, StageKind::Act]
            }
            PipelinePlan::ConvertModify { .. } => vec![StageKind::Convert, StageKind::Modify],
            PipelinePlan::ConvertAct { .. } => vec![StageKind::Convert, StageKind::Act],
            PipelinePlan::Direct(_) => vec![StageKind::Direct],
            PipelinePlan::ActOnly { .. } => vec![StageKind::Act],
        }
    }

    /// The slot family this plan writes to on success.
    ///
    /// A direct call whose expected field comes back empty writes nothing.
    pub fn output_slot(&self) -> OutputSlot {
        match self {
            PipelinePlan::ConvertModifyAct { .. }
            | PipelinePlan::ConvertAct { .. }
            | PipelinePlan::ActOnly { .. } => OutputSlot::AiAction,
            PipelinePlan::ConvertModify { .. } => OutputSlot::Modification,
            PipelinePlan::Direct(DirectCall::Convert { .. }) => OutputSlot::Conversion,
            PipelinePlan::Direct(DirectCall::Modify { .. }) => OutputSlot::Modification,
        }
    }

    /// The requested AI action, if the plan has an act stage.
    pub fn action(&self) -> Option<&RequestedAction> {
        match self {
            PipelinePlan::ConvertModifyAct { action, .. }
            | PipelinePlan::ConvertAct { action, .. }
            | PipelinePlan::ActOnly { action } => Some(action),
            PipelinePlan::ConvertModify { .. } | PipelinePlan::Direct(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTION: &str = "Refactor Structure";

    fn plan(instruction: &str, language: &str, action: &str) -> Result<PipelinePlan> {
        PipelineSelection::new(instruction, language, action).plan()
    }

    #[test]
    fn nothing_selected_is_missing_input() {
        assert_eq!(plan("", "", ""), Err(AssistError::MissingInput));
        assert_eq!(plan("   \n", "", "Select action..."), Err(AssistError::MissingInput));
    }

    #[test]
    fn every_combination_maps_to_one_shape() {
        let cases = [
            (("fix", "rust", ACTION), PipelineShape::ConvertModifyAct, OutputSlot::AiAction),
            (("fix", "rust", ""), PipelineShape::ConvertModify, OutputSlot::Modification),
            (("", "rust", ACTION), PipelineShape::ConvertAct, OutputSlot::AiAction),
            (("", "rust", ""), PipelineShape::Direct, OutputSlot::Conversion),
            (("fix", "", ""), PipelineShape::Direct, OutputSlot::Modification),
            (("fix", "", ACTION), PipelineShape::ActOnly, OutputSlot::AiAction),
            (("", "", ACTION), PipelineShape::ActOnly, OutputSlot::AiAction),
        ];
        for ((instruction, language, action), shape, slot) in cases {
            let p = plan(instruction, language, action).unwrap();
            assert_eq!(p.shape(), shape, "inputs {:?}", (instruction, language, action));
            assert_eq!(p.output_slot(), slot, "inputs {:?}", (instruction, language, action));
        }
    }

    #[test]
    fn stages_follow_priority_order() {
        let p = plan("fix", "rust", ACTION).unwrap();
        assert_eq!(
            p.stages(),
            vec![StageKind::Convert, StageKind::Modify, StageKind::Act]
        );
        assert_eq!(plan("", "", ACTION).unwrap().stages(), vec![StageKind::Act]);
        assert_eq!(plan("fix", "", "").unwrap().stages(), vec![StageKind::Direct]);
    }

    #[test]
    fn unknown_action_still_selects_a_shape() {
        let p = plan("", "", "Make It Faster").unwrap();
        assert_eq!(p.shape(), PipelineShape::ActOnly);
        assert_eq!(
            p.action(),
            Some(&RequestedAction::Unmapped("Make It Faster".to_string()))
        );
    }

    #[test]
    fn language_and_instruction_are_passed_verbatim() {
        let p = plan("  add tests  ", "go", "").unwrap();
        assert_eq!(
            p,
            PipelinePlan::ConvertModify {
                language: "go".to_string(),
                instruction: "  add tests  ".to_string(),
            }
        );
    }

    #[test]
    fn only_instruction_is_trimmed_for_presence() {
        // A blank instruction is no instruction.
        assert_eq!(plan("  \n", "", ""), Err(AssistError::MissingInput));
        // A whitespace language is still a selection and is sent as given.
        assert_eq!(
            plan("", " ", "").unwrap(),
            PipelinePlan::Direct(DirectCall::Convert {
                language: " ".to_string()
            })
        );
    }
}
