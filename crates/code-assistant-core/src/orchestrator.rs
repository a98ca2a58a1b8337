//! Transformation orchestrator.
//!
//! Executes a [`PipelinePlan`] against a [`TransformService`], chaining each
//! stage's text into the next. Stages run strictly one after another and
//! only the final stage writes to [`PipelineOutputs`], so a failure part way
//! through never surfaces an intermediate result.

use crate::actions::AiAction;
use crate::error::{AssistError, Result};
use crate::models::{
    OutputSlot, PipelineOutputs, SourceDocument, TransformRequest, TransformResult,
};
use crate::pipeline::{DirectCall, PipelinePlan, PipelineSelection};
use crate::service::TransformService;

const MODIFICATION_DONE: &str = "Modification completed successfully.";
const ACTION_DONE: &str = "AI action completed successfully.";

/// Plans and runs one pipeline for `base`.
///
/// Returns [`AssistError::MissingInput`] without calling the service when
/// nothing is selected. An AI action with no prompt mapping yields empty
/// outputs and no service call. Any failed stage aborts the run with
/// [`AssistError::TransformService`].
pub async fn run<S: TransformService + ?Sized>(
    service: &S,
    base: &SourceDocument,
    selection: &PipelineSelection,
) -> Result<PipelineOutputs> {
    let plan = selection.plan()?;
    execute(service, base, &plan).await
}

/// Runs an already-chosen plan.
pub async fn execute<S: TransformService + ?Sized>(
    service: &S,
    base: &SourceDocument,
    plan: &PipelinePlan,
) -> Result<PipelineOutputs> {
    let action = match plan.action() {
        Some(requested) => match requested.known() {
            Some(action) => Some(action),
            None => {
                tracing::debug!(?requested, "no prompt for AI action; nothing to run");
                return Ok(PipelineOutputs::default());
            }
        },
        None => None,
    };

    tracing::debug!(shape = ?plan.shape(), stages = ?plan.stages(), "running pipeline");
    let stages = Stages { service, base };

    let outputs = match (plan, action) {
        (
            PipelinePlan::ConvertModifyAct {
                language,
                instruction,
                ..
            },
            Some(action),
        ) => {
            let converted = stages.convert(language).await?;
            let modified = stages.modify(instruction, &converted).await?;
            let acted = stages.act(action, &modified).await?;
            PipelineOutputs::with(OutputSlot::AiAction, acted)
        }
        (
            PipelinePlan::ConvertModify {
                language,
                instruction,
            },
            _,
        ) => {
            let converted = stages.convert(language).await?;
            let modified = stages.modify(instruction, &converted).await?;
            PipelineOutputs::with(OutputSlot::Modification, modified)
        }
        (PipelinePlan::ConvertAct { language, .. }, Some(action)) => {
            let converted = stages.convert(language).await?;
            let acted = stages.act(action, &converted).await?;
            PipelineOutputs::with(OutputSlot::AiAction, acted)
        }
        (PipelinePlan::ActOnly { .. }, Some(action)) => {
            let acted = stages.act(action, &base.original_code).await?;
            PipelineOutputs::with(OutputSlot::AiAction, acted)
        }
        (PipelinePlan::Direct(call), _) => stages.direct(call).await?,
        // Plans with an act stage always resolve an action above.
        (_, None) => PipelineOutputs::default(),
    };

    tracing::debug!(slots = ?outputs.populated(), "pipeline finished");
    Ok(outputs)
}

struct Stages<'a, S: ?Sized> {
    service: &'a S,
    base: &'a SourceDocument,
}

impl<S: TransformService + ?Sized> Stages<'_, S> {
    async fn call(&self, instruction: String, language: &str) -> Result<TransformResult> {
        let request = TransformRequest::new(
            &self.base.space_key,
            &self.base.page_title,
            instruction,
            language,
        );
        self.service
            .transform(&request)
            .await
            .map_err(as_transform_error)
    }

    async fn convert(&self, language: &str) -> Result<String> {
        tracing::debug!(%language, "stage: convert");
        let result = self.call(String::new(), language).await?;
        Ok(result.best_text().unwrap_or_default().to_string())
    }

    async fn modify(&self, instruction: &str, code: &str) -> Result<String> {
        tracing::debug!("stage: modify");
        let result = self.call(format!("{}\n\n{}", instruction, code), "").await?;
        Ok(result.best_text().unwrap_or(MODIFICATION_DONE).to_string())
    }

    async fn act(&self, action: AiAction, code: &str) -> Result<String> {
        tracing::debug!(%action, "stage: act");
        let result = self.call(action.prompt(code), "").await?;
        Ok(result.best_text().unwrap_or(ACTION_DONE).to_string())
    }

    async fn direct(&self, call: &DirectCall) -> Result<PipelineOutputs> {
        let (instruction, language) = match call {
            DirectCall::Convert { language } => (String::new(), language.as_str()),
            DirectCall::Modify { instruction } => (instruction.clone(), ""),
        };
        tracing::debug!(?call, "stage: direct");
        let result = self.call(instruction, language).await?;

        let (slot, text) = match call {
            DirectCall::Convert { .. } => (OutputSlot::Conversion, result.converted()),
            DirectCall::Modify { .. } => (OutputSlot::Modification, result.modified()),
        };
        let outputs = match text {
            Some(text) => PipelineOutputs::with(slot, text),
            None => {
                tracing::debug!(?slot, "direct call returned nothing for its slot");
                PipelineOutputs::default()
            }
        };
        Ok(outputs)
    }
}

fn as_transform_error(err: AssistError) -> AssistError {
    match err {
        AssistError::TransformService(_) => err,
        other => AssistError::TransformService(other.to_string()),
    }
}
