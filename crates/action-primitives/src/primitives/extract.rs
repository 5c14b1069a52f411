//! Extract primitive - Read an element's text into the run

use crate::{
    errors::ActionError,
    registry::ActionHandler,
    types::{ActionOutcome, ExecutionContext},
};
use async_trait::async_trait;
use botflow_core_types::{FlowStep, StepAction};
use cdp_adapter::Page;
use serde_json::Value;
use tracing::{debug, info};

#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractAction;

#[async_trait]
impl ActionHandler for ExtractAction {
    fn action(&self) -> StepAction {
        StepAction::Extract
    }

    async fn execute(
        &self,
        page: &dyn Page,
        step: &FlowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<ActionOutcome, ActionError> {
        info!(run_id = %ctx.run_id, step_id = %step.id, "Executing extract primitive");

        let resolution = ctx.resolve(page, step).await?;
        let text = resolution
            .element
            .text_content()
            .await?
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        let value = Value::String(text);

        if let Some(key) = &step.save_as {
            debug!(step_id = %step.id, key = %key, "Saving extracted value");
            ctx.extracted.insert(key.clone(), value.clone());
        }
        Ok(ActionOutcome::resolved(&resolution).with_extracted(value))
    }
}
