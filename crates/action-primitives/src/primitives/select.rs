//! Select primitive - Choose a dropdown option

use super::rendered_value;
use crate::{
    conditions::verify_optional,
    errors::ActionError,
    registry::ActionHandler,
    types::{ActionOutcome, ExecutionContext},
};
use async_trait::async_trait;
use botflow_core_types::{FlowStep, StepAction};
use cdp_adapter::Page;
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct SelectAction;

#[async_trait]
impl ActionHandler for SelectAction {
    fn action(&self) -> StepAction {
        StepAction::Select
    }

    async fn execute(
        &self,
        page: &dyn Page,
        step: &FlowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<ActionOutcome, ActionError> {
        if step.value.is_none() {
            return Err(ActionError::MissingField("value"));
        }
        let option = rendered_value(step, ctx)?;
        info!(run_id = %ctx.run_id, step_id = %step.id, option = %option, "Executing select primitive");

        let resolution = ctx.resolve(page, step).await?;
        resolution.element.select_option(&option).await?;

        verify_optional(page, step.post_conditions.as_ref()).await?;
        Ok(ActionOutcome::resolved(&resolution))
    }
}
