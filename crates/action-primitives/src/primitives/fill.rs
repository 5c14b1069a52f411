//! Fill primitive - Replace an input's value

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
pub struct FillAction;

#[async_trait]
impl ActionHandler for FillAction {
    fn action(&self) -> StepAction {
        StepAction::Fill
    }

    async fn execute(
        &self,
        page: &dyn Page,
        step: &FlowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<ActionOutcome, ActionError> {
        let value = rendered_value(step, ctx)?;
        info!(run_id = %ctx.run_id, step_id = %step.id, chars = value.chars().count(), "Executing fill primitive");

        let resolution = ctx.resolve(page, step).await?;
        resolution.element.fill(&value).await?;

        verify_optional(page, step.post_conditions.as_ref()).await?;
        Ok(ActionOutcome::resolved(&resolution))
    }
}
