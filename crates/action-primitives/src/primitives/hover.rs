//! Hover primitive

use crate::{
    errors::ActionError,
    registry::ActionHandler,
    types::{ActionOutcome, ExecutionContext},
};
use async_trait::async_trait;
use botflow_core_types::{FlowStep, StepAction};
use cdp_adapter::Page;
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct HoverAction;

#[async_trait]
impl ActionHandler for HoverAction {
    fn action(&self) -> StepAction {
        StepAction::Hover
    }

    async fn execute(
        &self,
        page: &dyn Page,
        step: &FlowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<ActionOutcome, ActionError> {
        info!(run_id = %ctx.run_id, step_id = %step.id, "Executing hover primitive");
        let resolution = ctx.resolve(page, step).await?;
        resolution.element.hover().await?;
        Ok(ActionOutcome::resolved(&resolution))
    }
}
