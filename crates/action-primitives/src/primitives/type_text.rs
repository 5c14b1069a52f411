//! Type primitive - Key-by-key input
//!
//! Unlike fill, typing emits key events for every character, which some
//! inputs (masked dates, autocompletes) require.

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
use std::time::Duration;
use tracing::info;

/// Delay between two key presses.
pub const KEY_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Default, Clone, Copy)]
pub struct TypeAction;

#[async_trait]
impl ActionHandler for TypeAction {
    fn action(&self) -> StepAction {
        StepAction::Type
    }

    async fn execute(
        &self,
        page: &dyn Page,
        step: &FlowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<ActionOutcome, ActionError> {
        let value = rendered_value(step, ctx)?;
        info!(run_id = %ctx.run_id, step_id = %step.id, chars = value.chars().count(), "Executing type primitive");

        let resolution = ctx.resolve(page, step).await?;
        resolution.element.click().await?;
        page.type_keys(&value, KEY_DELAY).await?;

        verify_optional(page, step.post_conditions.as_ref()).await?;
        Ok(ActionOutcome::resolved(&resolution))
    }
}
