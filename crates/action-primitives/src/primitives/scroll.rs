//! Scroll primitive - Scroll an element into view or the page by an offset

use crate::{
    errors::ActionError,
    registry::ActionHandler,
    types::{ActionOutcome, ExecutionContext},
};
use async_trait::async_trait;
use botflow_core_types::{FlowStep, StepAction};
use cdp_adapter::Page;
use tracing::info;

/// Vertical offset used when a page scroll gives no `value`.
pub const DEFAULT_SCROLL_PX: i64 = 600;

#[derive(Debug, Default, Clone, Copy)]
pub struct ScrollAction;

#[async_trait]
impl ActionHandler for ScrollAction {
    fn action(&self) -> StepAction {
        StepAction::Scroll
    }

    async fn execute(
        &self,
        page: &dyn Page,
        step: &FlowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<ActionOutcome, ActionError> {
        if step.selector().is_some() {
            info!(run_id = %ctx.run_id, step_id = %step.id, "Executing scroll-into-view primitive");
            let resolution = ctx.resolve(page, step).await?;
            resolution.element.scroll_into_view().await?;
            return Ok(ActionOutcome::resolved(&resolution));
        }

        let dy = match step.value.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw
                .parse::<i64>()
                .map_err(|_| ActionError::InvalidValue(format!("scroll offset '{raw}' is not a number")))?,
            _ => DEFAULT_SCROLL_PX,
        };
        info!(run_id = %ctx.run_id, step_id = %step.id, dy, "Executing page scroll primitive");
        page.scroll_by(0, dy).await?;
        Ok(ActionOutcome::done())
    }
}
