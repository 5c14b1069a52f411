//! Navigate primitive - Load a URL

use crate::{
    errors::ActionError,
    registry::ActionHandler,
    template::{render_template, TemplateScope},
    types::{ActionOutcome, ExecutionContext},
};
use async_trait::async_trait;
use botflow_core_types::{FlowStep, StepAction};
use cdp_adapter::Page;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct NavigateAction;

#[async_trait]
impl ActionHandler for NavigateAction {
    fn action(&self) -> StepAction {
        StepAction::Navigate
    }

    async fn execute(
        &self,
        page: &dyn Page,
        step: &FlowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<ActionOutcome, ActionError> {
        let template = step.url.as_deref().ok_or(ActionError::MissingField("url"))?;
        let url = render_template(template, &TemplateScope::of(ctx))?;

        info!(run_id = %ctx.run_id, step_id = %step.id, url = %url, "Executing navigate primitive");
        page.goto(&url, Duration::from_millis(step.timeout_ms)).await?;
        Ok(ActionOutcome::done())
    }
}
