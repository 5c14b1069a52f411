//! Screenshot primitive - Capture the page to disk

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
pub struct ScreenshotAction;

#[async_trait]
impl ActionHandler for ScreenshotAction {
    fn action(&self) -> StepAction {
        StepAction::Screenshot
    }

    async fn execute(
        &self,
        page: &dyn Page,
        step: &FlowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<ActionOutcome, ActionError> {
        let path = ctx.screenshots_dir.join(format!("{}.png", step.id));
        info!(run_id = %ctx.run_id, step_id = %step.id, path = %path.display(), "Executing screenshot primitive");

        let png = page.screenshot().await?;
        tokio::fs::create_dir_all(&ctx.screenshots_dir).await?;
        tokio::fs::write(&path, png).await?;
        Ok(ActionOutcome::done().with_screenshot(path.display().to_string()))
    }
}
