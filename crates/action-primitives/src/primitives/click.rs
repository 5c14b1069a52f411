//! Click primitive - Click element with fallback strategies

use crate::{
    conditions::verify_optional,
    errors::ActionError,
    registry::ActionHandler,
    types::{require_selector, ActionOutcome, ExecutionContext},
};
use async_trait::async_trait;
use botflow_core_types::{FlowStep, StepAction, TargetSelector};
use cdp_adapter::{AdapterError, Page};
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, Copy)]
pub struct ClickAction;

/// Execute click primitive
///
/// Steps:
/// 1. Resolve element via the cascade
/// 2. Scroll it into view and click it
/// 3. On a failed click, retry on the first visible CSS match, then on a
///    button or link named by the target text
/// 4. Verify post-conditions
#[async_trait]
impl ActionHandler for ClickAction {
    fn action(&self) -> StepAction {
        StepAction::Click
    }

    async fn execute(
        &self,
        page: &dyn Page,
        step: &FlowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<ActionOutcome, ActionError> {
        let target = require_selector(step)?;
        info!(run_id = %ctx.run_id, step_id = %step.id, target = %target.describe(), "Executing click primitive");

        let resolution = ctx.resolve(page, step).await?;
        let element = &resolution.element;

        let direct = match element.scroll_into_view().await {
            Ok(()) => element.click().await,
            Err(err) => Err(err),
        };
        if let Err(click_err) = direct {
            warn!(step_id = %step.id, error = %click_err, "Element click failed, trying fallbacks");
            click_fallback(page, target, click_err).await?;
        }

        verify_optional(page, step.post_conditions.as_ref()).await?;
        Ok(ActionOutcome::resolved(&resolution))
    }
}

async fn click_fallback(
    page: &dyn Page,
    target: &TargetSelector,
    original: AdapterError,
) -> Result<(), ActionError> {
    if let Some(css) = target.css.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        for candidate in page.query_css(css).await? {
            if candidate.is_visible().await? && candidate.click().await.is_ok() {
                debug!(css, "Clicked via CSS fallback");
                return Ok(());
            }
        }
    }

    let Some(text) = target
        .text_content
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    else {
        return Err(original.into());
    };
    for role in ["button", "link"] {
        if let Some(candidate) = page.find_by_role(role, text).await?.into_iter().next() {
            debug!(role, text, "Clicking via role fallback");
            candidate.click().await?;
            return Ok(());
        }
    }
    Err(original.into())
}
