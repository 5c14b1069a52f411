//! Wait primitive - Element, URL or fixed delay

use crate::{
    errors::ActionError,
    registry::ActionHandler,
    types::{ActionOutcome, ExecutionContext},
    waiting::{wait_for_any, wait_for_url},
};
use async_trait::async_trait;
use botflow_core_types::{FlowStep, StepAction};
use cdp_adapter::Page;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct WaitAction;

/// Execute wait primitive
///
/// - With a selector target: wait for any of its css / xpath / exact text
///   lookups to match (falls back to `url` when the target has none)
/// - With only `url`: wait for the page URL to match
/// - Otherwise: sleep `value` milliseconds, or `timeout_ms` when unset
#[async_trait]
impl ActionHandler for WaitAction {
    fn action(&self) -> StepAction {
        StepAction::Wait
    }

    async fn execute(
        &self,
        page: &dyn Page,
        step: &FlowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<ActionOutcome, ActionError> {
        info!(run_id = %ctx.run_id, step_id = %step.id, "Executing wait primitive");
        let timeout = Duration::from_millis(step.timeout_ms);

        if let Some(target) = step.selector() {
            if wait_for_any(page, target, timeout).await?.is_some() {
                return Ok(ActionOutcome::done());
            }
            if let Some(url) = &step.url {
                wait_for_url(page, url, timeout).await?;
            }
            return Ok(ActionOutcome::done());
        }

        if let Some(url) = &step.url {
            wait_for_url(page, url, timeout).await?;
            return Ok(ActionOutcome::done());
        }

        let delay_ms = match step.value.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw
                .parse::<u64>()
                .map_err(|_| ActionError::InvalidValue(format!("wait delay '{raw}' is not milliseconds")))?,
            _ => step.timeout_ms,
        };
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Ok(ActionOutcome::done())
    }
}
