//! Flow runner implementation
//!
//! Steps move `pending -> running -> {success | failed | skipped}`. A failed
//! optional step is downgraded to skipped and the run continues; any other
//! failure stops the run. Returns are evaluated whatever the final status.

use crate::errors::FlowError;
use crate::params::resolve_params;
use action_locator::{ElementResolver, ResolverCascade};
use action_primitives::{render_value, ActionRegistry, ExecutionContext, TemplateScope};
use botflow_core_types::{Flow, FlowStep, RunResult, RunStatus, StepResult};
use cdp_adapter::Page;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Executes flows step by step against one page.
#[derive(Clone)]
pub struct FlowRunner {
    registry: Arc<ActionRegistry>,
    resolver: Arc<dyn ElementResolver>,
    screenshots_dir: PathBuf,
}

impl FlowRunner {
    /// Create a runner dispatching through `registry`.
    pub fn new(registry: ActionRegistry, resolver: Arc<dyn ElementResolver>) -> Self {
        Self {
            registry: Arc::new(registry),
            resolver,
            screenshots_dir: PathBuf::from("screenshots"),
        }
    }

    pub fn with_screenshots_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshots_dir = dir.into();
        self
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> Arc<dyn ElementResolver> {
        Arc::clone(&self.resolver)
    }

    fn context(&self, params: Map<String, Value>) -> ExecutionContext {
        ExecutionContext::new(params, Arc::clone(&self.resolver))
            .with_screenshots_dir(self.screenshots_dir.clone())
    }

    /// Run every step of `flow`.
    ///
    /// Only validation problems are errors; step failures are reported in
    /// the returned [`RunResult`].
    pub async fn run(
        &self,
        page: &dyn Page,
        flow: &Flow,
        params: Map<String, Value>,
    ) -> Result<RunResult, FlowError> {
        flow.validate()?;
        let params = resolve_params(flow, params)?;

        let started_at = Utc::now();
        let clock = Instant::now();
        let mut ctx = self.context(params);
        info!(
            flow_id = %flow.flow_id,
            run_id = %ctx.run_id,
            steps = flow.steps.len(),
            "Starting flow"
        );

        let mut step_results = Vec::with_capacity(flow.steps.len());
        for (index, step) in flow.steps.iter().enumerate() {
            debug!(
                flow_id = %flow.flow_id,
                step_id = %step.id,
                action = %step.action,
                "Running step {}/{}",
                index + 1,
                flow.steps.len()
            );
            let result = self.execute_step(page, step, &mut ctx).await;

            if !result.is_failed() {
                step_results.push(result);
                continue;
            }
            if step.optional {
                warn!(
                    flow_id = %flow.flow_id,
                    step_id = %step.id,
                    error = result.error.as_deref().unwrap_or_default(),
                    "Optional step failed, skipping"
                );
                step_results.push(result.into_skipped());
                continue;
            }
            warn!(
                flow_id = %flow.flow_id,
                step_id = %step.id,
                error = result.error.as_deref().unwrap_or_default(),
                "Step failed, stopping flow"
            );
            step_results.push(result);
            break;
        }

        let returns = build_returns(flow, &ctx);
        let status = RunStatus::from_steps(&step_results);
        let result = RunResult {
            flow_id: flow.flow_id.clone(),
            status,
            started_at,
            finished_at: Utc::now(),
            duration_ms: elapsed_ms(clock),
            step_results,
            returns,
            heals_triggered: 0,
        };
        info!(
            flow_id = %flow.flow_id,
            status = status.as_str(),
            duration_ms = result.duration_ms,
            "Flow finished"
        );
        Ok(result)
    }

    /// Run a single step in isolation, for debugging.
    ///
    /// Parameters are passed through as given; the flow's declarations are
    /// not enforced.
    pub async fn run_step(
        &self,
        page: &dyn Page,
        flow: &Flow,
        step_id: &str,
        params: Map<String, Value>,
    ) -> Result<StepResult, FlowError> {
        let step = flow.step(step_id).ok_or_else(|| FlowError::StepNotFound {
            flow_id: flow.flow_id.clone(),
            step_id: step_id.to_string(),
        })?;
        let mut ctx = self.context(params);
        Ok(self.execute_step(page, step, &mut ctx).await)
    }

    async fn execute_step(
        &self,
        page: &dyn Page,
        step: &FlowStep,
        ctx: &mut ExecutionContext,
    ) -> StepResult {
        let clock = Instant::now();
        let budget = Duration::from_millis(step.timeout_ms);

        match timeout(budget, self.registry.execute(page, step, ctx)).await {
            Err(_) => StepResult::failed(
                &step.id,
                step.timeout_ms as f64,
                format!("Step timed out after {}ms", step.timeout_ms),
            ),
            Ok(Err(err)) => {
                StepResult::failed(&step.id, elapsed_ms(clock), err.with_step_id(&step.id).to_string())
            }
            Ok(Ok(outcome)) => StepResult::success(&step.id, elapsed_ms(clock))
                .with_strategy(outcome.resolution_strategy)
                .with_extracted(outcome.extracted_value)
                .with_screenshot(outcome.screenshot_path),
        }
    }
}

impl Default for FlowRunner {
    fn default() -> Self {
        Self::new(ActionRegistry::with_defaults(), Arc::new(ResolverCascade::default()))
    }
}

/// Evaluate `returns_mapping` against the run's params and extracted values.
///
/// A reference to a missing variable yields `null`.
fn build_returns(flow: &Flow, ctx: &ExecutionContext) -> BTreeMap<String, Value> {
    let scope = TemplateScope::of(ctx);
    flow.returns_mapping
        .iter()
        .map(|(name, template)| {
            let value = render_value(template, &scope).unwrap_or_else(|err| {
                warn!(flow_id = %flow.flow_id, key = %name, error = %err, "Return value unavailable");
                Value::Null
            });
            (name.clone(), value)
        })
        .collect()
}

fn elapsed_ms(clock: Instant) -> f64 {
    clock.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_locator::CascadeConfig;
    use action_primitives::{ActionError, ActionHandler, ActionOutcome};
    use async_trait::async_trait;
    use botflow_core_types::{StepAction, StepStatus, TargetSelector};
    use cdp_adapter::fixture::{FixtureElement, FixturePage};
    use serde_json::json;

    fn runner() -> FlowRunner {
        let resolver = ResolverCascade::new(CascadeConfig {
            strategy_timeout: Duration::from_millis(200),
        });
        FlowRunner::new(ActionRegistry::with_defaults(), Arc::new(resolver))
    }

    fn page() -> FixturePage {
        FixturePage::new()
            .with_element(FixtureElement::new("user").css("#user"))
            .with_element(FixtureElement::new("balance").css(".balance").text(" 42.00 "))
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    struct Stall;

    #[async_trait]
    impl ActionHandler for Stall {
        fn action(&self) -> StepAction {
            StepAction::Hover
        }

        async fn execute(
            &self,
            _page: &dyn Page,
            _step: &FlowStep,
            _ctx: &mut ExecutionContext,
        ) -> Result<ActionOutcome, ActionError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(ActionOutcome::done())
        }
    }

    #[tokio::test]
    async fn test_successful_run_builds_returns() {
        let mut flow = Flow::new(
            "balance",
            "example.com",
            vec![
                FlowStep::new("open", StepAction::Navigate).with_url("https://example.com/{{params.path}}"),
                FlowStep::new("user", StepAction::Fill)
                    .with_target(TargetSelector::css("#user"))
                    .with_value("{{params.user}}"),
                FlowStep::new("read", StepAction::Extract)
                    .with_target(TargetSelector::css(".balance"))
                    .with_save_as("balance"),
            ],
        );
        flow.returns_mapping.insert("balance".into(), json!("{{extracted.balance}}"));
        flow.returns_mapping.insert("who".into(), json!("user {{params.user}}"));
        flow.returns_mapping.insert("fixed".into(), json!(7));
        flow.returns_mapping.insert("gone".into(), json!("{{extracted.nothing}}"));

        let page = page();
        let result = runner()
            .run(&page, &flow, params(json!({"path": "account", "user": "ada"})))
            .await
            .unwrap();

        assert_eq!(result.status, RunStatus::Success);
        assert_eq!(result.step_results.len(), 3);
        assert_eq!(result.step_results[1].resolution_strategy.as_deref(), Some("css"));
        assert_eq!(result.returns["balance"], json!("42.00"));
        assert_eq!(result.returns["who"], json!("user ada"));
        assert_eq!(result.returns["fixed"], json!(7));
        assert_eq!(result.returns["gone"], Value::Null);
        assert_eq!(page.url(), "https://example.com/account");
        assert!(result.finished_at >= result.started_at);
    }

    #[tokio::test]
    async fn test_optional_failure_gives_partial() {
        let flow = Flow::new(
            "promo",
            "example.com",
            vec![
                FlowStep::new("a", StepAction::Navigate).with_url("https://example.com"),
                FlowStep::new("b", StepAction::Click)
                    .with_target(TargetSelector::css("#close-popup"))
                    .optional(),
                FlowStep::new("c", StepAction::Fill)
                    .with_target(TargetSelector::css("#user"))
                    .with_value("x"),
            ],
        );
        let result = runner().run(&page(), &flow, Map::new()).await.unwrap();
        let statuses: Vec<StepStatus> = result.step_results.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![StepStatus::Success, StepStatus::Skipped, StepStatus::Success]);
        assert_eq!(result.status, RunStatus::Partial);
        let skipped = &result.step_results[1];
        assert_eq!(
            skipped.error.as_deref(),
            Some("Cannot resolve element for step 'b'. Tried: css")
        );
    }

    #[tokio::test]
    async fn test_required_failure_stops_run() {
        let flow = Flow::new(
            "login",
            "example.com",
            vec![
                FlowStep::new("a", StepAction::Navigate).with_url("https://example.com"),
                FlowStep::new("b", StepAction::Click).with_target(TargetSelector::css("#gone")),
                FlowStep::new("c", StepAction::Fill)
                    .with_target(TargetSelector::css("#user"))
                    .with_value("x"),
            ],
        );
        let page = page();
        let result = runner().run(&page, &flow, Map::new()).await.unwrap();
        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.step_results.len(), 2);
        assert_eq!(result.last_failed_step().unwrap().step_id, "b");
        assert!(!page.actions().iter().any(|a| a.starts_with("fill")));
    }

    #[tokio::test]
    async fn test_step_timeout_is_reported() {
        let mut registry = ActionRegistry::with_defaults();
        registry.register(Arc::new(Stall));
        let runner = FlowRunner::new(registry, Arc::new(ResolverCascade::default()));
        let flow = Flow::new(
            "slow",
            "example.com",
            vec![FlowStep::new("h", StepAction::Hover).with_timeout_ms(50)],
        );
        let result = runner.run(&page(), &flow, Map::new()).await.unwrap();
        let step = &result.step_results[0];
        assert_eq!(step.status, StepStatus::Failed);
        assert_eq!(step.error.as_deref(), Some("Step timed out after 50ms"));
        assert_eq!(step.duration_ms, 50.0);
    }

    #[tokio::test]
    async fn test_validation_happens_before_steps() {
        let mut flow = Flow::new(
            "needs",
            "example.com",
            vec![FlowStep::new("a", StepAction::Navigate).with_url("https://example.com/x")],
        );
        flow.params.insert(
            "username".into(),
            serde_json::from_value(json!({"type": "string"})).unwrap(),
        );
        let page = page();
        let err = runner().run(&page, &flow, Map::new()).await.unwrap_err();
        assert!(matches!(err, FlowError::Validation { .. }));
        assert!(page.actions().is_empty());

        let empty = Flow::new("empty", "example.com", vec![]);
        assert!(runner().run(&page, &empty, Map::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_run_step_in_isolation() {
        let flow = Flow::new(
            "debug",
            "example.com",
            vec![
                FlowStep::new("a", StepAction::Navigate).with_url("https://example.com/a"),
                FlowStep::new("b", StepAction::Navigate).with_url("https://example.com/b"),
            ],
        );
        let page = page();
        let runner = runner();
        let result = runner.run_step(&page, &flow, "b", Map::new()).await.unwrap();
        assert_eq!(result.status, StepStatus::Success);
        assert_eq!(page.url(), "https://example.com/b");

        let err = runner.run_step(&page, &flow, "zz", Map::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "Step 'zz' not found in flow 'debug'");
    }
}
