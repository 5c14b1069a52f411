//! Explicit map from step action to handler

use crate::{
    conditions::check_pre_conditions,
    errors::ActionError,
    primitives::*,
    types::{ActionOutcome, ExecutionContext},
};
use async_trait::async_trait;
use botflow_core_types::{FlowStep, StepAction};
use cdp_adapter::Page;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One step action implementation.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Action this handler implements
    fn action(&self) -> StepAction;

    /// Execute `step` against `page`. Errors mark the step failed.
    async fn execute(
        &self,
        page: &dyn Page,
        step: &FlowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<ActionOutcome, ActionError>;
}

/// Handler lookup table.
#[derive(Clone)]
pub struct ActionRegistry {
    handlers: HashMap<StepAction, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// Registry with no handlers.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with a handler for every [`StepAction`].
    pub fn with_defaults() -> Self {
        let handlers: HashMap<StepAction, Arc<dyn ActionHandler>> = HashMap::from([
            (StepAction::Navigate, Arc::new(NavigateAction) as Arc<dyn ActionHandler>),
            (StepAction::Click, Arc::new(ClickAction) as Arc<dyn ActionHandler>),
            (StepAction::Fill, Arc::new(FillAction) as Arc<dyn ActionHandler>),
            (StepAction::Extract, Arc::new(ExtractAction) as Arc<dyn ActionHandler>),
            (StepAction::Wait, Arc::new(WaitAction) as Arc<dyn ActionHandler>),
            (StepAction::Screenshot, Arc::new(ScreenshotAction) as Arc<dyn ActionHandler>),
            (StepAction::Select, Arc::new(SelectAction) as Arc<dyn ActionHandler>),
            (StepAction::Hover, Arc::new(HoverAction) as Arc<dyn ActionHandler>),
            (StepAction::Scroll, Arc::new(ScrollAction) as Arc<dyn ActionHandler>),
            (StepAction::Type, Arc::new(TypeAction) as Arc<dyn ActionHandler>),
        ]);
        Self { handlers }
    }

    /// Install `handler`, replacing any handler for the same action.
    pub fn register(&mut self, handler: Arc<dyn ActionHandler>) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.insert(handler.action(), handler)
    }

    pub fn get(&self, action: StepAction) -> Result<Arc<dyn ActionHandler>, ActionError> {
        self.handlers
            .get(&action)
            .cloned()
            .ok_or(ActionError::Unsupported(action))
    }

    pub fn contains(&self, action: StepAction) -> bool {
        self.handlers.contains_key(&action)
    }

    /// Check pre-conditions, then run the step's handler.
    pub async fn execute(
        &self,
        page: &dyn Page,
        step: &FlowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<ActionOutcome, ActionError> {
        let handler = self.get(step.action)?;
        if let Some(conditions) = &step.pre_conditions {
            debug!(step_id = %step.id, "Checking pre-conditions");
            check_pre_conditions(page, conditions).await?;
        }
        handler.execute(page, step, ctx).await
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botflow_core_types::PreConditions;
    use cdp_adapter::fixture::FixturePage;

    struct EchoNavigate;

    #[async_trait]
    impl ActionHandler for EchoNavigate {
        fn action(&self) -> StepAction {
            StepAction::Navigate
        }

        async fn execute(
            &self,
            _page: &dyn Page,
            step: &FlowStep,
            _ctx: &mut ExecutionContext,
        ) -> Result<ActionOutcome, ActionError> {
            Ok(ActionOutcome::done().with_extracted(serde_json::json!(step.id)))
        }
    }

    #[test]
    fn test_defaults_cover_every_action() {
        let registry = ActionRegistry::with_defaults();
        for action in StepAction::ALL {
            assert!(registry.contains(action), "missing handler for {action}");
            assert_eq!(registry.get(action).unwrap().action(), action);
        }
    }

    #[test]
    fn test_unknown_action_is_unsupported() {
        let registry = ActionRegistry::empty();
        let err = registry.get(StepAction::Hover).err().unwrap();
        assert_eq!(err.to_string(), "No action registered for: hover");
    }

    #[tokio::test]
    async fn test_register_replaces_and_pre_conditions_gate() {
        let mut registry = ActionRegistry::with_defaults();
        assert!(registry.register(Arc::new(EchoNavigate)).is_some());

        let page = FixturePage::new().with_url("https://a.com/start");
        let mut ctx = ExecutionContext::default();
        let mut step = FlowStep::new("n1", StepAction::Navigate);
        let outcome = registry.execute(&page, &step, &mut ctx).await.unwrap();
        assert_eq!(outcome.extracted_value, Some(serde_json::json!("n1")));

        step.pre_conditions = Some(PreConditions {
            url_pattern: Some("checkout".into()),
            ..PreConditions::default()
        });
        let err = registry.execute(&page, &step, &mut ctx).await.unwrap_err();
        assert!(matches!(err, ActionError::Condition(_)));
    }
}
