//! Execution context and handler outcomes

use action_locator::{ElementResolver, Resolution, ResolverCascade};
use botflow_core_types::{FlowStep, TargetSelector};
use cdp_adapter::Page;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::ActionError;

/// Runtime state shared by the steps of one run.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Caller parameters, with declared defaults merged in
    pub params: Map<String, Value>,

    /// Values saved by extract steps, keyed by `save_as`
    pub extracted: BTreeMap<String, Value>,

    /// Where screenshot steps write their PNGs
    pub screenshots_dir: PathBuf,

    /// Element resolver used by targeted actions
    pub resolver: Arc<dyn ElementResolver>,

    /// Identifier of the run, for log correlation
    pub run_id: String,
}

impl ExecutionContext {
    pub fn new(params: Map<String, Value>, resolver: Arc<dyn ElementResolver>) -> Self {
        Self {
            params,
            extracted: BTreeMap::new(),
            screenshots_dir: PathBuf::from("screenshots"),
            resolver,
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_screenshots_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshots_dir = dir.into();
        self
    }

    /// Resolve the step's selector target through the configured resolver.
    pub async fn resolve(
        &self,
        page: &dyn Page,
        step: &FlowStep,
    ) -> Result<Resolution, ActionError> {
        let target = require_selector(step)?;
        self.resolver
            .resolve(page, target)
            .await
            .map_err(|err| ActionError::Resolution(err.with_step_id(&step.id)))
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(Map::new(), Arc::new(ResolverCascade::default()))
    }
}

/// Selector target of a step; dynamic or missing targets are an error.
pub fn require_selector(step: &FlowStep) -> Result<&TargetSelector, ActionError> {
    step.selector().ok_or(ActionError::MissingTarget)
}

/// What a handler reports back on success.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutcome {
    pub resolution_strategy: Option<String>,
    pub extracted_value: Option<Value>,
    pub screenshot_path: Option<String>,
}

impl ActionOutcome {
    pub fn done() -> Self {
        Self::default()
    }

    pub fn resolved(resolution: &Resolution) -> Self {
        Self {
            resolution_strategy: Some(resolution.strategy_name().to_string()),
            ..Self::default()
        }
    }

    pub fn with_extracted(mut self, value: Value) -> Self {
        self.extracted_value = Some(value);
        self
    }

    pub fn with_screenshot(mut self, path: impl Into<String>) -> Self {
        self.screenshot_path = Some(path.into());
        self
    }
}
