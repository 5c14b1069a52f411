//! Error types for action primitives

use action_locator::LocatorError;
use botflow_core_types::StepAction;
use cdp_adapter::AdapterError;
use thiserror::Error;

/// Failures raised while executing one step.
#[derive(Debug, Error, Clone)]
pub enum ActionError {
    /// The target could not be resolved by any strategy
    #[error(transparent)]
    Resolution(#[from] LocatorError),

    /// The step needs a selector target but has none (or a dynamic one)
    #[error("No target selector")]
    MissingTarget,

    /// A required step field is absent
    #[error("Missing field '{0}'")]
    MissingField(&'static str),

    /// A step field holds a value the action cannot use
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Template references an unknown variable
    #[error("Template error: {0}")]
    Template(String),

    /// Browser driver failure
    #[error("{0}")]
    Adapter(#[from] AdapterError),

    /// Pre- or post-condition did not hold
    #[error("Condition failed: {0}")]
    Condition(String),

    /// Wait operation timed out
    #[error("Wait timeout: {0}")]
    WaitTimeout(String),

    /// No handler registered for the action
    #[error("No action registered for: {0}")]
    Unsupported(StepAction),

    /// Local filesystem failure (screenshots)
    #[error("I/O error: {0}")]
    Io(String),
}

impl ActionError {
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template(message.into())
    }

    pub fn condition(message: impl Into<String>) -> Self {
        Self::Condition(message.into())
    }

    /// Resolution failures are the ones self-healing can repair.
    pub fn is_resolution(&self) -> bool {
        matches!(self, ActionError::Resolution(_))
    }

    /// Attach the step id to resolution failures.
    pub fn with_step_id(self, step_id: &str) -> Self {
        match self {
            ActionError::Resolution(err) => ActionError::Resolution(err.with_step_id(step_id)),
            other => other,
        }
    }
}

impl From<std::io::Error> for ActionError {
    fn from(err: std::io::Error) -> Self {
        ActionError::Io(err.to_string())
    }
}
