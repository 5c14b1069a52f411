//! Error handling module
//!
//! One error type for the engine's outward API. Crate-level errors convert
//! into it with `?`.

use action_flow::FlowError;
use agent_core::LlmError;
use botflow_core_types::ModelError;
use cdp_adapter::AdapterError;
use thiserror::Error;

use crate::self_heal::HealError;

#[derive(Debug, Error)]
pub enum BotFlowError {
    #[error("Flow not found: {0}")]
    FlowNotFound(String),

    #[error("Flow validation error in '{flow_id}': {detail}")]
    FlowValidation { flow_id: String, detail: String },

    #[error("Step '{step_id}' ({action}) failed: {detail}")]
    StepExecution {
        step_id: String,
        action: String,
        detail: String,
    },

    #[error(transparent)]
    Healing(#[from] HealError),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BotFlowError {
    pub fn validation(flow_id: &str, detail: impl Into<String>) -> Self {
        BotFlowError::FlowValidation {
            flow_id: flow_id.to_string(),
            detail: detail.into(),
        }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        BotFlowError::Config(detail.into())
    }

    /// Not-found and validation errors are caused by the flow files, not the
    /// runtime.
    pub fn is_flow_definition(&self) -> bool {
        matches!(
            self,
            BotFlowError::FlowNotFound(_) | BotFlowError::FlowValidation { .. }
        )
    }
}

impl From<FlowError> for BotFlowError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::Validation { flow_id, detail } => BotFlowError::FlowValidation { flow_id, detail },
            FlowError::StepNotFound { flow_id, step_id } => BotFlowError::StepExecution {
                step_id,
                action: "unknown".to_string(),
                detail: format!("Step not found in flow '{flow_id}'"),
            },
        }
    }
}

impl From<ModelError> for BotFlowError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidFlow { flow_id, detail } => BotFlowError::FlowValidation { flow_id, detail },
            other => BotFlowError::Config(other.to_string()),
        }
    }
}

impl From<AdapterError> for BotFlowError {
    fn from(err: AdapterError) -> Self {
        BotFlowError::Browser(err.to_string())
    }
}

impl From<LlmError> for BotFlowError {
    fn from(err: LlmError) -> Self {
        BotFlowError::Config(format!("LLM client: {err}"))
    }
}

impl From<serde_yaml::Error> for BotFlowError {
    fn from(err: serde_yaml::Error) -> Self {
        BotFlowError::Config(err.to_string())
    }
}

/// Result type using BotFlowError
pub type BotFlowResult<T> = Result<T, BotFlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_error_conversion() {
        let err: BotFlowError = FlowError::validation("login", "Missing required parameter: user").into();
        assert!(err.is_flow_definition());
        assert_eq!(
            err.to_string(),
            "Flow validation error in 'login': Missing required parameter: user"
        );

        let err: BotFlowError = FlowError::StepNotFound {
            flow_id: "login".into(),
            step_id: "zz".into(),
        }
        .into();
        assert!(matches!(err, BotFlowError::StepExecution { ref action, .. } if action == "unknown"));
    }

    #[test]
    fn test_step_execution_message() {
        let err = BotFlowError::StepExecution {
            step_id: "submit".into(),
            action: "click".into(),
            detail: "Cannot resolve element for step 'submit'. Tried: css".into(),
        };
        assert_eq!(
            err.to_string(),
            "Step 'submit' (click) failed: Cannot resolve element for step 'submit'. Tried: css"
        );
    }

    #[test]
    fn test_adapter_error_is_browser() {
        let err: BotFlowError = AdapterError::new(cdp_adapter::AdapterErrorKind::NotStarted)
            .with_hint("call start() first")
            .into();
        assert!(matches!(err, BotFlowError::Browser(_)));
    }
}
