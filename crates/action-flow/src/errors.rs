//! Flow execution error types

use botflow_core_types::ModelError;
use thiserror::Error;

/// Flow execution errors
///
/// Ordinary step failures are reported inside the run result; these errors
/// only cover problems that prevent a run from starting.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FlowError {
    /// Flow structure or caller parameters rejected before any step ran
    #[error("Flow validation failed for '{flow_id}': {detail}")]
    Validation { flow_id: String, detail: String },

    /// `run_step` was asked for a step the flow does not declare
    #[error("Step '{step_id}' not found in flow '{flow_id}'")]
    StepNotFound { flow_id: String, step_id: String },
}

impl FlowError {
    pub fn validation(flow_id: &str, detail: impl Into<String>) -> Self {
        FlowError::Validation {
            flow_id: flow_id.to_string(),
            detail: detail.into(),
        }
    }
}

impl From<ModelError> for FlowError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidFlow { flow_id, detail } => FlowError::Validation { flow_id, detail },
            other => FlowError::Validation {
                flow_id: String::new(),
                detail: other.to_string(),
            },
        }
    }
}
