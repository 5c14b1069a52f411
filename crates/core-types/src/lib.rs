//! Shared models for BotFlow: flow definitions, execution results and the
//! healing / confidence records exchanged between the engine layers.

use thiserror::Error;

pub mod flow;
pub mod heal;
pub mod results;

pub use flow::{
    DynamicStrategy, DynamicTarget, Flow, FlowParam, FlowReturn, FlowStep, ParamType,
    PostConditions, PreConditions, ReturnType, StepAction, Target, TargetSelector,
};
pub use heal::{ConfidenceState, FlowHealth, HealMode, HealProposal};
pub use results::{RunResult, RunStatus, StepResult, StepStatus};

/// Errors raised by model-level validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("invalid flow '{flow_id}': {detail}")]
    InvalidFlow { flow_id: String, detail: String },

    #[error("unknown heal mode '{0}' (expected off, supervised or auto)")]
    UnknownHealMode(String),
}

impl ModelError {
    pub fn invalid_flow(flow_id: &str, detail: impl Into<String>) -> Self {
        Self::InvalidFlow {
            flow_id: flow_id.to_string(),
            detail: detail.into(),
        }
    }
}
