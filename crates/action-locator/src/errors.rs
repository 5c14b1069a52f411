//! Error types for the resolver cascade

use agent_core::LlmError;
use cdp_adapter::AdapterError;
use thiserror::Error;

/// Step id used until the caller knows which step was being resolved.
pub const UNKNOWN_STEP: &str = "unknown";

/// Locator error enumeration
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// Every applicable strategy ran and none found the element
    #[error(
        "Cannot resolve element for step '{}'. Tried: {}",
        .step_id,
        .strategies_tried.join(", ")
    )]
    SelectorResolution {
        step_id: String,
        strategies_tried: Vec<String>,
    },

    /// Strategy execution failed
    #[error("Strategy '{strategy}' failed: {reason}")]
    StrategyFailed { strategy: String, reason: String },

    /// Driver error while querying the page
    #[error("Driver error: {0}")]
    Adapter(#[from] AdapterError),

    /// Vision fallback could not reach or parse the model
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

impl LocatorError {
    pub fn exhausted(strategies_tried: Vec<String>) -> Self {
        LocatorError::SelectorResolution {
            step_id: UNKNOWN_STEP.to_string(),
            strategies_tried,
        }
    }

    /// Attach the step id to a resolution failure. Other variants pass through.
    pub fn with_step_id(self, id: &str) -> Self {
        match self {
            LocatorError::SelectorResolution {
                strategies_tried, ..
            } => LocatorError::SelectorResolution {
                step_id: id.to_string(),
                strategies_tried,
            },
            other => other,
        }
    }

    /// Strategies listed on a resolution failure.
    pub fn strategies_tried(&self) -> &[String] {
        match self {
            LocatorError::SelectorResolution {
                strategies_tried, ..
            } => strategies_tried,
            _ => &[],
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            LocatorError::Adapter(err) => err.retriable,
            LocatorError::Llm(LlmError::Transport(_)) => true,
            _ => false,
        }
    }
}
