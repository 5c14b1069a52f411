use thiserror::Error;

/// Errors emitted by LLM clients.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// The client could not be constructed or the request was malformed.
    #[error("invalid llm request: {0}")]
    InvalidRequest(String),

    /// Transport-level failure talking to the provider.
    #[error("llm transport failure: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("llm provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The provider answered but the payload was unusable.
    #[error("llm response invalid: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }
}

/// Raised when no JSON object can be recovered from a model reply.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("no JSON object found in response: {excerpt}")]
pub struct JsonRecoveryError {
    /// First 200 characters of the reply.
    pub excerpt: String,
}
