use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::LlmError;

/// One completion request: a text prompt with an optional PNG attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmRequest {
    pub prompt: String,
    pub image_png: Option<Vec<u8>>,
    pub max_tokens: u32,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image_png: None,
            max_tokens: 1024,
        }
    }

    pub fn with_image(mut self, png: Vec<u8>) -> Self {
        self.image_png = Some(png);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Abstraction over vision-capable LLM vendors.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one request and return the reply text.
    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError>;
}

/// Deterministic client used for tests and offline development.
///
/// Replies are served from a script in order; once exhausted the fallback
/// reply is returned. Every request is recorded.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer with `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(reply.into()),
            ..Self::default()
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.script.lock().push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, error: LlmError) {
        self.script.lock().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError> {
        self.requests.lock().push(request.clone());
        if let Some(next) = self.script.lock().pop_front() {
            return next;
        }
        self.fallback
            .clone()
            .ok_or_else(|| LlmError::invalid_response("mock client has no scripted reply"))
    }
}
