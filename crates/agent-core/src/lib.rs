//! LLM access for BotFlow.
//!
//! Callers depend on the [`LlmClient`] trait only. [`ClaudeVisionClient`]
//! talks to the Anthropic Messages API; [`MockLlmClient`] serves scripted
//! replies for tests. [`parse_json_object`] recovers structured answers from
//! loosely formatted replies.

pub mod claude;
pub mod client;
pub mod errors;
pub mod json;

pub use claude::{ClaudeConfig, ClaudeVisionClient, DEFAULT_CLAUDE_API_BASE, DEFAULT_CLAUDE_MODEL};
pub use client::{LlmClient, LlmRequest, MockLlmClient};
pub use errors::{JsonRecoveryError, LlmError};
pub use json::{extract_json_object, parse_json_object, strip_code_fences};
