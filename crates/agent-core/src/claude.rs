//! Anthropic Messages API client with image support.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{LlmClient, LlmRequest};
use crate::errors::LlmError;

pub const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_CLAUDE_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl ClaudeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_CLAUDE_MODEL.to_string(),
            api_base: DEFAULT_CLAUDE_API_BASE.to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct ClaudeVisionClient {
    client: Client,
    config: ClaudeConfig,
}

impl ClaudeVisionClient {
    pub fn new(config: ClaudeConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::invalid_request("anthropic api key is empty"));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| LlmError::invalid_request(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_body(&self, request: &LlmRequest) -> ClaudeRequest {
        let mut content = Vec::with_capacity(2);
        if let Some(png) = &request.image_png {
            content.push(ClaudeContent::Image {
                source: ImageSource {
                    _type: "base64".to_string(),
                    media_type: "image/png".to_string(),
                    data: STANDARD.encode(png),
                },
            });
        }
        content.push(ClaudeContent::Text {
            text: request.prompt.clone(),
        });
        ClaudeRequest {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: request.max_tokens,
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content,
            }],
        }
    }
}

#[async_trait]
impl LlmClient for ClaudeVisionClient {
    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError> {
        let body = self.build_body(request);
        let url = format!("{}/messages", self.config.api_base.trim_end_matches('/'));
        debug!(
            model = %self.config.model,
            with_image = request.image_png.is_some(),
            prompt_chars = request.prompt.len(),
            "Sending claude request"
        );

        let response = self
            .client
            .post(url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|err| LlmError::transport(format!("claude request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(LlmError::Status { status, body });
        }

        let response: ClaudeResponse = response
            .json()
            .await
            .map_err(|err| LlmError::invalid_response(format!("claude response invalid: {err}")))?;

        let text = response.text();
        if text.is_empty() {
            return Err(LlmError::invalid_response("claude response missing content"));
        }
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
    role: String,
    content: Vec<ClaudeContent>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClaudeContent {
    Image { source: ImageSource },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    _type: String,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeResponseContent>,
}

impl ClaudeResponse {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| part.text.as_ref())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Deserialize)]
struct ClaudeResponseContent {
    #[serde(rename = "type")]
    _type: String,
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_places_image_before_prompt() {
        let client = ClaudeVisionClient::new(ClaudeConfig::new("key")).unwrap();
        let request = LlmRequest::new("find the button")
            .with_image(vec![1, 2, 3])
            .with_max_tokens(500);
        let body = serde_json::to_value(client.build_body(&request)).unwrap();

        assert_eq!(body["max_tokens"], 500);
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[0]["source"]["media_type"], "image/png");
        assert_eq!(content[0]["source"]["data"], "AQID");
        assert_eq!(content[1], json!({"type": "text", "text": "find the button"}));
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: ClaudeResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "{\"css\":"},
                {"type": "tool_use"},
                {"type": "text", "text": "\"#a\"}"}
            ]
        }))
        .unwrap();
        assert_eq!(response.text(), "{\"css\":\n\"#a\"}");
    }

    #[test]
    fn test_rejects_empty_key() {
        assert!(ClaudeVisionClient::new(ClaudeConfig::new("  ")).is_err());
    }
}
