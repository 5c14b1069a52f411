//! LLM-assisted selector healing
//!
//! When a step cannot find its element, the healer shows the model a
//! screenshot plus the simplified DOM and asks for replacement selectors.
//! Applying a proposal rewrites the step's target in the stored flow.

use std::sync::Arc;

use agent_core::{parse_json_object, LlmClient, LlmRequest};
use botflow_core_types::{FlowStep, HealProposal, TargetSelector};
use cdp_adapter::dom::truncate_chars;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::storage::FlowStore;

pub const DEFAULT_MAX_DOM_CHARS: usize = 20_000;
pub const DEFAULT_HEAL_MAX_TOKENS: u32 = 1_000;
const NO_REASONING: &str = "No reasoning provided";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HealError {
    #[error("Healing failed for step '{step_id}': {detail}")]
    Failed { step_id: String, detail: String },

    #[error("Healing failed for step '{step_id}': Could not parse LLM response: {excerpt}")]
    Parse { step_id: String, excerpt: String },

    #[error("Healing failed for step '{step_id}': step not found in flow '{flow_id}'")]
    StepNotFound { flow_id: String, step_id: String },
}

impl HealError {
    pub fn failed(step_id: &str, detail: impl Into<String>) -> Self {
        HealError::Failed {
            step_id: step_id.to_string(),
            detail: detail.into(),
        }
    }

    pub fn step_id(&self) -> &str {
        match self {
            HealError::Failed { step_id, .. }
            | HealError::Parse { step_id, .. }
            | HealError::StepNotFound { step_id, .. } => step_id,
        }
    }
}

/// Proposes and applies selector repairs.
#[derive(Clone)]
pub struct AutoHealer {
    client: Option<Arc<dyn LlmClient>>,
    max_dom_chars: usize,
    max_tokens: u32,
}

impl AutoHealer {
    /// Healer backed by `client`; without one every proposal fails.
    pub fn new(client: Option<Arc<dyn LlmClient>>) -> Self {
        Self {
            client,
            max_dom_chars: DEFAULT_MAX_DOM_CHARS,
            max_tokens: DEFAULT_HEAL_MAX_TOKENS,
        }
    }

    pub fn with_max_dom_chars(mut self, max: usize) -> Self {
        self.max_dom_chars = max;
        self
    }

    /// Reply budget of each heal request.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Ask the model where the step's element went.
    ///
    /// One round trip, no retry. The confidence score is clamped to
    /// `[0, 100]`.
    pub async fn propose_heal(
        &self,
        step: &FlowStep,
        screenshot: Vec<u8>,
        dom: &str,
        error: &str,
    ) -> Result<HealProposal, HealError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| HealError::failed(&step.id, "No LLM client configured"))?;
        let old_target = step.selector().cloned().unwrap_or_default();

        let prompt = build_heal_prompt(step, &old_target, truncate_chars(dom, self.max_dom_chars), error);
        let request = LlmRequest::new(prompt)
            .with_image(screenshot)
            .with_max_tokens(self.max_tokens);
        debug!(step_id = %step.id, "Requesting heal proposal");

        let reply = client
            .complete(&request)
            .await
            .map_err(|err| HealError::failed(&step.id, format!("LLM call failed: {err}")))?;
        let fields = parse_json_object(&reply).map_err(|err| HealError::Parse {
            step_id: step.id.clone(),
            excerpt: err.excerpt,
        })?;

        let new_target = TargetSelector {
            css: text_field(&fields, "css"),
            xpath: text_field(&fields, "xpath"),
            text_content: text_field(&fields, "text_content"),
            aria_label: text_field(&fields, "aria_label"),
            ..TargetSelector::default()
        };
        if new_target.is_empty() {
            return Err(HealError::failed(&step.id, "LLM response proposed no selector"));
        }

        let proposal = HealProposal {
            step_id: step.id.clone(),
            old_target,
            new_target,
            confidence_score: confidence_field(&fields),
            reasoning: text_field(&fields, "reasoning").unwrap_or_else(|| NO_REASONING.to_string()),
            screenshot_before: None,
            screenshot_after: None,
        };
        info!(
            step_id = %step.id,
            confidence = proposal.confidence_score,
            target = %proposal.new_target.describe(),
            "Heal proposed"
        );
        Ok(proposal)
    }

    /// Replace the step's target with the proposal and persist the flow.
    pub fn apply_heal(
        &self,
        store: &dyn FlowStore,
        flow_id: &str,
        proposal: &HealProposal,
    ) -> Result<(), HealError> {
        let mut flow = store
            .load(flow_id)
            .map_err(|err| HealError::failed(&proposal.step_id, err.to_string()))?;
        let step = flow
            .step_mut(&proposal.step_id)
            .ok_or_else(|| HealError::StepNotFound {
                flow_id: flow_id.to_string(),
                step_id: proposal.step_id.clone(),
            })?;
        step.target = Some(proposal.new_target.clone().into());

        store
            .save(&flow)
            .map_err(|err| HealError::failed(&proposal.step_id, err.to_string()))?;
        info!(
            flow_id,
            step_id = %proposal.step_id,
            confidence = proposal.confidence_score,
            "Heal applied"
        );
        Ok(())
    }
}

fn build_heal_prompt(step: &FlowStep, old: &TargetSelector, dom: &str, error: &str) -> String {
    let show = |field: &Option<String>| field.clone().unwrap_or_else(|| "(none)".to_string());
    format!(
        "A browser automation step can no longer find the element it acts on.\n\
         \n\
         Step purpose: {description}\n\
         Action: {action}\n\
         \n\
         Selectors that used to work:\n\
         - css: {css}\n\
         - xpath: {xpath}\n\
         - text: {text}\n\
         - aria label: {aria}\n\
         - visual description: {visual}\n\
         \n\
         Failure: {error}\n\
         \n\
         Simplified DOM of the current page:\n\
         {dom}\n\
         \n\
         Locate the element this step meant to use, using the screenshot and the DOM.\n\
         Reply with a single JSON object and nothing else, with the keys:\n\
         css, xpath, text_content, aria_label (strings, omit when unknown),\n\
         confidence (number from 0 to 100) and reasoning (string).",
        description = step.description.as_deref().unwrap_or("No description"),
        action = step.action,
        css = show(&old.css),
        xpath = show(&old.xpath),
        text = show(&old.text_content),
        aria = show(&old.aria_label),
        visual = show(&old.visual_anchor),
    )
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn confidence_field(fields: &Map<String, Value>) -> f64 {
    let raw = match fields.get("confidence") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse().unwrap_or(0.0),
        _ => 0.0,
    };
    if raw.is_finite() {
        raw.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonFlowStore;
    use agent_core::{LlmError, MockLlmClient};
    use botflow_core_types::{Flow, StepAction};

    fn step() -> FlowStep {
        let mut step = FlowStep::new("submit", StepAction::Click).with_target(TargetSelector {
            css: Some("#old-submit".into()),
            visual_anchor: Some("green button under the form".into()),
            ..TargetSelector::default()
        });
        step.description = Some("Submit the login form".into());
        step
    }

    #[tokio::test]
    async fn test_proposal_from_fenced_reply() {
        let mock = Arc::new(MockLlmClient::replying(
            "Sure!\n```json\n{\"css\": \"#new-submit\", \"text_content\": \"Log in\", \"confidence\": 140}\n```",
        ));
        let healer = AutoHealer::new(Some(mock.clone() as Arc<dyn LlmClient>)).with_max_dom_chars(10);
        let proposal = healer
            .propose_heal(&step(), vec![1, 2, 3], "<html><body>0123456789</body></html>", "not found")
            .await
            .unwrap();

        assert_eq!(proposal.new_target.css.as_deref(), Some("#new-submit"));
        assert_eq!(proposal.old_target.css.as_deref(), Some("#old-submit"));
        assert_eq!(proposal.confidence_score, 100.0);
        assert_eq!(proposal.reasoning, "No reasoning provided");

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].image_png.as_deref(), Some(&[1u8, 2, 3][..]));
        assert!(requests[0].prompt.contains("Submit the login form"));
        assert!(requests[0].prompt.contains("green button under the form"));
        assert!(requests[0].prompt.contains("<html><bo"));
        assert!(!requests[0].prompt.contains("0123456789"));
    }

    #[tokio::test]
    async fn test_unparseable_and_failed_replies() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_reply("I could not find it, sorry.");
        mock.push_error(LlmError::transport("connection reset"));
        let healer = AutoHealer::new(Some(mock as Arc<dyn LlmClient>));

        let err = healer.propose_heal(&step(), vec![], "", "e").await.unwrap_err();
        assert!(matches!(err, HealError::Parse { .. }));
        assert!(err.to_string().contains("I could not find it"));

        let err = healer.propose_heal(&step(), vec![], "", "e").await.unwrap_err();
        assert!(err.to_string().contains("LLM call failed"));
    }

    #[tokio::test]
    async fn test_reply_without_selectors_is_rejected() {
        let mock = Arc::new(MockLlmClient::replying(r#"{"confidence": 95, "css": "  "}"#));
        let healer = AutoHealer::new(Some(mock as Arc<dyn LlmClient>));
        let err = healer.propose_heal(&step(), vec![], "", "e").await.unwrap_err();
        assert_eq!(
            err,
            HealError::failed("submit", "LLM response proposed no selector")
        );
    }

    #[tokio::test]
    async fn test_request_uses_configured_token_budget() {
        let mock = Arc::new(MockLlmClient::replying(r##"{"css": "#x", "confidence": 50}"##));
        let healer = AutoHealer::new(Some(mock.clone() as Arc<dyn LlmClient>));
        healer.propose_heal(&step(), vec![], "", "e").await.unwrap();
        let tuned = healer.clone().with_max_tokens(2_048);
        tuned.propose_heal(&step(), vec![], "", "e").await.unwrap();

        let budgets: Vec<u32> = mock.requests().iter().map(|r| r.max_tokens).collect();
        assert_eq!(budgets, vec![DEFAULT_HEAL_MAX_TOKENS, 2_048]);
    }

    #[tokio::test]
    async fn test_missing_client_names_step() {
        let err = AutoHealer::new(None)
            .propose_heal(&step(), vec![], "", "e")
            .await
            .unwrap_err();
        assert_eq!(err.step_id(), "submit");
    }

    #[test]
    fn test_apply_heal_rewrites_target() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFlowStore::new(dir.path());
        store
            .save(&Flow::new("login", "example.com", vec![step()]))
            .unwrap();

        let proposal = HealProposal {
            step_id: "submit".into(),
            old_target: TargetSelector::css("#old-submit"),
            new_target: TargetSelector::css("#new-submit"),
            confidence_score: 90.0,
            reasoning: "same label".into(),
            screenshot_before: None,
            screenshot_after: None,
        };
        let healer = AutoHealer::new(None);
        healer.apply_heal(&store, "login", &proposal).unwrap();

        let reloaded = JsonFlowStore::new(dir.path()).load("login").unwrap();
        assert_eq!(
            reloaded.steps[0].selector().and_then(|t| t.css.as_deref()),
            Some("#new-submit")
        );

        let stray = HealProposal {
            step_id: "nope".into(),
            ..proposal
        };
        assert!(matches!(
            healer.apply_heal(&store, "login", &stray),
            Err(HealError::StepNotFound { .. })
        ));
    }
}
