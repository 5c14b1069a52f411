//! Declarative flow definitions as stored in `*.flow.json` files.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ModelError;

fn default_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_step_timeout() -> u64 {
    10_000
}

fn default_post_timeout() -> u64 {
    5_000
}

/// Element selector carrying every known way of finding one element.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_anchor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_crop: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dom_neighborhood: Option<String>,
}

impl TargetSelector {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            css: Some(selector.into()),
            ..Self::default()
        }
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self {
            xpath: Some(expr.into()),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text_content: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn aria(label: impl Into<String>) -> Self {
        Self {
            aria_label: Some(label.into()),
            ..Self::default()
        }
    }

    /// True when no field usable for resolution is set.
    pub fn is_empty(&self) -> bool {
        self.css.is_none()
            && self.xpath.is_none()
            && self.text_content.is_none()
            && self.aria_label.is_none()
            && self.visual_anchor.is_none()
    }

    /// Short human readable rendering used in logs and prompts.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(css) = &self.css {
            parts.push(format!("css={css}"));
        }
        if let Some(xpath) = &self.xpath {
            parts.push(format!("xpath={xpath}"));
        }
        if let Some(text) = &self.text_content {
            parts.push(format!("text={text:?}"));
        }
        if let Some(label) = &self.aria_label {
            parts.push(format!("aria={label:?}"));
        }
        if let Some(anchor) = &self.visual_anchor {
            parts.push(format!("visual={anchor:?}"));
        }
        if parts.is_empty() {
            "<empty>".to_string()
        } else {
            parts.join(" ")
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicStrategy {
    FindByText,
    Dynamic,
    Css,
    Xpath,
}

/// Target computed at runtime by the caller. Opaque to the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicTarget {
    pub strategy: DynamicStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

/// Step target. On the wire a document with a `strategy` key is dynamic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    Dynamic(DynamicTarget),
    Selector(TargetSelector),
}

impl From<TargetSelector> for Target {
    fn from(selector: TargetSelector) -> Self {
        Target::Selector(selector)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expected_elements: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_changed_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_appears: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_disappears: Option<String>,
    #[serde(default = "default_post_timeout")]
    pub timeout_ms: u64,
}

impl Default for PostConditions {
    fn default() -> Self {
        Self {
            url_changed_to: None,
            element_appears: None,
            element_disappears: None,
            timeout_ms: default_post_timeout(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Enum,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowParam {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl FlowParam {
    /// Default value, treating an explicit JSON null as absent.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref().filter(|value| !value.is_null())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowReturn {
    #[serde(rename = "type")]
    pub return_type: ReturnType,
}

/// Step actions understood by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    Navigate,
    Click,
    Fill,
    Extract,
    Wait,
    Screenshot,
    Select,
    Hover,
    Scroll,
    Type,
}

impl StepAction {
    pub const ALL: [StepAction; 10] = [
        StepAction::Navigate,
        StepAction::Click,
        StepAction::Fill,
        StepAction::Extract,
        StepAction::Wait,
        StepAction::Screenshot,
        StepAction::Select,
        StepAction::Hover,
        StepAction::Scroll,
        StepAction::Type,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepAction::Navigate => "navigate",
            StepAction::Click => "click",
            StepAction::Fill => "fill",
            StepAction::Extract => "extract",
            StepAction::Wait => "wait",
            StepAction::Screenshot => "screenshot",
            StepAction::Select => "select",
            StepAction::Hover => "hover",
            StepAction::Scroll => "scroll",
            StepAction::Type => "type",
        }
    }
}

impl std::fmt::Display for StepAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowStep {
    pub id: String,
    pub action: StepAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_as: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_conditions: Option<PreConditions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_conditions: Option<PostConditions>,
    #[serde(default = "default_step_timeout")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub optional: bool,
}

impl FlowStep {
    pub fn new(id: impl Into<String>, action: StepAction) -> Self {
        Self {
            id: id.into(),
            action,
            description: None,
            target: None,
            url: None,
            value: None,
            save_as: None,
            pre_conditions: None,
            post_conditions: None,
            timeout_ms: default_step_timeout(),
            optional: false,
        }
    }

    pub fn with_target(mut self, target: impl Into<Target>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_save_as(mut self, key: impl Into<String>) -> Self {
        self.save_as = Some(key.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// The step's selector target, if it has one. Dynamic targets yield `None`.
    pub fn selector(&self) -> Option<&TargetSelector> {
        match &self.target {
            Some(Target::Selector(selector)) => Some(selector),
            _ => None,
        }
    }
}

/// A complete automation flow definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub flow_id: String,
    pub site: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, FlowParam>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub returns: BTreeMap<String, FlowReturn>,
    pub steps: Vec<FlowStep>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub returns_mapping: BTreeMap<String, Value>,
}

impl Flow {
    pub fn new(flow_id: impl Into<String>, site: impl Into<String>, steps: Vec<FlowStep>) -> Self {
        Self {
            flow_id: flow_id.into(),
            site: site.into(),
            version: default_version(),
            params: BTreeMap::new(),
            returns: BTreeMap::new(),
            steps,
            returns_mapping: BTreeMap::new(),
        }
    }

    /// Structural checks: non-empty id, at least one step, unique step ids.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.flow_id.trim().is_empty() {
            return Err(ModelError::invalid_flow(&self.flow_id, "flow_id is empty"));
        }
        if self.steps.is_empty() {
            return Err(ModelError::invalid_flow(
                &self.flow_id,
                "flow must contain at least one step",
            ));
        }
        let mut seen = HashSet::new();
        for step in &self.steps {
            if step.id.trim().is_empty() {
                return Err(ModelError::invalid_flow(&self.flow_id, "step with empty id"));
            }
            if !seen.insert(step.id.as_str()) {
                return Err(ModelError::invalid_flow(
                    &self.flow_id,
                    format!("duplicate step id '{}'", step.id),
                ));
            }
        }
        Ok(())
    }

    pub fn step(&self, step_id: &str) -> Option<&FlowStep> {
        self.steps.iter().find(|step| step.id == step_id)
    }

    pub fn step_mut(&mut self, step_id: &str) -> Option<&mut FlowStep> {
        self.steps.iter_mut().find(|step| step.id == step_id)
    }
}
