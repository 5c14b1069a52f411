//! Healing, confidence and health models.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ModelError, RunResult, TargetSelector};

/// A proposed replacement for a broken selector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealProposal {
    pub step_id: String,
    pub old_target: TargetSelector,
    pub new_target: TargetSelector,
    /// Model confidence in `[0, 100]`.
    pub confidence_score: f64,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_after: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealMode {
    Off,
    #[default]
    Supervised,
    Auto,
}

impl HealMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealMode::Off => "off",
            HealMode::Supervised => "supervised",
            HealMode::Auto => "auto",
        }
    }
}

impl std::fmt::Display for HealMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(HealMode::Off),
            "supervised" => Ok(HealMode::Supervised),
            "auto" => Ok(HealMode::Auto),
            other => Err(ModelError::UnknownHealMode(other.to_string())),
        }
    }
}

fn default_threshold() -> f64 {
    ConfidenceState::DEFAULT_THRESHOLD
}

/// Persisted per-flow auto-heal confidence counters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceState {
    pub flow_id: String,
    #[serde(default = "default_threshold")]
    pub auto_threshold: f64,
    #[serde(default)]
    pub consecutive_successful_heals: u32,
    #[serde(default)]
    pub consecutive_failed_heals: u32,
    #[serde(default)]
    pub total_successful_heals: u32,
    #[serde(default)]
    pub total_failed_heals: u32,
}

impl ConfidenceState {
    pub const DEFAULT_THRESHOLD: f64 = 100.0;

    pub fn new(flow_id: impl Into<String>) -> Self {
        Self {
            flow_id: flow_id.into(),
            auto_threshold: Self::DEFAULT_THRESHOLD,
            consecutive_successful_heals: 0,
            consecutive_failed_heals: 0,
            total_successful_heals: 0,
            total_failed_heals: 0,
        }
    }
}

/// Health summary of one flow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowHealth {
    pub flow_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<RunResult>,
    pub success_rate_7d: f64,
    pub heals_count_7d: u32,
    pub auto_heal_threshold: f64,
    pub heal_mode: HealMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heal_mode_parse() {
        assert_eq!("AUTO".parse::<HealMode>().unwrap(), HealMode::Auto);
        assert_eq!(" off ".parse::<HealMode>().unwrap(), HealMode::Off);
        assert!("sometimes".parse::<HealMode>().is_err());
        assert_eq!(HealMode::default(), HealMode::Supervised);
    }

    #[test]
    fn test_confidence_state_defaults_on_partial_json() {
        let state: ConfidenceState = serde_json::from_str(r#"{"flow_id": "f"}"#).unwrap();
        assert_eq!(state, ConfidenceState::new("f"));
        assert_eq!(state.auto_threshold, 100.0);
    }
}
