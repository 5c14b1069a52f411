//! Step and run outcomes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status of one executed step.
///
/// `Fallback` and `Healed` are reserved for richer reporting; the runner
/// itself only produces `Success`, `Failed` and `Skipped`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Fallback,
    Healed,
    Failed,
    Skipped,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_strategy: Option<String>,
    pub duration_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
}

impl StepResult {
    pub fn success(step_id: impl Into<String>, duration_ms: f64) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepStatus::Success,
            resolution_strategy: None,
            duration_ms,
            extracted_value: None,
            error: None,
            screenshot_path: None,
        }
    }

    pub fn failed(step_id: impl Into<String>, duration_ms: f64, error: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepStatus::Failed,
            resolution_strategy: None,
            duration_ms,
            extracted_value: None,
            error: Some(error.into()),
            screenshot_path: None,
        }
    }

    pub fn with_strategy(mut self, strategy: Option<String>) -> Self {
        self.resolution_strategy = strategy;
        self
    }

    pub fn with_extracted(mut self, value: Option<Value>) -> Self {
        self.extracted_value = value;
        self
    }

    pub fn with_screenshot(mut self, path: Option<String>) -> Self {
        self.screenshot_path = path;
        self
    }

    /// Re-label a failed result as skipped, keeping its error and duration.
    pub fn into_skipped(mut self) -> Self {
        self.status = StepStatus::Skipped;
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == StepStatus::Failed
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
}

impl RunStatus {
    /// Aggregate: failed if any step failed, partial if any was skipped.
    pub fn from_steps(results: &[StepResult]) -> Self {
        if results.iter().any(|r| r.status == StepStatus::Failed) {
            RunStatus::Failed
        } else if results.iter().any(|r| r.status == StepStatus::Skipped) {
            RunStatus::Partial
        } else {
            RunStatus::Success
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub flow_id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: f64,
    pub step_results: Vec<StepResult>,
    #[serde(default)]
    pub returns: BTreeMap<String, Value>,
    #[serde(default)]
    pub heals_triggered: u32,
}

impl RunResult {
    /// Most recent failed step, used when surfacing a run as an error.
    pub fn last_failed_step(&self) -> Option<&StepResult> {
        self.step_results.iter().rev().find(|r| r.is_failed())
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.step_results.iter().filter(|r| r.is_failed())
    }
}
