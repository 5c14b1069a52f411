//! Auto-heal confidence tracking
//!
//! Each flow keeps a small JSON state file with its heal track record. The
//! auto-apply threshold starts at 100 (never auto-apply) and is lowered as
//! heals keep succeeding:
//!
//! - 3 consecutive failures: back to 100
//! - any failure streak: +15, capped at 100
//! - 50 / 20 / 5 consecutive successes: 55 / 70 / 85

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use botflow_core_types::ConfidenceState;
use parking_lot::Mutex;
use tracing::info;

use crate::errors::BotFlowError;
use crate::storage::validate_flow_id;

const MAX_THRESHOLD: f64 = 100.0;
const FAILURE_PENALTY: f64 = 15.0;

/// Per-flow confidence state persisted under `state_dir`.
pub struct ConfidenceTracker {
    state_dir: PathBuf,
    // serialises read-modify-write of state files within this process
    lock: Mutex<()>,
}

impl ConfidenceTracker {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn state_path(&self, flow_id: &str) -> PathBuf {
        self.state_dir.join(format!("{flow_id}.confidence.json"))
    }

    /// Current state, defaults when nothing was persisted yet.
    pub fn state(&self, flow_id: &str) -> Result<ConfidenceState, BotFlowError> {
        validate_flow_id(flow_id)?;
        match fs::read_to_string(self.state_path(flow_id)) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(ConfidenceState::new(flow_id)),
            Err(err) => Err(err.into()),
        }
    }

    pub fn record_heal_success(&self, flow_id: &str) -> Result<ConfidenceState, BotFlowError> {
        let state = self.update(flow_id, |state| {
            state.consecutive_successful_heals += 1;
            state.consecutive_failed_heals = 0;
            state.total_successful_heals += 1;
            state.auto_threshold = adjust_threshold(state);
        })?;
        info!(
            flow_id,
            threshold = state.auto_threshold,
            consecutive = state.consecutive_successful_heals,
            "Heal success recorded"
        );
        Ok(state)
    }

    pub fn record_heal_failure(&self, flow_id: &str) -> Result<ConfidenceState, BotFlowError> {
        let state = self.update(flow_id, |state| {
            state.consecutive_failed_heals += 1;
            state.consecutive_successful_heals = 0;
            state.total_failed_heals += 1;
            state.auto_threshold = adjust_threshold(state);
        })?;
        info!(
            flow_id,
            threshold = state.auto_threshold,
            consecutive_failures = state.consecutive_failed_heals,
            "Heal failure recorded"
        );
        Ok(state)
    }

    /// Whether a proposal scored `confidence` may be applied without approval.
    pub fn should_auto_heal(&self, flow_id: &str, confidence: f64) -> Result<bool, BotFlowError> {
        Ok(confidence >= self.state(flow_id)?.auto_threshold)
    }

    /// Manual threshold override, clamped to `[0, 100]`.
    pub fn set_threshold(&self, flow_id: &str, threshold: f64) -> Result<ConfidenceState, BotFlowError> {
        if !threshold.is_finite() {
            return Err(BotFlowError::config(format!(
                "threshold must be a finite number, got {threshold}"
            )));
        }
        let threshold = threshold.clamp(0.0, MAX_THRESHOLD);
        let state = self.update(flow_id, |state| state.auto_threshold = threshold)?;
        info!(flow_id, threshold, "Confidence threshold set");
        Ok(state)
    }

    /// Forget the flow's track record.
    pub fn reset(&self, flow_id: &str) -> Result<(), BotFlowError> {
        validate_flow_id(flow_id)?;
        let _guard = self.lock.lock();
        match fs::remove_file(self.state_path(flow_id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn update<F>(&self, flow_id: &str, mutate: F) -> Result<ConfidenceState, BotFlowError>
    where
        F: FnOnce(&mut ConfidenceState),
    {
        let _guard = self.lock.lock();
        let mut state = self.state(flow_id)?;
        mutate(&mut state);
        self.save(&state)?;
        Ok(state)
    }

    fn save(&self, state: &ConfidenceState) -> Result<(), BotFlowError> {
        fs::create_dir_all(&self.state_dir)?;
        let body = serde_json::to_string_pretty(state)?;
        fs::write(self.state_path(&state.flow_id), body)?;
        Ok(())
    }
}

/// New threshold after the counters of `state` changed.
pub fn adjust_threshold(state: &ConfidenceState) -> f64 {
    if state.consecutive_failed_heals >= 3 {
        return MAX_THRESHOLD;
    }
    if state.consecutive_failed_heals > 0 {
        return (state.auto_threshold + FAILURE_PENALTY).min(MAX_THRESHOLD);
    }
    match state.consecutive_successful_heals {
        n if n >= 50 => 55.0,
        n if n >= 20 => 70.0,
        n if n >= 5 => 85.0,
        _ => state.auto_threshold,
    }
}
