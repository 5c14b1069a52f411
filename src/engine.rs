//! Engine orchestrator
//!
//! `BotEngine` owns the browser, the flow store, the runner, the healer and
//! the confidence tracker. A failed run may trigger healing: a proposal is
//! requested for each failed step with a selector target, gated by the heal
//! mode, and the first applied heal reruns the whole flow once.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use action_flow::FlowRunner;
use action_locator::{CascadeConfig, LlmVisionStrategy, ResolverCascade};
use action_primitives::ActionRegistry;
use agent_core::{ClaudeVisionClient, LlmClient};
use async_trait::async_trait;
use botflow_core_types::{
    FlowHealth, FlowStep, HealMode, HealProposal, RunResult, RunStatus, StepResult,
};
use cdp_adapter::{dom_snapshot, Browser, Page};
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::confidence::ConfidenceTracker;
use crate::config::EngineConfig;
use crate::errors::BotFlowError;
use crate::self_heal::{AutoHealer, HealError};
use crate::storage::{FlowStore, JsonFlowStore};

/// Runs kept per flow for health reporting.
const HISTORY_LIMIT: usize = 200;
const HEALTH_WINDOW_DAYS: i64 = 7;

/// Decides on heal proposals in supervised mode.
#[async_trait]
pub trait HealApprover: Send + Sync {
    /// `true` applies the proposal.
    async fn approve(&self, flow_id: &str, proposal: &HealProposal) -> bool;
}

pub struct BotEngine {
    config: EngineConfig,
    browser: Option<Arc<dyn Browser>>,
    store: Arc<dyn FlowStore>,
    runner: FlowRunner,
    healer: AutoHealer,
    confidence: ConfidenceTracker,
    approver: Option<Arc<dyn HealApprover>>,
    heal_mode: RwLock<HealMode>,
    flow_heal_modes: RwLock<HashMap<String, HealMode>>,
    history: RwLock<HashMap<String, VecDeque<RunResult>>>,
}

impl BotEngine {
    /// Build an engine from configuration.
    ///
    /// A Claude client is created when an API key is configured; it backs
    /// both the healer and, unless disabled, the vision strategy.
    pub fn new(config: EngineConfig) -> Result<Self, BotFlowError> {
        let client = match config.llm.claude_config() {
            Some(claude) => Some(Arc::new(ClaudeVisionClient::new(claude)?) as Arc<dyn LlmClient>),
            None => None,
        };
        Ok(Self::assemble(config, client))
    }

    fn assemble(config: EngineConfig, client: Option<Arc<dyn LlmClient>>) -> Self {
        let store: Arc<dyn FlowStore> = Arc::new(JsonFlowStore::new(config.flows_dir.clone()));
        let runner = build_runner(&config, client.as_ref());
        let healer = AutoHealer::new(client)
            .with_max_dom_chars(config.max_dom_chars)
            .with_max_tokens(config.llm.max_tokens);
        let confidence = ConfidenceTracker::new(config.state_dir());
        let flow_heal_modes = config
            .flow_heal_modes
            .iter()
            .map(|(id, mode)| (id.clone(), *mode))
            .collect();
        Self {
            heal_mode: RwLock::new(config.heal_mode),
            flow_heal_modes: RwLock::new(flow_heal_modes),
            history: RwLock::new(HashMap::new()),
            browser: None,
            approver: None,
            store,
            runner,
            healer,
            confidence,
            config,
        }
    }

    pub fn with_browser(mut self, browser: Arc<dyn Browser>) -> Self {
        self.browser = Some(browser);
        self
    }

    /// Replace the LLM client used for healing and vision resolution.
    pub fn with_llm_client(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.runner = build_runner(&self.config, Some(&client));
        self.healer = AutoHealer::new(Some(client))
            .with_max_dom_chars(self.config.max_dom_chars)
            .with_max_tokens(self.config.llm.max_tokens);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn FlowStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_approver(mut self, approver: Arc<dyn HealApprover>) -> Self {
        self.approver = Some(approver);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn FlowStore> {
        &self.store
    }

    pub fn confidence(&self) -> &ConfidenceTracker {
        &self.confidence
    }

    // --- Lifecycle ---

    pub async fn start(&self) -> Result<(), BotFlowError> {
        self.browser()?.start(self.config.headless).await?;
        info!(flows_dir = %self.config.flows_dir.display(), "Engine started");
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), BotFlowError> {
        self.browser()?.stop().await?;
        info!("Engine stopped");
        Ok(())
    }

    fn browser(&self) -> Result<&Arc<dyn Browser>, BotFlowError> {
        self.browser
            .as_ref()
            .ok_or_else(|| BotFlowError::Browser("no browser driver configured".to_string()))
    }

    async fn page(&self) -> Result<Arc<dyn Page>, BotFlowError> {
        Ok(self.browser()?.page().await?)
    }

    // --- Execution ---

    /// Run a flow and return its returns.
    ///
    /// A failed run raises `StepExecution` carrying the last failed step.
    pub async fn execute(
        &self,
        flow_id: &str,
        params: Map<String, Value>,
    ) -> Result<BTreeMap<String, Value>, BotFlowError> {
        let result = self.execute_full(flow_id, params).await?;
        if result.status == RunStatus::Failed {
            if let Some(failed) = result.last_failed_step() {
                let action = self
                    .store
                    .load(flow_id)
                    .ok()
                    .and_then(|flow| flow.step(&failed.step_id).map(|s| s.action.to_string()))
                    .unwrap_or_else(|| "unknown".to_string());
                return Err(BotFlowError::StepExecution {
                    step_id: failed.step_id.clone(),
                    action,
                    detail: failed.error.clone().unwrap_or_else(|| "Step failed".to_string()),
                });
            }
        }
        Ok(result.returns)
    }

    /// Run a flow and return the full result, healing when allowed.
    ///
    /// Step failures never surface as errors here.
    pub async fn execute_full(
        &self,
        flow_id: &str,
        params: Map<String, Value>,
    ) -> Result<RunResult, BotFlowError> {
        let flow = self.store.load(flow_id)?;
        let page = self.page().await?;
        let mut result = self.runner.run(page.as_ref(), &flow, params.clone()).await?;

        if result.status == RunStatus::Failed {
            let mode = self.heal_mode(flow_id);
            if mode != HealMode::Off {
                result = self
                    .attempt_healing(page.as_ref(), flow_id, result, &params, mode)
                    .await?;
            }
        }
        self.record_run(&result);
        Ok(result)
    }

    /// Run one step of a flow in isolation.
    pub async fn run_step(
        &self,
        flow_id: &str,
        step_id: &str,
        params: Map<String, Value>,
    ) -> Result<StepResult, BotFlowError> {
        let flow = self.store.load(flow_id)?;
        let page = self.page().await?;
        Ok(self.runner.run_step(page.as_ref(), &flow, step_id, params).await?)
    }

    async fn attempt_healing(
        &self,
        page: &dyn Page,
        flow_id: &str,
        mut result: RunResult,
        params: &Map<String, Value>,
        mode: HealMode,
    ) -> Result<RunResult, BotFlowError> {
        let mut heals_triggered = 0;
        let failed: Vec<StepResult> = result.failed_steps().cloned().collect();

        for failed_step in failed {
            let flow = self.store.load(flow_id)?;
            let Some(step) = flow.step(&failed_step.step_id) else {
                continue;
            };
            if step.selector().is_none() {
                continue;
            }
            let error = failed_step.error.as_deref().unwrap_or("Unknown error");

            match self
                .heal_step(page, flow_id, step, error, mode, &mut heals_triggered)
                .await
            {
                Ok(true) => {
                    let healed = self.store.load(flow_id)?;
                    let mut retry = self.runner.run(page, &healed, params.clone()).await?;
                    retry.heals_triggered = heals_triggered;
                    info!(
                        flow_id,
                        status = retry.status.as_str(),
                        heals_triggered,
                        "Flow rerun after heal"
                    );
                    return Ok(retry);
                }
                Ok(false) => self.note_heal_failure(flow_id),
                Err(err) => {
                    warn!(flow_id, step_id = %step.id, error = %err, "Healing failed");
                    self.note_heal_failure(flow_id);
                }
            }
        }

        result.heals_triggered = heals_triggered;
        Ok(result)
    }

    // confidence bookkeeping never aborts a run
    fn note_heal_failure(&self, flow_id: &str) {
        if let Err(err) = self.confidence.record_heal_failure(flow_id) {
            warn!(flow_id, error = %err, "Could not record heal failure");
        }
    }

    /// Propose a heal for `step` and apply it when the mode allows.
    ///
    /// Returns whether the heal was applied.
    async fn heal_step(
        &self,
        page: &dyn Page,
        flow_id: &str,
        step: &FlowStep,
        error: &str,
        mode: HealMode,
        heals_triggered: &mut u32,
    ) -> Result<bool, HealError> {
        let capture = |err: cdp_adapter::AdapterError| HealError::failed(&step.id, format!("page capture failed: {err}"));
        let screenshot = page.screenshot().await.map_err(capture)?;
        let dom = dom_snapshot(page).await.map_err(capture)?;
        let screenshot_path = self.save_heal_screenshot(flow_id, &step.id, &screenshot).await;

        let mut proposal = self.healer.propose_heal(step, screenshot, &dom, error).await?;
        proposal.screenshot_before = screenshot_path;
        *heals_triggered += 1;

        let apply = match mode {
            HealMode::Auto => self
                .confidence
                .should_auto_heal(flow_id, proposal.confidence_score)
                .map_err(|err| HealError::failed(&step.id, err.to_string()))?,
            HealMode::Supervised => match &self.approver {
                Some(approver) => approver.approve(flow_id, &proposal).await,
                None => {
                    warn!(flow_id, step_id = %step.id, "No heal approver configured, rejecting proposal");
                    false
                }
            },
            HealMode::Off => false,
        };
        if !apply {
            info!(
                flow_id,
                step_id = %step.id,
                confidence = proposal.confidence_score,
                mode = mode.as_str(),
                "Heal proposal not applied"
            );
            return Ok(false);
        }

        self.healer.apply_heal(self.store.as_ref(), flow_id, &proposal)?;
        if let Err(err) = self.confidence.record_heal_success(flow_id) {
            warn!(flow_id, step_id = %step.id, error = %err, "Could not record heal success");
        }
        Ok(true)
    }

    async fn save_heal_screenshot(&self, flow_id: &str, step_id: &str, png: &[u8]) -> Option<String> {
        let dir: &PathBuf = self.config.screenshots_dir.as_ref()?;
        let path = dir.join(format!("heal-{flow_id}-{step_id}.png"));
        let written: std::io::Result<()> = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, png).await
        }
        .await;
        match written {
            Ok(()) => Some(path.display().to_string()),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Could not write heal screenshot");
                None
            }
        }
    }

    fn record_run(&self, result: &RunResult) {
        let mut history = self.history.write();
        let runs = history.entry(result.flow_id.clone()).or_default();
        runs.push_back(result.clone());
        while runs.len() > HISTORY_LIMIT {
            runs.pop_front();
        }
    }

    // --- Status ---

    pub fn list_flows(&self) -> Result<Vec<String>, BotFlowError> {
        self.store.list_ids()
    }

    /// Health of every known flow from this engine's run history.
    ///
    /// Success and partial runs count as successful; the rate is 0 when the
    /// flow has not run in the window.
    pub fn flow_health(&self) -> Result<BTreeMap<String, FlowHealth>, BotFlowError> {
        let cutoff = Utc::now() - chrono::Duration::days(HEALTH_WINDOW_DAYS);
        let history = self.history.read();
        let mut health = BTreeMap::new();

        for flow_id in self.store.list_ids()? {
            let runs = history.get(&flow_id);
            let recent: Vec<&RunResult> = runs
                .into_iter()
                .flatten()
                .filter(|run| run.started_at >= cutoff)
                .collect();
            let succeeded = recent
                .iter()
                .filter(|run| run.status != RunStatus::Failed)
                .count();
            let success_rate_7d = if recent.is_empty() {
                0.0
            } else {
                succeeded as f64 / recent.len() as f64
            };
            let state = self.confidence.state(&flow_id)?;

            health.insert(
                flow_id.clone(),
                FlowHealth {
                    last_run: runs.and_then(|r| r.back().cloned()),
                    success_rate_7d,
                    heals_count_7d: recent.iter().map(|run| run.heals_triggered).sum(),
                    auto_heal_threshold: state.auto_threshold,
                    heal_mode: self.heal_mode(&flow_id),
                    flow_id,
                },
            );
        }
        Ok(health)
    }

    // --- Configuration ---

    /// Effective heal mode: per-flow override, else the global mode.
    pub fn heal_mode(&self, flow_id: &str) -> HealMode {
        self.flow_heal_modes
            .read()
            .get(flow_id)
            .copied()
            .unwrap_or(*self.heal_mode.read())
    }

    /// Set the mode of one flow, or the global mode with `None`.
    pub fn set_heal_mode(&self, flow_id: Option<&str>, mode: HealMode) {
        match flow_id {
            Some(id) => {
                self.flow_heal_modes.write().insert(id.to_string(), mode);
            }
            None => *self.heal_mode.write() = mode,
        }
        info!(flow_id = flow_id.unwrap_or("*"), mode = mode.as_str(), "Heal mode set");
    }

    pub fn set_confidence_threshold(&self, flow_id: &str, threshold: f64) -> Result<(), BotFlowError> {
        self.confidence.set_threshold(flow_id, threshold)?;
        Ok(())
    }
}

fn build_runner(config: &EngineConfig, client: Option<&Arc<dyn LlmClient>>) -> FlowRunner {
    let mut cascade = ResolverCascade::new(CascadeConfig {
        strategy_timeout: config.resolver.strategy_timeout(),
    });
    if config.resolver.vision_fallback {
        if let Some(client) = client {
            cascade = cascade.with_vision_strategy(
                LlmVisionStrategy::new(Arc::clone(client))
                    .with_max_tokens(config.llm.vision_max_tokens),
            );
        }
    }
    let runner = FlowRunner::new(ActionRegistry::with_defaults(), Arc::new(cascade));
    match &config.screenshots_dir {
        Some(dir) => runner.with_screenshots_dir(dir.clone()),
        None => runner,
    }
}
