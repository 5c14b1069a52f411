use anyhow::Result;
use botflow::{BotEngine, ConfidenceTracker, EngineConfig, JsonFlowStore};

use super::output::OutputFormat;

pub struct CliContext {
    config: EngineConfig,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(config: EngineConfig, output: OutputFormat) -> Self {
        Self { config, output }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    pub fn store(&self) -> JsonFlowStore {
        JsonFlowStore::new(self.config.flows_dir.clone())
    }

    pub fn tracker(&self) -> ConfidenceTracker {
        ConfidenceTracker::new(self.config.state_dir())
    }

    /// Engine without a browser driver, for status commands.
    pub fn engine(&self) -> Result<BotEngine> {
        Ok(BotEngine::new(self.config.clone())?)
    }
}
