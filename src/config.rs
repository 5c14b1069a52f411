//! Engine configuration
//!
//! YAML file (via `serde_yaml`) with environment overrides. Every field has a
//! default, so an empty or missing file yields a working configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use action_locator::LlmVisionStrategy;
use agent_core::{ClaudeConfig, DEFAULT_CLAUDE_API_BASE, DEFAULT_CLAUDE_MODEL};
use botflow_core_types::HealMode;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::BotFlowError;
use crate::self_heal::DEFAULT_HEAL_MAX_TOKENS;

pub const ENV_FLOWS_DIR: &str = "BOTFLOW_FLOWS_DIR";
pub const ENV_HEAL_MODE: &str = "BOTFLOW_HEAL_MODE";
pub const ENV_HEADLESS: &str = "BOTFLOW_HEADLESS";
pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";

/// Top-level engine settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory searched (recursively) for `*.flow.json` files
    pub flows_dir: PathBuf,

    /// Confidence state directory, `<flows_dir>/.botflow/confidence` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,

    /// Screenshot directory; heal screenshots are only written when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshots_dir: Option<PathBuf>,

    pub headless: bool,

    /// Global heal mode
    pub heal_mode: HealMode,

    /// Per-flow heal mode overrides
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub flow_heal_modes: BTreeMap<String, HealMode>,

    pub resolver: ResolverSettings,

    pub llm: LlmSettings,

    /// DOM characters included in heal prompts
    pub max_dom_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            flows_dir: PathBuf::from("flows"),
            state_dir: None,
            screenshots_dir: None,
            headless: true,
            heal_mode: HealMode::Supervised,
            flow_heal_modes: BTreeMap::new(),
            resolver: ResolverSettings::default(),
            llm: LlmSettings::default(),
            max_dom_chars: 20_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Time budget of a single strategy attempt
    pub strategy_timeout_ms: u64,

    /// Append the vision strategy when an LLM client is available
    pub vision_fallback: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            strategy_timeout_ms: 2_000,
            vision_fallback: true,
        }
    }
}

impl ResolverSettings {
    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_millis(self.strategy_timeout_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    /// Reply budget of heal proposals
    pub max_tokens: u32,
    /// Reply budget of vision resolution requests
    pub vision_max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_CLAUDE_MODEL.to_string(),
            api_base: DEFAULT_CLAUDE_API_BASE.to_string(),
            max_tokens: DEFAULT_HEAL_MAX_TOKENS,
            vision_max_tokens: LlmVisionStrategy::DEFAULT_MAX_TOKENS,
            temperature: 0.0,
            timeout_secs: 60,
        }
    }
}

impl LlmSettings {
    /// Client settings, `None` without an API key.
    pub fn claude_config(&self) -> Option<ClaudeConfig> {
        let key = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        let mut config = ClaudeConfig::new(key);
        config.model = self.model.clone();
        config.api_base = self.api_base.clone();
        config.temperature = self.temperature;
        config.timeout = Duration::from_secs(self.timeout_secs);
        Some(config)
    }
}

impl EngineConfig {
    pub fn with_flows_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.flows_dir = dir.into();
        self
    }

    pub fn state_dir(&self) -> PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(|| self.flows_dir.join(".botflow").join("confidence"))
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, BotFlowError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, BotFlowError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| BotFlowError::config(format!("failed to read {}: {err}", path.display())))?;
        Self::from_yaml_str(&raw)
            .map_err(|err| BotFlowError::config(format!("failed to parse {}: {err}", path.display())))
    }

    /// Load configuration and apply environment overrides.
    ///
    /// Priority: explicit path > `./config/botflow.yaml` >
    /// `<config_dir>/botflow/config.yaml` > defaults. An explicit path that
    /// does not exist is an error.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), BotFlowError> {
        let (mut config, source) = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(BotFlowError::config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                (Self::from_file(path)?, Some(path.to_path_buf()))
            }
            None => match default_config_path() {
                Some(path) => {
                    info!("Loaded configuration from: {}", path.display());
                    (Self::from_file(&path)?, Some(path))
                }
                None => (Self::default(), None),
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok((config, source))
    }

    /// Apply `BOTFLOW_*` / `ANTHROPIC_API_KEY` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), BotFlowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_FLOWS_DIR).filter(|v| !v.trim().is_empty()) {
            self.flows_dir = PathBuf::from(dir);
        }
        if let Some(mode) = lookup(ENV_HEAL_MODE) {
            self.heal_mode = mode.parse()?;
        }
        if let Some(raw) = lookup(ENV_HEADLESS) {
            match parse_bool(&raw) {
                Some(flag) => self.headless = flag,
                None => warn!(value = %raw, "Ignoring unparseable {ENV_HEADLESS}"),
            }
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.trim().is_empty()) {
            self.llm.api_key = Some(key);
        }
        Ok(())
    }
}

fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from("config/botflow.yaml");
    if local.exists() {
        return Some(local);
    }
    let user = dirs::config_dir()?.join("botflow").join("config.yaml");
    user.exists().then_some(user)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_yaml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.heal_mode, HealMode::Supervised);
        assert_eq!(config.resolver.strategy_timeout(), Duration::from_secs(2));
        assert_eq!(config.state_dir(), PathBuf::from("flows/.botflow/confidence"));
        assert!(config.llm.claude_config().is_none());
    }

    #[test]
    fn test_yaml_partial_document() {
        let config = EngineConfig::from_yaml_str(
            r#"
flows_dir: /srv/flows
heal_mode: auto
flow_heal_modes:
  checkout: off
resolver:
  strategy_timeout_ms: 500
llm:
  model: claude-test
  max_tokens: 1500
  vision_max_tokens: 300
"#,
        )
        .unwrap();
        assert_eq!(config.flows_dir, PathBuf::from("/srv/flows"));
        assert_eq!(config.heal_mode, HealMode::Auto);
        assert_eq!(config.flow_heal_modes["checkout"], HealMode::Off);
        assert_eq!(config.resolver.strategy_timeout_ms, 500);
        assert!(config.resolver.vision_fallback);
        assert_eq!(config.llm.model, "claude-test");
        assert_eq!(config.llm.max_tokens, 1_500);
        assert_eq!(config.llm.vision_max_tokens, 300);
        assert_eq!(config.max_dom_chars, 20_000);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_FLOWS_DIR, "/tmp/flows"),
            (ENV_HEAL_MODE, "OFF"),
            (ENV_HEADLESS, "no"),
            (ENV_API_KEY, "sk-test"),
        ]);
        let mut config = EngineConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.flows_dir, PathBuf::from("/tmp/flows"));
        assert_eq!(config.heal_mode, HealMode::Off);
        assert!(!config.headless);
        let claude = config.llm.claude_config().unwrap();
        assert_eq!(claude.api_key, "sk-test");

        let mut config = EngineConfig::default();
        let err = config
            .apply_overrides(|key| (key == ENV_HEAL_MODE).then(|| "sometimes".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("sometimes"));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(EngineConfig::load(Some(&missing)).is_err());

        let path = dir.path().join("botflow.yaml");
        std::fs::write(&path, "headless: false\nmax_dom_chars: 5000\n").unwrap();
        let config = EngineConfig::from_file(&path).unwrap();
        assert!(!config.headless);
        assert_eq!(config.max_dom_chars, 5000);
    }
}
