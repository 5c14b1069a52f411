//! Resolver cascade with per-strategy timeouts

use crate::{errors::LocatorError, strategies::*, types::*};
use agent_core::LlmClient;
use async_trait::async_trait;
use botflow_core_types::TargetSelector;
use cdp_adapter::Page;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Default bound on a single strategy attempt.
pub const DEFAULT_STRATEGY_TIMEOUT: Duration = Duration::from_secs(2);

/// Element resolver trait
#[async_trait]
pub trait ElementResolver: Send + Sync {
    /// Resolve exactly one element for `target`.
    async fn resolve(
        &self,
        page: &dyn Page,
        target: &TargetSelector,
    ) -> Result<Resolution, LocatorError>;
}

#[derive(Debug, Clone)]
pub struct CascadeConfig {
    pub strategy_timeout: Duration,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            strategy_timeout: DEFAULT_STRATEGY_TIMEOUT,
        }
    }
}

/// Ordered, fail-through list of strategies.
///
/// Strategies run one after another; the first hit wins. A strategy whose
/// field is absent on the target is skipped and not reported. Timeouts and
/// errors are recorded as `name(timeout)` / `name(error)` and the cascade
/// moves on.
pub struct ResolverCascade {
    strategies: Vec<Arc<dyn Strategy>>,
    config: CascadeConfig,
}

impl ResolverCascade {
    /// Cascade with the five DOM strategies.
    pub fn new(config: CascadeConfig) -> Self {
        Self {
            strategies: vec![
                Arc::new(XpathStrategy),
                Arc::new(CssStrategy),
                Arc::new(TextStrategy),
                Arc::new(AriaStrategy),
                Arc::new(FuzzyTextStrategy),
            ],
            config,
        }
    }

    /// Cascade with explicit strategies, tried in the given order.
    pub fn with_strategies(strategies: Vec<Arc<dyn Strategy>>, config: CascadeConfig) -> Self {
        Self { strategies, config }
    }

    /// Append the vision fallback as the last strategy.
    pub fn with_vision(self, client: Arc<dyn LlmClient>) -> Self {
        self.with_vision_strategy(LlmVisionStrategy::new(client))
    }

    /// Append a preconfigured vision strategy as the last strategy.
    pub fn with_vision_strategy(mut self, strategy: LlmVisionStrategy) -> Self {
        self.strategies.push(Arc::new(strategy));
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

impl Default for ResolverCascade {
    fn default() -> Self {
        Self::new(CascadeConfig::default())
    }
}

#[async_trait]
impl ElementResolver for ResolverCascade {
    async fn resolve(
        &self,
        page: &dyn Page,
        target: &TargetSelector,
    ) -> Result<Resolution, LocatorError> {
        debug!(target = %target.describe(), "Resolving element");
        let mut tried = Vec::new();

        for strategy in &self.strategies {
            if !strategy.applies(target) {
                continue;
            }
            let name = strategy.name();

            match timeout(self.config.strategy_timeout, strategy.resolve(page, target)).await {
                Ok(Ok(Some(element))) => {
                    info!(
                        strategy = name,
                        element = %element.describe(),
                        "Resolved element"
                    );
                    return Ok(Resolution::new(element, strategy.kind()));
                }
                Ok(Ok(None)) => {
                    debug!(strategy = name, "Strategy found nothing");
                    tried.push(name.to_string());
                }
                Ok(Err(err)) => {
                    warn!(strategy = name, error = %err, "Strategy failed");
                    tried.push(format!("{name}(error)"));
                }
                Err(_) => {
                    warn!(
                        strategy = name,
                        timeout_ms = self.config.strategy_timeout.as_millis() as u64,
                        "Strategy timed out"
                    );
                    tried.push(format!("{name}(timeout)"));
                }
            }
        }

        Err(LocatorError::exhausted(tried))
    }
}
