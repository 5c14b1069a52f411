//! Core types for the resolver cascade

use cdp_adapter::Element;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolution strategies, in cascade priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Exact XPath expression
    Xpath,

    /// Exact CSS selector
    Css,

    /// Exact, unambiguous text content
    Text,

    /// Unambiguous ARIA label
    Aria,

    /// Case-insensitive substring text match
    FuzzyText,

    /// Vision model reading a screenshot of the page
    LlmVision,
}

impl StrategyKind {
    /// Get strategy name as string
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Xpath => "xpath",
            StrategyKind::Css => "css",
            StrategyKind::Text => "text",
            StrategyKind::Aria => "aria",
            StrategyKind::FuzzyText => "fuzzy_text",
            StrategyKind::LlmVision => "llm_vision",
        }
    }

    /// All strategies in fallback order
    pub fn fallback_chain() -> [StrategyKind; 6] {
        [
            StrategyKind::Xpath,
            StrategyKind::Css,
            StrategyKind::Text,
            StrategyKind::Aria,
            StrategyKind::FuzzyText,
            StrategyKind::LlmVision,
        ]
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element found by the cascade together with the strategy that found it.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub element: Element,
    pub strategy: StrategyKind,
}

impl Resolution {
    pub fn new(element: Element, strategy: StrategyKind) -> Self {
        Self { element, strategy }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }
}
