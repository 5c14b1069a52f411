//! Element resolution strategies
//!
//! Six strategies in fallback order:
//! 1. XPath - exact expression, match must be visible
//! 2. CSS - exact selector, match must be visible
//! 3. Text - exact text, exactly one visible match
//! 4. ARIA - label lookup, exactly one match
//! 5. Fuzzy text - substring match, first visible on ambiguity
//! 6. LLM vision - screenshot + DOM sent to a vision model (optional)

use crate::{errors::LocatorError, types::StrategyKind};
use agent_core::{parse_json_object, LlmClient, LlmRequest};
use async_trait::async_trait;
use botflow_core_types::TargetSelector;
use cdp_adapter::dom::truncate_chars;
use cdp_adapter::{dom_snapshot, Element, Page};
use std::sync::Arc;
use tracing::debug;

/// Strategy trait for element resolution
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Get strategy type
    fn kind(&self) -> StrategyKind;

    /// Get strategy name
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Whether the target carries the field this strategy needs.
    fn applies(&self, target: &TargetSelector) -> bool;

    /// Attempt to resolve one element. `Ok(None)` means not found.
    async fn resolve(
        &self,
        page: &dyn Page,
        target: &TargetSelector,
    ) -> Result<Option<Element>, LocatorError>;
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

async fn first_if_visible(matches: Vec<Element>) -> Result<Option<Element>, LocatorError> {
    let Some(element) = matches.into_iter().next() else {
        return Ok(None);
    };
    if element.is_visible().await? {
        Ok(Some(element))
    } else {
        Ok(None)
    }
}

async fn first_visible(matches: Vec<Element>) -> Result<Option<Element>, LocatorError> {
    for element in matches {
        if element.is_visible().await? {
            return Ok(Some(element));
        }
    }
    Ok(None)
}

/// XPath resolution strategy
#[derive(Debug, Default)]
pub struct XpathStrategy;

#[async_trait]
impl Strategy for XpathStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Xpath
    }

    fn applies(&self, target: &TargetSelector) -> bool {
        non_blank(&target.xpath).is_some()
    }

    async fn resolve(
        &self,
        page: &dyn Page,
        target: &TargetSelector,
    ) -> Result<Option<Element>, LocatorError> {
        let Some(xpath) = non_blank(&target.xpath) else {
            return Ok(None);
        };
        debug!(xpath, "Resolving XPath");
        first_if_visible(page.query_xpath(xpath).await?).await
    }
}

/// CSS selector resolution strategy
#[derive(Debug, Default)]
pub struct CssStrategy;

#[async_trait]
impl Strategy for CssStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Css
    }

    fn applies(&self, target: &TargetSelector) -> bool {
        non_blank(&target.css).is_some()
    }

    async fn resolve(
        &self,
        page: &dyn Page,
        target: &TargetSelector,
    ) -> Result<Option<Element>, LocatorError> {
        let Some(css) = non_blank(&target.css) else {
            return Ok(None);
        };
        debug!(css, "Resolving CSS selector");
        first_if_visible(page.query_css(css).await?).await
    }
}

/// Exact text resolution strategy
#[derive(Debug, Default)]
pub struct TextStrategy;

#[async_trait]
impl Strategy for TextStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Text
    }

    fn applies(&self, target: &TargetSelector) -> bool {
        non_blank(&target.text_content).is_some()
    }

    async fn resolve(
        &self,
        page: &dyn Page,
        target: &TargetSelector,
    ) -> Result<Option<Element>, LocatorError> {
        let Some(text) = non_blank(&target.text_content) else {
            return Ok(None);
        };
        let matches = page.find_by_text(text, true).await?;
        if matches.len() != 1 {
            debug!(text, count = matches.len(), "Exact text is not unique");
            return Ok(None);
        }
        first_if_visible(matches).await
    }
}

/// ARIA label resolution strategy
#[derive(Debug, Default)]
pub struct AriaStrategy;

#[async_trait]
impl Strategy for AriaStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Aria
    }

    fn applies(&self, target: &TargetSelector) -> bool {
        non_blank(&target.aria_label).is_some()
    }

    async fn resolve(
        &self,
        page: &dyn Page,
        target: &TargetSelector,
    ) -> Result<Option<Element>, LocatorError> {
        let Some(label) = non_blank(&target.aria_label) else {
            return Ok(None);
        };
        let matches = page.find_by_label(label).await?;
        if matches.len() == 1 {
            Ok(matches.into_iter().next())
        } else {
            debug!(label, count = matches.len(), "ARIA label is not unique");
            Ok(None)
        }
    }
}

/// Fuzzy (substring) text resolution strategy
#[derive(Debug, Default)]
pub struct FuzzyTextStrategy;

#[async_trait]
impl Strategy for FuzzyTextStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FuzzyText
    }

    fn applies(&self, target: &TargetSelector) -> bool {
        non_blank(&target.text_content).is_some()
    }

    async fn resolve(
        &self,
        page: &dyn Page,
        target: &TargetSelector,
    ) -> Result<Option<Element>, LocatorError> {
        let Some(text) = non_blank(&target.text_content) else {
            return Ok(None);
        };
        let matches = page.find_by_text(text, false).await?;
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.into_iter().next()),
            _ => first_visible(matches).await,
        }
    }
}

/// Vision-model resolution strategy, used as the last resort.
pub struct LlmVisionStrategy {
    client: Arc<dyn LlmClient>,
    max_tokens: u32,
}

impl LlmVisionStrategy {
    const DOM_CHARS: usize = 10_000;
    pub const DEFAULT_MAX_TOKENS: u32 = 500;

    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
        }
    }

    /// Reply budget of each vision request.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_prompt(target: &TargetSelector, dom: &str) -> String {
        let mut parts =
            vec!["Find an element on this page matching the following description:".to_string()];
        if let Some(css) = &target.css {
            parts.push(format!("Previous CSS: {css}"));
        }
        if let Some(xpath) = &target.xpath {
            parts.push(format!("Previous XPath: {xpath}"));
        }
        if let Some(text) = &target.text_content {
            parts.push(format!("Text content: {text}"));
        }
        if let Some(label) = &target.aria_label {
            parts.push(format!("Aria label: {label}"));
        }
        if let Some(anchor) = &target.visual_anchor {
            parts.push(format!("Visual description: {anchor}"));
        }
        parts.push(format!(
            "\nDOM (truncated):\n{}",
            truncate_chars(dom, Self::DOM_CHARS)
        ));
        parts.push(
            "\nReturn ONLY a JSON object with keys \"css\" and \"xpath\" for the element."
                .to_string(),
        );
        parts.join("\n")
    }
}

#[async_trait]
impl Strategy for LlmVisionStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LlmVision
    }

    fn applies(&self, target: &TargetSelector) -> bool {
        !target.is_empty()
    }

    async fn resolve(
        &self,
        page: &dyn Page,
        target: &TargetSelector,
    ) -> Result<Option<Element>, LocatorError> {
        let screenshot = page.screenshot().await?;
        let dom = dom_snapshot(page).await?;
        let request = LlmRequest::new(Self::build_prompt(target, &dom))
            .with_image(screenshot)
            .with_max_tokens(self.max_tokens);

        let reply = self.client.complete(&request).await?;
        let answer = parse_json_object(&reply).map_err(|err| LocatorError::StrategyFailed {
            strategy: self.name().to_string(),
            reason: err.to_string(),
        })?;

        if let Some(css) = answer.get("css").and_then(|v| v.as_str()).filter(|s| !s.is_empty()) {
            if let Some(element) = page.query_css(css).await?.into_iter().next() {
                debug!(css, "Vision model located element");
                return Ok(Some(element));
            }
        }
        if let Some(xpath) = answer
            .get("xpath")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
        {
            if let Some(element) = page.query_xpath(xpath).await?.into_iter().next() {
                debug!(xpath, "Vision model located element");
                return Ok(Some(element));
            }
        }
        Ok(None)
    }
}
