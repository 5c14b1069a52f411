//! Polling waits built on the page query primitives

use crate::errors::ActionError;
use botflow_core_types::TargetSelector;
use cdp_adapter::{Element, Page};
use regex::Regex;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Interval between two polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Wait until any of the target's css / xpath / exact-text lookups matches a
/// visible element.
///
/// Returns `Ok(None)` when the target has none of those fields.
pub async fn wait_for_any(
    page: &dyn Page,
    target: &TargetSelector,
    timeout: Duration,
) -> Result<Option<Element>, ActionError> {
    let has_lookup = target.css.is_some()
        || target.xpath.is_some()
        || target
            .text_content
            .as_deref()
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false);
    if !has_lookup {
        return Ok(None);
    }

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(element) = first_match(page, target).await? {
            return Ok(Some(element));
        }
        if Instant::now() >= deadline {
            return Err(ActionError::WaitTimeout(format!(
                "element {} did not appear within {}ms",
                target.describe(),
                timeout.as_millis()
            )));
        }
        sleep(POLL_INTERVAL).await;
    }
}

async fn first_match(
    page: &dyn Page,
    target: &TargetSelector,
) -> Result<Option<Element>, ActionError> {
    if let Some(css) = &target.css {
        if let Some(el) = first_visible(page.query_css(css).await?).await? {
            return Ok(Some(el));
        }
    }
    if let Some(xpath) = &target.xpath {
        if let Some(el) = first_visible(page.query_xpath(xpath).await?).await? {
            return Ok(Some(el));
        }
    }
    if let Some(text) = target.text_content.as_deref().filter(|t| !t.trim().is_empty()) {
        if let Some(el) = first_visible(page.find_by_text(text, true).await?).await? {
            return Ok(Some(el));
        }
    }
    Ok(None)
}

async fn first_visible(candidates: Vec<Element>) -> Result<Option<Element>, ActionError> {
    for element in candidates {
        if element.is_visible().await? {
            return Ok(Some(element));
        }
    }
    Ok(None)
}

/// Wait until `selector` matches a visible element (`present`) or no longer
/// matches a visible one (`!present`).
pub async fn wait_for_selector_state(
    page: &dyn Page,
    selector: &str,
    present: bool,
    timeout: Duration,
) -> Result<(), ActionError> {
    let deadline = Instant::now() + timeout;
    loop {
        let mut visible = false;
        for element in page.query_css(selector).await? {
            if element.is_visible().await? {
                visible = true;
                break;
            }
        }
        if visible == present {
            return Ok(());
        }
        if Instant::now() >= deadline {
            let state = if present { "appear" } else { "disappear" };
            return Err(ActionError::WaitTimeout(format!(
                "'{selector}' did not {state} within {}ms",
                timeout.as_millis()
            )));
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Wait until the page URL matches `pattern`.
pub async fn wait_for_url(
    page: &dyn Page,
    pattern: &str,
    timeout: Duration,
) -> Result<(), ActionError> {
    let deadline = Instant::now() + timeout;
    loop {
        let current = page.current_url().await?;
        if url_matches(pattern, &current) {
            debug!(url = %current, pattern, "URL matched");
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(ActionError::WaitTimeout(format!(
                "URL '{current}' did not match '{pattern}' within {}ms",
                timeout.as_millis()
            )));
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Exact match, or glob match where `*` spans any characters.
pub fn url_matches(pattern: &str, url: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == url;
    }
    let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
    Regex::new(&format!("^{}$", escaped.join(".*")))
        .map(|re| re.is_match(url))
        .unwrap_or(false)
}
