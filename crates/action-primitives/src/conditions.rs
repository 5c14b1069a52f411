//! Pre- and post-condition checks around a step

use crate::errors::ActionError;
use crate::waiting::{wait_for_selector_state, wait_for_url};
use botflow_core_types::{PostConditions, PreConditions};
use cdp_adapter::Page;
use regex::Regex;
use std::time::Duration;

/// Check the page state a step expects before it runs.
///
/// `url_pattern` is a regular expression searched in the current URL;
/// every entry of `expected_elements` must match at least one element.
pub async fn check_pre_conditions(
    page: &dyn Page,
    conditions: &PreConditions,
) -> Result<(), ActionError> {
    if let Some(pattern) = &conditions.url_pattern {
        let re = Regex::new(pattern)
            .map_err(|err| ActionError::condition(format!("invalid url_pattern '{pattern}': {err}")))?;
        let url = page.current_url().await?;
        if !re.is_match(&url) {
            return Err(ActionError::condition(format!(
                "URL '{url}' does not match '{pattern}'"
            )));
        }
    }
    for selector in &conditions.expected_elements {
        if page.query_css(selector).await?.is_empty() {
            return Err(ActionError::condition(format!(
                "expected element '{selector}' is missing"
            )));
        }
    }
    Ok(())
}

/// Verify the effects a step should have produced.
pub async fn verify_post_conditions(
    page: &dyn Page,
    conditions: &PostConditions,
) -> Result<(), ActionError> {
    let timeout = Duration::from_millis(conditions.timeout_ms);
    if let Some(selector) = &conditions.element_appears {
        wait_for_selector_state(page, selector, true, timeout).await?;
    }
    if let Some(selector) = &conditions.element_disappears {
        wait_for_selector_state(page, selector, false, timeout).await?;
    }
    if let Some(url) = &conditions.url_changed_to {
        wait_for_url(page, url, timeout).await?;
    }
    Ok(())
}

/// Convenience used by handlers: verify only when the step declares checks.
pub async fn verify_optional(
    page: &dyn Page,
    conditions: Option<&PostConditions>,
) -> Result<(), ActionError> {
    match conditions {
        Some(conditions) => verify_post_conditions(page, conditions).await,
        None => Ok(()),
    }
}
