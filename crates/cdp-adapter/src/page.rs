//! Page and element contracts implemented by driver backends.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::dom::simplify_dom;
use crate::error::AdapterError;

/// Shared handle to a live element.
pub type Element = Arc<dyn ElementHandle>;

/// Operations on a single resolved element.
#[async_trait]
pub trait ElementHandle: Send + Sync + fmt::Debug {
    async fn is_visible(&self) -> Result<bool, AdapterError>;

    async fn click(&self) -> Result<(), AdapterError>;

    /// Replace the element's value in one operation.
    async fn fill(&self, value: &str) -> Result<(), AdapterError>;

    async fn hover(&self) -> Result<(), AdapterError>;

    async fn select_option(&self, value: &str) -> Result<(), AdapterError>;

    async fn scroll_into_view(&self) -> Result<(), AdapterError>;

    async fn text_content(&self) -> Result<Option<String>, AdapterError>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

/// A single browser page.
///
/// Query methods return every match in document order; an empty vector means
/// nothing matched. Ambiguity rules belong to the caller.
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), AdapterError>;

    async fn current_url(&self) -> Result<String, AdapterError>;

    async fn query_css(&self, selector: &str) -> Result<Vec<Element>, AdapterError>;

    async fn query_xpath(&self, expr: &str) -> Result<Vec<Element>, AdapterError>;

    /// Elements whose text equals `text` (`exact`) or contains it
    /// case-insensitively.
    async fn find_by_text(&self, text: &str, exact: bool) -> Result<Vec<Element>, AdapterError>;

    /// Elements labelled by `label` (aria-label or associated label).
    async fn find_by_label(&self, label: &str) -> Result<Vec<Element>, AdapterError>;

    /// Elements with the given ARIA role and accessible name.
    async fn find_by_role(&self, role: &str, name: &str) -> Result<Vec<Element>, AdapterError>;

    /// Full-page PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>, AdapterError>;

    /// Serialized HTML of the current document.
    async fn content(&self) -> Result<String, AdapterError>;

    /// Send key presses to the focused element with a per-key delay.
    async fn type_keys(&self, text: &str, delay: Duration) -> Result<(), AdapterError>;

    async fn scroll_by(&self, dx: i64, dy: i64) -> Result<(), AdapterError>;
}

/// Browser lifecycle owner handing out the active page.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn start(&self, headless: bool) -> Result<(), AdapterError>;

    async fn stop(&self) -> Result<(), AdapterError>;

    /// The active page. Errors with `NotStarted` before `start`.
    async fn page(&self) -> Result<Arc<dyn Page>, AdapterError>;
}

/// Simplified HTML of the page, suitable for LLM prompts.
pub async fn dom_snapshot(page: &dyn Page) -> Result<String, AdapterError> {
    let html = page.content().await?;
    Ok(simplify_dom(&html))
}
