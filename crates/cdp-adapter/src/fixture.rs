//! In-memory page used by tests and dry runs.
//!
//! Elements are declared up front with the selectors, text and labels they
//! answer to; queries match those declarations literally. Every interaction is
//! appended to an action log so callers can assert on what happened.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};

use crate::error::{AdapterError, AdapterErrorKind};
use crate::page::{Browser, Element, ElementHandle, Page};

/// Minimal PNG signature returned by [`FixturePage::screenshot`].
pub const FIXTURE_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Page reads that can be slowed down or broken for a test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Css,
    Xpath,
    Text,
    Label,
    Role,
    Screenshot,
}

#[derive(Debug, Default)]
struct PageState {
    url: Mutex<String>,
    log: Mutex<Vec<String>>,
    focused: Mutex<Option<String>>,
}

impl PageState {
    fn record(&self, entry: String) {
        self.log.lock().push(entry);
    }
}

/// Declarative element living on a [`FixturePage`].
#[derive(Debug)]
pub struct FixtureElement {
    name: String,
    css: Vec<String>,
    xpath: Vec<String>,
    text: Option<String>,
    label: Option<String>,
    role: Option<String>,
    visible: bool,
    click_fails: bool,
    navigates_to: Option<String>,
    options: Vec<String>,
    value: Mutex<String>,
    state: OnceCell<Arc<PageState>>,
}

impl FixtureElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            css: Vec::new(),
            xpath: Vec::new(),
            text: None,
            label: None,
            role: None,
            visible: true,
            click_fails: false,
            navigates_to: None,
            options: Vec::new(),
            value: Mutex::new(String::new()),
            state: OnceCell::new(),
        }
    }

    pub fn css(mut self, selector: impl Into<String>) -> Self {
        self.css.push(selector.into());
        self
    }

    pub fn xpath(mut self, expr: impl Into<String>) -> Self {
        self.xpath.push(expr.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Direct element clicks fail; page-level fallbacks still work.
    pub fn failing_click(mut self) -> Self {
        self.click_fails = true;
        self
    }

    /// Clicking changes the page URL.
    pub fn navigates_to(mut self, url: impl Into<String>) -> Self {
        self.navigates_to = Some(url.into());
        self
    }

    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> String {
        self.value.lock().clone()
    }

    fn record(&self, entry: String) {
        if let Some(state) = self.state.get() {
            state.record(entry);
        }
    }

    fn ensure_interactable(&self) -> Result<(), AdapterError> {
        if self.visible {
            Ok(())
        } else {
            Err(AdapterError::new(AdapterErrorKind::NotInteractable)
                .with_hint(format!("element '{}' is hidden", self.name)))
        }
    }

    fn matches_text(&self, query: &str, exact: bool) -> bool {
        let Some(text) = &self.text else {
            return false;
        };
        if exact {
            text.trim() == query.trim()
        } else {
            text.to_lowercase().contains(&query.trim().to_lowercase())
        }
    }

    fn matches_label(&self, query: &str) -> bool {
        self.label
            .as_deref()
            .map(|label| label.to_lowercase().contains(&query.trim().to_lowercase()))
            .unwrap_or(false)
    }

    fn accessible_name(&self) -> Option<&str> {
        self.label.as_deref().or(self.text.as_deref())
    }
}

#[async_trait]
impl ElementHandle for FixtureElement {
    async fn is_visible(&self) -> Result<bool, AdapterError> {
        Ok(self.visible)
    }

    async fn click(&self) -> Result<(), AdapterError> {
        self.ensure_interactable()?;
        if self.click_fails {
            return Err(AdapterError::new(AdapterErrorKind::NotInteractable)
                .with_hint(format!("click on '{}' intercepted", self.name)));
        }
        self.record(format!("click {}", self.name));
        if let Some(state) = self.state.get() {
            *state.focused.lock() = Some(self.name.clone());
            if let Some(url) = &self.navigates_to {
                *state.url.lock() = url.clone();
            }
        }
        Ok(())
    }

    async fn fill(&self, value: &str) -> Result<(), AdapterError> {
        self.ensure_interactable()?;
        *self.value.lock() = value.to_string();
        self.record(format!("fill {}={}", self.name, value));
        Ok(())
    }

    async fn hover(&self) -> Result<(), AdapterError> {
        self.ensure_interactable()?;
        self.record(format!("hover {}", self.name));
        Ok(())
    }

    async fn select_option(&self, value: &str) -> Result<(), AdapterError> {
        self.ensure_interactable()?;
        if !self.options.iter().any(|option| option == value) {
            return Err(AdapterError::new(AdapterErrorKind::OptionNotFound)
                .with_hint(format!("'{}' has no option '{}'", self.name, value)));
        }
        *self.value.lock() = value.to_string();
        self.record(format!("select {}={}", self.name, value));
        Ok(())
    }

    async fn scroll_into_view(&self) -> Result<(), AdapterError> {
        self.record(format!("scroll_into_view {}", self.name));
        Ok(())
    }

    async fn text_content(&self) -> Result<Option<String>, AdapterError> {
        Ok(self.text.clone())
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// In-memory [`Page`] implementation.
#[derive(Debug, Default)]
pub struct FixturePage {
    state: Arc<PageState>,
    elements: RwLock<Vec<Arc<FixtureElement>>>,
    html: RwLock<String>,
    delays: Mutex<HashMap<QueryKind, Duration>>,
    failing: Mutex<HashSet<QueryKind>>,
}

impl FixturePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(self, url: impl Into<String>) -> Self {
        *self.state.url.lock() = url.into();
        self
    }

    pub fn with_html(self, html: impl Into<String>) -> Self {
        *self.html.write() = html.into();
        self
    }

    pub fn with_element(self, element: FixtureElement) -> Self {
        self.add_element(element);
        self
    }

    pub fn add_element(&self, element: FixtureElement) -> Arc<FixtureElement> {
        let _ = element.state.set(self.state.clone());
        let element = Arc::new(element);
        self.elements.write().push(element.clone());
        element
    }

    /// Remove every element answering to the given CSS selector.
    pub fn remove_css(&self, selector: &str) {
        self.elements
            .write()
            .retain(|el| !el.css.iter().any(|css| css == selector));
    }

    /// Make every query of `kind` sleep before answering.
    pub fn delay_queries(&self, kind: QueryKind, delay: Duration) {
        self.delays.lock().insert(kind, delay);
    }

    /// Make every query of `kind` fail with a driver error.
    pub fn fail_queries(&self, kind: QueryKind) {
        self.failing.lock().insert(kind);
    }

    pub fn element(&self, name: &str) -> Option<Arc<FixtureElement>> {
        self.elements.read().iter().find(|el| el.name == name).cloned()
    }

    pub fn actions(&self) -> Vec<String> {
        self.state.log.lock().clone()
    }

    pub fn url(&self) -> String {
        self.state.url.lock().clone()
    }

    async fn gate(&self, kind: QueryKind) -> Result<(), AdapterError> {
        let delay = self.delays.lock().get(&kind).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().contains(&kind) {
            return Err(AdapterError::new(AdapterErrorKind::DriverIo)
                .with_hint(format!("{kind:?} query failed")));
        }
        Ok(())
    }

    fn collect(&self, predicate: impl Fn(&FixtureElement) -> bool) -> Vec<Element> {
        self.elements
            .read()
            .iter()
            .filter(|el| predicate(el))
            .map(|el| el.clone() as Element)
            .collect()
    }
}

#[async_trait]
impl Page for FixturePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), AdapterError> {
        *self.state.url.lock() = url.to_string();
        self.state.record(format!("goto {url}"));
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AdapterError> {
        Ok(self.url())
    }

    async fn query_css(&self, selector: &str) -> Result<Vec<Element>, AdapterError> {
        self.gate(QueryKind::Css).await?;
        Ok(self.collect(|el| el.css.iter().any(|css| css == selector)))
    }

    async fn query_xpath(&self, expr: &str) -> Result<Vec<Element>, AdapterError> {
        self.gate(QueryKind::Xpath).await?;
        Ok(self.collect(|el| el.xpath.iter().any(|xpath| xpath == expr)))
    }

    async fn find_by_text(&self, text: &str, exact: bool) -> Result<Vec<Element>, AdapterError> {
        self.gate(QueryKind::Text).await?;
        Ok(self.collect(|el| el.matches_text(text, exact)))
    }

    async fn find_by_label(&self, label: &str) -> Result<Vec<Element>, AdapterError> {
        self.gate(QueryKind::Label).await?;
        Ok(self.collect(|el| el.matches_label(label)))
    }

    async fn find_by_role(&self, role: &str, name: &str) -> Result<Vec<Element>, AdapterError> {
        self.gate(QueryKind::Role).await?;
        Ok(self.collect(|el| {
            el.role.as_deref() == Some(role)
                && el.accessible_name().map(str::trim) == Some(name.trim())
        }))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, AdapterError> {
        self.gate(QueryKind::Screenshot).await?;
        Ok(FIXTURE_PNG.to_vec())
    }

    async fn content(&self) -> Result<String, AdapterError> {
        let html = self.html.read().clone();
        if !html.is_empty() {
            return Ok(html);
        }
        let body: Vec<String> = self
            .elements
            .read()
            .iter()
            .map(|el| {
                format!(
                    "<div data-name=\"{}\">{}</div>",
                    el.name,
                    el.text.clone().unwrap_or_default()
                )
            })
            .collect();
        Ok(format!("<html><body>{}</body></html>", body.join("\n")))
    }

    async fn type_keys(&self, text: &str, _delay: Duration) -> Result<(), AdapterError> {
        let focused = self.state.focused.lock().clone();
        let Some(name) = focused else {
            return Err(AdapterError::new(AdapterErrorKind::NotInteractable)
                .with_hint("no focused element to type into"));
        };
        if let Some(element) = self.element(&name) {
            element.value.lock().push_str(text);
        }
        self.state.record(format!("type {name}={text}"));
        Ok(())
    }

    async fn scroll_by(&self, dx: i64, dy: i64) -> Result<(), AdapterError> {
        self.state.record(format!("scroll_by {dx},{dy}"));
        Ok(())
    }
}

/// [`Browser`] wrapper serving a single shared [`FixturePage`].
#[derive(Debug)]
pub struct FixtureBrowser {
    page: Arc<FixturePage>,
    started: AtomicBool,
}

impl FixtureBrowser {
    pub fn new(page: Arc<FixturePage>) -> Self {
        Self {
            page,
            started: AtomicBool::new(false),
        }
    }

    pub fn fixture(&self) -> &Arc<FixturePage> {
        &self.page
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Browser for FixtureBrowser {
    async fn start(&self, _headless: bool) -> Result<(), AdapterError> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), AdapterError> {
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn page(&self) -> Result<Arc<dyn Page>, AdapterError> {
        if !self.is_started() {
            return Err(AdapterError::new(AdapterErrorKind::NotStarted)
                .with_hint("call start() before executing flows"));
        }
        Ok(self.page.clone() as Arc<dyn Page>)
    }
}
