//! Action primitives implementation
//!
//! Ten step actions, one handler each:
//! 1. navigate - Load a URL
//! 2. click - Click element with fallback strategies
//! 3. fill - Replace an input's value
//! 4. type - Type text key by key
//! 5. extract - Read an element's text into the run
//! 6. wait - Wait for an element, a URL or a fixed delay
//! 7. screenshot - Capture the page to disk
//! 8. select - Choose a dropdown option
//! 9. hover - Move the pointer over an element
//! 10. scroll - Scroll an element into view or the page by an offset

mod click;
mod extract;
mod fill;
mod hover;
mod navigate;
mod screenshot;
mod scroll;
mod select;
mod type_text;
mod wait;

pub use click::*;
pub use extract::*;
pub use fill::*;
pub use hover::*;
pub use navigate::*;
pub use screenshot::*;
pub use scroll::*;
pub use select::*;
pub use type_text::*;
pub use wait::*;

use crate::{
    errors::ActionError,
    template::{render_template, TemplateScope},
    types::ExecutionContext,
};
use botflow_core_types::FlowStep;

/// Render the step's `value` template, `""` when absent.
pub(crate) fn rendered_value(step: &FlowStep, ctx: &ExecutionContext) -> Result<String, ActionError> {
    match &step.value {
        Some(template) => render_template(template, &TemplateScope::of(ctx)),
        None => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ActionHandler;
    use crate::types::ActionOutcome;
    use action_locator::{CascadeConfig, ResolverCascade};
    use botflow_core_types::{PostConditions, StepAction, TargetSelector};
    use cdp_adapter::fixture::{FixtureElement, FixturePage};
    use serde_json::{json, Map, Value};
    use std::sync::Arc;
    use std::time::Duration;

    fn ctx(params: Value) -> ExecutionContext {
        let params: Map<String, Value> = params.as_object().cloned().unwrap_or_default();
        let resolver = ResolverCascade::new(CascadeConfig {
            strategy_timeout: Duration::from_millis(200),
        });
        ExecutionContext::new(params, Arc::new(resolver))
    }

    fn form_page() -> FixturePage {
        FixturePage::new()
            .with_url("https://example.com/login")
            .with_element(FixtureElement::new("user").css("#user").label("Username"))
            .with_element(FixtureElement::new("dob").css("#dob"))
            .with_element(
                FixtureElement::new("submit")
                    .css("#submit")
                    .text("Sign in")
                    .role("button")
                    .navigates_to("https://example.com/home"),
            )
            .with_element(FixtureElement::new("balance").css(".balance").text("  $1,024.00 \n"))
            .with_element(
                FixtureElement::new("country")
                    .css("select#country")
                    .options(["FR", "DE"]),
            )
    }

    async fn run(
        handler: &dyn ActionHandler,
        page: &FixturePage,
        step: &FlowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<ActionOutcome, ActionError> {
        handler.execute(page, step, ctx).await
    }

    #[tokio::test]
    async fn test_navigate_renders_url() {
        let page = FixturePage::new();
        let mut ctx = ctx(json!({"host": "example.org"}));
        let step = FlowStep::new("open", StepAction::Navigate).with_url("https://{{params.host}}/a");
        run(&NavigateAction, &page, &step, &mut ctx).await.unwrap();
        assert_eq!(page.url(), "https://example.org/a");

        let no_url = FlowStep::new("open", StepAction::Navigate);
        let err = run(&NavigateAction, &page, &no_url, &mut ctx).await.unwrap_err();
        assert!(matches!(err, ActionError::MissingField("url")));
    }

    #[tokio::test]
    async fn test_fill_and_type() {
        let page = form_page();
        let mut ctx = ctx(json!({"user": "ada"}));

        let fill = FlowStep::new("user", StepAction::Fill)
            .with_target(TargetSelector::css("#user"))
            .with_value("{{params.user}}");
        let outcome = run(&FillAction, &page, &fill, &mut ctx).await.unwrap();
        assert_eq!(outcome.resolution_strategy.as_deref(), Some("css"));
        assert_eq!(page.element("user").unwrap().value(), "ada");

        let typed = FlowStep::new("dob", StepAction::Type)
            .with_target(TargetSelector::css("#dob"))
            .with_value("01/02/1990");
        run(&TypeAction, &page, &typed, &mut ctx).await.unwrap();
        assert_eq!(page.element("dob").unwrap().value(), "01/02/1990");
    }

    #[tokio::test]
    async fn test_dynamic_target_is_missing_target() {
        let page = form_page();
        let mut ctx = ctx(json!({}));
        let step: FlowStep = serde_json::from_value(json!({
            "id": "pick", "action": "click",
            "target": {"strategy": "find_by_text", "text": "Sign in"}
        }))
        .unwrap();
        let err = run(&ClickAction, &page, &step, &mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "No target selector");
    }

    #[tokio::test]
    async fn test_click_checks_post_conditions() {
        let page = form_page();
        let mut ctx = ctx(json!({}));
        let mut step = FlowStep::new("go", StepAction::Click).with_target(TargetSelector::css("#submit"));
        step.post_conditions = Some(PostConditions {
            url_changed_to: Some("https://example.com/home".into()),
            timeout_ms: 100,
            ..PostConditions::default()
        });
        run(&ClickAction, &page, &step, &mut ctx).await.unwrap();
        assert!(page.actions().contains(&"click submit".to_string()));
    }

    #[tokio::test]
    async fn test_click_falls_back_to_role() {
        let page = FixturePage::new()
            .with_element(FixtureElement::new("covered").css("#pay").failing_click())
            .with_element(FixtureElement::new("pay-button").text("Pay now").role("button"));
        let mut ctx = ctx(json!({}));
        let target = TargetSelector {
            css: Some("#pay".into()),
            text_content: Some("Pay now".into()),
            ..TargetSelector::default()
        };
        let step = FlowStep::new("pay", StepAction::Click).with_target(target);
        run(&ClickAction, &page, &step, &mut ctx).await.unwrap();
        assert!(page.actions().contains(&"click pay-button".to_string()));
    }

    #[tokio::test]
    async fn test_extract_saves_trimmed_text() {
        let page = form_page();
        let mut ctx = ctx(json!({}));
        let step = FlowStep::new("read", StepAction::Extract)
            .with_target(TargetSelector::css(".balance"))
            .with_save_as("balance");
        let outcome = run(&ExtractAction, &page, &step, &mut ctx).await.unwrap();
        assert_eq!(outcome.extracted_value, Some(json!("$1,024.00")));
        assert_eq!(ctx.extracted["balance"], json!("$1,024.00"));
    }

    #[tokio::test]
    async fn test_select_and_hover() {
        let page = form_page();
        let mut ctx = ctx(json!({"country": "DE"}));
        let select = FlowStep::new("country", StepAction::Select)
            .with_target(TargetSelector::css("select#country"))
            .with_value("{{params.country}}");
        run(&SelectAction, &page, &select, &mut ctx).await.unwrap();
        assert_eq!(page.element("country").unwrap().value(), "DE");

        let bad = select.clone().with_value("IT");
        assert!(run(&SelectAction, &page, &bad, &mut ctx).await.is_err());

        let hover = FlowStep::new("hover", StepAction::Hover).with_target(TargetSelector::aria("Username"));
        let outcome = run(&HoverAction, &page, &hover, &mut ctx).await.unwrap();
        assert_eq!(outcome.resolution_strategy.as_deref(), Some("aria"));
    }

    #[tokio::test]
    async fn test_scroll_page_and_element() {
        let page = form_page();
        let mut ctx = ctx(json!({}));
        let by_offset = FlowStep::new("down", StepAction::Scroll).with_value("400");
        run(&ScrollAction, &page, &by_offset, &mut ctx).await.unwrap();

        let to_element = FlowStep::new("to", StepAction::Scroll).with_target(TargetSelector::css("#submit"));
        run(&ScrollAction, &page, &to_element, &mut ctx).await.unwrap();

        let actions = page.actions();
        assert!(actions.contains(&"scroll_by 0,400".to_string()));
        assert!(actions.contains(&"scroll_into_view submit".to_string()));

        let garbage = FlowStep::new("bad", StepAction::Scroll).with_value("lots");
        assert!(matches!(
            run(&ScrollAction, &page, &garbage, &mut ctx).await,
            Err(ActionError::InvalidValue(_))
        ));
    }

    #[tokio::test]
    async fn test_wait_variants() {
        let page = form_page();
        let mut ctx = ctx(json!({}));

        let for_element = FlowStep::new("w1", StepAction::Wait)
            .with_target(TargetSelector::text("Sign in"))
            .with_timeout_ms(200);
        run(&WaitAction, &page, &for_element, &mut ctx).await.unwrap();

        let for_url = FlowStep::new("w2", StepAction::Wait)
            .with_url("https://example.com/*")
            .with_timeout_ms(200);
        run(&WaitAction, &page, &for_url, &mut ctx).await.unwrap();

        let delay = FlowStep::new("w3", StepAction::Wait).with_value("10");
        run(&WaitAction, &page, &delay, &mut ctx).await.unwrap();

        let missing = FlowStep::new("w4", StepAction::Wait)
            .with_target(TargetSelector::css("#never"))
            .with_timeout_ms(150);
        assert!(run(&WaitAction, &page, &missing, &mut ctx).await.is_err());
    }

    #[tokio::test]
    async fn test_screenshot_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let page = form_page();
        let mut ctx = ctx(json!({})).with_screenshots_dir(dir.path().join("shots"));
        let step = FlowStep::new("snap", StepAction::Screenshot);
        let outcome = run(&ScreenshotAction, &page, &step, &mut ctx).await.unwrap();
        let path = outcome.screenshot_path.unwrap();
        assert!(path.ends_with("snap.png"));
        assert!(std::path::Path::new(&path).exists());
    }

    #[tokio::test]
    async fn test_unresolvable_target_names_step() {
        let page = form_page();
        let mut ctx = ctx(json!({}));
        let step = FlowStep::new("ghost", StepAction::Click).with_target(TargetSelector::css("#ghost"));
        let err = run(&ClickAction, &page, &step, &mut ctx).await.unwrap_err();
        assert!(err.is_resolution());
        assert_eq!(
            err.to_string(),
            "Cannot resolve element for step 'ghost'. Tried: css"
        );
    }
}
