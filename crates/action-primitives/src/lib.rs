//! Step action handlers
//!
//! This crate turns a single [`FlowStep`](botflow_core_types::FlowStep) into
//! browser operations:
//! - one handler per step action, looked up through an explicit registry
//! - `{{params.x}}` / `{{extracted.x}}` templating for urls and values
//! - pre/post-condition checks and polling waits

pub mod conditions;
pub mod errors;
mod primitives;
pub mod registry;
pub mod template;
pub mod types;
pub mod waiting;

pub use conditions::{check_pre_conditions, verify_post_conditions};
pub use errors::ActionError;
pub use primitives::*;
pub use registry::{ActionHandler, ActionRegistry};
pub use template::{render_template, render_value, TemplateScope};
pub use types::{require_selector, ActionOutcome, ExecutionContext};
pub use waiting::{url_matches, wait_for_any, wait_for_url};
