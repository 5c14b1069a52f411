//! Selector resolution cascade
//!
//! This crate maps a multi-field `TargetSelector` to exactly one live element:
//! - XPath and CSS lookups (visible matches only)
//! - Exact text and ARIA label lookups (unambiguous matches only)
//! - Fuzzy text fallback
//! - Optional vision-model fallback as the last resort
//!
//! Every strategy attempt is bounded by its own timeout and a failing
//! strategy never aborts the cascade.

pub mod errors;
pub mod resolver;
pub mod strategies;
pub mod types;

pub use errors::*;
pub use resolver::*;
pub use strategies::*;
pub use types::*;
