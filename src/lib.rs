//! BotFlow library
//!
//! Self-healing browser flow automation. The layer crates provide the model,
//! the browser and LLM ports, selector resolution, step actions and the
//! flow runner; this crate adds flow storage, healing, confidence tracking
//! and the [`BotEngine`] that ties them together.

pub mod confidence;
pub mod config;
pub mod engine;
pub mod errors;
pub mod self_heal;
pub mod storage;

pub use confidence::{adjust_threshold, ConfidenceTracker};
pub use config::EngineConfig;
pub use engine::{BotEngine, HealApprover};
pub use errors::{BotFlowError, BotFlowResult};
pub use self_heal::{AutoHealer, HealError};
pub use storage::{FlowStore, JsonFlowStore};

// Re-export the model so callers need a single dependency
pub use botflow_core_types as model;
