//! Flow Orchestration Layer
//!
//! Runs a [`Flow`](botflow_core_types::Flow) step by step: validates the
//! flow and its parameters, dispatches each step through the action
//! registry under its own timeout, aggregates the run status and evaluates
//! the flow's returns.

pub mod errors;
pub mod params;
pub mod runner;

pub use errors::FlowError;
pub use params::resolve_params;
pub use runner::FlowRunner;
