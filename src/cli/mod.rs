pub mod app;
pub mod commands;
pub mod confidence;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod flows;
pub mod health;
pub mod output;
pub mod runtime;
