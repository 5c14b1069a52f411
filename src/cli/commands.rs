use clap::Subcommand;

use super::confidence::ConfidenceArgs;
use super::flows::FlowsArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// List, show and validate flow definitions
    Flows(FlowsArgs),

    /// Show heal mode, threshold and recent run health of every flow
    Health,

    /// Inspect or adjust auto-heal confidence state
    Confidence(ConfidenceArgs),
}
