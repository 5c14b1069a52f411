use anyhow::{bail, Result};
use botflow::model::ConfidenceState;
use clap::{Args, Subcommand};
use tracing::info;

use crate::cli::context::CliContext;
use crate::cli::output::{print_json, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ConfidenceArgs {
    #[command(subcommand)]
    pub action: ConfidenceAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfidenceAction {
    /// Show the confidence state of a flow
    Show {
        /// Flow id
        id: String,
    },

    /// Set the auto-heal threshold of a flow (0-100)
    Set {
        /// Flow id
        id: String,

        /// New threshold
        value: f64,
    },

    /// Discard a flow's confidence state
    Reset {
        /// Flow id
        id: String,
    },
}

pub async fn cmd_confidence(args: ConfidenceArgs, ctx: &CliContext) -> Result<()> {
    let tracker = ctx.tracker();
    match args.action {
        ConfidenceAction::Show { id } => {
            let state = tracker.state(&id)?;
            print_state(ctx, &state)?;
        }
        ConfidenceAction::Set { id, value } => {
            if !value.is_finite() {
                bail!("Threshold must be a number, got {value}");
            }
            let state = tracker.set_threshold(&id, value)?;
            info!(flow_id = %id, threshold = state.auto_threshold, "Threshold updated");
            print_state(ctx, &state)?;
        }
        ConfidenceAction::Reset { id } => {
            tracker.reset(&id)?;
            match ctx.output() {
                OutputFormat::Json => print_json(&serde_json::json!({"flow_id": id, "reset": true}))?,
                OutputFormat::Text => println!("Confidence state for '{id}' reset"),
            }
        }
    }
    Ok(())
}

fn print_state(ctx: &CliContext, state: &ConfidenceState) -> Result<()> {
    match ctx.output() {
        OutputFormat::Json => print_json(state)?,
        OutputFormat::Text => {
            println!("Flow: {}", state.flow_id);
            println!("  Auto-heal threshold:  {:.1}", state.auto_threshold);
            println!(
                "  Consecutive heals:    {} ok / {} failed",
                state.consecutive_successful_heals, state.consecutive_failed_heals
            );
            println!(
                "  Total heals:          {} ok / {} failed",
                state.total_successful_heals, state.total_failed_heals
            );
        }
    }
    Ok(())
}
