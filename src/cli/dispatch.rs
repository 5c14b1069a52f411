use super::confidence::cmd_confidence;
use super::env::CliArgs;
use super::flows::cmd_flows;
use super::health::cmd_health;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Flows(args) => cmd_flows(args, ctx).await,
        Commands::Health => cmd_health(ctx).await,
        Commands::Confidence(args) => cmd_confidence(args, ctx).await,
    }
}
