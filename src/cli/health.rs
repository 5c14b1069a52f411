use anyhow::{Context, Result};

use crate::cli::context::CliContext;
use crate::cli::output::{print_json, OutputFormat};

/// Report per-flow health. Run history lives in the engine process, so a
/// fresh CLI invocation shows configuration and confidence state only.
pub async fn cmd_health(ctx: &CliContext) -> Result<()> {
    let engine = ctx.engine()?;
    let health = engine.flow_health().context("Failed to compute flow health")?;

    match ctx.output() {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Text => {
            if health.is_empty() {
                println!("No flows found in {}", ctx.config().flows_dir.display());
                return Ok(());
            }
            println!(
                "{:<32} {:<11} {:>9} {:>8} {:>6}  last run",
                "flow", "heal mode", "threshold", "success", "heals"
            );
            for entry in health.values() {
                let last_run = entry
                    .last_run
                    .as_ref()
                    .map(|run| format!("{} ({})", run.started_at.to_rfc3339(), run.status.as_str()))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<32} {:<11} {:>9.1} {:>7.0}% {:>6}  {last_run}",
                    entry.flow_id,
                    entry.heal_mode.as_str(),
                    entry.auto_heal_threshold,
                    entry.success_rate_7d * 100.0,
                    entry.heals_count_7d,
                );
            }
        }
    }
    Ok(())
}
