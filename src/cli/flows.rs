use anyhow::{bail, Context, Result};
use botflow::{model::Flow, FlowStore};
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::json;

use crate::cli::context::CliContext;
use crate::cli::output::{print_json, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct FlowsArgs {
    #[command(subcommand)]
    pub action: FlowsAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum FlowsAction {
    /// List every valid flow in the flows directory
    List,

    /// Show one flow definition
    Show {
        /// Flow id
        id: String,
    },

    /// Validate one flow, or every flow file when no id is given
    Validate {
        /// Flow id
        id: Option<String>,
    },
}

#[derive(Serialize)]
struct FlowSummary<'a> {
    flow_id: &'a str,
    site: &'a str,
    version: u32,
    steps: usize,
    params: Vec<&'a str>,
}

impl<'a> From<&'a Flow> for FlowSummary<'a> {
    fn from(flow: &'a Flow) -> Self {
        Self {
            flow_id: &flow.flow_id,
            site: &flow.site,
            version: flow.version,
            steps: flow.steps.len(),
            params: flow.params.keys().map(String::as_str).collect(),
        }
    }
}

pub async fn cmd_flows(args: FlowsArgs, ctx: &CliContext) -> Result<()> {
    match args.action {
        FlowsAction::List => list(ctx),
        FlowsAction::Show { id } => show(ctx, &id),
        FlowsAction::Validate { id } => validate(ctx, id.as_deref()),
    }
}

fn list(ctx: &CliContext) -> Result<()> {
    let store = ctx.store();
    let flows = store.load_all().context("Failed to list flows")?;
    let summaries: Vec<FlowSummary<'_>> = flows.values().map(FlowSummary::from).collect();

    match ctx.output() {
        OutputFormat::Json => print_json(&summaries)?,
        OutputFormat::Text => {
            if summaries.is_empty() {
                println!("No flows found in {}", store.flows_dir().display());
            }
            for flow in &summaries {
                println!(
                    "{:<32} v{:<3} {:>3} steps  {}",
                    flow.flow_id, flow.version, flow.steps, flow.site
                );
            }
        }
    }
    Ok(())
}

fn show(ctx: &CliContext, flow_id: &str) -> Result<()> {
    let flow = ctx.store().load(flow_id)?;
    match ctx.output() {
        OutputFormat::Json => print_json(&flow)?,
        OutputFormat::Text => {
            println!("Flow: {} (v{})", flow.flow_id, flow.version);
            println!("Site: {}", flow.site);
            if !flow.params.is_empty() {
                println!("Params:");
                for (name, param) in &flow.params {
                    let required = if param.required { "required" } else { "optional" };
                    println!("  {name}: {} ({required})", format!("{:?}", param.param_type).to_lowercase());
                }
            }
            println!("Steps:");
            for (index, step) in flow.steps.iter().enumerate() {
                let optional = if step.optional { " [optional]" } else { "" };
                let description = step.description.as_deref().unwrap_or("");
                println!(
                    "  {:>2}. {:<20} {:<10}{optional} {description}",
                    index + 1,
                    step.id,
                    step.action.as_str()
                );
            }
        }
    }
    Ok(())
}

fn validate(ctx: &CliContext, flow_id: Option<&str>) -> Result<()> {
    let store = ctx.store();

    let outcomes: Vec<(String, Option<String>)> = match flow_id {
        Some(id) => {
            // reload so a stale cache never hides a broken file
            let outcome = store.reload(id).map(|_| ()).map_err(|err| err.to_string());
            vec![(id.to_string(), outcome.err())]
        }
        None => store
            .check_all()
            .into_iter()
            .map(|(path, outcome)| (path.display().to_string(), outcome.err().map(|e| e.to_string())))
            .collect(),
    };

    let failures = outcomes.iter().filter(|(_, err)| err.is_some()).count();
    match ctx.output() {
        OutputFormat::Json => {
            let report: Vec<_> = outcomes
                .iter()
                .map(|(name, err)| json!({"flow": name, "valid": err.is_none(), "error": err}))
                .collect();
            print_json(&report)?;
        }
        OutputFormat::Text => {
            for (name, err) in &outcomes {
                match err {
                    None => println!("ok    {name}"),
                    Some(err) => println!("FAIL  {name}: {err}"),
                }
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} flow(s) failed validation", outcomes.len());
    }
    Ok(())
}
