//! Discovery and execution commands

use crate::display::{self, status_icon, truncate};
use crate::input::{
    default_graph_input, load_input_file, parse_input_vars, sample_workflow_input,
};
use crate::prompt::Prompter;
use crate::track;
use crate::{ListKind, TargetKind};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use oo_client::filters::{GraphFilter, WorkflowFilter};
use oo_client::{OuroborosClient, PollOptions};
use oo_core::{
    display_value, ErrorKind, ExecutionResponse, GraphExecutionRequest, GraphSummary, JsonMap,
    OoError, WorkflowExecutionRequest, WorkflowSummary,
};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Name of the graph or workflow
    #[arg(long)]
    pub name: String,

    /// Target type (probed when omitted: graph first, then workflow)
    #[arg(long = "type", value_enum)]
    pub kind: Option<TargetKind>,

    /// JSON file with the input state or input values
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Input values as key=value pairs (values may be JSON)
    #[arg(
        long = "input-var",
        visible_alias = "input-vars",
        value_name = "KEY=VALUE",
        num_args = 1..
    )]
    pub input_vars: Vec<String>,

    /// Always prompt for workflow input, merging over any given input
    #[arg(long, conflicts_with = "no_dynamic_input")]
    pub dynamic_input: bool,

    /// Never prompt; fall back to sample values when no input is given
    #[arg(long)]
    pub no_dynamic_input: bool,

    /// Start the workflow asynchronously
    #[arg(long = "async")]
    pub async_execution: bool,

    /// With --async, wait for the execution to finish
    #[arg(long, requires = "async_execution")]
    pub wait: bool,

    /// Seconds between status checks while waiting
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Seconds to wait before giving up
    #[arg(long, value_name = "SECS")]
    pub max_wait: Option<u64>,

    /// Workspace directory passed to the execution
    #[arg(long, value_name = "DIR")]
    pub system_workspace: Option<String>,

    /// Save the execution result to a JSON file
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub async fn cmd_list(client: &OuroborosClient, kind: ListKind) -> Result<bool> {
    let mut success = true;

    if matches!(kind, ListKind::Graph | ListKind::All) {
        println!("🔍 Discovering available graphs...");
        match client.list_graphs(&GraphFilter::default()).await {
            Ok(graphs) if !graphs.is_empty() => {
                println!("\n{}", format!("📊 Available Graphs ({}):", graphs.len()).bold());
                for graph in &graphs {
                    println!(
                        "   {} {} ({}) - {}",
                        status_icon(graph.is_available()),
                        graph.display_name().bright_cyan(),
                        graph.category.as_deref().unwrap_or("Unknown"),
                        graph.status.as_deref().unwrap_or("Unknown")
                    );
                }
            }
            outcome => {
                if let Err(e) = outcome {
                    println!("{} {}", "❌ Failed to discover graphs:".red(), e);
                }
                println!("\n{}", "❌ No graphs available".red());
                success = false;
            }
        }
    }

    if matches!(kind, ListKind::Workflow | ListKind::All) {
        println!("🔍 Discovering available workflows...");
        match client.list_workflows(&WorkflowFilter::default()).await {
            Ok(workflows) if !workflows.is_empty() => {
                println!(
                    "\n{}",
                    format!("🔄 Available Workflows ({}):", workflows.len()).bold()
                );
                for workflow in &workflows {
                    let asis_icon = if workflow.asis_compatible { "🎯" } else { "📦" };
                    println!(
                        "   {} {} {} (ID: {})",
                        status_icon(workflow.is_active()),
                        asis_icon,
                        workflow.display_name().bright_cyan(),
                        workflow.id()
                    );
                    println!(
                        "      {}",
                        workflow.description.as_deref().unwrap_or("No description")
                    );
                }
            }
            outcome => {
                if let Err(e) = outcome {
                    println!("{} {}", "❌ Failed to discover workflows:".red(), e);
                }
                println!("\n{}", "❌ No workflows available".red());
                success = false;
            }
        }
    }

    Ok(success)
}

pub async fn cmd_describe(
    client: &OuroborosClient,
    name: &str,
    kind: Option<TargetKind>,
) -> Result<bool> {
    let kind = match kind {
        Some(kind) => kind,
        None => resolve_kind(client, name).await?,
    };

    match kind {
        TargetKind::Graph => {
            let details = client.get_graph(name).await?;
            let info = details.graph_info.unwrap_or_default();
            println!("{}", format!("📊 Graph: {}", name).bold());
            println!("   Name: {}", info.display_name());
            println!("   Status: {}", info.status.as_deref().unwrap_or("Unknown"));
            println!("   Category: {}", info.category.as_deref().unwrap_or("Unknown"));
            println!(
                "   Module Path: {}",
                info.module_path.as_deref().unwrap_or("Unknown")
            );
        }
        TargetKind::Workflow => {
            let details = client.get_workflow(name).await?;
            let workflow = details.workflow.unwrap_or_default();
            println!("{}", format!("🔄 Workflow: {}", name).bold());
            println!("   ID: {}", workflow.id());
            println!("   Name: {}", workflow.display_name());
            println!(
                "   Description: {}",
                workflow.description.as_deref().unwrap_or("No description")
            );
            println!("   Status: {}", workflow.status.as_deref().unwrap_or("Unknown"));
            println!("   ASIS Compatible: {}", workflow.asis_compatible);

            let schema = workflow.schema_fields();
            if !schema.is_empty() {
                println!("   Input Schema:");
                for field in schema {
                    let required = if field.required { " (required)" } else { "" };
                    println!("     - {}: {}{}", field.name, field.field_type, required);
                }
            }

            match client.get_workflow_input_fields(name).await {
                Ok(fields) if !fields.input_fields.is_empty() => {
                    println!("   Input Fields:");
                    for field in &fields.input_fields {
                        let required = if field.is_required() { " (required)" } else { "" };
                        println!("     - {}: {}{}", field.key(), field.kind(), required);
                        if let Some(description) = field.describe() {
                            println!("       {}", description);
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Could not load input fields for {}: {}", name, e),
            }

            match client.get_workflow_steps(name).await {
                Ok(steps) => {
                    let names = step_names(&steps);
                    if !names.is_empty() {
                        println!("   Steps:");
                        for (i, step) in names.iter().enumerate() {
                            println!("     {:2}. {}", i + 1, step);
                        }
                    }
                }
                Err(e) => tracing::warn!("Could not load steps for {}: {}", name, e),
            }
        }
    }

    Ok(true)
}

pub async fn cmd_run(client: &OuroborosClient, args: RunArgs, verbose: bool) -> Result<bool> {
    let mut input = match &args.input {
        Some(path) => {
            let input = load_input_file(path)?;
            println!("{} Loaded input from {}", "✅".green(), path.display());
            input
        }
        None => parse_input_vars(&args.input_vars)?,
    };

    let kind = match args.kind {
        Some(kind) => kind,
        None => resolve_kind(client, &args.name).await?,
    };
    let system_workspace = args
        .system_workspace
        .clone()
        .or_else(|| client.config().system_workspace.clone());

    let response = match kind {
        TargetKind::Graph => {
            if input.is_empty() {
                input = default_graph_input(
                    &args.name,
                    "oo-run",
                    &format!("Execution of {} from oo-run", args.name),
                );
            }
            execute_graph(client, &args.name, input, system_workspace).await?
        }
        TargetKind::Workflow => {
            let input = workflow_input(client, &args, input).await?;
            execute_workflow(
                client,
                &args.name,
                input,
                system_workspace,
                args.async_execution,
            )
            .await?
        }
    };

    let mut result = serde_json::to_value(&response)?;

    if args.wait {
        match response.execution_id() {
            Some(id) => {
                let options = poll_options(client, args.poll_interval, args.max_wait);
                println!("\n⏳ Waiting for execution {} to finish...", id);
                result = track::wait_interruptibly(client, id, options).await?;
                println!("{} Execution {} completed", "✅".green(), id);
            }
            None => println!(
                "{}",
                "⚠️  The server returned no execution ID, nothing to wait for".yellow()
            ),
        }
    }

    println!("\n{}", "🎉 Execution completed successfully!".green().bold());

    if let Some(path) = &args.output {
        track::save_result(path, &result);
    }

    if verbose {
        let lines = display::summary_lines(&response);
        if !lines.is_empty() {
            println!("\n📊 Execution Summary:");
            for line in lines {
                println!("   {}", line);
            }
        }
    }

    Ok(true)
}

pub async fn cmd_interactive(client: &OuroborosClient) -> Result<bool> {
    println!("{}", "🎯 Interactive Mode - Ouroboros Runner".bold());
    println!("{}", "=".repeat(50));
    println!("\n🔍 Discovering available targets...");

    let graphs = client
        .list_graphs(&GraphFilter::default())
        .await
        .unwrap_or_else(|e| {
            println!("{} {}", "⚠️  Could not list graphs:".yellow(), e);
            Vec::new()
        });
    let workflows = client
        .list_workflows(&WorkflowFilter::default())
        .await
        .unwrap_or_else(|e| {
            println!("{} {}", "⚠️  Could not list workflows:".yellow(), e);
            Vec::new()
        });

    let targets = available_targets(&graphs, &workflows);
    if targets.is_empty() {
        println!("{}", "❌ No available targets found.".red());
        return Ok(false);
    }

    println!("\n📋 Available Targets ({}):", targets.len());
    for (i, target) in targets.iter().enumerate() {
        println!("   {:2}. ✅ {}", i + 1, target.label);
    }

    let mut prompter = Prompter::terminal();
    let Some(index) = prompter.choose(targets.len())? else {
        println!("{}", "❌ Invalid selection or cancelled".red());
        return Ok(false);
    };
    let target = &targets[index];
    println!("\n🎯 Selected: {} ({})", target.name, target.kind);

    let system_workspace = client.config().system_workspace.clone();
    match target.kind {
        TargetKind::Graph => {
            let input = default_graph_input(
                &target.name,
                "interactive_mode",
                "Interactive execution from oo-run",
            );
            execute_graph(client, &target.name, input, system_workspace).await?;
        }
        TargetKind::Workflow => {
            let input = match prompter.collect_workflow_input(client, &target.name).await? {
                Some(input) => input,
                None => {
                    println!(
                        "{}",
                        "⚠️  Input collection failed, using sample values".yellow()
                    );
                    sample_workflow_input()
                }
            };
            execute_workflow(client, &target.name, input, system_workspace, false).await?;
        }
    }

    println!(
        "\n{}",
        format!("🎉 {} execution completed successfully!", target.kind)
            .green()
            .bold()
    );
    Ok(true)
}

/// Figure out whether `name` is a graph or a workflow
async fn resolve_kind(client: &OuroborosClient, name: &str) -> Result<TargetKind> {
    println!("🔍 Target type not specified, probing...");

    match client.get_graph(name).await {
        Ok(_) => {
            println!("{} Found '{}' as a graph", "✅".green(), name);
            return Ok(TargetKind::Graph);
        }
        Err(e) if e.kind() == ErrorKind::Network => return Err(e.into()),
        Err(e) => tracing::debug!("{} is not a graph: {}", name, e),
    }

    match client.get_workflow(name).await {
        Ok(_) => {
            println!("{} Found '{}' as a workflow", "✅".green(), name);
            Ok(TargetKind::Workflow)
        }
        Err(e) if e.kind() == ErrorKind::Network => Err(e.into()),
        Err(e) => {
            tracing::debug!("{} is not a workflow: {}", name, e);
            Err(OoError::InvalidInput(format!(
                "Could not find '{}' as either graph or workflow",
                name
            ))
            .into())
        }
    }
}

/// Decide the workflow input from what was given and the dynamic-input flags
async fn workflow_input(
    client: &OuroborosClient,
    args: &RunArgs,
    mut input: JsonMap,
) -> Result<JsonMap> {
    if !input.is_empty() && !args.dynamic_input {
        return Ok(input);
    }

    let collect = args.dynamic_input || !args.no_dynamic_input;
    if collect {
        let mut prompter = Prompter::terminal();
        match prompter.collect_workflow_input(client, &args.name).await? {
            Some(collected) if input.is_empty() => {
                println!("{} Using collected input", "✅".green());
                input = collected;
            }
            Some(collected) => {
                println!("{} Merged collected input with given input", "✅".green());
                input.extend(collected);
            }
            None => println!(
                "{}",
                "⚠️  Input collection failed or was cancelled".yellow()
            ),
        }
    }

    if input.is_empty() {
        if args.dynamic_input {
            return Err(OoError::InvalidInput(
                "Input collection failed and no fallback input was provided".to_string(),
            )
            .into());
        }
        input = sample_workflow_input();
        println!(
            "{} {}",
            "⚠️  Using sample default values:".yellow(),
            Value::Object(input.clone())
        );
    }

    Ok(input)
}

async fn execute_graph(
    client: &OuroborosClient,
    name: &str,
    input_state: JsonMap,
    system_workspace: Option<String>,
) -> Result<ExecutionResponse> {
    let mut system_kwargs = JsonMap::new();
    if let Some(workspace) = system_workspace {
        system_kwargs.insert("system_workspace".to_string(), Value::String(workspace));
    }

    println!("🚀 Executing graph: {}", name.bright_cyan());
    println!("   Input state keys: {}", key_list(&input_state));
    println!("   System kwargs: {}", key_list(&system_kwargs));

    let request = GraphExecutionRequest {
        input_state,
        system_kwargs,
    };
    let response = client.execute_graph(name, &request).await?;

    println!("{}", "✅ Graph executed successfully!".green());
    for line in display::execution_lines(&response, name) {
        println!("   {}", line);
    }
    Ok(response)
}

async fn execute_workflow(
    client: &OuroborosClient,
    slug: &str,
    input_values: JsonMap,
    system_workspace: Option<String>,
    async_execution: bool,
) -> Result<ExecutionResponse> {
    println!("🚀 Executing workflow: {}", slug.bright_cyan());
    println!("   Input values: {}", key_list(&input_values));
    println!("   Async execution: {}", async_execution);

    let request = WorkflowExecutionRequest {
        input_values,
        async_execution,
        system_workspace_dir: system_workspace,
        ..WorkflowExecutionRequest::default()
    };
    let response = client.execute_workflow(slug, &request).await?;

    println!("{}", "✅ Workflow executed successfully!".green());
    for line in display::execution_lines(&response, slug) {
        println!("   {}", line);
    }
    Ok(response)
}

pub fn poll_options(
    client: &OuroborosClient,
    poll_interval: Option<u64>,
    max_wait: Option<u64>,
) -> PollOptions {
    let mut options = client.poll_options();
    if let Some(secs) = poll_interval {
        options.poll_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = max_wait {
        options.max_wait = Duration::from_secs(secs);
    }
    options
}

fn key_list(map: &JsonMap) -> String {
    if map.is_empty() {
        "None".to_string()
    } else {
        map.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Step names from a `/workflows/{slug}/steps` payload
fn step_names(steps: &Value) -> Vec<String> {
    let list = steps
        .get("steps")
        .and_then(Value::as_array)
        .or_else(|| steps.as_array());

    list.map(|items| {
        items
            .iter()
            .map(|step| {
                ["step_name", "name", "step_id"]
                    .iter()
                    .find_map(|key| step.get(*key))
                    .map(display_value)
                    .unwrap_or_else(|| truncate(&step.to_string(), 60))
            })
            .collect()
    })
    .unwrap_or_default()
}

/// An entry in the interactive target menu
#[derive(Debug, Clone, PartialEq)]
struct Target {
    kind: TargetKind,
    name: String,
    label: String,
}

/// Graphs that are available and workflows that are active, graphs first
fn available_targets(graphs: &[GraphSummary], workflows: &[WorkflowSummary]) -> Vec<Target> {
    let graph_targets = graphs.iter().filter(|g| g.is_available()).map(|g| Target {
        kind: TargetKind::Graph,
        name: g.display_name().to_string(),
        label: format!(
            "[GRAPH] {} ({})",
            g.display_name(),
            g.category.as_deref().unwrap_or("Unknown")
        ),
    });

    let workflow_targets = workflows.iter().filter(|w| w.is_active()).map(|w| {
        let asis = if w.asis_compatible { "🎯 " } else { "" };
        Target {
            kind: TargetKind::Workflow,
            name: w.display_name().to_string(),
            label: format!(
                "[WORKFLOW] {}{} - {}",
                asis,
                w.display_name(),
                truncate(w.description.as_deref().unwrap_or("No description"), 50)
            ),
        }
    });

    graph_targets.chain(workflow_targets).collect()
}
