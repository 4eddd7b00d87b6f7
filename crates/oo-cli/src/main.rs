//! oo-run - command-line runner for the Ouroboros Compute API
//!
//! Usage:
//!   oo-run list --type all                        List graphs and workflows
//!   oo-run run --name sample_workflow --input-var topic=AI
//!   oo-run run --name ASIS --input asis_input.json --output result.json
//!   oo-run interactive                            Discover, pick and run
//!   oo-run wait <execution-id>                    Block until an execution ends

mod display;
mod input;
mod prompt;
mod run;
mod track;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use oo_client::OuroborosClient;
use oo_core::{OoConfig, CONFIG_FILE};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "oo-run")]
#[command(author, version, about = "Run Ouroboros graphs and workflows")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the compute API
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    /// Config file (defaults to .oo/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Request timeout in seconds (0 = no timeout)
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Retries after a connection failure
    #[arg(long, global = true, value_name = "N")]
    max_retries: Option<u32>,

    /// Enable verbose output and debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Do not check API health before running the command
    #[arg(long, global = true)]
    skip_health_check: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API and service health
    Health,

    /// List available graphs and/or workflows
    List {
        /// What to list
        #[arg(long = "type", value_enum, default_value_t = ListKind::All)]
        kind: ListKind,
    },

    /// Show details of a graph or workflow
    Describe {
        /// Graph or workflow name
        name: String,

        /// Target type (probed when omitted)
        #[arg(long = "type", value_enum)]
        kind: Option<TargetKind>,
    },

    /// Execute a graph or workflow
    Run(run::RunArgs),

    /// Discover targets, choose one and execute it
    Interactive,

    /// Show the status of an execution
    Status {
        /// Execution ID
        id: String,
    },

    /// Wait for an execution to finish
    Wait {
        /// Execution ID
        id: String,

        /// Seconds between status checks
        #[arg(long, value_name = "SECS")]
        poll_interval: Option<u64>,

        /// Seconds to wait before giving up
        #[arg(long, value_name = "SECS")]
        max_wait: Option<u64>,

        /// Save the final result to a JSON file
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Cancel a running execution
    Cancel {
        /// Execution ID
        id: String,

        /// Reason for cancelling (makes the cancellation graceful)
        #[arg(long)]
        reason: Option<String>,
    },

    /// Show events recorded for an execution
    Events {
        /// Execution ID
        id: String,

        /// Only events of this type
        #[arg(long)]
        event_type: Option<String>,

        /// Maximum events to show
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },

    /// Show step executions of an execution
    Steps {
        /// Execution ID
        id: String,
    },

    /// List recent executions
    Executions {
        /// Only executions of this workflow
        #[arg(long, value_name = "SLUG")]
        workflow: Option<String>,

        /// Only executions with this status
        #[arg(long)]
        status: Option<String>,

        /// Maximum executions to show
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },

    /// List workflow checkpoints
    Checkpoints {
        /// Only checkpoints of this workflow
        #[arg(long, value_name = "SLUG")]
        workflow: Option<String>,

        /// Only checkpoints of this execution
        #[arg(long, value_name = "ID")]
        execution: Option<String>,

        /// Maximum checkpoints to show
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },

    /// MCP servers and tools
    Mcp {
        #[command(subcommand)]
        action: McpCommands,
    },

    /// Workspace directories, configuration and files
    Workspace {
        #[command(subcommand)]
        action: WorkspaceCommands,
    },
}

#[derive(Subcommand)]
enum McpCommands {
    /// List MCP servers
    Servers,

    /// List MCP tools
    Tools {
        /// Only tools of this server
        #[arg(long)]
        server: Option<String>,
    },

    /// Show MCP status
    Status,

    /// Execute an MCP tool
    Exec {
        /// Tool ID
        tool_id: String,

        /// JSON file with the tool input
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Input values as key=value pairs
        #[arg(long = "input-var", value_name = "KEY=VALUE", num_args = 1..)]
        input_vars: Vec<String>,
    },
}

#[derive(Subcommand)]
enum WorkspaceCommands {
    /// Show workspace directories
    Info,

    /// Show workspace configuration
    Config,

    /// List files in a workspace
    Files {
        /// Workspace name
        #[arg(long, default_value = "default")]
        name: String,

        /// Subdirectory to list
        #[arg(long)]
        directory: Option<String>,

        /// Only files with this extension
        #[arg(long)]
        extension: Option<String>,

        /// Maximum files to show
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListKind {
    Graph,
    Workflow,
    All,
}

/// Kind of executable target
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetKind {
    Graph,
    Workflow,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Graph => write!(f, "graph"),
            TargetKind::Workflow => write!(f, "workflow"),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // --verbose forces debug; otherwise RUST_LOG, defaulting to warn
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    display::banner("🐍 Ouroboros Runner");
    let outcome = execute(cli).await;
    display::footer();

    match outcome {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            display::print_failure(&err);
            std::process::exit(1);
        }
    }
}

/// Run the selected command; `Ok(false)` means it finished but reported failure
async fn execute(cli: Cli) -> Result<bool> {
    let config = build_config(&cli)?;
    tracing::debug!("Using API at {}", config.api_url);
    let client = OuroborosClient::from_config(config)?;

    // The health command reports on its own
    let gated = !matches!(cli.command, Commands::Health);
    if gated && !cli.skip_health_check && !check_api(&client).await {
        return Ok(false);
    }

    match cli.command {
        Commands::Health => track::cmd_health(&client).await,
        Commands::List { kind } => run::cmd_list(&client, kind).await,
        Commands::Describe { name, kind } => run::cmd_describe(&client, &name, kind).await,
        Commands::Run(args) => run::cmd_run(&client, args, cli.verbose).await,
        Commands::Interactive => run::cmd_interactive(&client).await,
        Commands::Status { id } => track::cmd_status(&client, &id).await,
        Commands::Wait {
            id,
            poll_interval,
            max_wait,
            output,
        } => track::cmd_wait(&client, &id, poll_interval, max_wait, output.as_deref()).await,
        Commands::Cancel { id, reason } => track::cmd_cancel(&client, &id, reason.as_deref()).await,
        Commands::Events {
            id,
            event_type,
            limit,
        } => track::cmd_events(&client, &id, event_type, limit).await,
        Commands::Steps { id } => track::cmd_steps(&client, &id).await,
        Commands::Executions {
            workflow,
            status,
            limit,
        } => track::cmd_executions(&client, workflow, status, limit).await,
        Commands::Checkpoints {
            workflow,
            execution,
            limit,
        } => track::cmd_checkpoints(&client, workflow, execution, limit).await,
        Commands::Mcp { action } => match action {
            McpCommands::Servers => track::cmd_mcp_servers(&client).await,
            McpCommands::Tools { server } => track::cmd_mcp_tools(&client, server.as_deref()).await,
            McpCommands::Status => track::cmd_print(client.get_mcp_status().await?),
            McpCommands::Exec {
                tool_id,
                input,
                input_vars,
            } => track::cmd_mcp_exec(&client, tool_id, input.as_deref(), &input_vars).await,
        },
        Commands::Workspace { action } => match action {
            WorkspaceCommands::Info => track::cmd_print(client.get_workspace_info().await?),
            WorkspaceCommands::Config => track::cmd_print(client.get_workspace_config().await?),
            WorkspaceCommands::Files {
                name,
                directory,
                extension,
                limit,
            } => track::cmd_workspace_files(&client, name, directory, extension, limit).await,
        },
    }
}

/// Defaults, then the config file, then `OO_*` variables, then flags
fn build_config(cli: &Cli) -> Result<OoConfig> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| Path::new(CONFIG_FILE).to_path_buf());
    if cli.config.is_some() && !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }

    let mut config = OoConfig::load_or_default(&path)?.with_env_overrides()?;
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(retries) = cli.max_retries {
        config.max_retries = retries;
    }
    Ok(config.validate()?)
}

/// Gate every command on a healthy API
async fn check_api(client: &OuroborosClient) -> bool {
    println!("🔍 Checking API health...");
    match client.health().await {
        Ok(report) if report.is_healthy() => {
            println!(
                "{} API is healthy: {}",
                "✅".green(),
                report.message.as_deref().unwrap_or("OK")
            );
            println!();
            true
        }
        outcome => {
            match outcome {
                Ok(report) => println!(
                    "{} API health check failed: {}",
                    "❌".red(),
                    report.message.as_deref().unwrap_or("not healthy")
                ),
                Err(e) => println!("{} API health check failed: {}", "❌".red(), e),
            }
            println!();
            println!("{}", "Cannot proceed - API is not accessible".red().bold());
            println!("Troubleshooting steps:");
            println!("  1. Make sure the compute API is running");
            println!("  2. Check the health endpoint: curl {}/health", client.api_url());
            println!("  3. Point oo-run elsewhere with --api-url or OO_API_URL");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "oo-run",
            "--api-url",
            "http://compute:8080",
            "run",
            "--name",
            "sample_workflow",
            "--type",
            "workflow",
            "--input-var",
            "topic=AI",
            "school_level=college",
            "--async",
            "--wait",
        ])
        .unwrap();

        assert_eq!(cli.api_url.as_deref(), Some("http://compute:8080"));
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.name, "sample_workflow");
                assert_eq!(args.kind, Some(TargetKind::Workflow));
                assert_eq!(args.input_vars, vec!["topic=AI", "school_level=college"]);
                assert!(args.async_execution);
                assert!(args.wait);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_dynamic_input_flags_conflict() {
        let result = Cli::try_parse_from([
            "oo-run",
            "run",
            "--name",
            "x",
            "--dynamic-input",
            "--no-dynamic-input",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_url = \"http://from-file:5001\"\nmax_retries = 7\n").unwrap();

        let cli = Cli::try_parse_from([
            "oo-run",
            "--config",
            path.to_str().unwrap(),
            "--timeout",
            "0",
            "list",
        ])
        .unwrap();
        let config = build_config(&cli).unwrap();

        assert_eq!(config.max_retries, 7);
        assert_eq!(config.timeout(), None);
        assert!(config.api_url.starts_with("http"));
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let cli = Cli::try_parse_from(["oo-run", "--config", "/nonexistent/oo.toml", "health"]).unwrap();
        assert!(build_config(&cli).is_err());
    }
}
