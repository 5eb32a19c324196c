//! `flowdag` CLI entry-point.
//!
//! Available sub-commands:
//! - `validate`: check a workflow JSON file and print its execution order.
//! - `run`: execute a workflow locally and print the execution record.
//!
//! `run` has no tool server or LLM provider wired in; `mcp_fetch` and
//! `transform` nodes fail with a descriptive error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use engine::{ExecutionStatus, ExecutorConfig, WorkflowDag, WorkflowExecutor};
use nodes::NodeServices;

#[derive(Parser)]
#[command(
    name = "flowdag",
    about = "Workflow DAG execution engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a workflow definition JSON file.
    Validate {
        /// Path to the workflow JSON file.
        path: PathBuf,
    },
    /// Execute a workflow definition JSON file.
    Run {
        /// Path to the workflow JSON file.
        path: PathBuf,
        /// JSON file whose contents are fed to nodes with no inputs.
        #[arg(long)]
        input: Option<PathBuf>,
        /// User the run is attributed to.
        #[arg(long, env = "FLOWDAG_USER_ID", default_value = "local")]
        user_id: String,
        /// Per-node timeout in seconds; 0 disables it.
        #[arg(long, env = "FLOWDAG_NODE_TIMEOUT_SECS", default_value_t = 300)]
        node_timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Validate { path } => {
            let workflow = load_workflow(&path)?;
            match engine::validate_dag(&workflow) {
                Ok(order) => {
                    println!("Workflow is valid. Execution order: {order:?}");
                }
                Err(e) => {
                    eprintln!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Run { path, input, user_id, node_timeout_secs } => {
            let workflow = load_workflow(&path)?;
            let config = ExecutorConfig {
                node_timeout: (node_timeout_secs > 0).then(|| Duration::from_secs(node_timeout_secs)),
            };
            let executor = WorkflowExecutor::new(NodeServices::unconfigured(), config);

            info!("Running workflow '{}' ({} nodes)", workflow.name, workflow.nodes.len());
            let execution = match input {
                Some(input_path) => {
                    let payload = read_json(&input_path)?;
                    executor.execute_with_input(&workflow, &user_id, payload).await
                }
                None => executor.execute(&workflow, &user_id).await,
            };

            println!("{}", serde_json::to_string_pretty(&execution)?);
            if execution.status != ExecutionStatus::Completed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn load_workflow(path: &Path) -> Result<WorkflowDag> {
    let value = read_json(path)?;
    serde_json::from_value(value)
        .with_context(|| format!("{} is not a workflow definition", path.display()))
}
