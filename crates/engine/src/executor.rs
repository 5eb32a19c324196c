//! Workflow execution engine.
//!
//! `WorkflowExecutor` is the central orchestrator:
//! 1. Validates the DAG and produces a topological ordering.
//! 2. Runs nodes one at a time in that order, feeding each the recorded
//!    outputs of its declared inputs.
//! 3. Appends a log entry per node and stops at the first failure.
//! 4. Returns a finalized [`WorkflowExecution`]; errors never escape `execute`.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, Span};

use nodes::{BuiltinNode, ExecutableNode, ExecutionContext, NodeError, NodeServices};

use crate::dag::validate_dag;
use crate::models::{NodeExecutionLog, WorkflowDag, WorkflowExecution, WorkflowNode};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Upper bound on a single node's execution. `None` waits forever.
    pub node_timeout: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            node_timeout: Some(Duration::from_secs(300)),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowExecutor
// ---------------------------------------------------------------------------

/// Stateless orchestrator. One instance can serve any number of concurrent
/// runs; each run owns its own output map and log.
#[derive(Debug, Clone)]
pub struct WorkflowExecutor {
    services: NodeServices,
    config: ExecutorConfig,
}

impl WorkflowExecutor {
    pub fn new(services: NodeServices, config: ExecutorConfig) -> Self {
        Self { services, config }
    }

    /// Run the workflow to a terminal state.
    pub async fn execute(&self, workflow: &WorkflowDag, user_id: &str) -> WorkflowExecution {
        self.run(workflow, user_id, None, &CancellationToken::new()).await
    }

    /// Run with a trigger payload. Nodes that declare no inputs receive it as
    /// their only upstream output.
    pub async fn execute_with_input(
        &self,
        workflow: &WorkflowDag,
        user_id: &str,
        input: Value,
    ) -> WorkflowExecution {
        self.run(workflow, user_id, Some(input), &CancellationToken::new()).await
    }

    /// Run until finished or until `cancel` fires, whichever comes first.
    /// A cancelled run is recorded as failed at the node that was interrupted.
    pub async fn execute_with_cancel(
        &self,
        workflow: &WorkflowDag,
        user_id: &str,
        input: Option<Value>,
        cancel: &CancellationToken,
    ) -> WorkflowExecution {
        self.run(workflow, user_id, input, cancel).await
    }

    #[instrument(
        skip_all,
        fields(workflow_id = %workflow.id, execution_id = tracing::field::Empty)
    )]
    async fn run(
        &self,
        workflow: &WorkflowDag,
        user_id: &str,
        trigger_input: Option<Value>,
        cancel: &CancellationToken,
    ) -> WorkflowExecution {
        let mut execution = WorkflowExecution::start(&workflow.id, user_id);
        Span::current().record("execution_id", tracing::field::display(execution.id));

        // ------------------------------------------------------------------
        // Validate and topologically sort the DAG.
        // ------------------------------------------------------------------
        let sorted_ids = match validate_dag(workflow) {
            Ok(ids) => ids,
            Err(e) => {
                error!("workflow rejected: {e}");
                return execution.fail(e.to_string());
            }
        };
        info!(
            "DAG validated, executing {} nodes in order: {:?}",
            sorted_ids.len(),
            sorted_ids
        );

        let node_map: HashMap<&str, &WorkflowNode> = workflow
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n))
            .collect();

        let ctx = ExecutionContext {
            workflow_id: workflow.id.clone(),
            execution_id: execution.id,
            user_id: user_id.to_owned(),
            owner_id: workflow.owner_id.clone(),
        };

        // ------------------------------------------------------------------
        // Execute nodes sequentially.
        // ------------------------------------------------------------------
        let mut outputs: HashMap<&str, Value> = HashMap::with_capacity(sorted_ids.len());

        for node_id in &sorted_ids {
            let started_at = Utc::now();
            let step = self
                .run_node(node_id, &node_map, &outputs, trigger_input.as_ref(), &ctx, cancel)
                .await;

            match step {
                Ok(output) => {
                    debug!("node '{}' completed", node_id);
                    execution
                        .logs
                        .push(NodeExecutionLog::completed(node_id, started_at, output.clone()));
                    outputs.insert(node_id.as_str(), output);
                }
                Err(e) => {
                    let message = e.to_string();
                    error!("node '{}' failed: {}", node_id, message);
                    execution
                        .logs
                        .push(NodeExecutionLog::failed(node_id, started_at, message.clone()));

                    let failure = EngineError::NodeFailed {
                        node_id: node_id.clone(),
                        message,
                    };
                    return execution.fail(failure.to_string());
                }
            }
        }

        let result = sorted_ids
            .last()
            .and_then(|id| outputs.remove(id.as_str()))
            .unwrap_or(Value::Null);

        info!("execution {} completed", execution.id);
        execution.complete(result)
    }

    /// Gather inputs, build the node and run it under the timeout and the
    /// cancellation token.
    async fn run_node(
        &self,
        node_id: &str,
        node_map: &HashMap<&str, &WorkflowNode>,
        outputs: &HashMap<&str, Value>,
        trigger_input: Option<&Value>,
        ctx: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<Value, EngineError> {
        let node = node_map
            .get(node_id)
            .ok_or_else(|| EngineError::NodeNotFound(node_id.to_owned()))?;

        let inputs: Vec<Value> = if node.inputs.is_empty() {
            trigger_input.cloned().into_iter().collect()
        } else {
            node.inputs
                .iter()
                .map(|input_id| {
                    outputs.get(input_id.as_str()).cloned().ok_or_else(|| {
                        EngineError::MissingOutput {
                            node_id: node_id.to_owned(),
                            input_id: input_id.clone(),
                        }
                    })
                })
                .collect::<Result<_, _>>()?
        };

        if cancel.is_cancelled() {
            return Err(NodeError::Cancelled.into());
        }

        let executable = BuiltinNode::build(node.kind, &node.config, &self.services)?;
        debug!("running {} node '{}' with {} input(s)", node.kind, node_id, inputs.len());

        let work = executable.execute(&inputs, ctx);
        let bounded = async {
            match self.config.node_timeout {
                Some(limit) => tokio::time::timeout(limit, work)
                    .await
                    .unwrap_or(Err(NodeError::Timeout(limit))),
                None => work.await,
            }
        };

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(NodeError::Cancelled),
            result = bounded => result,
        }?;
        Ok(output)
    }
}
