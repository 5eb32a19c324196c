//! Core domain models for the workflow engine.
//!
//! A [`WorkflowDag`] is the read-only definition handed to the executor.
//! A [`WorkflowExecution`] is the record one run produces; it is created at
//! the start of the run and finalized exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use nodes::NodeKind;

// ---------------------------------------------------------------------------
// WorkflowNode
// ---------------------------------------------------------------------------

/// A single step in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    /// Unique identifier within this workflow.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub description: String,
    /// Kind-specific configuration, parsed when the node runs.
    #[serde(default)]
    pub config: Value,
    /// Upstream node ids. Order is significant: it defines `$input[n]`.
    #[serde(default)]
    pub inputs: Vec<String>,
}

impl WorkflowNode {
    pub fn new(
        id: impl Into<String>,
        kind: NodeKind,
        config: Value,
        inputs: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            description: String::new(),
            config,
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowDag
// ---------------------------------------------------------------------------

/// A complete workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDag {
    /// Caller-assigned identifier; any string is accepted.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Principal whose credentials tool calls run under.
    pub owner_id: String,
    pub nodes: Vec<WorkflowNode>,
}

impl WorkflowDag {
    /// Convenience constructor for testing.
    pub fn new(name: impl Into<String>, owner_id: impl Into<String>, nodes: Vec<WorkflowNode>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            category: String::new(),
            owner_id: owner_id.into(),
            nodes,
        }
    }
}

// ---------------------------------------------------------------------------
// Execution record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One node's entry in the execution log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecutionLog {
    pub node_id: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NodeExecutionLog {
    pub(crate) fn completed(node_id: &str, started_at: DateTime<Utc>, output: Value) -> Self {
        Self {
            node_id: node_id.to_owned(),
            status: ExecutionStatus::Completed,
            started_at,
            completed_at: Some(Utc::now()),
            output: Some(output),
            error: None,
        }
    }

    pub(crate) fn failed(node_id: &str, started_at: DateTime<Utc>, error: String) -> Self {
        Self {
            node_id: node_id.to_owned(),
            status: ExecutionStatus::Failed,
            started_at,
            completed_at: Some(Utc::now()),
            output: None,
            error: Some(error),
        }
    }
}

/// The full record of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecution {
    pub id: Uuid,
    pub workflow_id: String,
    pub user_id: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Output of the last node in topological order, on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub logs: Vec<NodeExecutionLog>,
}

impl WorkflowExecution {
    pub(crate) fn start(workflow_id: &str, user_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id: workflow_id.to_owned(),
            user_id: user_id.to_owned(),
            status: ExecutionStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            result: None,
            error: None,
            logs: Vec::new(),
        }
    }

    pub(crate) fn complete(mut self, result: Value) -> Self {
        self.status = ExecutionStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.result = Some(result);
        self
    }

    pub(crate) fn fail(mut self, error: String) -> Self {
        self.status = ExecutionStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error = Some(error);
        self
    }
}
