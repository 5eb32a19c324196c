//! Engine-level error types.

use thiserror::Error;

use nodes::NodeError;

/// Errors produced by the workflow engine.
///
/// None of these escape [`WorkflowExecutor`](crate::WorkflowExecutor): the
/// orchestrator turns each into a failed execution record.
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Graph errors ------

    /// Two or more nodes share the same ID.
    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    /// A node lists an input that is not a node of this workflow.
    #[error("node '{node_id}' references unknown input '{input_id}'")]
    UnknownInput { node_id: String, input_id: String },

    /// Topological sort could not place every node.
    #[error("workflow graph contains a cycle involving nodes {0:?}")]
    CycleDetected(Vec<String>),

    // ------ Execution errors ------

    /// The scheduler produced an id with no matching node.
    #[error("node '{0}' not found in workflow")]
    NodeNotFound(String),

    /// An input had not produced an output by the time its dependent ran.
    #[error("output of input '{input_id}' is missing for node '{node_id}'")]
    MissingOutput { node_id: String, input_id: String },

    #[error(transparent)]
    Node(#[from] NodeError),

    /// A node failed; the rest of the run is skipped.
    #[error("Node {node_id} failed: {message}")]
    NodeFailed { node_id: String, message: String },
}
