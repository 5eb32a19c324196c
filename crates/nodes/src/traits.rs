//! The `ExecutableNode` trait: the contract every node kind must fulfil.

use async_trait::async_trait;
use serde_json::Value;

use crate::NodeError;

/// Shared context passed to every node during execution.
///
/// Defined here (in the nodes crate) so both the engine and individual node
/// implementations can import it without a circular dependency.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// ID of the workflow being run.
    pub workflow_id: String,
    /// ID of the current execution run.
    pub execution_id: uuid::Uuid,
    /// User who started the run.
    pub user_id: String,
    /// Owner of the workflow; the principal scope for credential lookups.
    pub owner_id: String,
}

/// The core node trait.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    /// Execute the node against the outputs of its declared inputs, in
    /// declaration order, and return this node's JSON output.
    async fn execute(
        &self,
        inputs: &[Value],
        ctx: &ExecutionContext,
    ) -> Result<Value, NodeError>;
}
