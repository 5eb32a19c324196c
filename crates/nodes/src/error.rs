//! Node-level error types.

use thiserror::Error;

/// Errors returned by a node's `execute` method.
///
/// Every variant is fatal to the run: the orchestrator records it on the
/// failing node's log entry and stops. Nothing in this crate retries.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NodeError {
    /// Configuration is missing a field or has the wrong shape.
    #[error("invalid node config: {0}")]
    InvalidConfig(String),

    /// Upstream data does not have the shape this node requires.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A declared variant with no implementation behind it.
    #[error("{0} is not yet supported")]
    Unsupported(String),

    /// The tool invocation service reported `success = false` or could not be reached.
    #[error("tool call failed: {0}")]
    ToolCall(String),

    /// The completion service returned an error.
    #[error("completion failed: {0}")]
    Completion(String),

    /// A conditional expression failed to parse or evaluate.
    #[error("expression error: {0}")]
    Expression(String),

    /// The node did not finish within the configured timeout.
    #[error("node execution timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The run was cancelled while this node was pending or in flight.
    #[error("execution cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for NodeError {
    fn from(e: serde_json::Error) -> Self {
        NodeError::InvalidConfig(e.to_string())
    }
}

/// Failure reported by a [`CredentialStore`](crate::services::CredentialStore).
///
/// Never fatal; the `mcp_fetch` node logs it and proceeds without credentials.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("credential lookup failed: {0}")]
pub struct CredentialError(pub String);
