//! Built-in node kinds and the closed dispatch over them.
//!
//! A workflow node carries a [`NodeKind`] tag plus an untyped JSON config.
//! [`BuiltinNode::build`] turns that pair into a typed executor; a config that
//! does not fit the kind is a node failure, not a panic.

pub mod action;
pub mod conditional;
pub mod filter;
pub mod mcp_fetch;
pub mod merge;
pub mod transform;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::NodeServices;
use crate::traits::{ExecutableNode, ExecutionContext};
use crate::NodeError;

pub use action::{ActionConfig, ActionNode};
pub use conditional::{ConditionalConfig, ConditionalNode};
pub use filter::{FilterCondition, FilterConfig, FilterNode, FilterOperator};
pub use mcp_fetch::{McpFetchConfig, McpFetchNode};
pub use merge::{MergeConfig, MergeNode, MergeStrategy};
pub use transform::{LlmTransform, TransformConfig, TransformNode};

/// The six node kinds a workflow may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    McpFetch,
    Transform,
    Filter,
    Merge,
    Action,
    Conditional,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::McpFetch => "mcp_fetch",
            Self::Transform => "transform",
            Self::Filter => "filter",
            Self::Merge => "merge",
            Self::Action => "action",
            Self::Conditional => "conditional",
        };
        f.write_str(name)
    }
}

/// A node ready to run, one variant per [`NodeKind`].
pub enum BuiltinNode {
    McpFetch(McpFetchNode),
    Transform(TransformNode),
    Filter(FilterNode),
    Merge(MergeNode),
    Action(ActionNode),
    Conditional(ConditionalNode),
}

impl BuiltinNode {
    /// Parse `config` for `kind` and bind the services the kind needs.
    pub fn build(
        kind: NodeKind,
        config: &Value,
        services: &NodeServices,
    ) -> Result<Self, NodeError> {
        let node = match kind {
            NodeKind::McpFetch => Self::McpFetch(McpFetchNode::new(
                parse(kind, config)?,
                services.tools.clone(),
                services.credentials.clone(),
            )),
            NodeKind::Transform => Self::Transform(TransformNode::new(
                parse(kind, config)?,
                services.completions.clone(),
            )),
            NodeKind::Filter => Self::Filter(FilterNode::new(parse(kind, config)?)),
            NodeKind::Merge => Self::Merge(MergeNode::new(parse(kind, config)?)),
            NodeKind::Action => Self::Action(ActionNode::new(parse(kind, config)?)),
            NodeKind::Conditional => Self::Conditional(ConditionalNode::new(parse(kind, config)?)?),
        };
        Ok(node)
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::McpFetch(_) => NodeKind::McpFetch,
            Self::Transform(_) => NodeKind::Transform,
            Self::Filter(_) => NodeKind::Filter,
            Self::Merge(_) => NodeKind::Merge,
            Self::Action(_) => NodeKind::Action,
            Self::Conditional(_) => NodeKind::Conditional,
        }
    }
}

#[async_trait]
impl ExecutableNode for BuiltinNode {
    async fn execute(&self, inputs: &[Value], ctx: &ExecutionContext) -> Result<Value, NodeError> {
        match self {
            Self::McpFetch(node) => node.execute(inputs, ctx).await,
            Self::Transform(node) => node.execute(inputs, ctx).await,
            Self::Filter(node) => node.execute(inputs, ctx).await,
            Self::Merge(node) => node.execute(inputs, ctx).await,
            Self::Action(node) => node.execute(inputs, ctx).await,
            Self::Conditional(node) => node.execute(inputs, ctx).await,
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(kind: NodeKind, config: &Value) -> Result<T, NodeError> {
    T::deserialize(config)
        .map_err(|e| NodeError::InvalidConfig(format!("{kind} node: {e}")))
}
