//! `action`: terminal side effects.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::traits::{ExecutableNode, ExecutionContext};
use crate::NodeError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionConfig {
    /// Pass the first input through. Persistence hooks in here later.
    Save,
    Notify {
        #[serde(default)]
        message: Option<String>,
    },
    SendEmail,
    Webhook,
}

pub struct ActionNode {
    config: ActionConfig,
}

impl ActionNode {
    pub fn new(config: ActionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ExecutableNode for ActionNode {
    async fn execute(&self, inputs: &[Value], ctx: &ExecutionContext) -> Result<Value, NodeError> {
        match &self.config {
            ActionConfig::Save => Ok(inputs.first().cloned().unwrap_or(Value::Null)),
            ActionConfig::Notify { message } => {
                info!(
                    workflow_id = %ctx.workflow_id,
                    execution_id = %ctx.execution_id,
                    message = message.as_deref().unwrap_or(""),
                    inputs = inputs.len(),
                    "notify action"
                );
                Ok(json!({ "success": true, "message": "Notification sent" }))
            }
            ActionConfig::SendEmail => Err(NodeError::Unsupported("send_email action".into())),
            ActionConfig::Webhook => Err(NodeError::Unsupported("webhook action".into())),
        }
    }
}
