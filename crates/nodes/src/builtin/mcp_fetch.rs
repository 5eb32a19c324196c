//! `mcp_fetch`: call a tool on an integration server.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::resolver::resolve_parameters;
use crate::services::{CredentialStore, ToolCallRequest, ToolInvoker};
use crate::traits::{ExecutableNode, ExecutionContext};
use crate::NodeError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpFetchConfig {
    pub server_id: String,
    pub tool_name: String,
    /// Top-level string values may be `$input` references.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

pub struct McpFetchNode {
    config: McpFetchConfig,
    tools: Arc<dyn ToolInvoker>,
    credentials: Arc<dyn CredentialStore>,
}

impl McpFetchNode {
    pub fn new(
        config: McpFetchConfig,
        tools: Arc<dyn ToolInvoker>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self { config, tools, credentials }
    }
}

#[async_trait]
impl ExecutableNode for McpFetchNode {
    async fn execute(&self, inputs: &[Value], ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let parameters = resolve_parameters(&self.config.parameters, inputs);

        let credentials = match self
            .credentials
            .get_credentials(&ctx.owner_id, &self.config.server_id)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(
                    server_id = %self.config.server_id,
                    error = %e,
                    "proceeding without credentials"
                );
                None
            }
        };

        debug!(
            server_id = %self.config.server_id,
            tool = %self.config.tool_name,
            has_credentials = credentials.is_some(),
            "calling tool"
        );

        let result = self
            .tools
            .call_tool(ToolCallRequest {
                server_id: self.config.server_id.clone(),
                tool_name: self.config.tool_name.clone(),
                parameters,
                credentials,
            })
            .await;

        if !result.success {
            return Err(NodeError::ToolCall(
                result.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        Ok(result.data.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{test_context, MockCredentialStore, MockToolInvoker};
    use crate::services::ToolCallResult;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config(parameters: Value) -> McpFetchConfig {
        McpFetchConfig {
            server_id: "github".into(),
            tool_name: "list_issues".into(),
            parameters: parameters.as_object().cloned().unwrap_or_default(),
        }
    }

    #[tokio::test]
    async fn resolves_parameters_and_returns_tool_data() {
        let tools = Arc::new(MockToolInvoker::returning(ToolCallResult::ok(json!([1, 2]))));
        let creds = Arc::new(MockCredentialStore::with("github", [("token", "abc")]));
        let node = McpFetchNode::new(
            config(json!({ "repo": "$input[0].repo", "state": "open" })),
            tools.clone(),
            creds,
        );

        let out = node
            .execute(&[json!({ "repo": "acme/app" })], &test_context())
            .await
            .unwrap();
        assert_eq!(out, json!([1, 2]));

        let calls = tools.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, "list_issues");
        assert_eq!(
            Value::Object(calls[0].parameters.clone()),
            json!({ "repo": "acme/app", "state": "open" })
        );
        assert_eq!(
            calls[0].credentials.as_ref().and_then(|c| c.get("token")).map(String::as_str),
            Some("abc")
        );
    }

    #[tokio::test]
    async fn credential_failure_is_not_fatal() {
        let tools = Arc::new(MockToolInvoker::returning(ToolCallResult::ok(json!("ok"))));
        let node = McpFetchNode::new(
            config(json!({})),
            tools.clone(),
            Arc::new(MockCredentialStore::failing("vault sealed")),
        );

        let out = node.execute(&[], &test_context()).await.unwrap();
        assert_eq!(out, json!("ok"));
        assert_eq!(tools.calls()[0].credentials, None);
    }

    #[tokio::test]
    async fn unsuccessful_tool_call_fails_the_node() {
        let node = McpFetchNode::new(
            config(json!({})),
            Arc::new(MockToolInvoker::returning(ToolCallResult::failed("rate limited"))),
            Arc::new(MockCredentialStore::empty()),
        );

        let err = node.execute(&[], &test_context()).await.unwrap_err();
        assert_eq!(err, NodeError::ToolCall("rate limited".into()));
    }

    #[tokio::test]
    async fn credentials_are_scoped_to_the_owner() {
        let creds = Arc::new(MockCredentialStore::empty());
        let node = McpFetchNode::new(
            config(json!({})),
            Arc::new(MockToolInvoker::returning(ToolCallResult::ok(Value::Null))),
            creds.clone(),
        );

        node.execute(&[], &test_context()).await.unwrap();
        assert_eq!(creds.lookups(), vec![("owner-1".to_string(), "github".to_string())]);
    }
}
