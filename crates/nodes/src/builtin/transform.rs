//! `transform`: reshape upstream data, currently only through an LLM.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::services::{ChatMessage, CompletionOptions, CompletionService};
use crate::traits::{ExecutableNode, ExecutionContext};
use crate::NodeError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformConfig {
    Llm(LlmTransform),
    /// Declared so configs naming it deserialize; executing it fails.
    Code {
        #[serde(default)]
        code: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmTransform {
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

impl LlmTransform {
    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            provider: self.provider.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// The configured prompt, followed by a pretty-printed dump of every
    /// upstream output when there are any.
    fn render_prompt(&self, inputs: &[Value]) -> Result<String, NodeError> {
        if inputs.is_empty() {
            return Ok(self.prompt.clone());
        }
        let dump = serde_json::to_string_pretty(inputs)
            .map_err(|e| NodeError::InvalidInput(e.to_string()))?;
        Ok(format!("{}\n\nInput data:\n{dump}", self.prompt))
    }
}

pub struct TransformNode {
    config: TransformConfig,
    completions: Arc<dyn CompletionService>,
}

impl TransformNode {
    pub fn new(config: TransformConfig, completions: Arc<dyn CompletionService>) -> Self {
        Self { config, completions }
    }
}

#[async_trait]
impl ExecutableNode for TransformNode {
    async fn execute(&self, inputs: &[Value], _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let llm = match &self.config {
            TransformConfig::Llm(llm) => llm,
            TransformConfig::Code { .. } => {
                return Err(NodeError::Unsupported("code transform".into()));
            }
        };

        let messages = vec![ChatMessage::user(llm.render_prompt(inputs)?)];
        let completion = self
            .completions
            .complete(messages, llm.options())
            .await
            .map_err(NodeError::Completion)?;

        match serde_json::from_str::<Value>(&completion.content) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                debug!(error = %e, "completion is not JSON; returning raw text");
                Ok(Value::String(completion.content))
            }
        }
    }
}
