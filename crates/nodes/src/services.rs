//! External collaborators consumed by the node executors.
//!
//! The engine never talks to a tool server or an LLM provider directly.
//! It is handed implementations of these traits by the surrounding service.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CredentialError;

// ---------------------------------------------------------------------------
// Tool invocation
// ---------------------------------------------------------------------------

/// Opaque credentials for one tool server, as handed out by the credential store.
pub type Credentials = HashMap<String, String>;

/// A single call to a tool exposed by an integration server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRequest {
    pub server_id: String,
    pub tool_name: String,
    pub parameters: Map<String, Value>,
    /// `None` when the lookup failed or nothing is stored for this server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

/// What the tool server reported back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ToolCallResult {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ToolCallResult {
    pub fn ok(data: Value) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(error.into()) }
    }
}

#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Invoke a tool. Transport problems should be folded into a
    /// `success = false` result rather than panicking.
    async fn call_tool(&self, request: ToolCallRequest) -> ToolCallResult;
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptions {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<Completion, String>;
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up credentials for `server_id` within the principal's scope.
    /// `Ok(None)` means nothing is stored; both that and `Err` are survivable.
    async fn get_credentials(
        &self,
        principal: &str,
        server_id: &str,
    ) -> Result<Option<Credentials>, CredentialError>;
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// The set of external services one executor instance is wired to.
#[derive(Clone)]
pub struct NodeServices {
    pub tools: Arc<dyn ToolInvoker>,
    pub completions: Arc<dyn CompletionService>,
    pub credentials: Arc<dyn CredentialStore>,
}

impl NodeServices {
    pub fn new(
        tools: Arc<dyn ToolInvoker>,
        completions: Arc<dyn CompletionService>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self { tools, completions, credentials }
    }

    /// Services that refuse every external call. Workflows built only from
    /// filter / merge / action / conditional nodes still run.
    pub fn unconfigured() -> Self {
        Self::new(
            Arc::new(Unconfigured),
            Arc::new(Unconfigured),
            Arc::new(Unconfigured),
        )
    }
}

impl std::fmt::Debug for NodeServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeServices").finish_non_exhaustive()
    }
}

/// Stand-in used when no real integration is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

#[async_trait]
impl ToolInvoker for Unconfigured {
    async fn call_tool(&self, request: ToolCallRequest) -> ToolCallResult {
        ToolCallResult::failed(format!(
            "no tool invocation service configured (server '{}', tool '{}')",
            request.server_id, request.tool_name
        ))
    }
}

#[async_trait]
impl CompletionService for Unconfigured {
    async fn complete(
        &self,
        _messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<Completion, String> {
        Err("no completion service configured".into())
    }
}

#[async_trait]
impl CredentialStore for Unconfigured {
    async fn get_credentials(
        &self,
        _principal: &str,
        _server_id: &str,
    ) -> Result<Option<Credentials>, CredentialError> {
        Ok(None)
    }
}
