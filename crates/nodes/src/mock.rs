//! Test doubles for the external services.
//!
//! Each mock records every call it receives and answers with a
//! programmer-specified result. Used by unit tests here and by the engine's
//! orchestrator tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CredentialError;
use crate::services::{
    ChatMessage, Completion, CompletionOptions, CompletionService, CredentialStore, Credentials,
    NodeServices, ToolCallRequest, ToolCallResult, ToolInvoker,
};
use crate::traits::ExecutionContext;

/// A context with fixed ids, for tests that don't care about them.
pub fn test_context() -> ExecutionContext {
    ExecutionContext {
        workflow_id: "wf-test".into(),
        execution_id: uuid::Uuid::nil(),
        user_id: "user-1".into(),
        owner_id: "owner-1".into(),
    }
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// Answers tool calls by tool name, falling back to a default result.
pub struct MockToolInvoker {
    default: ToolCallResult,
    by_tool: HashMap<String, ToolCallResult>,
    calls: Arc<Mutex<Vec<ToolCallRequest>>>,
}

impl MockToolInvoker {
    /// Every call returns `result`.
    pub fn returning(result: ToolCallResult) -> Self {
        Self {
            default: result,
            by_tool: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Calls to `tool_name` return `result`; others return the default.
    pub fn with_tool(mut self, tool_name: impl Into<String>, result: ToolCallResult) -> Self {
        self.by_tool.insert(tool_name.into(), result);
        self
    }

    /// Every request seen so far, in call order.
    pub fn calls(&self) -> Vec<ToolCallRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolInvoker for MockToolInvoker {
    async fn call_tool(&self, request: ToolCallRequest) -> ToolCallResult {
        let result = self
            .by_tool
            .get(&request.tool_name)
            .unwrap_or(&self.default)
            .clone();
        self.calls.lock().unwrap().push(request);
        result
    }
}

// ---------------------------------------------------------------------------
// Completions
// ---------------------------------------------------------------------------

pub struct MockCompletionService {
    reply: Result<String, String>,
    calls: Arc<Mutex<Vec<(Vec<ChatMessage>, CompletionOptions)>>>,
}

impl MockCompletionService {
    pub fn replying(content: impl Into<String>) -> Self {
        Self { reply: Ok(content.into()), calls: Arc::default() }
    }

    pub fn failing(error: impl Into<String>) -> Self {
        Self { reply: Err(error.into()), calls: Arc::default() }
    }

    pub fn calls(&self) -> Vec<(Vec<ChatMessage>, CompletionOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for MockCompletionService {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<Completion, String> {
        self.calls.lock().unwrap().push((messages, options));
        self.reply
            .clone()
            .map(|content| Completion { content, usage: None })
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

pub struct MockCredentialStore {
    stored: Result<HashMap<String, Credentials>, CredentialError>,
    lookups: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockCredentialStore {
    pub fn empty() -> Self {
        Self { stored: Ok(HashMap::new()), lookups: Arc::default() }
    }

    /// Credentials for a single server.
    pub fn with<'a>(
        server_id: &str,
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let creds = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            stored: Ok(HashMap::from([(server_id.to_string(), creds)])),
            lookups: Arc::default(),
        }
    }

    /// Every lookup fails with `error`.
    pub fn failing(error: impl Into<String>) -> Self {
        Self { stored: Err(CredentialError(error.into())), lookups: Arc::default() }
    }

    /// `(principal, server_id)` pairs looked up so far.
    pub fn lookups(&self) -> Vec<(String, String)> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn get_credentials(
        &self,
        principal: &str,
        server_id: &str,
    ) -> Result<Option<Credentials>, CredentialError> {
        self.lookups
            .lock()
            .unwrap()
            .push((principal.to_string(), server_id.to_string()));
        match &self.stored {
            Ok(stored) => Ok(stored.get(server_id).cloned()),
            Err(e) => Err(e.clone()),
        }
    }
}

/// Services where every tool call returns `tool_data` and completions reply
/// with an empty JSON object.
pub fn mock_services(tool_data: Value) -> NodeServices {
    NodeServices::new(
        Arc::new(MockToolInvoker::returning(ToolCallResult::ok(tool_data))),
        Arc::new(MockCompletionService::replying("{}")),
        Arc::new(MockCredentialStore::empty()),
    )
}
