//! Orchestrator tests for the workflow execution engine.
//!
//! External services are replaced by the recording doubles in `nodes::mock`,
//! so these run without any tool server or LLM provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use nodes::mock::{mock_services, MockCompletionService, MockCredentialStore, MockToolInvoker};
use nodes::services::{ToolCallRequest, ToolCallResult, ToolInvoker};
use nodes::{NodeKind, NodeServices};

use crate::{
    ExecutionStatus, ExecutorConfig, WorkflowDag, WorkflowExecutor, WorkflowNode,
};

fn executor(services: NodeServices) -> WorkflowExecutor {
    WorkflowExecutor::new(services, ExecutorConfig::default())
}

fn save(id: &str, inputs: &[&str]) -> WorkflowNode {
    WorkflowNode::new(id, NodeKind::Action, json!({ "type": "save" }), inputs)
}

fn fetch(id: &str, tool: &str, parameters: Value, inputs: &[&str]) -> WorkflowNode {
    WorkflowNode::new(
        id,
        NodeKind::McpFetch,
        json!({ "serverId": "crm", "toolName": tool, "parameters": parameters }),
        inputs,
    )
}

fn statuses(execution: &crate::WorkflowExecution) -> Vec<(&str, ExecutionStatus)> {
    execution
        .logs
        .iter()
        .map(|l| (l.node_id.as_str(), l.status))
        .collect()
}

/// Tool invoker that never answers before `delay`.
struct SlowTools {
    delay: Duration,
}

#[async_trait]
impl ToolInvoker for SlowTools {
    async fn call_tool(&self, _request: ToolCallRequest) -> ToolCallResult {
        tokio::time::sleep(self.delay).await;
        ToolCallResult::ok(json!("late"))
    }
}

fn slow_services(delay: Duration) -> NodeServices {
    NodeServices::new(
        Arc::new(SlowTools { delay }),
        Arc::new(MockCompletionService::replying("{}")),
        Arc::new(MockCredentialStore::empty()),
    )
}

// ============================================================
// Happy paths
// ============================================================

#[tokio::test]
async fn single_save_node_returns_trigger_input() {
    let wf = WorkflowDag::new("echo", "owner", vec![save("store", &[])]);

    let execution = executor(NodeServices::unconfigured())
        .execute_with_input(&wf, "user-1", json!({ "hello": "world" }))
        .await;

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.result, Some(json!({ "hello": "world" })));
    assert_eq!(execution.error, None);
    assert!(execution.completed_at.is_some());
    assert_eq!(statuses(&execution), vec![("store", ExecutionStatus::Completed)]);
}

#[tokio::test]
async fn reference_resolves_against_upstream_output() {
    let tools = Arc::new(
        MockToolInvoker::returning(ToolCallResult::ok(json!("done")))
            .with_tool("get_account", ToolCallResult::ok(json!({ "x": 1 }))),
    );
    let services = NodeServices::new(
        tools.clone(),
        Arc::new(MockCompletionService::replying("{}")),
        Arc::new(MockCredentialStore::empty()),
    );
    let wf = WorkflowDag::new(
        "resolve",
        "owner",
        vec![
            fetch("a", "get_account", json!({}), &[]),
            fetch("b", "update_account", json!({ "v": "$input[0].x" }), &["a"]),
        ],
    );

    let execution = executor(services).execute(&wf, "user-1").await;

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.result, Some(json!("done")));
    let calls = tools.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].parameters.get("v"), Some(&json!(1)));
}

#[tokio::test]
async fn pipeline_fetch_filter_merge() {
    let tools = Arc::new(
        MockToolInvoker::returning(ToolCallResult::ok(json!([])))
            .with_tool("list_a", ToolCallResult::ok(json!([{ "id": 1, "price": 5 }, { "id": 2, "price": 15 }])))
            .with_tool("list_b", ToolCallResult::ok(json!([{ "id": 2, "price": 15 }, { "id": 3, "price": 30 }]))),
    );
    let services = NodeServices::new(
        tools,
        Arc::new(MockCompletionService::replying("{}")),
        Arc::new(MockCredentialStore::empty()),
    );
    let wf = WorkflowDag::new(
        "pipeline",
        "owner",
        vec![
            WorkflowNode::new(
                "combined",
                NodeKind::Merge,
                json!({ "strategy": "deduplicate", "key": "id" }),
                &["a", "b"],
            ),
            fetch("a", "list_a", json!({}), &[]),
            fetch("b", "list_b", json!({}), &[]),
            WorkflowNode::new(
                "expensive",
                NodeKind::Filter,
                json!({ "conditions": [{ "field": "price", "operator": "gt", "value": 10 }] }),
                &["combined"],
            ),
        ],
    );

    let execution = executor(services).execute(&wf, "user-1").await;

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(
        execution.result,
        Some(json!([{ "id": 2, "price": 15 }, { "id": 3, "price": 30 }]))
    );
    assert_eq!(
        statuses(&execution),
        vec![
            ("a", ExecutionStatus::Completed),
            ("b", ExecutionStatus::Completed),
            ("combined", ExecutionStatus::Completed),
            ("expensive", ExecutionStatus::Completed),
        ]
    );
}

#[tokio::test]
async fn conditional_does_not_skip_any_branch() {
    let wf = WorkflowDag::new(
        "branching",
        "owner",
        vec![
            save("start", &[]),
            WorkflowNode::new(
                "check",
                NodeKind::Conditional,
                json!({ "condition": "data.total > 100", "trueBranch": "big", "falseBranch": "small" }),
                &["start"],
            ),
            save("big", &["check"]),
            save("small", &["check"]),
        ],
    );

    let execution = executor(NodeServices::unconfigured())
        .execute_with_input(&wf, "user-1", json!({ "total": 10 }))
        .await;

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.logs.len(), 4);
    assert_eq!(execution.logs[1].output.as_ref().unwrap()["nextNode"], json!("small"));
    // Result is whichever node is last in topological order.
    assert_eq!(execution.result.as_ref().unwrap()["conditionMet"], json!(false));
}

// ============================================================
// Failure paths
// ============================================================

#[tokio::test]
async fn failing_middle_node_stops_the_run() {
    let wf = WorkflowDag::new(
        "chain",
        "owner",
        vec![
            save("ok", &[]),
            WorkflowNode::new("boom", NodeKind::Action, json!({ "type": "webhook" }), &["ok"]),
            save("never", &["boom"]),
        ],
    );

    let execution = executor(NodeServices::unconfigured())
        .execute_with_input(&wf, "user-1", json!({ "n": 1 }))
        .await;

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(
        statuses(&execution),
        vec![("ok", ExecutionStatus::Completed), ("boom", ExecutionStatus::Failed)]
    );
    assert_eq!(execution.result, None);
    assert!(execution.completed_at.is_some());

    let error = execution.error.unwrap();
    assert!(error.starts_with("Node boom failed: "), "{error}");
    assert!(error.contains("not yet supported"));
    assert_eq!(
        execution.logs[1].error.as_deref(),
        Some("webhook action is not yet supported")
    );
}

#[tokio::test]
async fn cycle_fails_with_empty_log() {
    let wf = WorkflowDag::new(
        "loop",
        "owner",
        vec![save("a", &["b"]), save("b", &["a"])],
    );

    let execution = executor(mock_services(Value::Null)).execute(&wf, "user-1").await;

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.logs.is_empty());
    assert!(execution.error.unwrap().contains("cycle"));
}

#[tokio::test]
async fn unknown_input_fails_before_any_node_runs() {
    let tools = Arc::new(MockToolInvoker::returning(ToolCallResult::ok(Value::Null)));
    let services = NodeServices::new(
        tools.clone(),
        Arc::new(MockCompletionService::replying("{}")),
        Arc::new(MockCredentialStore::empty()),
    );
    let wf = WorkflowDag::new(
        "dangling",
        "owner",
        vec![fetch("a", "t", json!({}), &[]), save("b", &["missing"])],
    );

    let execution = executor(services).execute(&wf, "user-1").await;

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.logs.is_empty());
    assert!(execution.error.unwrap().contains("missing"));
    assert!(tools.calls().is_empty());
}

#[tokio::test]
async fn bad_config_is_recorded_as_node_failure() {
    let wf = WorkflowDag::new(
        "misconfigured",
        "owner",
        vec![WorkflowNode::new("m", NodeKind::Merge, json!({}), &[])],
    );

    let execution = executor(NodeServices::unconfigured()).execute(&wf, "user-1").await;

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(statuses(&execution), vec![("m", ExecutionStatus::Failed)]);
    assert!(execution.error.unwrap().starts_with("Node m failed: invalid node config"));
}

#[tokio::test(start_paused = true)]
async fn slow_node_times_out() {
    let wf = WorkflowDag::new("slow", "owner", vec![fetch("wait", "t", json!({}), &[])]);
    let executor = WorkflowExecutor::new(
        slow_services(Duration::from_secs(60)),
        ExecutorConfig { node_timeout: Some(Duration::from_secs(5)) },
    );

    let execution = executor.execute(&wf, "user-1").await;

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.error.unwrap().contains("timed out"));
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_running_node() {
    let wf = WorkflowDag::new(
        "cancel",
        "owner",
        vec![fetch("wait", "t", json!({}), &[]), save("after", &["wait"])],
    );
    let executor = WorkflowExecutor::new(
        slow_services(Duration::from_secs(60)),
        ExecutorConfig { node_timeout: None },
    );
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let execution = executor.execute_with_cancel(&wf, "user-1", None, &cancel).await;

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(statuses(&execution), vec![("wait", ExecutionStatus::Failed)]);
    assert_eq!(execution.error.as_deref(), Some("Node wait failed: execution cancelled"));
}

#[tokio::test]
async fn cancelled_token_stops_the_next_node_before_it_starts() {
    let tools = Arc::new(MockToolInvoker::returning(ToolCallResult::ok(json!("fetched"))));
    let services = NodeServices::new(
        tools.clone(),
        Arc::new(MockCompletionService::replying("{}")),
        Arc::new(MockCredentialStore::empty()),
    );
    let wf = WorkflowDag::new(
        "precancelled",
        "owner",
        vec![fetch("first", "t", json!({}), &[]), save("second", &["first"])],
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let execution = executor(services).execute_with_cancel(&wf, "user-1", None, &cancel).await;

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(statuses(&execution), vec![("first", ExecutionStatus::Failed)]);
    assert_eq!(execution.error.as_deref(), Some("Node first failed: execution cancelled"));
    assert!(tools.calls().is_empty());
}

#[tokio::test]
async fn definition_with_free_form_id_loads_and_runs() {
    let wf: WorkflowDag = serde_json::from_value(json!({
        "id": "wf-1",
        "name": "echo",
        "ownerId": "owner",
        "nodes": [{ "id": "store", "type": "action", "config": { "type": "save" } }],
    }))
    .unwrap();

    let execution = executor(NodeServices::unconfigured())
        .execute_with_input(&wf, "user-1", json!("payload"))
        .await;

    assert_eq!(execution.workflow_id, "wf-1");
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.result, Some(json!("payload")));
}

#[tokio::test]
async fn concurrent_runs_are_independent() {
    let wf = WorkflowDag::new("echo", "owner", vec![save("store", &[])]);
    let executor = executor(NodeServices::unconfigured());

    let (first, second) = tokio::join!(
        executor.execute_with_input(&wf, "alice", json!(1)),
        executor.execute_with_input(&wf, "bob", json!(2)),
    );

    assert_ne!(first.id, second.id);
    assert_eq!(first.result, Some(json!(1)));
    assert_eq!(second.result, Some(json!(2)));
    assert_eq!(first.user_id, "alice");
    assert_eq!(second.user_id, "bob");
}
