//! Tool registry integration tests
//!
//! Runs the built-in tools through `ToolRegistry` against an in-memory
//! backend stub and checks the `ToolResult` contract: parameter
//! validation, error typing and rendered content.

use codebolt_sdk::{ClientConfig, CodeboltClient, Kind, MemoryTransport, ToolErrorType, ToolRegistry};
use serde_json::{json, Value};
use std::sync::Arc;

/// Client whose backend answers every request with `reply(message)`
fn setup(reply: impl Fn(&Value) -> Value + Send + Sync + 'static) -> (Arc<MemoryTransport>, CodeboltClient, ToolRegistry) {
    let transport = Arc::new(MemoryTransport::with_responder(move |msg| {
        let mut response = reply(msg);
        response["requestId"] = msg["requestId"].clone();
        Some(response)
    }));
    let client = CodeboltClient::with_transport(transport.clone(), ClientConfig::default()).unwrap();
    let registry = client.tool_registry();
    (transport, client, registry)
}

#[tokio::test]
async fn test_add_event_tool_end_to_end() {
    let (transport, _client, registry) = setup(|_| {
        json!({
            "type": "agentEventQueue.addEvent",
            "success": true,
            "data": {"event": {"eventId": "e1", "status": "pending"}}
        })
    });

    let result = registry
        .execute(
            "eventqueue_add_event",
            &json!({"targetAgentId": "agent-b", "payload": {"task": "review"}, "priority": "high"}),
        )
        .await;

    assert!(result.error.is_none());
    assert!(result.llm_content.contains("Event ID: e1"));
    let sent = transport.last_sent().unwrap();
    assert_eq!(sent["params"]["priority"], "high");
    assert_eq!(sent["params"]["eventType"], "custom");
}

#[tokio::test]
async fn test_backend_error_message_surfaces_typed() {
    let (_transport, _client, registry) = setup(|msg| {
        json!({
            "type": format!("{}Response", msg["action"].as_str().unwrap_or_default()),
            "success": false,
            "error": "boom"
        })
    });

    let result = registry
        .execute("task_delete", &json!({"taskId": "t1"}))
        .await;

    let error = result.error.unwrap();
    assert_eq!(error.error_type, ToolErrorType::TaskNotFound);
    assert_eq!(error.message, "boom");
    assert_eq!(result.llm_content, "Error: boom");
}

#[tokio::test]
async fn test_git_commit_without_message_sends_nothing() {
    let (transport, _client, registry) = setup(|_| json!({"type": "gitCommitResponse", "success": true}));

    let result = registry
        .execute("git_action", &json!({"action": "commit"}))
        .await;

    assert_eq!(result.error.unwrap().error_type, ToolErrorType::InvalidToolParams);
    assert_eq!(transport.sent_count(), 0);
}

#[tokio::test]
async fn test_missing_required_parameter() {
    let (transport, _client, registry) = setup(|_| json!({"type": "mail.reserveFiles", "success": true}));

    let result = registry
        .execute("mail_reserve_files", &json!({"files": ["a.rs"]}))
        .await;

    let error = result.error.unwrap();
    assert_eq!(error.error_type, ToolErrorType::InvalidToolParams);
    assert!(error.message.contains("agentId"));
    assert_eq!(transport.sent_count(), 0);
}

#[tokio::test]
async fn test_unknown_tool() {
    let (_transport, _client, registry) = setup(|_| json!({}));
    let result = registry.execute("teleport", &json!({})).await;
    assert_eq!(result.error.unwrap().error_type, ToolErrorType::ToolNotRegistered);
}

#[tokio::test]
async fn test_transport_failure_is_execution_failed() {
    let (transport, _client, registry) = setup(|_| json!({}));
    transport.disconnect();

    let result = registry
        .execute("git_action", &json!({"action": "status"}))
        .await;
    assert_eq!(result.error.unwrap().error_type, ToolErrorType::ExecutionFailed);
}

#[tokio::test]
async fn test_definitions_are_well_formed() {
    let (_transport, _client, registry) = setup(|_| json!({}));
    let definitions = registry.definitions();

    assert_eq!(definitions.len(), 37);
    for definition in &definitions {
        assert_eq!(definition.parameters["type"], "object", "{}", definition.name);
        assert!(definition.parameters["required"].is_array(), "{}", definition.name);
        assert!(!definition.description.is_empty(), "{}", definition.name);
    }

    let git = definitions.iter().find(|d| d.name == "git_action").unwrap();
    assert_eq!(git.kind, Kind::Execute);
    assert_eq!(git.parameters["required"], json!(["action"]));
}
