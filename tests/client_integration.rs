//! Client integration tests
//!
//! End-to-end tests driving `CodeboltClient` against an in-memory backend
//! stub. Covers correlation, reply pass-through, the event queue cache and
//! background thread tracking.

use codebolt_sdk::modules::agent_event_queue::AddEventInput;
use codebolt_sdk::modules::mail::ReserveFilesParams;
use codebolt_sdk::{ClientConfig, ClientError, CodeboltClient, MemoryTransport, Response};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Backend stub answering by request type
fn backend(reply: impl Fn(&str, &Value) -> Option<Value> + Send + Sync + 'static) -> Arc<MemoryTransport> {
    Arc::new(MemoryTransport::with_responder(move |msg| {
        let kind = msg["type"].as_str()?.to_string();
        let mut response = reply(&kind, msg)?;
        if let Some(object) = response.as_object_mut() {
            object
                .entry("requestId")
                .or_insert_with(|| msg["requestId"].clone());
        }
        Some(response)
    }))
}

fn client(transport: Arc<MemoryTransport>) -> CodeboltClient {
    CodeboltClient::with_transport(transport, ClientConfig::default()).unwrap()
}

async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// ─── Correlation ────────────────────────────────────────────────

#[tokio::test]
async fn test_add_event_reply_passes_through_unchanged() {
    let transport = backend(|kind, msg| {
        (kind == "agentEventQueue.addEvent").then(|| {
            json!({
                "type": "agentEventQueue.addEvent",
                "requestId": msg["requestId"],
                "success": true,
                "data": {"event": {"eventId": "e1", "status": "pending"}},
                "serverTime": "2026-01-01T00:00:00Z"
            })
        })
    });
    let client = client(transport.clone());

    let response = client
        .event_queue()
        .add_event(&AddEventInput::new("agent-b", json!({"task": "review"})))
        .await
        .unwrap();

    let sent = transport.last_sent().unwrap();
    assert_eq!(sent["params"]["targetAgentId"], "agent-b");
    assert_eq!(sent["params"]["eventType"], "custom");
    assert_eq!(sent["params"]["priority"], "normal");

    let expected = json!({
        "type": "agentEventQueue.addEvent",
        "requestId": sent["requestId"],
        "success": true,
        "data": {"event": {"eventId": "e1", "status": "pending"}},
        "serverTime": "2026-01-01T00:00:00Z"
    });
    assert_eq!(serde_json::to_value(&response).unwrap(), expected);
}

#[tokio::test]
async fn test_request_ids_unique_under_concurrency() {
    let transport = backend(|kind, _| {
        (kind == "agentEventQueue.getQueueStats").then(|| {
            json!({"type": "agentEventQueue.getQueueStats", "success": true, "data": {"totalAgents": 1}})
        })
    });
    let client = Arc::new(client(transport.clone()));

    let mut handles = Vec::new();
    for _ in 0..32 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client.event_queue().get_queue_stats().await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_success());
    }

    let ids: HashSet<String> = transport
        .sent_messages()
        .iter()
        .map(|m| m["requestId"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids.len(), 32);
    assert_eq!(client.manager().pending_count(), 0);
}

#[tokio::test]
async fn test_reserve_files_request_shape() {
    let transport = backend(|kind, _| {
        (kind == "mail.reserveFiles")
            .then(|| json!({"type": "mail.reserveFiles", "success": true, "data": {"reserved": 2}}))
    });
    let client = client(transport.clone());

    client
        .mail()
        .reserve_files(&ReserveFilesParams {
            agent_id: "a1".into(),
            files: vec!["src/a.rs".into(), "src/b.rs".into()],
            reason: Some("refactor".into()),
            duration: None,
        })
        .await
        .unwrap();

    let sent = transport.last_sent().unwrap();
    assert_eq!(sent["type"], "mail.reserveFiles");
    assert_eq!(
        sent["params"],
        json!({"agentId": "a1", "files": ["src/a.rs", "src/b.rs"], "reason": "refactor"})
    );
    assert!(sent.get("action").is_none());
}

#[tokio::test]
async fn test_context_rule_get_passes_through() {
    let transport = backend(|kind, msg| {
        (kind == "contextRuleEngineEvent").then(|| {
            json!({
                "type": "contextRuleEngineResponse",
                "success": true,
                "data": {"ruleEngine": {"id": msg["message"]["id"], "rules": []}}
            })
        })
    });
    let client = client(transport.clone());

    let response = client.context_rules().get("cre-1").await.unwrap();

    assert_eq!(response.data.unwrap()["ruleEngine"]["id"], "cre-1");
    let sent = transport.last_sent().unwrap();
    assert_eq!(sent["action"], "get");
    assert_eq!(sent["message"], json!({"id": "cre-1"}));
}

#[tokio::test]
async fn test_backend_failure_is_not_an_error() {
    let transport = backend(|_, _| {
        Some(json!({"type": "gitPushResponse", "success": false, "error": "boom"}))
    });
    let client = client(transport);

    let response: Response = client.git().push().await.unwrap();
    assert!(!response.is_success());
    assert_eq!(response.error_message().as_deref(), Some("boom"));
}

#[tokio::test]
async fn test_timeout_and_disconnect() {
    let transport = Arc::new(MemoryTransport::new());
    let config = ClientConfig::default().with_request_timeout(1);
    let client = CodeboltClient::with_transport(transport.clone(), config).unwrap();

    let result = client.git().status().await;
    assert!(matches!(result, Err(ClientError::Timeout { .. })));
    assert_eq!(client.manager().pending_count(), 0);

    let waiting = {
        let git = client.git().clone();
        tokio::spawn(async move { git.pull().await })
    };
    wait_until(|| client.manager().pending_count() == 1).await;
    transport.disconnect();

    let result = waiting.await.unwrap();
    assert!(matches!(result, Err(ClientError::Disconnected(_))));
}

// ─── Event queue ────────────────────────────────────────────────

/// Queue backend serving `pending` once and recording acknowledgements
fn queue_backend(pending: Vec<Value>, acked: Arc<Mutex<Vec<String>>>) -> Arc<MemoryTransport> {
    let pending = Arc::new(Mutex::new(pending));
    backend(move |kind, msg| {
        let data = match kind {
            "agentEventQueue.getPendingEvents" => {
                json!({"events": pending.lock().unwrap().drain(..).collect::<Vec<_>>()})
            }
            "agentEventQueue.acknowledgeEvent" => {
                acked
                    .lock()
                    .unwrap()
                    .push(msg["params"]["eventId"].as_str().unwrap_or_default().to_string());
                json!({"acknowledged": true})
            }
            _ => return None,
        };
        Some(json!({"type": kind, "success": true, "data": data}))
    })
}

fn push(transport: &MemoryTransport, event_id: &str) {
    transport
        .inject(json!({
            "type": "agentEventQueue.eventDelivered",
            "payload": {"event": {"eventId": event_id, "payload": {"n": event_id}}}
        }))
        .unwrap();
}

#[tokio::test]
async fn test_cache_drain_without_duplicates() {
    let acked = Arc::new(Mutex::new(Vec::new()));
    // The backend still lists e2 although it was also pushed
    let transport = queue_backend(
        vec![json!({"eventId": "e2"}), json!({"eventId": "e3"})],
        acked.clone(),
    );
    let client = client(transport.clone());
    let queue = client.event_queue();

    push(&transport, "e1");
    push(&transport, "e2");
    wait_until(|| queue.get_local_cache_size() == 2).await;

    let batch = queue.get_pending_queue_events(None).await.unwrap();
    let ids: Vec<&str> = batch.events.iter().map(|e| e.event_id.as_str()).collect();
    assert_eq!(ids, vec!["e1", "e2", "e3"]);
    assert_eq!(batch.from_cache, 2);
    assert_eq!(queue.get_local_cache_size(), 0);

    // Cached events are acknowledged on consumption
    assert_eq!(*acked.lock().unwrap(), vec!["e1", "e2"]);

    // A late redelivery of a consumed event is ignored
    push(&transport, "e1");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(queue.get_local_cache_size(), 0);
    assert!(queue.get_pending_queue_events(None).await.unwrap().events.is_empty());
}

#[tokio::test]
async fn test_max_depth_served_from_cache_first() {
    let acked = Arc::new(Mutex::new(Vec::new()));
    let transport = queue_backend(vec![json!({"eventId": "b1"})], acked);
    let client = client(transport.clone());
    let queue = client.event_queue();

    push(&transport, "c1");
    push(&transport, "c2");
    wait_until(|| queue.get_local_cache_size() == 2).await;
    transport.clear_sent();

    let batch = queue.get_pending_queue_events(Some(2)).await.unwrap();
    assert_eq!(batch.events.len(), 2);
    assert_eq!(batch.from_cache, 2);
    // Depth satisfied by the cache, so no backend pull
    assert!(transport
        .sent_messages()
        .iter()
        .all(|m| m["type"] != "agentEventQueue.getPendingEvents"));
}

#[tokio::test]
async fn test_wait_for_next_event_wakes_on_push() {
    let acked = Arc::new(Mutex::new(Vec::new()));
    let transport = queue_backend(Vec::new(), acked);
    let client = client(transport.clone());
    let queue = client.event_queue().clone();

    let cancel = CancellationToken::new();
    let waiter = {
        let cancel = cancel.clone();
        tokio::spawn(async move { queue.wait_for_next_queue_event(None, &cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    push(&transport, "w1");

    let batch = tokio::time::timeout(Duration::from_secs(2), waiter)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(batch.events[0].event_id, "w1");
}

// ─── Background child threads ───────────────────────────────────

#[tokio::test]
async fn test_background_completion_tracking() {
    let transport = Arc::new(MemoryTransport::new());
    let client = client(transport.clone());
    let threads = client.background_threads();

    threads.add_running_agent("t1", json!({"task": "lint"}), None);
    threads.add_running_agent("t2", json!({"task": "test"}), None);
    assert_eq!(threads.get_running_agent_count(), 2);
    assert!(threads.check_for_background_agent_completion().is_none());

    transport
        .inject(json!({"type": "backgroundAgentCompletion", "threadId": "t1", "result": "ok"}))
        .unwrap();

    let completion = threads
        .on_background_agent_completion(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(completion.thread_id.as_deref(), Some("t1"));
    assert_eq!(completion.message["result"], "ok");
    assert_eq!(threads.get_running_agent_count(), 1);
    assert!(threads.check_for_background_agent_completion().is_none());
}
