//! Agent event queue tools

use super::{outcome, pretty, DeclarativeTool, Kind, NoParams, ParameterSchema, ToolErrorType, ToolResult};
use crate::error::Result;
use crate::modules::agent_event_queue::{
    AddEventInput, AgentEvent, AgentEventQueue, QueueEvents, QueueStats, SendAgentMessageInput,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const EVENT_TYPES: &[&str] = &[
    "agentMessage",
    "calendarUpdate",
    "systemNotification",
    "taskUpdate",
    "custom",
];
const PRIORITIES: &[&str] = &["low", "normal", "high", "urgent"];

fn wire_name(value: impl Serialize) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(s)) => s,
        Ok(other) => other.to_string(),
        Err(_) => String::new(),
    }
}

fn describe_event(event: &AgentEvent) -> String {
    format!(
        "- [{}] {} ({}) from {}: {}",
        wire_name(event.priority),
        event.event_id,
        wire_name(event.event_type),
        event.source_agent_id.as_deref().unwrap_or("unknown"),
        event.payload
    )
}

/// Render a pull result
fn pulled(result: Result<QueueEvents>) -> ToolResult {
    let batch = match result {
        Err(e) => return ToolResult::error(ToolErrorType::ExecutionFailed, e.to_string()),
        Ok(batch) if !batch.success => {
            return ToolResult::error(
                ToolErrorType::ExecutionFailed,
                batch
                    .error
                    .unwrap_or_else(|| "Failed to get pending events".to_string()),
            )
        }
        Ok(batch) => batch,
    };

    if batch.events.is_empty() {
        return ToolResult::success("No pending events in queue.", "No pending events");
    }

    let mut content = format!(
        "Retrieved {} event(s), {} from the local cache. These events have been acknowledged and removed from the queue.\n\n",
        batch.events.len(),
        batch.from_cache
    );
    for event in &batch.events {
        content.push_str(&describe_event(event));
        content.push('\n');
    }
    content.push_str("\nFull events:\n");
    content.push_str(&pretty(&serde_json::to_value(&batch.events).unwrap_or(Value::Null)));

    ToolResult::success(content, format!("Retrieved {} event(s)", batch.events.len()))
}

/// Add an event to another agent's queue
pub struct EventQueueAddEventTool {
    queue: Arc<AgentEventQueue>,
}

impl EventQueueAddEventTool {
    pub fn new(queue: Arc<AgentEventQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl DeclarativeTool for EventQueueAddEventTool {
    type Params = AddEventInput;

    fn name(&self) -> &str {
        "eventqueue_add_event"
    }

    fn description(&self) -> &str {
        "Adds an event to the agent event queue for delivery to a target agent."
    }

    fn kind(&self) -> Kind {
        Kind::Execute
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string("targetAgentId", "ID of the agent that receives the event", true)
            .object("payload", "Event payload", true)
            .string_enum("eventType", "Type of event (default custom)", EVENT_TYPES, false)
            .string_enum("priority", "Event priority (default normal)", PRIORITIES, false)
            .string("targetAgentInstanceId", "Specific agent instance to target", false)
            .string("targetThreadId", "Thread to deliver the event to", false)
    }

    async fn invoke(&self, params: AddEventInput, _cancel: &CancellationToken) -> ToolResult {
        let target = params.target_agent_id.clone();
        outcome(
            self.queue.add_event(&params).await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let event = response
                    .data
                    .as_ref()
                    .and_then(|data| data.get("event"))
                    .cloned()
                    .unwrap_or(Value::Null);
                let event_id = event["eventId"].as_str().unwrap_or("unknown");
                let status = event["status"].as_str().unwrap_or("unknown");
                ToolResult::success(
                    format!(
                        "Event added to queue successfully.\nEvent ID: {}\nTarget Agent: {}\nStatus: {}",
                        event_id, target, status
                    ),
                    format!("Event {} queued for {}", event_id, target),
                )
            },
        )
    }
}

/// Send a message event to another agent
pub struct EventQueueSendMessageTool {
    queue: Arc<AgentEventQueue>,
}

impl EventQueueSendMessageTool {
    pub fn new(queue: Arc<AgentEventQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl DeclarativeTool for EventQueueSendMessageTool {
    type Params = SendAgentMessageInput;

    fn name(&self) -> &str {
        "eventqueue_send_message"
    }

    fn description(&self) -> &str {
        "Sends a text, JSON or command message to another agent through the event queue."
    }

    fn kind(&self) -> Kind {
        Kind::Execute
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string("targetAgentId", "ID of the receiving agent", true)
            .any("content", "Message content", true)
            .string_enum("messageType", "Content type (default text)", &["text", "json", "command"], false)
            .string("replyTo", "Event ID this message replies to", false)
            .string_enum("priority", "Message priority", PRIORITIES, false)
            .string("targetThreadId", "Thread to deliver the message to", false)
    }

    async fn invoke(&self, params: SendAgentMessageInput, _cancel: &CancellationToken) -> ToolResult {
        let target = params.target_agent_id.clone();
        outcome(
            self.queue.send_agent_message(params).await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let event_id = response
                    .data
                    .as_ref()
                    .and_then(|data| data.pointer("/event/eventId"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                ToolResult::success(
                    format!("Message sent to {}.\nEvent ID: {}", target, event_id),
                    format!("Message sent to {}", target),
                )
            },
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullParams {
    #[serde(default)]
    max_depth: Option<usize>,
}

/// Pull pending events without waiting
pub struct EventQueueGetPendingTool {
    queue: Arc<AgentEventQueue>,
}

impl EventQueueGetPendingTool {
    pub fn new(queue: Arc<AgentEventQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl DeclarativeTool for EventQueueGetPendingTool {
    type Params = PullParams;

    fn name(&self) -> &str {
        "eventqueue_get_pending_events"
    }

    fn description(&self) -> &str {
        "Retrieves pending events for this agent. Events are automatically acknowledged and removed from the queue after retrieval."
    }

    fn kind(&self) -> Kind {
        Kind::Read
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new().integer("maxDepth", "Maximum number of events to return", false)
    }

    async fn invoke(&self, params: PullParams, _cancel: &CancellationToken) -> ToolResult {
        pulled(self.queue.get_pending_queue_events(params.max_depth).await)
    }
}

/// Block until an event arrives
pub struct EventQueueWaitNextTool {
    queue: Arc<AgentEventQueue>,
}

impl EventQueueWaitNextTool {
    pub fn new(queue: Arc<AgentEventQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl DeclarativeTool for EventQueueWaitNextTool {
    type Params = PullParams;

    fn name(&self) -> &str {
        "eventqueue_wait_next_event"
    }

    fn description(&self) -> &str {
        "Waits until at least one event is available, then returns it along with any other buffered events. Events are acknowledged on retrieval."
    }

    fn kind(&self) -> Kind {
        Kind::Read
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new().integer("maxDepth", "Maximum number of events to return", false)
    }

    async fn invoke(&self, params: PullParams, cancel: &CancellationToken) -> ToolResult {
        pulled(
            self.queue
                .wait_for_next_queue_event(params.max_depth, cancel)
                .await,
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckParams {
    event_id: String,
    #[serde(default = "processed")]
    success: bool,
    #[serde(default)]
    error_message: Option<String>,
}

fn processed() -> bool {
    true
}

/// Acknowledge a push-delivered event
pub struct EventQueueAckTool {
    queue: Arc<AgentEventQueue>,
}

impl EventQueueAckTool {
    pub fn new(queue: Arc<AgentEventQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl DeclarativeTool for EventQueueAckTool {
    type Params = AckParams;

    fn name(&self) -> &str {
        "eventqueue_acknowledge_event"
    }

    fn description(&self) -> &str {
        "Acknowledges an event as processed (or failed) so the queue stops redelivering it."
    }

    fn kind(&self) -> Kind {
        Kind::Edit
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string("eventId", "ID of the event to acknowledge", true)
            .boolean("success", "Whether processing succeeded (default true)", false)
            .string("errorMessage", "Failure reason when success is false", false)
    }

    async fn invoke(&self, params: AckParams, _cancel: &CancellationToken) -> ToolResult {
        let result = self
            .queue
            .acknowledge_event(&params.event_id, params.success, params.error_message.as_deref())
            .await;
        outcome(result, ToolErrorType::ExecutionFailed, |_| {
            let state = if params.success { "processed" } else { "failed" };
            ToolResult::success(
                format!("Event {} acknowledged as {}.", params.event_id, state),
                format!("Acknowledged {}", params.event_id),
            )
        })
    }
}

/// Aggregate queue statistics
pub struct EventQueueStatsTool {
    queue: Arc<AgentEventQueue>,
}

impl EventQueueStatsTool {
    pub fn new(queue: Arc<AgentEventQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl DeclarativeTool for EventQueueStatsTool {
    type Params = NoParams;

    fn name(&self) -> &str {
        "eventqueue_get_stats"
    }

    fn description(&self) -> &str {
        "Returns event queue statistics: agent count, pending and delivered totals."
    }

    fn kind(&self) -> Kind {
        Kind::Read
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
    }

    async fn invoke(&self, _params: NoParams, _cancel: &CancellationToken) -> ToolResult {
        outcome(
            self.queue.get_queue_stats().await,
            ToolErrorType::ExecutionFailed,
            |response| {
                let data = response.data.clone().unwrap_or(Value::Null);
                let stats: QueueStats = serde_json::from_value(data.clone()).unwrap_or_default();
                ToolResult::success(
                    format!(
                        "Queue statistics:\nTotal agents: {}\nTotal pending: {}\nTotal delivered: {}\n\n{}",
                        stats.total_agents,
                        stats.total_pending,
                        stats.total_delivered,
                        pretty(&data)
                    ),
                    format!(
                        "{} pending, {} delivered",
                        stats.total_pending, stats.total_delivered
                    ),
                )
            },
        )
    }
}

/// Inspect the local cache without consuming it
pub struct EventQueueLocalCacheTool {
    queue: Arc<AgentEventQueue>,
}

impl EventQueueLocalCacheTool {
    pub fn new(queue: Arc<AgentEventQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl DeclarativeTool for EventQueueLocalCacheTool {
    type Params = NoParams;

    fn name(&self) -> &str {
        "eventqueue_get_local_cache"
    }

    fn description(&self) -> &str {
        "Shows events delivered to this agent that have not been retrieved yet. Does not consume them."
    }

    fn kind(&self) -> Kind {
        Kind::Read
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
    }

    async fn invoke(&self, _params: NoParams, _cancel: &CancellationToken) -> ToolResult {
        let events = self.queue.peek_local_cache();
        let mut content = format!("Local event cache holds {} event(s).", events.len());
        for event in &events {
            content.push('\n');
            content.push_str(&describe_event(event));
        }
        ToolResult::success(content, format!("{} cached event(s)", events.len()))
    }
}

/// Drop the local cache
pub struct EventQueueClearCacheTool {
    queue: Arc<AgentEventQueue>,
}

impl EventQueueClearCacheTool {
    pub fn new(queue: Arc<AgentEventQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl DeclarativeTool for EventQueueClearCacheTool {
    type Params = NoParams;

    fn name(&self) -> &str {
        "eventqueue_clear_local_cache"
    }

    fn description(&self) -> &str {
        "Discards events held in the local cache. The backend queue is not affected."
    }

    fn kind(&self) -> Kind {
        Kind::Delete
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new()
    }

    async fn invoke(&self, _params: NoParams, _cancel: &CancellationToken) -> ToolResult {
        let cleared = self.queue.clear_local_cache();
        ToolResult::success(
            format!("Cleared {} event(s) from the local cache.", cleared),
            format!("Cleared {} event(s)", cleared),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::manager::MessageManager;
    use crate::tools::Tool;
    use crate::transport::MemoryTransport;
    use serde_json::json;

    fn queue(transport: Arc<MemoryTransport>) -> Arc<AgentEventQueue> {
        let config = ClientConfig::default();
        let manager = Arc::new(MessageManager::new(transport, &config).unwrap());
        Arc::new(AgentEventQueue::new(manager, &config))
    }

    fn echo_success(data: Value) -> Arc<MemoryTransport> {
        Arc::new(MemoryTransport::with_responder(move |msg| {
            Some(json!({"type": msg["type"], "requestId": msg["requestId"], "success": true, "data": data}))
        }))
    }

    #[tokio::test]
    async fn test_add_event_renders_event_id() {
        let transport = echo_success(json!({"event": {"eventId": "e1", "status": "pending"}}));
        let tool = EventQueueAddEventTool::new(queue(transport));

        let result = tool
            .execute(
                &json!({"targetAgentId": "agent-b", "payload": {"k": 1}}),
                &CancellationToken::new(),
            )
            .await;

        assert!(!result.is_error());
        assert!(result.llm_content.contains("Event ID: e1"));
        assert!(result.llm_content.contains("Status: pending"));
    }

    #[tokio::test]
    async fn test_add_event_rejects_unknown_priority() {
        let transport = echo_success(json!({}));
        let tool = EventQueueAddEventTool::new(queue(transport.clone()));

        let result = tool
            .execute(
                &json!({"targetAgentId": "b", "payload": {}, "priority": "critical"}),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(result.error_type(), Some(ToolErrorType::InvalidToolParams));
        assert_eq!(transport.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_add_event_backend_failure() {
        let transport = Arc::new(MemoryTransport::with_responder(|msg| {
            Some(json!({"type": msg["type"], "requestId": msg["requestId"], "success": false, "message": "queue full"}))
        }));
        let tool = EventQueueAddEventTool::new(queue(transport));

        let result = tool
            .execute(
                &json!({"targetAgentId": "b", "payload": {}}),
                &CancellationToken::new(),
            )
            .await;

        let error = result.error.unwrap();
        assert_eq!(error.error_type, ToolErrorType::ExecutionFailed);
        assert_eq!(error.message, "queue full");
    }

    #[tokio::test]
    async fn test_get_pending_empty() {
        let transport = echo_success(json!({"events": []}));
        let tool = EventQueueGetPendingTool::new(queue(transport));

        let result = tool.execute(&json!({}), &CancellationToken::new()).await;
        assert_eq!(result.llm_content, "No pending events in queue.");
    }

    #[tokio::test]
    async fn test_get_pending_lists_events() {
        let transport = echo_success(json!({"events": [
            {"eventId": "p1", "priority": "high", "sourceAgentId": "a", "payload": {"x": 1}}
        ]}));
        let tool = EventQueueGetPendingTool::new(queue(transport));

        let result = tool.execute(&json!({"maxDepth": 5}), &CancellationToken::new()).await;
        assert!(result.llm_content.contains("Retrieved 1 event(s)"));
        assert!(result.llm_content.contains("[high] p1 (custom) from a"));
    }

    #[tokio::test]
    async fn test_wait_cancelled_reports_failure() {
        let transport = echo_success(json!({"events": []}));
        let tool = EventQueueWaitNextTool::new(queue(transport));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = tool.execute(&json!({}), &cancel).await;
        assert_eq!(result.error_type(), Some(ToolErrorType::ExecutionFailed));
    }

    #[tokio::test]
    async fn test_ack_defaults_to_success() {
        let transport = echo_success(json!({}));
        let tool = EventQueueAckTool::new(queue(transport.clone()));

        let result = tool
            .execute(&json!({"eventId": "e9"}), &CancellationToken::new())
            .await;
        assert!(result.llm_content.contains("processed"));
        assert_eq!(transport.last_sent().unwrap()["params"]["success"], true);
    }

    #[tokio::test]
    async fn test_local_cache_tools() {
        let transport = echo_success(json!({}));
        let queue = queue(transport.clone());
        transport
            .inject(json!({
                "type": "agentEventQueue.eventDelivered",
                "payload": {"event": {"eventId": "c1"}}
            }))
            .unwrap();
        while queue.get_local_cache_size() == 0 {
            tokio::task::yield_now().await;
        }

        let peek = EventQueueLocalCacheTool::new(queue.clone())
            .execute(&json!({}), &CancellationToken::new())
            .await;
        assert!(peek.llm_content.contains("c1"));

        let clear = EventQueueClearCacheTool::new(queue.clone())
            .execute(&json!({}), &CancellationToken::new())
            .await;
        assert!(clear.llm_content.contains("Cleared 1"));
        assert_eq!(queue.get_local_cache_size(), 0);
    }
}
