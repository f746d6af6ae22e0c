//! Agent event queue types
//!
//! All types use camelCase JSON serialization for wire compatibility.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Kind of inter-agent event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AgentEventType {
    AgentMessage,
    CalendarUpdate,
    SystemNotification,
    TaskUpdate,
    #[default]
    Custom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// Backend-reported delivery status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Delivered,
    Acknowledged,
    Failed,
    Expired,
    #[serde(other)]
    Unknown,
}

/// A unit of inter-agent communication or notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEvent {
    /// Backend-assigned unique id
    pub event_id: String,

    #[serde(default)]
    pub event_type: AgentEventType,

    #[serde(default)]
    pub priority: EventPriority,

    /// Opaque body, shape depends on `event_type`
    #[serde(default)]
    pub payload: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_agent_id: Option<String>,

    #[serde(default)]
    pub target_agent_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_agent_instance_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_thread_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl AgentEvent {
    /// True once `expires_at` is in the past
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |expires| expires <= now)
    }
}

/// Input for `addEvent`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEventInput {
    pub target_agent_id: String,

    pub payload: Value,

    /// Defaults to `custom` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<AgentEventType>,

    /// Defaults to `normal` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<EventPriority>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_agent_instance_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_thread_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

impl AddEventInput {
    pub fn new(target_agent_id: impl Into<String>, payload: Value) -> Self {
        Self {
            target_agent_id: target_agent_id.into(),
            payload,
            ..Default::default()
        }
    }

    pub fn with_event_type(mut self, event_type: AgentEventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.target_thread_id = Some(thread_id.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Copy with the documented defaults filled in
    pub(crate) fn with_defaults(&self) -> Self {
        let mut input = self.clone();
        input.event_type.get_or_insert(AgentEventType::Custom);
        input.priority.get_or_insert(EventPriority::Normal);
        input
    }
}

/// Content type of an agent-to-agent message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMessageType {
    #[default]
    Text,
    Json,
    Command,
}

/// Input for `sendAgentMessage`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendAgentMessageInput {
    pub target_agent_id: String,

    /// Text, JSON, or a command string depending on `message_type`
    pub content: Value,

    #[serde(default)]
    pub message_type: AgentMessageType,

    /// Event id this message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<EventPriority>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_agent_instance_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_thread_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

impl SendAgentMessageInput {
    pub fn text(target_agent_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            target_agent_id: target_agent_id.into(),
            content: Value::String(content.into()),
            ..Default::default()
        }
    }

    pub fn replying_to(mut self, event_id: impl Into<String>) -> Self {
        self.reply_to = Some(event_id.into());
        self
    }

    /// The `addEvent` this message expands to
    pub fn into_add_event(self) -> AddEventInput {
        let mut payload = serde_json::json!({
            "messageType": self.message_type,
            "content": self.content,
        });
        if let Some(reply_to) = self.reply_to {
            payload["replyTo"] = Value::String(reply_to);
        }

        AddEventInput {
            target_agent_id: self.target_agent_id,
            payload,
            event_type: Some(AgentEventType::AgentMessage),
            priority: self.priority,
            target_agent_instance_id: self.target_agent_instance_id,
            target_thread_id: self.target_thread_id,
            expires_at: None,
            metadata: self.metadata,
        }
    }
}

/// Per-agent queue counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentQueueStats {
    pub agent_id: String,
    #[serde(default)]
    pub pending: u64,
    #[serde(default)]
    pub delivered: u64,
}

/// Aggregate queue statistics from `getQueueStats`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    #[serde(default)]
    pub total_agents: u64,
    #[serde(default)]
    pub total_pending: u64,
    #[serde(default)]
    pub total_delivered: u64,
    #[serde(default)]
    pub agent_stats: Vec<AgentQueueStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<Value>,
}

/// Result of a pull (`getPendingQueueEvents` / `waitForNextQueueEvent`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueEvents {
    pub success: bool,
    /// Cached events first, then backend-pulled events
    pub events: Vec<AgentEvent>,
    /// How many of `events` came from the local cache
    pub from_cache: usize,
    pub error: Option<String>,
}
