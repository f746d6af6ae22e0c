//! Agent event queue client
//!
//! Inter-agent events reach this client two ways: pushed by the backend
//! (`agentEventQueue.eventDelivered`) or pulled with `getPendingEvents`.
//! Pushed events wait in a bounded [`LocalEventCache`] until the caller
//! pulls, unless a push handler or stream is installed, in which case they
//! go straight to it.
//!
//! Event lifecycle as seen from here:
//!
//! ```text
//! pending ──push──► local cache ──pull──► consumed ──ack──► acknowledged
//!    └─────────────────pull (backend acks)──────────────────────┘
//! ```

mod cache;
mod types;

pub use cache::LocalEventCache;
pub use types::{
    AddEventInput, AgentEvent, AgentEventType, AgentMessageType, AgentQueueStats, EventPriority,
    EventStatus, QueueEvents, QueueStats, SendAgentMessageInput,
};

use crate::config::{ClientConfig, DuplicateAckPolicy};
use crate::error::{ClientError, Result};
use crate::manager::MessageManager;
use crate::protocol::{Operation, Response, ResultField};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

/// Routing table for the event queue backend
pub mod ops {
    use crate::protocol::Operation;

    pub const ADD_EVENT: Operation =
        Operation::new("agentEventQueue.addEvent", "agentEventQueue.addEvent");
    pub const GET_QUEUE_STATS: Operation =
        Operation::new("agentEventQueue.getQueueStats", "agentEventQueue.getQueueStats");
    pub const GET_PENDING_EVENTS: Operation =
        Operation::new("agentEventQueue.getPendingEvents", "agentEventQueue.getPendingEvents");
    pub const ACKNOWLEDGE_EVENT: Operation =
        Operation::new("agentEventQueue.acknowledgeEvent", "agentEventQueue.acknowledgeEvent");

    /// Unsolicited delivery pushed by the backend
    pub const EVENT_DELIVERED: &str = "agentEventQueue.eventDelivered";
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PendingEventsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_depth: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AcknowledgeParams<'a> {
    event_id: &'a str,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<&'a str>,
}

/// Where pushed events go when they bypass the cache
#[derive(Clone)]
enum PushSink {
    Callback(Arc<dyn Fn(AgentEvent) + Send + Sync>),
    Channel(mpsc::UnboundedSender<AgentEvent>),
}

/// Agent event queue module
pub struct AgentEventQueue {
    manager: Arc<MessageManager>,
    cache: Arc<LocalEventCache>,
    sink: Arc<RwLock<Option<PushSink>>>,
    duplicate_ack: DuplicateAckPolicy,
}

impl AgentEventQueue {
    /// Create the module and start listening for pushed events
    pub fn new(manager: Arc<MessageManager>, config: &ClientConfig) -> Self {
        let cache = Arc::new(LocalEventCache::new(config.event_cache_capacity));
        let sink: Arc<RwLock<Option<PushSink>>> = Arc::new(RwLock::new(None));

        let push_cache = cache.clone();
        let push_sink = sink.clone();
        manager.subscribe(ops::EVENT_DELIVERED, move |response| {
            for event in events_from_push(response) {
                deliver(&push_cache, &push_sink, event);
            }
        });

        Self {
            manager,
            cache,
            sink,
            duplicate_ack: config.duplicate_ack,
        }
    }

    /// Enqueue an event for another agent
    ///
    /// `eventType` defaults to `custom` and `priority` to `normal`.
    pub async fn add_event(&self, input: &AddEventInput) -> Result<Response> {
        self.manager
            .call(&ops::ADD_EVENT, input.with_defaults())
            .await
    }

    /// Send a text/json/command message to another agent
    pub async fn send_agent_message(&self, input: SendAgentMessageInput) -> Result<Response> {
        self.add_event(&input.into_add_event()).await
    }

    /// Aggregate queue counters (read-only)
    pub async fn get_queue_stats(&self) -> Result<Response> {
        self.manager.call(&ops::GET_QUEUE_STATS, Value::Null).await
    }

    /// Pull up to `max_depth` events (all if `None` or zero)
    ///
    /// Cached events come first. Everything returned counts as consumed:
    /// backend-pulled events are acknowledged by the backend, cached ones
    /// are acknowledged here.
    pub async fn get_pending_queue_events(&self, max_depth: Option<usize>) -> Result<QueueEvents> {
        self.pull(max_depth, None).await
    }

    /// Wait until at least one event is available, then pull like
    /// [`get_pending_queue_events`](Self::get_pending_queue_events)
    pub async fn wait_for_next_queue_event(
        &self,
        max_depth: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<QueueEvents> {
        loop {
            let notified = self.cache.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let batch = self.pull(max_depth, Some(cancel)).await?;
            if !batch.events.is_empty() || !batch.success {
                return Ok(batch);
            }

            tracing::debug!("No queued events, waiting for delivery");
            tokio::select! {
                _ = &mut notified => continue,
                _ = cancel.cancelled() => {
                    return Err(ClientError::Cancelled(ops::EVENT_DELIVERED.to_string()));
                }
            }
        }
    }

    /// Report the outcome of processing an event
    ///
    /// A successful acknowledgement also drops any cached copy. Repeats for
    /// the same id follow the configured [`DuplicateAckPolicy`].
    pub async fn acknowledge_event(
        &self,
        event_id: &str,
        success: bool,
        error_message: Option<&str>,
    ) -> Result<Response> {
        self.acknowledge(event_id, success, error_message, None).await
    }

    async fn acknowledge(
        &self,
        event_id: &str,
        success: bool,
        error_message: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response> {
        if self.cache.is_acknowledged(event_id) {
            match self.duplicate_ack {
                DuplicateAckPolicy::Forward => {}
                DuplicateAckPolicy::Ignore => {
                    tracing::debug!(event_id, "Skipping repeated acknowledgement");
                    return Ok(Response::ok(
                        ops::ACKNOWLEDGE_EVENT.response_type,
                        serde_json::json!({"eventId": event_id, "duplicate": true}),
                    ));
                }
                DuplicateAckPolicy::Reject => {
                    return Err(ClientError::AlreadyAcknowledged(event_id.to_string()));
                }
            }
        }

        let params = AcknowledgeParams {
            event_id,
            success,
            error_message,
        };
        let response = match cancel {
            Some(token) => {
                self.manager
                    .call_cancellable(&ops::ACKNOWLEDGE_EVENT, params, token)
                    .await?
            }
            None => self.manager.call(&ops::ACKNOWLEDGE_EVENT, params).await?,
        };

        if response.is_success() {
            self.cache.settle(event_id);
        }

        Ok(response)
    }

    /// Deliver pushed events to `handler` instead of the cache
    pub fn on_queue_event(&self, handler: impl Fn(AgentEvent) + Send + Sync + 'static) {
        self.set_sink(Some(PushSink::Callback(Arc::new(handler))));
    }

    /// Deliver pushed events to a stream instead of the cache
    ///
    /// Dropping the stream sends later pushes back to the cache.
    pub fn queue_event_stream(&self) -> UnboundedReceiverStream<AgentEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.set_sink(Some(PushSink::Channel(tx)));
        UnboundedReceiverStream::new(rx)
    }

    /// Go back to caching pushed events
    pub fn clear_queue_event_handler(&self) {
        self.set_sink(None);
    }

    pub fn get_local_cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Snapshot of cached events without consuming them
    pub fn peek_local_cache(&self) -> Vec<AgentEvent> {
        self.cache.peek()
    }

    /// Drop cached events locally; the backend is not told
    pub fn clear_local_cache(&self) -> usize {
        let cleared = self.cache.clear();
        tracing::debug!(cleared, "Local event cache cleared");
        cleared
    }

    fn set_sink(&self, sink: Option<PushSink>) {
        match self.sink.write() {
            Ok(mut slot) => *slot = sink,
            Err(e) => tracing::error!("Push sink lock poisoned: {}", e),
        }
    }

    async fn pull(
        &self,
        max_depth: Option<usize>,
        cancel: Option<&CancellationToken>,
    ) -> Result<QueueEvents> {
        let max_depth = max_depth.filter(|depth| *depth > 0);
        let cached = self.cache.drain(max_depth);
        let remaining = max_depth.map(|depth| depth.saturating_sub(cached.len()));

        let mut batch = QueueEvents {
            success: true,
            events: cached.clone(),
            from_cache: cached.len(),
            error: None,
        };

        if remaining != Some(0) {
            let params = PendingEventsParams {
                max_depth: remaining,
            };
            let response = match cancel {
                Some(token) => {
                    self.manager
                        .call_cancellable(&ops::GET_PENDING_EVENTS, params, token)
                        .await
                }
                None => self.manager.call(&ops::GET_PENDING_EVENTS, params).await,
            };

            match response {
                Ok(response) if response.is_success() => {
                    let pulled = parse_events(
                        response.result_key(ops::GET_PENDING_EVENTS.result, "events"),
                    );
                    batch.events.extend(self.cache.admit(pulled));
                }
                Ok(response) if cached.is_empty() => {
                    batch.success = false;
                    batch.error = response.error_message();
                }
                Ok(response) => {
                    tracing::warn!(
                        error = ?response.error_message(),
                        cached = cached.len(),
                        "Backend pull failed, returning cached events only"
                    );
                }
                Err(e) if cached.is_empty() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        cached = cached.len(),
                        "Backend pull failed, returning cached events only"
                    );
                }
            }
        }

        // The batch is returned even if acknowledging is cut short; the
        // events have already left the cache.
        for (index, event) in cached.iter().enumerate() {
            if cancel.map_or(false, CancellationToken::is_cancelled) {
                tracing::debug!(
                    unacknowledged = cached.len() - index,
                    "Pull cancelled, skipping remaining acknowledgements"
                );
                break;
            }
            match self.acknowledge(&event.event_id, true, None, cancel).await {
                Ok(_) => {}
                Err(ClientError::Cancelled(_)) => {
                    tracing::debug!(
                        event_id = %event.event_id,
                        "Acknowledgement abandoned on cancel"
                    );
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        event_id = %event.event_id,
                        error = %e,
                        "Failed to acknowledge consumed event"
                    );
                }
            }
        }

        tracing::debug!(
            returned = batch.events.len(),
            from_cache = batch.from_cache,
            "Pulled queue events"
        );

        Ok(batch)
    }
}

fn deliver(cache: &LocalEventCache, sink: &RwLock<Option<PushSink>>, event: AgentEvent) {
    let current = sink.read().ok().and_then(|s| s.clone());
    match current {
        Some(PushSink::Callback(handler)) => {
            if cache.mark_consumed(&event.event_id) {
                handler(event);
            }
        }
        Some(PushSink::Channel(tx)) => {
            if cache.is_consumed(&event.event_id) {
                return;
            }
            let event_id = event.event_id.clone();
            match tx.send(event) {
                Ok(()) => {
                    cache.mark_consumed(&event_id);
                }
                Err(mpsc::error::SendError(event)) => {
                    tracing::debug!("Event stream dropped, reverting to local cache");
                    if let Ok(mut slot) = sink.write() {
                        *slot = None;
                    }
                    cache.push(event);
                }
            }
        }
        None => {
            cache.push(event);
        }
    }
}

/// Events carried by a push message (`payload.event` or `payload.events`)
fn events_from_push(response: &Response) -> Vec<AgentEvent> {
    let body = response
        .result(ResultField::Payload)
        .or_else(|| response.result(ResultField::Data));
    let Some(body) = body else {
        tracing::warn!("Event delivery without payload");
        return Vec::new();
    };

    if let Some(event) = body.get("event") {
        return parse_events(Some(Value::Array(vec![event.clone()])));
    }
    parse_events(body.get("events").cloned())
}

fn parse_events(value: Option<Value>) -> Vec<AgentEvent> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<AgentEvent>(item) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed agent event");
                None
            }
        })
        .collect()
}
