//! Background child thread tracker
//!
//! Keeps a local set of running out-of-process agent threads and buffers
//! the completion signals the backend pushes for them. Completions are
//! consumed either by polling (`check_*`) or by waiting (`on_*`).

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::manager::MessageManager;
use crate::modules::recent_ids::RecentIds;
use crate::protocol::Response;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Push sent when one background thread finishes
pub const AGENT_COMPLETION: &str = "backgroundAgentCompletion";

/// Push sent when every thread of a group has finished
pub const GROUP_COMPLETION: &str = "backgroundGroupedAgentCompletion";

/// A thread registered with [`BackgroundChildThreads::add_running_agent`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningAgent {
    pub thread_id: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// One finished background thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCompletion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// The push message as received
    pub message: Value,
    pub received_at: DateTime<Utc>,
}

/// Every thread of a group has finished
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupCompletion {
    pub group_id: String,
    /// Member completions seen by this client, in arrival order
    pub completions: Vec<AgentCompletion>,
    /// The backend push, absent when the client built this itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
    pub received_at: DateTime<Utc>,
}

impl GroupCompletion {
    /// True if the client built this from member completions
    pub fn is_synthesized(&self) -> bool {
        self.message.is_none()
    }
}

#[derive(Default)]
struct TrackerState {
    running: HashMap<String, RunningAgent>,
    completions: VecDeque<AgentCompletion>,
    group_completions: VecDeque<GroupCompletion>,
    /// Member completions per group not yet reported as a group
    group_members: HashMap<String, Vec<AgentCompletion>>,
    /// Groups already reported, by push or by synthesis
    reported_groups: RecentIds,
}

impl TrackerState {
    fn has_running_in(&self, group_id: &str) -> bool {
        self.running
            .values()
            .any(|agent| agent.group_id.as_deref() == Some(group_id))
    }
}

struct Shared {
    state: Mutex<TrackerState>,
    completed: Notify,
    group_completed: Notify,
    capacity: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn on_agent_completion(&self, response: &Response) {
        let message = serde_json::to_value(response).unwrap_or(Value::Null);
        let thread_id = lookup(response, "threadId");
        let mut group_ready = false;

        {
            let mut state = self.lock();
            let removed = thread_id.as_ref().and_then(|id| state.running.remove(id));
            let group_id = lookup(response, "groupId")
                .or_else(|| removed.as_ref().and_then(|agent| agent.group_id.clone()));

            if removed.is_none() {
                tracing::debug!(thread_id = ?thread_id, "Completion for an untracked thread");
            }

            let completion = AgentCompletion {
                thread_id,
                group_id: group_id.clone(),
                message,
                received_at: Utc::now(),
            };

            if let Some(group_id) = group_id {
                if !state.reported_groups.contains(&group_id) {
                    state
                        .group_members
                        .entry(group_id.clone())
                        .or_default()
                        .push(completion.clone());

                    if !state.has_running_in(&group_id) {
                        let completions = state.group_members.remove(&group_id).unwrap_or_default();
                        tracing::debug!(group_id = %group_id, members = completions.len(), "Group finished");
                        state.reported_groups.insert(&group_id);
                        push_bounded(
                            &mut state.group_completions,
                            GroupCompletion {
                                group_id,
                                completions,
                                message: None,
                                received_at: Utc::now(),
                            },
                            self.capacity,
                        );
                        group_ready = true;
                    }
                }
            }

            push_bounded(&mut state.completions, completion, self.capacity);
        }

        self.completed.notify_waiters();
        if group_ready {
            self.group_completed.notify_waiters();
        }
    }

    fn on_group_completion(&self, response: &Response) {
        let Some(group_id) = lookup(response, "groupId") else {
            tracing::warn!("Group completion without groupId");
            return;
        };

        {
            let mut state = self.lock();
            if !state.reported_groups.insert(&group_id) {
                tracing::debug!(group_id = %group_id, "Group already reported");
                return;
            }

            state
                .running
                .retain(|_, agent| agent.group_id.as_deref() != Some(group_id.as_str()));
            let completions = state.group_members.remove(&group_id).unwrap_or_default();
            push_bounded(
                &mut state.group_completions,
                GroupCompletion {
                    group_id,
                    completions,
                    message: Some(serde_json::to_value(response).unwrap_or(Value::Null)),
                    received_at: Utc::now(),
                },
                self.capacity,
            );
        }

        self.group_completed.notify_waiters();
    }
}

fn push_bounded<T>(queue: &mut VecDeque<T>, item: T, capacity: usize) {
    queue.push_back(item);
    if queue.len() > capacity {
        queue.pop_front();
        tracing::warn!(capacity, "Completion buffer full, dropping oldest completion");
    }
}

/// Read a string key from the top level, `data` or `payload`
fn lookup(response: &Response, key: &str) -> Option<String> {
    let nested = |v: &Option<Value>| {
        v.as_ref()
            .and_then(|v| v.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    response
        .fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| nested(&response.data))
        .or_else(|| nested(&response.payload))
}

/// Background child thread tracker module
pub struct BackgroundChildThreads {
    shared: Arc<Shared>,
}

impl BackgroundChildThreads {
    /// Create the tracker and start listening for completion pushes
    pub fn new(manager: &MessageManager, config: &ClientConfig) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(TrackerState::default()),
            completed: Notify::new(),
            group_completed: Notify::new(),
            capacity: config.event_cache_capacity.max(1),
        });

        let on_agent = shared.clone();
        manager.subscribe(AGENT_COMPLETION, move |response| {
            on_agent.on_agent_completion(response)
        });
        let on_group = shared.clone();
        manager.subscribe(GROUP_COMPLETION, move |response| {
            on_group.on_group_completion(response)
        });

        Self { shared }
    }

    /// Register a running thread; an existing entry with the same id is replaced
    pub fn add_running_agent(&self, thread_id: impl Into<String>, data: Value, group_id: Option<String>) {
        let thread_id = thread_id.into();
        let mut state = self.shared.lock();

        if let Some(group_id) = &group_id {
            // A group that was reported before is being reused
            state.reported_groups.remove(group_id);
        }

        let previous = state.running.insert(
            thread_id.clone(),
            RunningAgent {
                thread_id: thread_id.clone(),
                data,
                group_id,
                started_at: Utc::now(),
            },
        );
        if previous.is_some() {
            tracing::debug!(thread_id = %thread_id, "Replacing running agent entry");
        }
    }

    pub fn get_running_agent_count(&self) -> usize {
        self.shared.lock().running.len()
    }

    /// Snapshot of the running threads
    pub fn running_agents(&self) -> Vec<RunningAgent> {
        self.shared.lock().running.values().cloned().collect()
    }

    /// Take every buffered completion, or `None` if nothing finished
    pub fn check_for_background_agent_completion(&self) -> Option<Vec<AgentCompletion>> {
        let mut state = self.shared.lock();
        if state.completions.is_empty() {
            None
        } else {
            Some(state.completions.drain(..).collect())
        }
    }

    /// Wait for exactly one completion
    pub async fn on_background_agent_completion(
        &self,
        cancel: &CancellationToken,
    ) -> Result<AgentCompletion> {
        loop {
            let notified = self.shared.completed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(completion) = self.shared.lock().completions.pop_front() {
                return Ok(completion);
            }

            tokio::select! {
                _ = &mut notified => continue,
                _ = cancel.cancelled() => {
                    return Err(ClientError::Cancelled(AGENT_COMPLETION.to_string()));
                }
            }
        }
    }

    /// Take every buffered group completion, or `None` if no group finished
    pub fn check_for_background_group_completion(&self) -> Option<Vec<GroupCompletion>> {
        let mut state = self.shared.lock();
        if state.group_completions.is_empty() {
            None
        } else {
            Some(state.group_completions.drain(..).collect())
        }
    }

    /// Wait for exactly one group completion
    pub async fn on_background_group_completion(
        &self,
        cancel: &CancellationToken,
    ) -> Result<GroupCompletion> {
        loop {
            let notified = self.shared.group_completed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(completion) = self.shared.lock().group_completions.pop_front() {
                return Ok(completion);
            }

            tokio::select! {
                _ = &mut notified => continue,
                _ = cancel.cancelled() => {
                    return Err(ClientError::Cancelled(GROUP_COMPLETION.to_string()));
                }
            }
        }
    }
}
