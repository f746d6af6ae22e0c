//! Local cache of push-delivered, not yet consumed events
//!
//! Every access happens inside one mutex critical section, so a push
//! arriving while a pull drains the cache either lands before the drain
//! (and is returned by it) or after (and stays for the next pull). Event
//! ids handed to the caller are remembered in a bounded window so the same
//! event arriving by push and by pull is returned once.

use super::types::AgentEvent;
use crate::modules::recent_ids::RecentIds;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

struct CacheState {
    events: VecDeque<AgentEvent>,
    consumed: RecentIds,
    acknowledged: RecentIds,
}

/// Bounded, ordered buffer of delivered-but-unconsumed events
pub struct LocalEventCache {
    state: Mutex<CacheState>,
    notify: Notify,
    capacity: usize,
}

impl LocalEventCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                events: VecDeque::new(),
                consumed: RecentIds::default(),
                acknowledged: RecentIds::default(),
            }),
            notify: Notify::new(),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // The state stays consistent across a panicking holder
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Buffer a pushed event; returns false for a duplicate
    ///
    /// When full, the oldest event is evicted.
    pub fn push(&self, event: AgentEvent) -> bool {
        {
            let mut state = self.lock();
            if state.consumed.contains(&event.event_id)
                || state.events.iter().any(|e| e.event_id == event.event_id)
            {
                tracing::debug!(event_id = %event.event_id, "Ignoring duplicate delivery");
                return false;
            }

            state.events.push_back(event);
            if state.events.len() > self.capacity {
                if let Some(evicted) = state.events.pop_front() {
                    tracing::warn!(
                        event_id = %evicted.event_id,
                        capacity = self.capacity,
                        "Local event cache full, evicting oldest event"
                    );
                }
            }
        }

        self.notify.notify_waiters();
        true
    }

    /// Remove and return up to `max` events (all if `None`), oldest first
    ///
    /// Expired events are discarded rather than returned.
    pub fn drain(&self, max: Option<usize>) -> Vec<AgentEvent> {
        let now = Utc::now();
        let mut state = self.lock();
        let mut drained = Vec::new();

        while max.map_or(true, |m| drained.len() < m) {
            let Some(event) = state.events.pop_front() else {
                break;
            };
            if event.is_expired_at(now) {
                tracing::debug!(event_id = %event.event_id, "Discarding expired cached event");
                continue;
            }
            state.consumed.insert(&event.event_id);
            drained.push(event);
        }

        drained
    }

    /// Filter backend-pulled events against everything already handed out
    ///
    /// A pulled event that is also sitting in the cache is taken out of the
    /// cache, so it is returned once.
    pub fn admit(&self, events: Vec<AgentEvent>) -> Vec<AgentEvent> {
        let mut state = self.lock();
        let mut admitted = Vec::with_capacity(events.len());

        for event in events {
            if !state.consumed.insert(&event.event_id) {
                tracing::debug!(event_id = %event.event_id, "Dropping already consumed event");
                continue;
            }
            state.events.retain(|e| e.event_id != event.event_id);
            admitted.push(event);
        }

        admitted
    }

    /// Record an event delivered straight to a handler
    pub fn mark_consumed(&self, event_id: &str) -> bool {
        self.lock().consumed.insert(event_id)
    }

    pub fn is_consumed(&self, event_id: &str) -> bool {
        self.lock().consumed.contains(event_id)
    }

    /// Record a successful acknowledgement: the cached copy is dropped and
    /// later deliveries of the id are refused. False if already recorded.
    pub fn settle(&self, event_id: &str) -> bool {
        let mut state = self.lock();
        state.events.retain(|e| e.event_id != event_id);
        state.consumed.insert(event_id);
        state.acknowledged.insert(event_id)
    }

    pub fn is_acknowledged(&self, event_id: &str) -> bool {
        self.lock().acknowledged.contains(event_id)
    }

    /// Take a specific event out of the cache
    pub fn remove(&self, event_id: &str) -> Option<AgentEvent> {
        let mut state = self.lock();
        let index = state.events.iter().position(|e| e.event_id == event_id)?;
        state.events.remove(index)
    }

    /// Snapshot of the cache, oldest first
    pub fn peek(&self) -> Vec<AgentEvent> {
        self.lock().events.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached event without consuming it; returns how many
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let count = state.events.len();
        state.events.clear();
        count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Future that resolves on the next successful push
    ///
    /// Call `enable()` on the pinned future before checking the cache to
    /// avoid missing a push that lands in between.
    pub fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn event(id: &str) -> AgentEvent {
        serde_json::from_value(json!({"eventId": id, "targetAgentId": "me"})).unwrap()
    }

    #[test]
    fn test_push_and_drain_in_order() {
        let cache = LocalEventCache::new(10);
        cache.push(event("a"));
        cache.push(event("b"));
        cache.push(event("c"));

        let first = cache.drain(Some(2));
        assert_eq!(
            first.iter().map(|e| e.event_id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        let rest = cache.drain(None);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].event_id, "c");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = LocalEventCache::new(2);
        cache.push(event("a"));
        cache.push(event("b"));
        cache.push(event("c"));

        let ids: Vec<_> = cache.peek().into_iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(cache.capacity(), 2);
    }

    #[test]
    fn test_duplicates_rejected() {
        let cache = LocalEventCache::new(10);
        assert!(cache.push(event("a")));
        assert!(!cache.push(event("a")));

        cache.drain(None);
        // already consumed
        assert!(!cache.push(event("a")));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_admit_filters_consumed_and_cached() {
        let cache = LocalEventCache::new(10);
        cache.push(event("a"));
        cache.push(event("b"));
        let drained = cache.drain(Some(1));
        assert_eq!(drained[0].event_id, "a");

        let admitted = cache.admit(vec![event("a"), event("b"), event("c")]);
        let ids: Vec<_> = admitted.into_iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec!["b", "c"]);
        // b came back through the pull, so it no longer waits in the cache
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_events_skipped_on_drain() {
        let cache = LocalEventCache::new(10);
        let mut stale = event("old");
        stale.expires_at = Some(Utc::now() - chrono::Duration::minutes(1));
        cache.push(stale);
        cache.push(event("fresh"));

        let drained = cache.drain(None);
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].event_id, "fresh");
    }

    #[test]
    fn test_remove_peek_clear() {
        let cache = LocalEventCache::new(10);
        cache.push(event("a"));
        cache.push(event("b"));

        assert_eq!(cache.remove("a").unwrap().event_id, "a");
        assert!(cache.remove("a").is_none());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek()[0].event_id, "b");
        // peek does not consume
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.clear(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_settled_event_refuses_redelivery() {
        let cache = LocalEventCache::new(10);
        cache.push(event("a"));
        assert!(!cache.is_acknowledged("a"));

        assert!(cache.settle("a"));
        assert!(!cache.settle("a"));
        assert!(cache.is_acknowledged("a"));
        assert!(cache.is_empty());

        assert!(!cache.push(event("a")));
        assert!(cache.admit(vec![event("a")]).is_empty());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_push_wakes_waiter() {
        let cache = Arc::new(LocalEventCache::new(10));

        let waiter = cache.clone();
        let handle = tokio::spawn(async move {
            let notified = waiter.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if waiter.is_empty() {
                notified.await;
            }
            waiter.drain(None)
        });

        tokio::task::yield_now().await;
        cache.push(event("late"));

        let drained = handle.await.unwrap();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].event_id, "late");
    }
}
