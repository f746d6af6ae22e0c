//! Bounded set of recently seen ids

use std::collections::{HashSet, VecDeque};

/// Ids remembered before the oldest are forgotten
pub(crate) const RECENT_ID_WINDOW: usize = 10_000;

/// FIFO-bounded set: inserting past capacity forgets the oldest id
pub(crate) struct RecentIds {
    order: VecDeque<String>,
    set: HashSet<String>,
    capacity: usize,
}

impl RecentIds {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            set: HashSet::new(),
            capacity: capacity.max(1),
        }
    }

    /// Returns false if the id was already present
    pub(crate) fn insert(&mut self, id: &str) -> bool {
        if !self.set.insert(id.to_string()) {
            return false;
        }
        self.order.push_back(id.to_string());
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        true
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.set.contains(id)
    }

    pub(crate) fn remove(&mut self, id: &str) -> bool {
        if !self.set.remove(id) {
            return false;
        }
        self.order.retain(|known| known != id);
        true
    }
}

impl Default for RecentIds {
    fn default() -> Self {
        Self::new(RECENT_ID_WINDOW)
    }
}
