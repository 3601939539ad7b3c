//! Bounded, insertion-ordered message cache
//!
//! Holds message ids with a per-id value (the referenced ids for the seen
//! set). The oldest entry is evicted once the capacity is reached.

use crate::message::MessageId;
use std::collections::{HashMap, VecDeque};

#[derive(Debug)]
pub struct MessageCache<V> {
    entries: HashMap<MessageId, V>,
    order: VecDeque<MessageId>,
    capacity: usize,
}

impl<V> MessageCache<V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert a new id; returns false if it was already cached
    pub fn insert(&mut self, id: MessageId, value: V) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }

        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }

        self.entries.insert(id, value);
        self.order.push_back(id);
        true
    }

    pub fn get(&self, id: &MessageId) -> Option<&V> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.entries.contains_key(id)
    }

    /// Ids from oldest to newest
    pub fn ids(&self) -> impl Iterator<Item = &MessageId> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
