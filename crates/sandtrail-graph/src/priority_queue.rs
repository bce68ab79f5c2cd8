//! Ordered-insertion min-priority queue.
//!
//! Entries are kept sorted by priority at insertion time, so dequeueing
//! the minimum is a constant-time pop from the front. Insertion is O(n)
//! but stable: entries with equal priority come out in the order they
//! went in, which keeps Dijkstra's tie-breaking (and therefore the trails
//! built on top of it) deterministic.

use std::collections::VecDeque;

/// A min-priority queue over `(item, priority)` pairs.
///
/// Lower priority values are dequeued first. Priorities are compared with
/// [`f64::total_cmp`], so `NaN` sorts after every finite value instead of
/// poisoning the ordering.
#[derive(Debug, Clone)]
pub struct PriorityQueue<T> {
    entries: VecDeque<(T, f64)>,
}

impl<T> PriorityQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Insert `item` behind every entry whose priority is less than or
    /// equal to `priority`.
    pub fn enqueue(&mut self, item: T, priority: f64) {
        let at = self
            .entries
            .partition_point(|(_, existing)| existing.total_cmp(&priority).is_le());
        self.entries.insert(at, (item, priority));
    }

    /// Remove and return the entry with the lowest priority.
    ///
    /// Returns `None` when the queue is empty.
    pub fn dequeue(&mut self) -> Option<(T, f64)> {
        self.entries.pop_front()
    }

    /// The entry that the next [`dequeue`](Self::dequeue) would return.
    #[must_use]
    pub fn peek(&self) -> Option<&(T, f64)> {
        self.entries.front()
    }

    /// Returns `true` if no entries are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
