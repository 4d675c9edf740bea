//! Bounded FIFO buffers
//!
//! Used for the sample history, the learning set and the diagnostic
//! score window. Pushing past capacity evicts the oldest entry.

use std::collections::VecDeque;

/// Capacity of the recent-sample history
pub const HISTORY_CAPACITY: usize = 20;

/// Fixed-capacity FIFO preserving insertion order
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    /// Create an empty buffer; a zero capacity is treated as one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an item, returning the evicted oldest item on overflow
    pub fn record(&mut self, item: T) -> Option<T> {
        self.items.push_back(item);
        if self.items.len() > self.capacity {
            self.items.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently recorded item
    pub fn newest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Item recorded just before the newest one
    pub fn previous(&self) -> Option<&T> {
        self.items.len().checked_sub(2).and_then(|i| self.items.get(i))
    }

    /// Oldest item still retained
    pub fn oldest(&self) -> Option<&T> {
        self.items.front()
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }
}

impl<T: Clone> BoundedHistory<T> {
    /// Copy out the contents, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

impl<T> Default for BoundedHistory<T> {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_most_recent_in_order() {
        let mut history = BoundedHistory::new(HISTORY_CAPACITY);
        for i in 1..=25 {
            history.record(i);
        }

        assert_eq!(history.len(), 20);
        assert_eq!(history.to_vec(), (6..=25).collect::<Vec<_>>());
        assert_eq!(history.oldest(), Some(&6));
        assert_eq!(history.newest(), Some(&25));
        assert_eq!(history.previous(), Some(&24));
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut history = BoundedHistory::new(3);
        for i in 0..100 {
            history.record(i);
            assert!(history.len() <= 3);
        }
        assert!(history.is_full());
    }

    #[test]
    fn test_record_returns_evicted() {
        let mut history = BoundedHistory::new(2);
        assert_eq!(history.record("a"), None);
        assert_eq!(history.record("b"), None);
        assert_eq!(history.record("c"), Some("a"));
    }

    #[test]
    fn test_previous_needs_two_entries() {
        let mut history = BoundedHistory::new(5);
        assert!(history.previous().is_none());
        history.record(1);
        assert!(history.previous().is_none());
        history.record(2);
        assert_eq!(history.previous(), Some(&1));
    }
}
