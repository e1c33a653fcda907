//! Bounded FIFO of computed views (time-travel feature)
//!
//! Enables a UI to replay recent book states.

use crate::view::ComputedView;
use std::collections::VecDeque;
use std::sync::Arc;

/// Default number of views retained
pub const DEFAULT_HISTORY_LENGTH: usize = 500;

/// Bounded history buffer
///
/// Entries are shared, immutable views; once pushed they are never mutated.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T = Arc<ComputedView>> {
    entries: VecDeque<T>,
    max_length: usize,
}

impl<T: Clone> HistoryBuffer<T> {
    /// Create a buffer retaining at most `max_length` entries
    pub fn new(max_length: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_length.min(1024)),
            max_length,
        }
    }

    /// Append an entry, evicting the oldest ones beyond the bound
    pub fn push(&mut self, entry: T) {
        self.entries.push_back(entry);
        self.evict();
    }

    /// Change the bound, evicting immediately if the buffer is over it
    pub fn set_max_length(&mut self, max_length: usize) {
        self.max_length = max_length;
        self.evict();
    }

    fn evict(&mut self) {
        while self.entries.len() > self.max_length {
            self.entries.pop_front();
        }
    }

    /// Current bound
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Get an entry by index (0 = oldest)
    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    /// Owned copy of every entry, oldest first
    pub fn all(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }

    /// Most recent entry
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterator over all entries (oldest first)
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

impl<T: Clone> Default for HistoryBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_get() {
        let mut buffer = HistoryBuffer::new(10);
        assert!(buffer.is_empty());

        buffer.push(1);
        buffer.push(2);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.get(0), Some(&1));
        assert_eq!(buffer.latest(), Some(&2));
        assert_eq!(buffer.get(2), None);
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut buffer = HistoryBuffer::new(3);
        for i in 0..10 {
            buffer.push(i);
            assert!(buffer.len() <= 3);
        }
        assert_eq!(buffer.all(), vec![7, 8, 9]);
    }

    #[test]
    fn test_set_max_length_shrinks_immediately() {
        let mut buffer = HistoryBuffer::new(5);
        for i in 0..5 {
            buffer.push(i);
        }

        buffer.set_max_length(2);
        assert_eq!(buffer.all(), vec![3, 4]);
        assert_eq!(buffer.max_length(), 2);

        buffer.set_max_length(4);
        buffer.push(5);
        assert_eq!(buffer.all(), vec![3, 4, 5]);
    }

    #[test]
    fn test_all_is_a_copy() {
        let mut buffer = HistoryBuffer::new(4);
        buffer.push(String::from("a"));
        let mut copy = buffer.all();
        copy.push(String::from("b"));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_zero_length_retains_nothing() {
        let mut buffer = HistoryBuffer::new(0);
        buffer.push(1);
        assert!(buffer.is_empty());
        assert_eq!(buffer.latest(), None);
    }

    #[test]
    fn test_clear() {
        let mut buffer: HistoryBuffer<Arc<ComputedView>> = HistoryBuffer::default();
        buffer.push(Arc::new(ComputedView::empty(1)));
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.max_length(), DEFAULT_HISTORY_LENGTH);
    }
}
