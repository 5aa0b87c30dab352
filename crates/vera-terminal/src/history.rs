//! Fixed-capacity, append-only in-memory logs.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Thread-safe ring buffer. Pushing onto a full log evicts the oldest entry.
/// A capacity of zero records nothing.
pub struct RingLog<T> {
    capacity: usize,
    entries: Mutex<VecDeque<T>>,
}

impl<T: Clone> RingLog<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    pub fn push(&self, entry: T) {
        if self.capacity == 0 {
            return;
        }
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if guard.len() == self.capacity {
            guard.pop_front();
        }
        guard.push_back(entry);
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        let guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let log = RingLog::new(4);
        log.push(1);
        log.push(2);
        log.push(3);
        assert_eq!(log.snapshot(), vec![1, 2, 3]);
    }

    #[test]
    fn evicts_oldest_on_overflow() {
        let log = RingLog::new(3);
        for i in 0..10 {
            log.push(i);
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.snapshot(), vec![7, 8, 9]);
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let log = RingLog::new(0);
        log.push("x");
        assert!(log.is_empty());
        assert_eq!(log.capacity(), 0);
    }
}
