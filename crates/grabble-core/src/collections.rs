//! Concurrent queue primitives backing the download manager.
//!
//! Three narrow containers: a rearrangeable pending deque (FIFO with
//! drag-reordering), an iterable running set scanned by the watchdog, and a
//! FIFO terminal queue for completed/failed entries. All of them lock
//! internally; callers never coordinate access themselves, and iteration is
//! always over a snapshot so concurrent removal cannot invalidate it.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Ordered pending queue supporting insertion at either end, idempotent
/// removal, and explicit move-to-position for drag-reordering.
///
/// Safe under concurrent producers (capture, requeue) and a single
/// consumer (the dispatcher).
#[derive(Debug, Default)]
pub struct RearrangeableDeque<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T: Clone + PartialEq> RearrangeableDeque<T> {
    /// Create an empty deque.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert at the head of the queue.
    pub fn offer_first(&self, item: T) {
        self.lock().push_front(item);
    }

    /// Insert at the tail of the queue.
    pub fn offer_last(&self, item: T) {
        self.lock().push_back(item);
    }

    /// Remove and return the head, without blocking.
    pub fn poll(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Remove the item wherever it sits. No-op when absent.
    pub fn remove(&self, item: &T) {
        let mut queue = self.lock();
        if let Some(pos) = queue.iter().position(|candidate| candidate == item) {
            queue.remove(pos);
        }
    }

    /// Whether the item is currently queued.
    pub fn contains(&self, item: &T) -> bool {
        self.lock().iter().any(|candidate| candidate == item)
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Relocate an already-queued item to the given index.
    ///
    /// The index is clamped to `[0, len - 1]`; the relative order of all
    /// other items is preserved. Returns false (a silent no-op) when the
    /// item is not present.
    pub fn move_to_position(&self, item: &T, index: usize) -> bool {
        let mut queue = self.lock();
        let Some(pos) = queue.iter().position(|candidate| candidate == item) else {
            return false;
        };

        let target = index.min(queue.len().saturating_sub(1));
        if let Some(moved) = queue.remove(pos) {
            queue.insert(target, moved);
        }
        true
    }

    /// Copy of the current queue contents, head first.
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().iter().cloned().collect()
    }
}

/// Set of entries currently executing, scanned by the watchdog.
///
/// Iteration happens over a snapshot, so an entry finishing mid-scan is
/// harmless.
#[derive(Debug, Default)]
pub struct RunningSet<T> {
    inner: Mutex<Vec<T>>,
}

impl<T: Clone + PartialEq> RunningSet<T> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an entry to the set.
    pub fn offer(&self, item: T) {
        self.lock().push(item);
    }

    /// Remove an entry. No-op when absent.
    pub fn remove(&self, item: &T) {
        let mut set = self.lock();
        if let Some(pos) = set.iter().position(|candidate| candidate == item) {
            set.remove(pos);
        }
    }

    /// Number of entries currently in the set.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current members, in insertion order.
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().clone()
    }
}

/// FIFO holding area for entries in a terminal state.
#[derive(Debug, Default)]
pub struct TerminalQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T: Clone + PartialEq> TerminalQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry.
    pub fn offer(&self, item: T) {
        self.lock().push_back(item);
    }

    /// Remove and return the oldest entry.
    pub fn poll(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Remove an entry by identity. No-op when absent.
    pub fn remove(&self, item: &T) {
        let mut queue = self.lock();
        if let Some(pos) = queue.iter().position(|candidate| candidate == item) {
            queue.remove(pos);
        }
    }

    /// Whether the entry is held here.
    pub fn contains(&self, item: &T) -> bool {
        self.lock().iter().any(|candidate| candidate == item)
    }

    /// Number of held entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().iter().cloned().collect()
    }
}
