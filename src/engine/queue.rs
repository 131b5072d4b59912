// src/engine/queue.rs

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::trace;

use super::Priority;

/// Priority queue of pending jobs.
///
/// Semantics:
/// - `pop` returns the entry with the numerically smallest priority.
/// - Among equal priorities, the entry pushed first wins. Every `push`
///   draws the next value of a sequence counter owned by the queue; the
///   payload never takes part in the ordering.
///
/// The queue is pure data: locking and waking the worker are the
/// scheduler's business.
#[derive(Debug)]
pub struct JobQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    next_sequence: u64,
}

#[derive(Debug)]
struct Entry<T> {
    priority: Priority,
    sequence: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // BinaryHeap is a max-heap; reverse so the smallest (priority, sequence)
    // sits on top.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.priority, other.sequence).cmp(&(self.priority, self.sequence))
    }
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> JobQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_sequence: 0,
        }
    }

    /// Insert `item` and return the sequence number it was given.
    pub fn push(&mut self, priority: Priority, item: T) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        trace!(priority, sequence, "job queued");
        self.heap.push(Entry {
            priority,
            sequence,
            item,
        });
        sequence
    }

    pub fn pop(&mut self) -> Option<T> {
        self.heap.pop().map(|entry| entry.item)
    }

    /// Priority and sequence of the entry `pop` would return.
    pub fn peek_key(&self) -> Option<(Priority, u64)> {
        self.heap.peek().map(|e| (e.priority, e.sequence))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
