//! Priority queue feeding the worker pool.
//!
//! Lower priority values are served first; tasks at the same priority are
//! served in submission order. Blocking pops time out so workers can notice
//! shutdown, and a closed queue still drains whatever was already enqueued.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::domain::error::QuorumtraderError;
use crate::domain::strategy::Strategy;

#[derive(Debug)]
pub struct ScheduledTask {
    pub strategy: Strategy,
    pub priority: u32,
    /// Submission sequence number, assigned by the queue.
    seq: u64,
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    // BinaryHeap is a max-heap, so invert: smallest priority (then smallest
    // seq) compares greatest.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug)]
pub enum PopOutcome {
    Task(ScheduledTask),
    TimedOut,
    Closed,
}

#[derive(Debug)]
struct QueueState {
    heap: BinaryHeap<ScheduledTask>,
    next_seq: u64,
    closed: bool,
}

#[derive(Debug)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        TaskQueue {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                next_seq: 0,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    pub fn push(&self, strategy: Strategy, priority: u32) -> Result<(), QuorumtraderError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(QuorumtraderError::SchedulerStopped);
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(ScheduledTask {
            strategy,
            priority,
            seq,
        });
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// Wait up to `timeout` for a task. A closed queue keeps yielding tasks
    /// until it is drained, then reports `Closed`.
    pub fn pop_timeout(&self, timeout: Duration) -> PopOutcome {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(task) = state.heap.pop() {
                return PopOutcome::Task(task);
            }
            if state.closed {
                return PopOutcome::Closed;
            }
            let (next, wait) = self.available.wait_timeout(state, timeout).unwrap();
            state = next;
            if wait.timed_out() {
                return match state.heap.pop() {
                    Some(task) => PopOutcome::Task(task),
                    None if state.closed => PopOutcome::Closed,
                    None => PopOutcome::TimedOut,
                };
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Refuse new submissions and wake every waiting worker.
    pub fn close(&self) {
        self.state.lock().unwrap().closed = true;
        self.available.notify_all();
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        TaskQueue::new()
    }
}
