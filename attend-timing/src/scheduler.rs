//! Logical task queue for delayed session work.
//!
//! Tasks are plain values dispatched by their owner; the queue only orders
//! them. Earlier due time runs first and equal due times run in registration
//! order. `cancel_all` bumps the cancellation epoch so nothing registered
//! before it can ever be returned again.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

use tracing::trace;

use crate::clock::JitterLog;

#[derive(Debug)]
struct Entry<E> {
    due_ns: u64,
    seq: u64,
    epoch: u64,
    task: E,
}

impl<E> PartialEq for Entry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.due_ns == other.due_ns && self.seq == other.seq
    }
}

impl<E> Eq for Entry<E> {}

impl<E> Ord for Entry<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due_ns
            .cmp(&other.due_ns)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl<E> PartialOrd for Entry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
pub struct Scheduler<E> {
    pending: BinaryHeap<Reverse<Entry<E>>>,
    next_seq: u64,
    epoch: u64,
    lateness: JitterLog,
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            pending: BinaryHeap::new(),
            next_seq: 0,
            epoch: 0,
            lateness: JitterLog::default(),
        }
    }

    /// Registers `task` to run not before `now_ns + delay`.
    pub fn after(&mut self, now_ns: u64, delay: Duration, task: E) {
        self.at(now_ns.saturating_add(delay.as_nanos() as u64), task);
    }

    pub fn at(&mut self, due_ns: u64, task: E) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Reverse(Entry {
            due_ns,
            seq,
            epoch: self.epoch,
            task,
        }));
    }

    /// Invalidates every pending task.
    pub fn cancel_all(&mut self) {
        self.epoch += 1;
        let dropped = self.pending.len();
        self.pending.clear();
        trace!(epoch = self.epoch, dropped, "scheduler cancelled");
    }

    /// Due time of the earliest live task.
    pub fn next_due(&self) -> Option<u64> {
        self.pending
            .iter()
            .filter(|Reverse(e)| e.epoch == self.epoch)
            .map(|Reverse(e)| e.due_ns)
            .min()
    }

    /// Removes and returns the earliest task due at or before `now_ns`.
    pub fn pop_due(&mut self, now_ns: u64) -> Option<E> {
        self.pop_due_at(now_ns).map(|(_, task)| task)
    }

    /// Like [`Scheduler::pop_due`], also returning the task's due time.
    pub fn pop_due_at(&mut self, now_ns: u64) -> Option<(u64, E)> {
        while let Some(Reverse(entry)) = self.pending.peek() {
            if entry.due_ns > now_ns {
                return None;
            }
            let Some(Reverse(entry)) = self.pending.pop() else {
                return None;
            };
            if entry.epoch != self.epoch {
                continue;
            }
            self.lateness
                .record(Duration::from_nanos(now_ns - entry.due_ns));
            return Some((entry.due_ns, entry.task));
        }
        None
    }

    pub fn len(&self) -> usize {
        self.pending
            .iter()
            .filter(|Reverse(e)| e.epoch == self.epoch)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// How late dispatched tasks ran relative to their due time
    pub fn lateness(&self) -> &JitterLog {
        &self.lateness
    }
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}
