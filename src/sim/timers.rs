//! Deferred actions keyed by game time
//!
//! Every "do this later" in the simulation (grace periods, effect reverts,
//! scripted sequences, entity expiry) is an entry in a [`TimerQueue`] that is
//! polled once per tick. Entries fire in deadline order, ties broken by
//! scheduling order, so replays are deterministic.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, BinaryHeap};

use serde::{Deserialize, Serialize};

use crate::Millis;

/// Handle to a scheduled entry, used for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle {
    pub deadline: Millis,
    seq: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry<T> {
    deadline: Millis,
    seq: u64,
    action: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.deadline, self.seq).cmp(&(other.deadline, other.seq))
    }
}

/// Min-heap of `(deadline, action)` pairs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<Reverse<Entry<T>>>,
    /// Sequence numbers still pending (cancelled entries are dropped lazily)
    live: BTreeSet<u64>,
    next_seq: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: BTreeSet::new(),
            next_seq: 0,
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` to fire once `now >= deadline`
    pub fn schedule(&mut self, deadline: Millis, action: T) -> TimerHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Entry {
            deadline,
            seq,
            action,
        }));
        self.live.insert(seq);
        TimerHandle { deadline, seq }
    }

    /// Cancel a pending entry. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.live.remove(&handle.seq)
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.live.contains(&handle.seq)
    }

    /// Pop the earliest entry whose deadline has passed
    pub fn pop_due(&mut self, now: Millis) -> Option<(Millis, T)> {
        loop {
            let due = matches!(self.heap.peek(), Some(Reverse(e)) if e.deadline <= now);
            if !due {
                return None;
            }
            let Reverse(entry) = self.heap.pop()?;
            if self.live.remove(&entry.seq) {
                return Some((entry.deadline, entry.action));
            }
        }
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Millis> {
        self.heap
            .iter()
            .filter(|Reverse(e)| self.live.contains(&e.seq))
            .map(|Reverse(e)| e.deadline)
            .min()
    }
}

/// Handles tied to a scene's lifetime
///
/// Disposing the scope cancels everything it still owns, so nothing fires
/// after the scene is torn down.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerScope {
    handles: Vec<TimerHandle>,
}

impl TimerScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, handle: TimerHandle) -> TimerHandle {
        self.handles.push(handle);
        handle
    }

    /// Forget handles whose entries already fired
    pub fn prune<T>(&mut self, queue: &TimerQueue<T>) {
        self.handles.retain(|h| queue.is_pending(*h));
    }

    /// Cancel every pending handle. Returns how many were cancelled.
    pub fn dispose<T>(&mut self, queue: &mut TimerQueue<T>) -> usize {
        let cancelled = self.handles.drain(..).filter(|h| queue.cancel(*h)).count();
        if cancelled > 0 {
            log::debug!("Timer scope disposed, {} pending timers cancelled", cancelled);
        }
        cancelled
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
