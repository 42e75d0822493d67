//! Reconcile triggers and the keyed work queue
//!
//! A key is held at most once in the ready list. A key that is enqueued
//! while its pass is running is marked dirty and re-queued when the pass
//! finishes, so a record is never reconciled by two passes at once.

use entra_types::ResourceKey;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Anything that can schedule a reconcile pass for a key
pub trait ReconcileTrigger: Send + Sync {
    fn enqueue(&self, key: ResourceKey);
    fn enqueue_after(&self, key: ResourceKey, delay: Duration);
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<ResourceKey>,
    queued: HashSet<ResourceKey>,
    in_flight: HashSet<ResourceKey>,
    dirty: HashSet<ResourceKey>,
    delayed: HashMap<ResourceKey, Instant>,
    shutdown: bool,
}

impl QueueState {
    fn push(&mut self, key: ResourceKey) -> bool {
        if self.in_flight.contains(&key) {
            self.dirty.insert(key);
            return false;
        }
        if self.queued.insert(key.clone()) {
            self.ready.push_back(key);
            return true;
        }
        false
    }

    fn promote_due(&mut self, now: Instant) {
        let due: Vec<ResourceKey> = self
            .delayed
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in due {
            self.delayed.remove(&key);
            self.push(key);
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.delayed.values().min().copied()
    }
}

/// De-duplicating work queue with delayed requeues
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
        }
    }

    /// Waits for the next ready key and marks it in flight.
    ///
    /// Returns `None` once the queue has been shut down. Intended for a
    /// single consumer.
    pub async fn next(&self) -> Option<ResourceKey> {
        loop {
            let deadline = {
                let mut state = self.state.lock();
                if state.shutdown {
                    return None;
                }
                state.promote_due(Instant::now());
                if let Some(key) = state.ready.pop_front() {
                    state.queued.remove(&key);
                    state.in_flight.insert(key.clone());
                    return Some(key);
                }
                state.next_deadline()
            };

            match deadline {
                Some(deadline) => {
                    tokio::select! {
                        _ = self.notify.notified() => {}
                        _ = tokio::time::sleep_until(deadline) => {}
                    }
                }
                None => self.notify.notified().await,
            }
        }
    }

    /// Marks a pass finished, re-queueing the key if it went dirty meanwhile.
    pub fn done(&self, key: &ResourceKey) {
        let mut state = self.state.lock();
        state.in_flight.remove(key);
        if state.dirty.remove(key) && !state.shutdown && state.push(key.clone()) {
            self.notify.notify_one();
        }
    }

    /// Stops handing out keys; pending work is dropped.
    pub fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.notify.notify_one();
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Number of keys ready to run now
    pub fn ready_len(&self) -> usize {
        self.state.lock().ready.len()
    }

    /// Deadline of a delayed requeue for the key, if any
    pub fn scheduled(&self, key: &ResourceKey) -> Option<Instant> {
        self.state.lock().delayed.get(key).copied()
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconcileTrigger for WorkQueue {
    fn enqueue(&self, key: ResourceKey) {
        let mut state = self.state.lock();
        if state.shutdown {
            return;
        }
        state.delayed.remove(&key);
        if state.push(key) {
            self.notify.notify_one();
        }
    }

    fn enqueue_after(&self, key: ResourceKey, delay: Duration) {
        let mut state = self.state.lock();
        if state.shutdown {
            return;
        }
        let deadline = Instant::now() + delay;
        let entry = state.delayed.entry(key).or_insert(deadline);
        if deadline < *entry {
            *entry = deadline;
        }
        self.notify.notify_one();
    }
}
