use std::{collections::VecDeque, time::Duration};

use crate::actor::ActorHandle;

/// Lets one event through per `interval`
#[derive(Clone, Debug)]
pub struct RateGate {
    interval: Duration,
    last_opened: Option<Duration>,
}

impl RateGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_opened: None,
        }
    }

    pub fn is_open(&self, now: Duration) -> bool {
        self.last_opened
            .map_or(true, |last| now.saturating_sub(last) >= self.interval)
    }

    pub fn mark(&mut self, now: Duration) {
        self.last_opened = Some(now);
    }
}

/// Throughput of memory replication, measured in whole-second windows of
/// the world clock
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemorySyncStats {
    /// Actors waiting for their memory to be sent
    pub queue_len: usize,
    /// Bytes sent during the current second
    pub bytes_this_second: usize,
    /// Bytes sent during the previous second
    pub bytes_last_second: usize,
    /// Memory blobs sent since creation, transfers included
    pub syncs_sent: u64,
}

/// Actors whose script memory must be replicated, drained at a bounded rate
pub struct MemorySyncQueue {
    queue: VecDeque<ActorHandle>,
    gate: RateGate,
    stats: MemorySyncStats,
    window: u64,
}

impl MemorySyncQueue {
    pub fn new(interval: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            gate: RateGate::new(interval),
            stats: MemorySyncStats::default(),
            window: 0,
        }
    }

    /// Returns false when the actor was already queued
    pub fn enqueue(&mut self, actor: ActorHandle) -> bool {
        if self.queue.contains(&actor) {
            return false;
        }
        self.queue.push_back(actor);
        true
    }

    pub fn remove(&mut self, actor: ActorHandle) {
        self.queue.retain(|queued| *queued != actor);
    }

    pub fn contains(&self, actor: ActorHandle) -> bool {
        self.queue.contains(&actor)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pops the next eligible actor if the rate gate is open. Ineligible
    /// entries met on the way are dropped.
    pub fn next_due<F>(&mut self, now: Duration, is_eligible: F) -> Option<ActorHandle>
    where
        F: Fn(ActorHandle) -> bool,
    {
        if self.queue.is_empty() || !self.gate.is_open(now) {
            return None;
        }
        while let Some(actor) = self.queue.pop_front() {
            if is_eligible(actor) {
                self.gate.mark(now);
                return Some(actor);
            }
        }
        None
    }

    pub fn record_sent(&mut self, now: Duration, bytes: usize) {
        self.roll_window(now);
        self.stats.bytes_this_second += bytes;
        self.stats.syncs_sent += 1;
    }

    pub fn stats(&self, now: Duration) -> MemorySyncStats {
        let mut stats = self.stats;
        let window = now.as_secs();
        if window != self.window {
            stats.bytes_last_second = if window == self.window + 1 {
                stats.bytes_this_second
            } else {
                0
            };
            stats.bytes_this_second = 0;
        }
        stats.queue_len = self.queue.len();
        stats
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    fn roll_window(&mut self, now: Duration) {
        let stats = self.stats(now);
        self.stats = stats;
        self.window = now.as_secs();
    }
}
