//! Per-interval and whole-run flow counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Accepted/emitted counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlowSnapshot {
    pub accepted: u64,
    pub emitted: u64,
}

/// Counters shared by the two worker loops and the sampler.
///
/// The interval counters are added to by the loops and swapped back to zero by
/// the sampler once per tick; the totals only ever grow.
#[derive(Debug, Default)]
pub struct FlowCounters {
    accepted: AtomicU64,
    emitted: AtomicU64,
    total_accepted: AtomicU64,
    total_emitted: AtomicU64,
}

impl FlowCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_accepted(&self, count: u64) {
        if count > 0 {
            self.accepted.fetch_add(count, Ordering::Relaxed);
            self.total_accepted.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn add_emitted(&self, count: u64) {
        if count > 0 {
            self.emitted.fetch_add(count, Ordering::Relaxed);
            self.total_emitted.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Items accepted since the last [`take`](FlowCounters::take).
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Items emitted since the last [`take`](FlowCounters::take).
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Returns the current interval and starts a new one.
    pub fn take(&self) -> FlowSnapshot {
        FlowSnapshot {
            accepted: self.accepted.swap(0, Ordering::Relaxed),
            emitted: self.emitted.swap(0, Ordering::Relaxed),
        }
    }

    pub fn totals(&self) -> FlowSnapshot {
        FlowSnapshot {
            accepted: self.total_accepted.load(Ordering::Relaxed),
            emitted: self.total_emitted.load(Ordering::Relaxed),
        }
    }
}
