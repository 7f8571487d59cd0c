//! Propagation counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Snapshot of the propagator counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PropagatorStats {
    /// Events and patches accepted onto a worker queue.
    pub received: u64,
    /// Documents written after a create or update.
    pub indexed: u64,
    /// Documents removed after a delete.
    pub deleted: u64,
    /// Partial updates applied.
    pub patched: u64,
    /// Events whose projection or engine write failed.
    pub failed: u64,
    /// Events refused for another entity type or after shutdown.
    pub rejected: u64,
}

impl PropagatorStats {
    /// Events that reached a final outcome.
    pub fn completed(&self) -> u64 {
        self.indexed + self.deleted + self.patched + self.failed
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub received: AtomicU64,
    pub indexed: AtomicU64,
    pub deleted: AtomicU64,
    pub patched: AtomicU64,
    pub failed: AtomicU64,
    pub rejected: AtomicU64,
}

impl Counters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PropagatorStats {
        PropagatorStats {
            received: self.received.load(Ordering::Relaxed),
            indexed: self.indexed.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            patched: self.patched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}
