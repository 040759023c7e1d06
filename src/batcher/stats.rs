//! Dispatch counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Snapshot of a batcher's dispatch history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Worker invocations attempted.
    pub batches_dispatched: u64,
    /// Requests folded into those invocations.
    pub entries_dispatched: u64,
    /// Batches whose callers received an error.
    pub batches_failed: u64,
    /// Size of the largest batch so far.
    pub largest_batch: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    batches: AtomicU64,
    entries: AtomicU64,
    failed: AtomicU64,
    largest: AtomicU64,
}

impl StatsCounters {
    pub fn record_dispatch(&self, size: usize) {
        let size = size as u64;
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.entries.fetch_add(size, Ordering::Relaxed);
        self.largest.fetch_max(size, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BatchStats {
        BatchStats {
            batches_dispatched: self.batches.load(Ordering::Relaxed),
            entries_dispatched: self.entries.load(Ordering::Relaxed),
            batches_failed: self.failed.load(Ordering::Relaxed),
            largest_batch: self.largest.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let counters = StatsCounters::default();
        counters.record_dispatch(3);
        counters.record_dispatch(1);
        counters.record_failure();

        let stats = counters.snapshot();
        assert_eq!(stats.batches_dispatched, 2);
        assert_eq!(stats.entries_dispatched, 4);
        assert_eq!(stats.batches_failed, 1);
        assert_eq!(stats.largest_batch, 3);
    }

    #[test]
    fn snapshot_serializes() {
        let stats = BatchStats { batches_dispatched: 1, entries_dispatched: 3, ..Default::default() };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"entries_dispatched\":3"));
        let back: BatchStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
