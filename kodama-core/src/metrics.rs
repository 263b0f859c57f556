//! # Metrics
//!
//! Write-path counters for one grove. The subsystem runs on one logical
//! thread, so counters are plain `Cell`s shared over `Rc` between the
//! object tree and its index trees.

use std::cell::Cell;

/// Counter set shared by the trees of one grove.
#[derive(Debug, Default)]
pub struct Metrics {
    object_puts: Cell<u64>,
    object_removes: Cell<u64>,
    index_puts: Cell<u64>,
    index_removes: Cell<u64>,
    cache_hits: Cell<u64>,
    cache_misses: Cell<u64>,
}

/// Point-in-time copy of a grove's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub object_puts: u64,
    pub object_removes: u64,
    pub index_puts: u64,
    pub index_removes: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_object_put(&self) {
        self.object_puts.set(self.object_puts.get() + 1);
    }

    pub fn record_object_remove(&self) {
        self.object_removes.set(self.object_removes.get() + 1);
    }

    pub fn record_index_put(&self) {
        self.index_puts.set(self.index_puts.get() + 1);
    }

    pub fn record_index_remove(&self) {
        self.index_removes.set(self.index_removes.get() + 1);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.set(self.cache_hits.get() + 1);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.set(self.cache_misses.get() + 1);
    }

    /// Copy out the current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            object_puts: self.object_puts.get(),
            object_removes: self.object_removes.get(),
            index_puts: self.index_puts.get(),
            index_removes: self.index_removes.get(),
            cache_hits: self.cache_hits.get(),
            cache_misses: self.cache_misses.get(),
        }
    }

    /// Cache hit rate over all lookups so far, or 0.0 before the first.
    pub fn cache_hit_rate(&self) -> f64 {
        let hits = self.cache_hits.get();
        let total = hits + self.cache_misses.get();
        if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        }
    }
}
