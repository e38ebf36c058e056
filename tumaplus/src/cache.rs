//! Single-slot dataset memo
//!
//! The dashboard keeps one snapshot of the source table until it is told to
//! drop it. There is no expiry: an explicit refresh is the only way to pick
//! up newer rows.

use crate::dataset::Dataset;
use std::sync::Arc;

/// Cache statistics for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the slot
    pub hits: u64,
    /// Lookups that found the slot empty
    pub misses: u64,
    /// Explicit invalidations
    pub invalidations: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the slot
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

/// Memoized dataset snapshot
#[derive(Debug, Default)]
pub struct DatasetCache {
    slot: Option<Arc<Dataset>>,
    stats: CacheStats,
}

impl DatasetCache {
    /// An empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// The memoized snapshot, if any
    pub fn get(&mut self) -> Option<Arc<Dataset>> {
        match &self.slot {
            Some(dataset) => {
                self.stats.hits += 1;
                tracing::debug!("Dataset cache hit ({} records)", dataset.len());
                Some(Arc::clone(dataset))
            }
            None => {
                self.stats.misses += 1;
                tracing::debug!("Dataset cache miss");
                None
            }
        }
    }

    /// Store a snapshot, replacing the previous one
    pub fn put(&mut self, dataset: Arc<Dataset>) {
        self.slot = Some(dataset);
    }

    /// Drop the snapshot. Returns it so a failed reload can restore it.
    pub fn invalidate(&mut self) -> Option<Arc<Dataset>> {
        self.stats.invalidations += 1;
        self.slot.take()
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
