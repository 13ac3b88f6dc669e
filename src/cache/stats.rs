//! Cache Statistics Module
//!
//! Tracks hits, misses, evictions, size accounting and read latency.

use serde::{Deserialize, Serialize};

// == Cache Stats ==
/// Snapshot-able cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Successful reads
    pub hits: u64,
    /// Reads that found nothing or an expired entry
    pub misses: u64,
    /// hits / (hits + misses), 0 before the first read
    pub hit_ratio: f64,
    /// Summed `size_bytes` of all entries
    pub total_size: u64,
    /// Current number of entries
    pub entry_count: usize,
    /// Entries removed to make room or relieve memory pressure
    pub evictions: u64,
    /// Moving average of read latency, each sample weighted 0.5
    pub average_access_time_ms: f64,
    /// Latency samples folded into the average so far
    #[serde(default)]
    pub access_samples: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit / Miss ==
    pub fn record_hit(&mut self) {
        self.hits += 1;
        self.update_hit_ratio();
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
        self.update_hit_ratio();
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Access Time ==
    /// Folds one read latency sample into the moving average.
    pub fn record_access_time(&mut self, millis: f64) {
        self.average_access_time_ms = if self.access_samples == 0 {
            millis
        } else {
            self.average_access_time_ms * 0.5 + millis * 0.5
        };
        self.access_samples += 1;
    }

    /// Updates size accounting after a store mutation.
    pub fn set_occupancy(&mut self, total_size: u64, entry_count: usize) {
        self.total_size = total_size;
        self.entry_count = entry_count;
    }

    fn update_hit_ratio(&mut self) {
        let total = self.hits + self.misses;
        self.hit_ratio = if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        };
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.hit_ratio, 0.0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.entry_count, 0);
    }

    #[test]
    fn test_hit_ratio_all_hits() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        assert_eq!(stats.hit_ratio, 1.0);
    }

    #[test]
    fn test_hit_ratio_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        stats.record_miss();
        stats.record_miss();
        assert_eq!(stats.hit_ratio, 0.25);
    }

    #[test]
    fn test_access_time_moving_average() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_access_time(4.0);
        assert_eq!(stats.average_access_time_ms, 4.0);

        stats.record_miss();
        stats.record_access_time(2.0);
        assert_eq!(stats.average_access_time_ms, 3.0);
    }

    #[test]
    fn test_first_access_time_sets_average_after_earlier_reads() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        stats.record_access_time(6.0);
        assert_eq!(stats.average_access_time_ms, 6.0);
        assert_eq!(stats.access_samples, 1);

        stats.record_access_time(2.0);
        assert_eq!(stats.average_access_time_ms, 4.0);
    }

    #[test]
    fn test_record_eviction() {
        let mut stats = CacheStats::new();
        stats.record_eviction();
        stats.record_eviction();
        assert_eq!(stats.evictions, 2);
    }

    #[test]
    fn test_set_occupancy() {
        let mut stats = CacheStats::new();
        stats.set_occupancy(512, 4);
        assert_eq!(stats.total_size, 512);
        assert_eq!(stats.entry_count, 4);
    }
}
