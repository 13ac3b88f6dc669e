//! Cache Store Module
//!
//! Synchronous entry bookkeeping: the key map, access order, capacity
//! enforcement and statistics. Every method here completes without awaiting,
//! so a caller holding the store lock performs each mutation as one step.

use std::collections::HashMap;

use tracing::debug;

use crate::cache::{
    current_timestamp_ms, select_victim, AccessOrder, CacheEntry, CacheStats, EvictionPolicy,
    Priority,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Lookup ==
/// Outcome of a read against the in-memory store.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Live entry, already touched and counted as a hit
    Hit(CacheEntry),
    /// Entry existed but had expired; it was removed and counted as a miss
    Expired,
    /// No entry; not yet counted
    Missing,
}

// == Cache Store ==
/// In-memory entry store with pluggable eviction.
#[derive(Debug)]
pub struct CacheStore {
    entries: HashMap<String, CacheEntry>,
    order: AccessOrder,
    stats: CacheStats,
    total_size: u64,
    max_size: u64,
    max_entries: usize,
    policy: EvictionPolicy,
}

impl CacheStore {
    // == Constructor ==
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_limits(config.max_size, config.max_entries, config.eviction_policy)
    }

    /// Creates a store with explicit capacity limits.
    pub fn with_limits(max_size: u64, max_entries: usize, policy: EvictionPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            order: AccessOrder::new(),
            stats: CacheStats::new(),
            total_size: 0,
            max_size,
            max_entries,
            policy,
        }
    }

    // == Insert ==
    /// Stores an entry, replacing any entry with the same key.
    ///
    /// Evicts as many entries as needed first. Fails with `CapacityExceeded`
    /// when the entry can never fit, leaving the store untouched.
    pub fn insert(&mut self, entry: CacheEntry) -> Result<()> {
        if entry.size_bytes > self.max_size || self.max_entries == 0 {
            return Err(CacheError::CapacityExceeded {
                key: entry.key,
                size: entry.size_bytes,
                max_size: self.max_size,
            });
        }

        self.detach(&entry.key);
        self.ensure_capacity(&entry.key, entry.size_bytes)?;

        self.total_size += entry.size_bytes;
        self.order.touch(&entry.key);
        self.entries.insert(entry.key.clone(), entry);
        self.sync_occupancy();

        Ok(())
    }

    // == Ensure Capacity ==
    /// Evicts victims until `required_bytes` and one more entry fit.
    fn ensure_capacity(&mut self, key: &str, required_bytes: u64) -> Result<()> {
        let now = current_timestamp_ms();

        while self.total_size + required_bytes > self.max_size
            || self.entries.len() >= self.max_entries
        {
            let victim = select_victim(&self.entries, &self.order, self.policy, now).ok_or_else(
                || CacheError::CapacityExceeded {
                    key: key.to_string(),
                    size: required_bytes,
                    max_size: self.max_size,
                },
            )?;

            self.detach(&victim);
            self.stats.record_eviction();
            debug!(key = %victim, policy = %self.policy, "Evicted entry");
        }

        Ok(())
    }

    // == Lookup ==
    /// Reads an entry, applying lazy expiry and updating recency and stats.
    pub fn lookup(&mut self, key: &str, now: u64) -> Lookup {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => return Lookup::Missing,
        };

        if expired {
            self.detach(key);
            self.sync_occupancy();
            self.stats.record_miss();
            return Lookup::Expired;
        }

        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.touch(now);
                let snapshot = entry.clone();
                self.order.touch(key);
                self.stats.record_hit();
                Lookup::Hit(snapshot)
            }
            None => Lookup::Missing,
        }
    }

    // == Get ==
    /// Reads an entry, counting absence as a miss.
    pub fn get(&mut self, key: &str) -> Option<CacheEntry> {
        match self.lookup(key, current_timestamp_ms()) {
            Lookup::Hit(entry) => Some(entry),
            Lookup::Expired => None,
            Lookup::Missing => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Returns a live entry without touching recency or stats.
    pub fn peek(&self, key: &str, now: u64) -> Option<&CacheEntry> {
        self.entries.get(key).filter(|entry| !entry.is_expired_at(now))
    }

    pub fn record_hit(&mut self) {
        self.stats.record_hit();
    }

    pub fn record_miss(&mut self) {
        self.stats.record_miss();
    }

    pub fn record_access_time(&mut self, millis: f64) {
        self.stats.record_access_time(millis);
    }

    // == Remove ==
    /// Removes an entry, returning it if present.
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let removed = self.detach(key);
        if removed.is_some() {
            self.sync_occupancy();
        }
        removed
    }

    /// Removes an entry as an eviction.
    pub fn evict(&mut self, key: &str) -> bool {
        if self.remove(key).is_some() {
            self.stats.record_eviction();
            true
        } else {
            false
        }
    }

    /// Removes `key` only if it is still expired at `now`.
    pub fn remove_if_expired(&mut self, key: &str, now: u64) -> bool {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired_at(now));
        if expired {
            self.remove(key);
        }
        expired
    }

    // == Clear ==
    /// Empties the store and resets stats to zero.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.total_size = 0;
        self.stats = CacheStats::new();
    }

    // == Maintenance Helpers ==
    /// Keys whose TTL has elapsed at `now`.
    pub fn expired_keys(&self, now: u64) -> Vec<String> {
        self.entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| entry.key.clone())
            .collect()
    }

    /// Up to `count` keys for emergency eviction: lower priority first,
    /// least recently used first within a priority.
    pub fn pressure_victims(&self, count: usize) -> Vec<String> {
        let mut candidates: Vec<(Priority, usize, &str)> = self
            .order
            .iter_oldest_first()
            .enumerate()
            .filter_map(|(rank, key)| self.entries.get(key).map(|e| (e.priority, rank, key)))
            .collect();
        candidates.sort();

        candidates
            .into_iter()
            .take(count)
            .map(|(_, _, key)| key.to_string())
            .collect()
    }

    /// Clones every entry, least recently used first.
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.order
            .iter_oldest_first()
            .filter_map(|key| self.entries.get(key).cloned())
            .collect()
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn detach(&mut self, key: &str) -> Option<CacheEntry> {
        let removed = self.entries.remove(key)?;
        self.order.remove(key);
        self.total_size -= removed.size_bytes;
        Some(removed)
    }

    fn sync_occupancy(&mut self) {
        self.stats.set_occupancy(self.total_size, self.entries.len());
    }
}
