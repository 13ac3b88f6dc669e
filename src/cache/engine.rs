//! Cache Engine Module
//!
//! Public handle tying together the entry store, compression codec and
//! durable tier. The store lock is only held for synchronous bookkeeping;
//! codec and durable calls happen outside it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::codec::{self, Codec, DEFAULT_LEVEL};
use crate::cache::durable::{DurableStore, DurableTier, FileStore};
use crate::cache::store::{CacheStore, Lookup};
use crate::cache::{
    current_timestamp_ms, CacheEntry, CacheStats, CacheValue, Priority, SetOptions, StoredValue,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

/// Version of the export format produced by [`CacheEngine::export`].
pub const SNAPSHOT_VERSION: u32 = 1;

// == Entry Snapshot ==
/// Decoded view of an entry returned by [`CacheEngine::get_entry`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySnapshot {
    pub key: String,
    pub value: CacheValue,
    /// Unix milliseconds of the last write
    pub created_at: u64,
    pub ttl: Duration,
    pub access_count: u64,
    pub last_accessed_at: u64,
    pub priority: Priority,
    pub metadata: BTreeMap<String, String>,
}

// == Cache Snapshot ==
/// Bulk export of entries and stats for migration between processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub entries: Vec<CacheEntry>,
    pub stats: CacheStats,
}

// == Cache Engine ==
/// Cloneable handle to one cache instance.
#[derive(Clone)]
pub struct CacheEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: CacheConfig,
    store: RwLock<CacheStore>,
    codec: Option<Codec>,
    compression_enabled: AtomicBool,
    durable: Option<DurableTier>,
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("config", &self.inner.config)
            .field("compression", &self.compression_active())
            .field("durable", &self.inner.durable.is_some())
            .finish()
    }
}

impl CacheEngine {
    // == Constructors ==
    /// Builds an engine from configuration.
    ///
    /// With `persist_to_disk` set, entries are mirrored into a [`FileStore`]
    /// under `storage_path`. Background workers need a tokio runtime; without
    /// one, compression and persistence are disabled rather than failing.
    pub fn new(config: CacheConfig) -> Self {
        let durable: Option<Arc<dyn DurableStore>> = if config.persist_to_disk {
            Some(Arc::new(FileStore::new(config.storage_path.clone())))
        } else {
            None
        };
        Self::build(config, durable)
    }

    /// Builds an engine backed by a caller-supplied durable store.
    ///
    /// Reads always consult `store` on a miss; writes are mirrored when
    /// `persist_to_disk` is set or requested per call.
    pub fn with_durable_store(config: CacheConfig, store: Arc<dyn DurableStore>) -> Self {
        Self::build(config, Some(store))
    }

    fn build(config: CacheConfig, durable: Option<Arc<dyn DurableStore>>) -> Self {
        let codec = if config.compression {
            match Codec::spawn(DEFAULT_LEVEL) {
                Ok(codec) => Some(codec),
                Err(e) => {
                    warn!(error = %e, "Compression disabled for this engine");
                    None
                }
            }
        } else {
            None
        };

        let durable = durable.and_then(|store| match DurableTier::spawn(store) {
            Ok(tier) => Some(tier),
            Err(e) => {
                warn!(error = %e, "Durable tier disabled for this engine");
                None
            }
        });

        info!(
            max_size = config.max_size,
            max_entries = config.max_entries,
            policy = %config.eviction_policy,
            compression = codec.is_some(),
            durable = durable.is_some(),
            "Cache engine initialized"
        );

        Self {
            inner: Arc::new(EngineInner {
                store: RwLock::new(CacheStore::new(&config)),
                compression_enabled: AtomicBool::new(codec.is_some()),
                codec,
                durable,
                config,
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Whether values are currently being compressed.
    pub fn compression_active(&self) -> bool {
        self.inner.compression_enabled.load(Ordering::Relaxed)
    }

    pub fn has_durable_tier(&self) -> bool {
        self.inner.durable.is_some()
    }

    // == Set ==
    /// Stores a value under `key`, replacing any previous entry.
    ///
    /// Only fails with `CapacityExceeded`; compression and persistence
    /// problems are logged and never reach the caller.
    pub async fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<CacheValue>,
        options: SetOptions,
    ) -> Result<()> {
        let key = key.into();
        let stored = self.encode(value.into()).await;
        let entry = CacheEntry::new(
            key,
            stored,
            options.ttl.unwrap_or(self.inner.config.default_ttl),
            options.priority.unwrap_or_default(),
            options.metadata.unwrap_or_default(),
        );

        let persist = options.persist.unwrap_or(self.inner.config.persist_to_disk);
        debug!(key = %entry.key, size = entry.size_bytes, compressed = entry.value.is_compressed(), "Set");

        // Durable ops are queued under the store guard so disk order follows memory order
        let mut store = self.inner.store.write().await;
        let record = self.durable_record(&entry, persist);
        let key = entry.key.clone();
        store.insert(entry)?;
        self.mirror_write(&key, record);
        Ok(())
    }

    fn durable_record(&self, entry: &CacheEntry, persist: bool) -> Option<CacheEntry> {
        (persist && self.inner.durable.is_some()).then(|| entry.clone())
    }

    /// Queues the durable side of a write. A memory-only write drops any
    /// older record so eviction cannot bring it back.
    fn mirror_write(&self, key: &str, record: Option<CacheEntry>) {
        let Some(durable) = &self.inner.durable else {
            return;
        };
        match record {
            Some(entry) => durable.persist(entry),
            None => durable.remove(key),
        }
    }

    // == Get ==
    /// Returns the value for `key`, or `None` on a miss or expiry.
    pub async fn get(&self, key: &str) -> Option<CacheValue> {
        self.get_entry(key).await.map(|snapshot| snapshot.value)
    }

    /// Like [`get`](Self::get) but also returns entry metadata and timestamps.
    pub async fn get_entry(&self, key: &str) -> Option<EntrySnapshot> {
        let started = Instant::now();
        let now = current_timestamp_ms();

        let lookup = {
            let mut store = self.inner.store.write().await;
            let lookup = store.lookup(key, now);
            if let (Lookup::Expired, Some(durable)) = (&lookup, &self.inner.durable) {
                durable.remove(key);
            }
            lookup
        };
        let entry = match lookup {
            Lookup::Hit(entry) => Some(entry),
            Lookup::Expired => {
                debug!(key, "Expired on read");
                None
            }
            Lookup::Missing => self.load_from_durable(key, now).await,
        };

        let snapshot = match entry {
            Some(entry) => Some(self.snapshot(entry).await),
            None => None,
        };

        let elapsed = started.elapsed().as_secs_f64() * 1000.0;
        self.inner.store.write().await.record_access_time(elapsed);
        snapshot
    }

    /// Consults the durable tier after an in-memory miss, promoting a hit.
    async fn load_from_durable(&self, key: &str, now: u64) -> Option<CacheEntry> {
        let Some(durable) = &self.inner.durable else {
            self.inner.store.write().await.record_miss();
            return None;
        };

        let loaded = durable.load(key).await;
        let mut store = self.inner.store.write().await;

        // A write may have landed while the durable read was in flight
        if store.peek(key, now).is_some() {
            return match store.lookup(key, now) {
                Lookup::Hit(entry) => Some(entry),
                _ => None,
            };
        }

        match loaded {
            Some(mut entry) if !entry.is_expired_at(now) => {
                entry.touch(now);
                entry.recompute_size();
                if let Err(e) = store.insert(entry.clone()) {
                    warn!(key, error = %e, "Could not promote persisted entry");
                }
                store.record_hit();
                debug!(key, "Promoted entry from durable tier");
                Some(entry)
            }
            Some(_) => {
                store.record_miss();
                durable.remove(key);
                None
            }
            None => {
                store.record_miss();
                None
            }
        }
    }

    // == Delete ==
    /// Removes `key` from both tiers. Returns whether it was in memory.
    pub async fn delete(&self, key: &str) -> bool {
        let removed = {
            let mut store = self.inner.store.write().await;
            let removed = store.remove(key).is_some();
            if let Some(durable) = &self.inner.durable {
                durable.remove(key);
            }
            removed
        };
        debug!(key, removed, "Delete");
        removed
    }

    // == Clear ==
    /// Empties both tiers and resets stats.
    pub async fn clear(&self) {
        let mut store = self.inner.store.write().await;
        store.clear();
        if let Some(durable) = &self.inner.durable {
            durable.clear();
        }
        drop(store);
        info!("Cache cleared");
    }

    // == Inspection ==
    /// Read-only stats snapshot.
    pub async fn stats(&self) -> CacheStats {
        self.inner.store.read().await.stats()
    }

    /// Whether a live entry exists in memory. Does not count as a read.
    pub async fn contains(&self, key: &str) -> bool {
        self.inner
            .store
            .read()
            .await
            .peek(key, current_timestamp_ms())
            .is_some()
    }

    pub async fn len(&self) -> usize {
        self.inner.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.store.read().await.is_empty()
    }

    /// Occupied fraction of `max_size`.
    pub async fn usage_ratio(&self) -> f64 {
        let store = self.inner.store.read().await;
        if store.max_size() == 0 {
            return 1.0;
        }
        store.total_size() as f64 / store.max_size() as f64
    }

    // == Maintenance ==
    /// Removes every expired entry, one lock acquisition per entry.
    pub async fn cleanup_expired(&self) -> usize {
        let candidates = self
            .inner
            .store
            .read()
            .await
            .expired_keys(current_timestamp_ms());

        let mut removed = 0;
        for key in candidates {
            let mut store = self.inner.store.write().await;
            if store.remove_if_expired(&key, current_timestamp_ms()) {
                removed += 1;
                if let Some(durable) = &self.inner.durable {
                    durable.remove(key);
                }
            }
            drop(store);
            tokio::task::yield_now().await;
        }
        removed
    }

    /// Emergency eviction of a quarter of the entries, low priority first.
    pub async fn relieve_pressure(&self) -> usize {
        let victims = {
            let store = self.inner.store.read().await;
            store.pressure_victims(store.len().div_ceil(4))
        };

        let mut evicted = 0;
        for key in victims {
            if self.inner.store.write().await.evict(&key) {
                evicted += 1;
            }
            tokio::task::yield_now().await;
        }

        if evicted > 0 {
            info!(evicted, "Emergency eviction under memory pressure");
        }
        evicted
    }

    /// Waits for every queued durable-tier operation to be applied.
    pub async fn sync_durable(&self) {
        if let Some(durable) = &self.inner.durable {
            durable.flush().await;
        }
    }

    // == Export / Import ==
    /// Serializable copy of all entries (in stored form) and stats.
    pub async fn export(&self) -> CacheSnapshot {
        let store = self.inner.store.read().await;
        CacheSnapshot {
            version: SNAPSHOT_VERSION,
            exported_at: Utc::now(),
            entries: store.entries(),
            stats: store.stats(),
        }
    }

    /// Loads entries from an export, returning how many were stored.
    ///
    /// Expired entries are skipped; entries that cannot fit are logged and
    /// skipped. Local hit/miss counters are left untouched.
    pub async fn import(&self, snapshot: CacheSnapshot) -> Result<usize> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CacheError::InvalidRequest(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        let now = current_timestamp_ms();
        let mut imported = 0;
        for mut entry in snapshot.entries {
            if entry.is_expired_at(now) {
                continue;
            }
            entry.recompute_size();

            let key = entry.key.clone();
            let mut store = self.inner.store.write().await;
            let record = self.durable_record(&entry, self.inner.config.persist_to_disk);
            if let Err(e) = store.insert(entry) {
                warn!(key = %key, error = %e, "Skipping imported entry");
                continue;
            }
            self.mirror_write(&key, record);
            imported += 1;
        }

        info!(imported, "Imported cache snapshot");
        Ok(imported)
    }

    // == Codec Plumbing ==
    fn active_codec(&self) -> Option<&Codec> {
        if self.compression_active() {
            self.inner.codec.as_ref()
        } else {
            None
        }
    }

    async fn encode(&self, value: CacheValue) -> StoredValue {
        let threshold = self.inner.config.compression_threshold;
        let (codec, text) = match (self.active_codec(), value) {
            (Some(codec), CacheValue::Text(text)) if text.len() >= threshold => (codec, text),
            (_, value) => return StoredValue::Raw { value },
        };

        let original_len = text.len();
        match codec.compress(text.clone()).await {
            Ok(data) if data.len() < original_len => StoredValue::Compressed { data, original_len },
            Ok(_) => StoredValue::Raw {
                value: CacheValue::Text(text),
            },
            Err(e) => {
                self.codec_failed(&e);
                StoredValue::Raw {
                    value: CacheValue::Text(text),
                }
            }
        }
    }

    async fn decode(&self, stored: StoredValue) -> CacheValue {
        let data = match stored {
            StoredValue::Raw { value } => return value,
            StoredValue::Compressed { data, .. } => data,
        };

        let decoded = match self.active_codec() {
            Some(codec) => codec.decompress(data.clone()).await,
            None => codec::decode(&data),
        };

        match decoded.and_then(|bytes| {
            String::from_utf8(bytes).map_err(|e| CacheError::Codec(e.to_string()))
        }) {
            Ok(text) => CacheValue::Text(text),
            Err(e) => {
                self.codec_failed(&e);
                CacheValue::Binary(data)
            }
        }
    }

    fn codec_failed(&self, error: &CacheError) {
        warn!(error = %error, "Codec failure, using raw value");
        let worker_gone = self
            .inner
            .codec
            .as_ref()
            .is_some_and(|codec| !codec.is_available());
        if worker_gone && self.inner.compression_enabled.swap(false, Ordering::Relaxed) {
            warn!("Compression worker unavailable; compression disabled for this engine");
        }
    }

    async fn snapshot(&self, entry: CacheEntry) -> EntrySnapshot {
        EntrySnapshot {
            value: self.decode(entry.value).await,
            key: entry.key,
            created_at: entry.created_at,
            ttl: Duration::from_millis(entry.ttl_ms),
            access_count: entry.access_count,
            last_accessed_at: entry.last_accessed_at,
            priority: entry.priority,
            metadata: entry.metadata,
        }
    }
}
