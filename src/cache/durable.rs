//! Durable Tier
//!
//! Persistent backing store for cache entries. The engine talks to it only
//! through [`DurableTier`], which applies operations one at a time in the
//! order they were issued. Writes are fire-and-forget; failures are logged.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, warn};

use crate::cache::{sha256_hex, CacheEntry};
use crate::error::{CacheError, Result};

/// Version written into every persisted record.
pub const SCHEMA_VERSION: u32 = 1;

// == Persisted Record ==
/// On-disk layout: one record per key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub version: u32,
    pub entry: CacheEntry,
}

impl PersistedRecord {
    pub fn new(entry: CacheEntry) -> Self {
        Self {
            version: SCHEMA_VERSION,
            entry,
        }
    }

    /// Decodes a record, returning `None` for other schema versions.
    pub fn decode(raw: &str) -> Result<Option<CacheEntry>> {
        let record: PersistedRecord = serde_json::from_str(raw)?;
        if record.version != SCHEMA_VERSION {
            warn!(
                version = record.version,
                key = %record.entry.key,
                "Ignoring persisted record with unsupported schema version"
            );
            return Ok(None);
        }
        Ok(Some(record.entry))
    }
}

// == Durable Store Trait ==
/// Async key-value backend for persisted entries.
///
/// Implementations may be disk-backed or remote; the engine never calls them
/// while holding the entry store lock.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Writes or replaces the record for `entry.key`
    async fn persist(&self, entry: &CacheEntry) -> Result<()>;

    /// Reads the record for `key`
    async fn load(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Deletes the record for `key`, succeeding if it was absent
    async fn remove(&self, key: &str) -> Result<()>;

    /// Deletes every record
    async fn clear(&self) -> Result<()>;
}

// == File Store ==
/// One JSON file per key under a root directory.
///
/// File names are the SHA-256 of the key, so arbitrary keys are safe.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// The directory is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sha256_hex(key.as_bytes())))
    }
}

#[async_trait]
impl DurableStore for FileStore {
    async fn persist(&self, entry: &CacheEntry) -> Result<()> {
        fs::create_dir_all(&self.root).await?;

        let path = self.path_for(&entry.key);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec(&PersistedRecord::new(entry.clone()))?;

        // Write-then-rename so readers never see a torn record
        fs::write(&tmp, body).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<CacheEntry>> {
        let raw = match fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // A digest collision would hand back another key's record
        Ok(PersistedRecord::decode(&raw)?.filter(|entry| entry.key == key))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<()> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().is_some_and(|ext| ext == "json" || ext == "tmp") {
                fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }
}

// == Memory Store ==
/// Serialized records held in memory, with a switch to simulate outages.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, String>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every operation fail while `false`.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::Relaxed);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(CacheError::Persistence("memory store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn persist(&self, entry: &CacheEntry) -> Result<()> {
        self.check_available()?;
        let raw = serde_json::to_string(&PersistedRecord::new(entry.clone()))?;
        self.records.write().await.insert(entry.key.clone(), raw);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<CacheEntry>> {
        self.check_available()?;
        match self.records.read().await.get(key) {
            Some(raw) => PersistedRecord::decode(raw),
            None => Ok(None),
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.check_available()?;
        self.records.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.check_available()?;
        self.records.write().await.clear();
        Ok(())
    }
}

// == Durable Tier ==
enum DurableOp {
    Persist(CacheEntry),
    Remove(String),
    Clear,
    Load(String, oneshot::Sender<Option<CacheEntry>>),
    Flush(oneshot::Sender<()>),
}

/// Ordered, fire-and-forget front for a [`DurableStore`].
///
/// Lookups travel through the same queue as writes, so a load never
/// observes state older than a write or delete issued before it.
#[derive(Clone)]
pub struct DurableTier {
    ops: mpsc::UnboundedSender<DurableOp>,
}

impl std::fmt::Debug for DurableTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableTier")
            .field("closed", &self.ops.is_closed())
            .finish()
    }
}

impl DurableTier {
    /// Starts the writer task on the current tokio runtime.
    pub fn spawn(store: Arc<dyn DurableStore>) -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| CacheError::Persistence(format!("durable writer unavailable: {}", e)))?;
        let (ops, rx) = mpsc::unbounded_channel();
        handle.spawn(run_writer(store, rx));
        Ok(Self { ops })
    }

    pub fn persist(&self, entry: CacheEntry) {
        self.enqueue(DurableOp::Persist(entry));
    }

    pub fn remove(&self, key: impl Into<String>) {
        self.enqueue(DurableOp::Remove(key.into()));
    }

    pub fn clear(&self) {
        self.enqueue(DurableOp::Clear);
    }

    /// Reads `key` after every previously queued operation has applied.
    ///
    /// Read failures are logged and reported as absent.
    pub async fn load(&self, key: &str) -> Option<CacheEntry> {
        let (reply, rx) = oneshot::channel();
        self.enqueue(DurableOp::Load(key.to_string(), reply));
        rx.await.ok().flatten()
    }

    /// Waits until every queued operation has been applied.
    pub async fn flush(&self) {
        let (reply, rx) = oneshot::channel();
        self.enqueue(DurableOp::Flush(reply));
        let _ = rx.await;
    }

    fn enqueue(&self, op: DurableOp) {
        if self.ops.send(op).is_err() {
            warn!("Durable writer has stopped; dropping operation");
        }
    }
}

async fn run_writer(store: Arc<dyn DurableStore>, mut rx: mpsc::UnboundedReceiver<DurableOp>) {
    while let Some(op) = rx.recv().await {
        match op {
            DurableOp::Persist(entry) => {
                if let Err(e) = store.persist(&entry).await {
                    warn!(key = %entry.key, error = %e, "Failed to persist entry");
                }
            }
            DurableOp::Remove(key) => {
                if let Err(e) = store.remove(&key).await {
                    warn!(key = %key, error = %e, "Failed to remove persisted entry");
                }
            }
            DurableOp::Clear => {
                if let Err(e) = store.clear().await {
                    warn!(error = %e, "Failed to clear durable tier");
                }
            }
            DurableOp::Load(key, reply) => {
                let loaded = match store.load(&key).await {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(key = %key, error = %e, "Failed to load persisted entry");
                        None
                    }
                };
                let _ = reply.send(loaded);
            }
            DurableOp::Flush(reply) => {
                let _ = reply.send(());
            }
        }
    }
    debug!("Durable writer stopped");
}
