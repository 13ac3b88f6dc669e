//! Cache Entry Module
//!
//! Defines cache entries, payload types and per-write options.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// == Priority ==
/// Entry priority, consulted only by emergency eviction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}

// == Cache Value ==
/// Caller-facing payload. Only `Text` is eligible for compression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CacheValue {
    Text(String),
    Binary(Vec<u8>),
    Json(serde_json::Value),
}

impl CacheValue {
    /// Payload size in bytes used for capacity accounting.
    pub fn size_bytes(&self) -> u64 {
        match self {
            CacheValue::Text(s) => s.len() as u64,
            CacheValue::Binary(b) => b.len() as u64,
            CacheValue::Json(v) => v.to_string().len() as u64,
        }
    }

    /// Returns the text content for string-like values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CacheValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts the payload into a JSON value for API responses.
    ///
    /// Binary payloads are rendered as lossy UTF-8.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CacheValue::Text(s) => serde_json::Value::String(s.clone()),
            CacheValue::Binary(b) => serde_json::Value::String(String::from_utf8_lossy(b).into_owned()),
            CacheValue::Json(v) => v.clone(),
        }
    }

    /// Consumes the value and returns its raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            CacheValue::Text(s) => s.into_bytes(),
            CacheValue::Binary(b) => b,
            CacheValue::Json(v) => v.to_string().into_bytes(),
        }
    }
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        CacheValue::Text(value)
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        CacheValue::Text(value.to_string())
    }
}

impl From<Vec<u8>> for CacheValue {
    fn from(value: Vec<u8>) -> Self {
        CacheValue::Binary(value)
    }
}

impl From<serde_json::Value> for CacheValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => CacheValue::Text(s),
            other => CacheValue::Json(other),
        }
    }
}

// == Stored Value ==
/// Value as held by the store. Compression state is tracked, never sniffed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "encoding", rename_all = "snake_case")]
pub enum StoredValue {
    Raw { value: CacheValue },
    Compressed { data: Vec<u8>, original_len: usize },
}

impl StoredValue {
    pub fn size_bytes(&self) -> u64 {
        match self {
            StoredValue::Raw { value } => value.size_bytes(),
            StoredValue::Compressed { data, .. } => data.len() as u64,
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, StoredValue::Compressed { .. })
    }
}

// == Set Options ==
/// Per-write options; unset fields fall back to engine defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetOptions {
    pub ttl: Option<Duration>,
    pub priority: Option<Priority>,
    pub metadata: Option<BTreeMap<String, String>>,
    /// Overrides `persist_to_disk` for this write
    pub persist: Option<bool>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = Some(persist);
        self
    }
}

// == Cache Entry ==
/// Represents a single cache entry with value and bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Unique key
    pub key: String,
    /// Stored payload, raw or compressed
    pub value: StoredValue,
    /// Timestamp of the last write (Unix milliseconds)
    pub created_at: u64,
    /// Time to live in milliseconds, relative to `created_at`
    pub ttl_ms: u64,
    /// Number of successful reads
    pub access_count: u64,
    /// Timestamp of the most recent read (Unix milliseconds)
    pub last_accessed_at: u64,
    pub priority: Priority,
    /// Size used for capacity accounting
    pub size_bytes: u64,
    /// Caller-supplied pairs, not interpreted by the engine
    pub metadata: BTreeMap<String, String>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(
        key: impl Into<String>,
        value: StoredValue,
        ttl: Duration,
        priority: Priority,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        let key = key.into();
        let now = current_timestamp_ms();
        let size_bytes = compute_size(&key, &value, &metadata);

        Self {
            key,
            value,
            created_at: now,
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
            access_count: 0,
            last_accessed_at: now,
            priority,
            size_bytes,
            metadata,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once strictly more than `ttl_ms` has elapsed
    /// since `created_at`.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now.saturating_sub(self.created_at) > self.ttl_ms
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.created_at
            .saturating_add(self.ttl_ms)
            .saturating_sub(current_timestamp_ms())
    }

    /// Records a successful read.
    pub fn touch(&mut self, now: u64) {
        self.access_count += 1;
        self.last_accessed_at = now;
    }

    /// Recomputes `size_bytes` after fields were replaced.
    pub fn recompute_size(&mut self) {
        self.size_bytes = compute_size(&self.key, &self.value, &self.metadata);
    }
}

impl fmt::Display for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} bytes, ttl {}ms, {:?})",
            self.key, self.size_bytes, self.ttl_ms, self.priority
        )
    }
}

fn compute_size(key: &str, value: &StoredValue, metadata: &BTreeMap<String, String>) -> u64 {
    let meta: usize = metadata.iter().map(|(k, v)| k.len() + v.len()).sum();
    key.len() as u64 + value.size_bytes() + meta as u64
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Hex-encoded SHA-256 digest of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
