//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::{CacheEngine, CacheStats, EntrySnapshot, Priority};

/// Response body for GET /get/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: serde_json::Value,
    pub priority: Priority,
    pub access_count: u64,
    /// Unix milliseconds after which the entry is expired
    pub expires_at: u64,
    pub metadata: BTreeMap<String, String>,
}

impl From<EntrySnapshot> for GetResponse {
    fn from(snapshot: EntrySnapshot) -> Self {
        let ttl_ms = u64::try_from(snapshot.ttl.as_millis()).unwrap_or(u64::MAX);
        Self {
            value: snapshot.value.to_json(),
            expires_at: snapshot.created_at.saturating_add(ttl_ms),
            key: snapshot.key,
            priority: snapshot.priority,
            access_count: snapshot.access_count,
            metadata: snapshot.metadata,
        }
    }
}

/// Response body for PUT /set
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    pub message: String,
    pub key: String,
}

impl SetResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for DELETE /del/:key
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for POST /clear and POST /import
#[derive(Debug, Clone, Serialize)]
pub struct BulkResponse {
    pub message: String,
    /// Entries affected, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl BulkResponse {
    pub fn cleared() -> Self {
        Self {
            message: "Cache cleared".to_string(),
            count: None,
        }
    }

    pub fn imported(count: usize) -> Self {
        Self {
            message: format!("Imported {} entries", count),
            count: Some(count),
        }
    }
}

/// Response body for GET /stats
///
/// Counters from [`CacheStats`] plus the limits they are measured against.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    pub max_size: u64,
    pub max_entries: usize,
    pub compression: bool,
    pub durable: bool,
}

impl StatsResponse {
    pub async fn collect(engine: &CacheEngine) -> Self {
        let config = engine.config();
        Self {
            stats: engine.stats().await,
            max_size: config.max_size,
            max_entries: config.max_entries,
            compression: engine.compression_active(),
            durable: engine.has_durable_tier(),
        }
    }
}

/// Response body for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in RFC 3339 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
