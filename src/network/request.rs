//! Request and response types for the network cache.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cache::{current_timestamp_ms, sha256_hex, CacheValue, EntrySnapshot};

const KEY_PREFIX: &str = "net:";
const FIELD_SEPARATOR: char = '\u{1f}';

// Metadata keys on cached responses
pub(crate) const META_STATUS: &str = "status";
pub(crate) const META_HEADERS: &str = "headers";
pub(crate) const META_FETCHED_AT: &str = "fetched_at";

// == Fetch Request ==
/// Outgoing request description. Header names are stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl FetchRequest {
    pub fn new(method: impl AsRef<str>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.as_ref().to_ascii_uppercase(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Deterministic cache slot for this request.
    ///
    /// Covers method, URL, every header and a digest of the body, so two
    /// requests share a key only when all of these match.
    pub fn cache_key(&self) -> String {
        let mut material = String::new();
        material.push_str(&self.method.to_ascii_uppercase());
        material.push(FIELD_SEPARATOR);
        material.push_str(&self.url);
        material.push(FIELD_SEPARATOR);
        for (name, value) in &self.headers {
            material.push_str(&name.to_ascii_lowercase());
            material.push(':');
            material.push_str(value);
            material.push('\n');
        }
        material.push(FIELD_SEPARATOR);
        material.push_str(&sha256_hex(self.body.as_deref().unwrap_or_default()));

        format!("{}{}", KEY_PREFIX, sha256_hex(material.as_bytes()))
    }
}

// == Fetch Response ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
    /// Unix milliseconds at which the response was received
    pub fetched_at: u64,
    /// Whether this response was served from the cache
    pub from_cache: bool,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
            fetched_at: current_timestamp_ms(),
            from_cache: false,
        }
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Milliseconds since the response was fetched.
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.fetched_at)
    }

    /// Body as a cache value; UTF-8 bodies are stored as text so they can be compressed.
    pub(crate) fn to_cache_value(&self) -> CacheValue {
        match String::from_utf8(self.body.clone()) {
            Ok(text) => CacheValue::Text(text),
            Err(e) => CacheValue::Binary(e.into_bytes()),
        }
    }

    pub(crate) fn to_metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        metadata.insert(META_STATUS.to_string(), self.status.to_string());
        metadata.insert(META_FETCHED_AT.to_string(), self.fetched_at.to_string());
        metadata.insert(
            META_HEADERS.to_string(),
            serde_json::to_string(&self.headers).unwrap_or_default(),
        );
        metadata
    }

    /// Rebuilds a response from a cached entry. Entries without response
    /// metadata are not responses and yield `None`.
    pub(crate) fn from_snapshot(snapshot: EntrySnapshot) -> Option<Self> {
        let status = snapshot.metadata.get(META_STATUS)?.parse().ok()?;
        let fetched_at = snapshot
            .metadata
            .get(META_FETCHED_AT)
            .and_then(|v| v.parse().ok())
            .unwrap_or(snapshot.created_at);
        let headers = snapshot
            .metadata
            .get(META_HEADERS)
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();

        Some(Self {
            status,
            headers,
            body: snapshot.value.into_bytes(),
            fetched_at,
            from_cache: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Priority;
    use std::time::Duration;

    #[test]
    fn test_cache_key_is_deterministic() {
        let a = FetchRequest::get("https://example.com/a").header("Accept", "json");
        let b = FetchRequest::get("https://example.com/a").header("accept", "json");

        assert_eq!(a.cache_key(), b.cache_key());
        assert!(a.cache_key().starts_with("net:"));
    }

    #[test]
    fn test_cache_key_distinguishes_requests() {
        let base = FetchRequest::get("https://example.com/a");
        let keys = [
            base.cache_key(),
            FetchRequest::new("post", "https://example.com/a").cache_key(),
            FetchRequest::get("https://example.com/b").cache_key(),
            base.clone().header("accept", "json").cache_key(),
            base.clone().body("x").cache_key(),
            base.clone().body("y").cache_key(),
        ];

        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_method_is_normalized() {
        assert_eq!(FetchRequest::new("get", "u").method, "GET");
    }

    #[test]
    fn test_success_range() {
        assert!(FetchResponse::new(204, "").is_success());
        assert!(!FetchResponse::new(304, "").is_success());
        assert!(!FetchResponse::new(500, "").is_success());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut response = FetchResponse::new(200, "hello");
        response
            .headers
            .insert("content-type".to_string(), "text/plain".to_string());

        let snapshot = EntrySnapshot {
            key: "net:x".to_string(),
            value: response.to_cache_value(),
            created_at: response.fetched_at,
            ttl: Duration::from_secs(60),
            access_count: 1,
            last_accessed_at: response.fetched_at,
            priority: Priority::Medium,
            metadata: response.to_metadata(),
        };

        let restored = FetchResponse::from_snapshot(snapshot).unwrap();
        assert!(restored.from_cache);
        assert_eq!(restored.status, 200);
        assert_eq!(restored.headers, response.headers);
        assert_eq!(restored.body, response.body);
        assert_eq!(restored.fetched_at, response.fetched_at);
    }

    #[test]
    fn test_snapshot_without_metadata_is_not_a_response() {
        let snapshot = EntrySnapshot {
            key: "plain".to_string(),
            value: CacheValue::from("v"),
            created_at: 0,
            ttl: Duration::from_secs(1),
            access_count: 0,
            last_accessed_at: 0,
            priority: Priority::Low,
            metadata: BTreeMap::new(),
        };
        assert!(FetchResponse::from_snapshot(snapshot).is_none());
    }
}
