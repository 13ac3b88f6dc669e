//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::{CacheValue, Priority, SetOptions, MAX_KEY_LENGTH};

/// Request body for PUT /set
///
/// `value` may be any JSON value; strings are stored as text, everything
/// else as JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: serde_json::Value,
    /// TTL in seconds; engine default when absent
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub persist: Option<bool>,
}

impl SetRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }

    /// Splits the request into key, value and write options.
    pub fn into_parts(self) -> (String, CacheValue, SetOptions) {
        let options = SetOptions {
            ttl: self.ttl.map(Duration::from_secs),
            priority: self.priority,
            metadata: self.metadata,
            persist: self.persist,
        };
        (self.key, CacheValue::from(self.value), options)
    }
}

/// Key rules shared by every endpoint that takes a key.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        ));
    }
    None
}
