//! Storage seam between the network façade and a cache.

use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{CacheEngine, SetOptions};
use crate::error::Result;
use crate::network::FetchResponse;

/// Where the façade reads and writes cached responses.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Cached response for `key`, regardless of its age.
    async fn lookup(&self, key: &str) -> Option<FetchResponse>;

    async fn store(&self, key: &str, response: &FetchResponse, ttl: Option<Duration>) -> Result<()>;
}

#[async_trait]
impl ResponseCache for CacheEngine {
    async fn lookup(&self, key: &str) -> Option<FetchResponse> {
        self.get_entry(key).await.and_then(FetchResponse::from_snapshot)
    }

    async fn store(&self, key: &str, response: &FetchResponse, ttl: Option<Duration>) -> Result<()> {
        let mut options = SetOptions::new().metadata(response.to_metadata());
        if let Some(ttl) = ttl {
            options = options.ttl(ttl);
        }
        self.set(key, response.to_cache_value(), options).await
    }
}
