//! Network cache façade: resolves one request under a caching strategy.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{current_timestamp_ms, CacheEngine};
use crate::error::{CacheError, Result};
use crate::network::{
    CacheStrategy, FetchOptions, FetchRequest, FetchResponse, Fetcher, HttpFetcher, ResponseCache,
};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

// == Network Cache ==
#[derive(Clone)]
pub struct NetworkCache {
    cache: Arc<dyn ResponseCache>,
    fetcher: Arc<dyn Fetcher>,
}

impl NetworkCache {
    pub fn new(cache: Arc<dyn ResponseCache>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { cache, fetcher }
    }

    /// Façade over `engine` using a default [`HttpFetcher`].
    pub fn with_engine(engine: CacheEngine) -> Result<Self> {
        let fetcher = HttpFetcher::new(DEFAULT_FETCH_TIMEOUT)?;
        Ok(Self::new(Arc::new(engine), Arc::new(fetcher)))
    }

    // == Fetch With Cache ==
    /// Resolves `request` according to `options.strategy`.
    ///
    /// Caller-visible errors are `NoCachedResponse` (cache-only miss) and
    /// `Network` when no cached fallback applies. Non-2xx responses are
    /// returned as-is and never cached.
    pub async fn fetch_with_cache(
        &self,
        request: &FetchRequest,
        options: &FetchOptions,
    ) -> Result<FetchResponse> {
        let key = request.cache_key();
        debug!(url = %request.url, strategy = %options.strategy, "Fetch with cache");

        match options.strategy {
            CacheStrategy::NetworkOnly => self.fetcher.fetch(request).await,
            CacheStrategy::CacheOnly => self
                .cache
                .lookup(&key)
                .await
                .ok_or(CacheError::NoCachedResponse(key)),
            CacheStrategy::CacheFirst => self.cache_first(&key, request, options).await,
            CacheStrategy::NetworkFirst => self.network_first(&key, request, options).await,
            CacheStrategy::StaleWhileRevalidate => {
                self.stale_while_revalidate(key, request, options).await
            }
        }
    }

    async fn cache_first(
        &self,
        key: &str,
        request: &FetchRequest,
        options: &FetchOptions,
    ) -> Result<FetchResponse> {
        let cached = self.cache.lookup(key).await;
        if let Some(response) = &cached {
            if response.age_ms(current_timestamp_ms()) <= options.max_age_ms() {
                return Ok(response.clone());
            }
        }

        match fetch_and_store(&*self.cache, &*self.fetcher, key, request, options.ttl).await {
            Ok(response) => Ok(response),
            Err(e) => match cached {
                Some(stale) => {
                    warn!(url = %request.url, error = %e, "Fetch failed, serving stale response");
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }

    async fn network_first(
        &self,
        key: &str,
        request: &FetchRequest,
        options: &FetchOptions,
    ) -> Result<FetchResponse> {
        match fetch_and_store(&*self.cache, &*self.fetcher, key, request, options.ttl).await {
            Ok(response) => Ok(response),
            Err(e) => match self.cache.lookup(key).await {
                Some(cached) => {
                    warn!(url = %request.url, error = %e, "Fetch failed, serving cached response");
                    Ok(cached)
                }
                None => Err(e),
            },
        }
    }

    async fn stale_while_revalidate(
        &self,
        key: String,
        request: &FetchRequest,
        options: &FetchOptions,
    ) -> Result<FetchResponse> {
        let now = current_timestamp_ms();
        let usable = self.cache.lookup(&key).await.filter(|cached| {
            options
                .serve_stale_limit_ms()
                .map_or(true, |limit| cached.age_ms(now) <= limit)
        });

        match usable {
            Some(cached) => {
                self.revalidate(key, request.clone(), options.ttl);
                Ok(cached)
            }
            None => fetch_and_store(&*self.cache, &*self.fetcher, &key, request, options.ttl).await,
        }
    }

    /// Refreshes `key` in a detached task. Failures are only logged.
    fn revalidate(&self, key: String, request: FetchRequest, ttl: Option<Duration>) {
        let cache = Arc::clone(&self.cache);
        let fetcher = Arc::clone(&self.fetcher);

        tokio::spawn(async move {
            match fetch_and_store(&*cache, &*fetcher, &key, &request, ttl).await {
                Ok(response) => debug!(url = %request.url, status = response.status, "Revalidated"),
                Err(e) => warn!(url = %request.url, error = %e, "Background revalidation failed"),
            }
        });
    }
}

/// Fetches `request` and caches a 2xx response under `key`.
///
/// A response that cannot be cached is still returned.
async fn fetch_and_store(
    cache: &dyn ResponseCache,
    fetcher: &dyn Fetcher,
    key: &str,
    request: &FetchRequest,
    ttl: Option<Duration>,
) -> Result<FetchResponse> {
    let response = fetcher.fetch(request).await?;
    if response.is_success() {
        if let Err(e) = cache.store(key, &response, ttl).await {
            warn!(url = %request.url, error = %e, "Response not cached");
        }
    } else {
        debug!(url = %request.url, status = response.status, "Non-success response not cached");
    }
    Ok(response)
}
