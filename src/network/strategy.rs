//! Caching strategies and per-call fetch options.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a fetch consults the cache and the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheStrategy {
    /// Fresh cache, else network; stale cache if the network fails
    #[default]
    CacheFirst,
    /// Network, else cache
    NetworkFirst,
    CacheOnly,
    NetworkOnly,
    /// Cached response now, refresh in the background
    StaleWhileRevalidate,
}

impl FromStr for CacheStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cache-first" => Ok(CacheStrategy::CacheFirst),
            "network-first" => Ok(CacheStrategy::NetworkFirst),
            "cache-only" => Ok(CacheStrategy::CacheOnly),
            "network-only" => Ok(CacheStrategy::NetworkOnly),
            "stale-while-revalidate" => Ok(CacheStrategy::StaleWhileRevalidate),
            other => Err(format!("unknown cache strategy: {}", other)),
        }
    }
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheStrategy::CacheFirst => "cache-first",
            CacheStrategy::NetworkFirst => "network-first",
            CacheStrategy::CacheOnly => "cache-only",
            CacheStrategy::NetworkOnly => "network-only",
            CacheStrategy::StaleWhileRevalidate => "stale-while-revalidate",
        };
        f.write_str(name)
    }
}

// == Fetch Options ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOptions {
    pub strategy: CacheStrategy,
    /// Age after which a cached response is no longer fresh
    pub max_age: Duration,
    /// Extra window past `max_age` during which stale-while-revalidate
    /// still serves the cached response. `None` means unbounded.
    pub stale_while_revalidate: Option<Duration>,
    /// Entry TTL for stored responses; engine default when unset
    pub ttl: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            strategy: CacheStrategy::default(),
            max_age: Duration::from_secs(300),
            stale_while_revalidate: None,
            ttl: None,
        }
    }
}

impl FetchOptions {
    pub fn new(strategy: CacheStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn stale_while_revalidate(mut self, window: Duration) -> Self {
        self.stale_while_revalidate = Some(window);
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub(crate) fn max_age_ms(&self) -> u64 {
        duration_ms(self.max_age)
    }

    /// Oldest age at which stale-while-revalidate still serves from cache.
    pub(crate) fn serve_stale_limit_ms(&self) -> Option<u64> {
        self.stale_while_revalidate
            .map(|window| self.max_age_ms().saturating_add(duration_ms(window)))
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
