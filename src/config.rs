//! Configuration Module
//!
//! Engine configuration plus the server process settings loaded from
//! environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::EvictionPolicy;

// == Cache Config ==
/// Engine-wide cache configuration, immutable once the engine is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum summed entry size in bytes
    pub max_size: u64,
    /// TTL applied to entries written without an explicit one
    pub default_ttl: Duration,
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Victim selection policy used when capacity is exceeded
    pub eviction_policy: EvictionPolicy,
    /// Mirror writes into the durable tier
    pub persist_to_disk: bool,
    /// Compress text values before storage
    pub compression: bool,
    /// Directory used by the file-backed durable tier
    pub storage_path: PathBuf,
    /// Minimum text length in bytes before compression is attempted
    pub compression_threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 50 * 1024 * 1024,
            default_ttl: Duration::from_secs(300),
            max_entries: 1000,
            eviction_policy: EvictionPolicy::Lru,
            persist_to_disk: false,
            compression: false,
            storage_path: PathBuf::from("./cache-data"),
            compression_threshold: 1024,
        }
    }
}

impl CacheConfig {
    /// Loads cache settings from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_SIZE` - Maximum total size in bytes (default: 52428800)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `EVICTION_POLICY` - One of lru, lfu, fifo, ttl (default: lru)
    /// - `PERSIST_TO_DISK` - Enable the durable tier (default: false)
    /// - `COMPRESSION` - Enable compression (default: false)
    /// - `STORAGE_PATH` - Durable tier directory (default: ./cache-data)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_size: env_or("MAX_SIZE", defaults.max_size),
            default_ttl: Duration::from_secs(env_or("DEFAULT_TTL", defaults.default_ttl.as_secs())),
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            eviction_policy: env_or("EVICTION_POLICY", defaults.eviction_policy),
            persist_to_disk: env_or("PERSIST_TO_DISK", defaults.persist_to_disk),
            compression: env_or("COMPRESSION", defaults.compression),
            storage_path: env::var("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_path),
            compression_threshold: defaults.compression_threshold,
        }
    }
}

// == Server Config ==
/// Server process configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Engine configuration
    pub cache: CacheConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Expiry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Memory-pressure check interval in seconds
    pub pressure_interval: u64,
    /// Usage ratio above which emergency eviction runs
    pub pressure_threshold: f64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - everything read by [`CacheConfig::from_env`]
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 60)
    /// - `PRESSURE_INTERVAL` - Pressure check frequency in seconds (default: 30)
    /// - `PRESSURE_THRESHOLD` - Usage ratio triggering eviction (default: 0.9)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache: CacheConfig::from_env(),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            pressure_interval: env_or("PRESSURE_INTERVAL", defaults.pressure_interval),
            pressure_threshold: env_or("PRESSURE_THRESHOLD", defaults.pressure_threshold),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: 3000,
            cleanup_interval: 60,
            pressure_interval: 30,
            pressure_threshold: 0.9,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
