//! Mini Cache - an embeddable caching engine
//!
//! In-memory entry store with LRU/LFU/FIFO/TTL eviction, optional zstd
//! compression, an optional durable tier and a strategy-driven network
//! fetch façade. An admin HTTP surface and background maintenance tasks are
//! available for running it as a service.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheEngine, CacheStats, CacheValue, EvictionPolicy, Priority, SetOptions};
pub use config::{CacheConfig, Config};
pub use error::{CacheError, Result};
pub use network::{CacheStrategy, FetchOptions, FetchRequest, FetchResponse, NetworkCache};
pub use tasks::{spawn_cleanup_task, spawn_pressure_monitor};
