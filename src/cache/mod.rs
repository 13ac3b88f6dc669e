//! Cache Module
//!
//! In-memory entry store with pluggable eviction, optional compression and
//! an optional durable tier, exposed through [`CacheEngine`].

pub mod codec;
pub mod durable;
mod engine;
mod entry;
mod eviction;
mod lru;
mod stats;
pub mod store;


// Re-export public types
pub use codec::Codec;
pub use durable::{DurableStore, DurableTier, FileStore, MemoryStore, PersistedRecord};
pub use engine::{CacheEngine, CacheSnapshot, EntrySnapshot, SNAPSHOT_VERSION};
pub use entry::{
    current_timestamp_ms, sha256_hex, CacheEntry, CacheValue, Priority, SetOptions, StoredValue,
};
pub use eviction::{select_victim, EvictionPolicy};
pub use lru::AccessOrder;
pub use stats::CacheStats;
pub use store::{CacheStore, Lookup};

// == Public Constants ==
/// Maximum allowed key length in bytes for the HTTP surface
pub const MAX_KEY_LENGTH: usize = 256;
