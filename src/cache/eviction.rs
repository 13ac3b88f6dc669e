//! Eviction Policy Module
//!
//! Victim selection for the four supported policies. All policies walk the
//! access order from least to most recently used, so ties are always broken
//! in favour of the least recently used key.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::{AccessOrder, CacheEntry};

// == Eviction Policy ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Least recently used
    #[default]
    Lru,
    /// Least frequently used
    Lfu,
    /// Oldest write first
    Fifo,
    /// First expired entry, falling back to LRU when nothing has expired
    Ttl,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionPolicy::Lru),
            "lfu" => Ok(EvictionPolicy::Lfu),
            "fifo" => Ok(EvictionPolicy::Fifo),
            "ttl" => Ok(EvictionPolicy::Ttl),
            other => Err(format!("unknown eviction policy: {}", other)),
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvictionPolicy::Lru => "lru",
            EvictionPolicy::Lfu => "lfu",
            EvictionPolicy::Fifo => "fifo",
            EvictionPolicy::Ttl => "ttl",
        };
        f.write_str(name)
    }
}

// == Select Victim ==
/// Picks the key to evict under `policy`, or `None` when the store is empty.
pub fn select_victim(
    entries: &HashMap<String, CacheEntry>,
    order: &AccessOrder,
    policy: EvictionPolicy,
    now: u64,
) -> Option<String> {
    let candidates = order
        .iter_oldest_first()
        .filter_map(|key| entries.get(key).map(|entry| (key, entry)));

    let victim = match policy {
        EvictionPolicy::Lru => order.least_recent(),
        // min_by_key keeps the first minimum, i.e. the least recently used one
        EvictionPolicy::Lfu => candidates
            .min_by_key(|(_, entry)| entry.access_count)
            .map(|(key, _)| key),
        EvictionPolicy::Fifo => candidates
            .min_by_key(|(_, entry)| entry.created_at)
            .map(|(key, _)| key),
        EvictionPolicy::Ttl => candidates
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key)
            .next()
            .or_else(|| order.least_recent()),
    };

    victim.map(str::to_string)
}
