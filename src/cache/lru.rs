//! Access Order Module
//!
//! Tracks recency of use for every key in the store. Drives LRU victim
//! selection and serves as the deterministic iteration order for the
//! other eviction policies.

use std::collections::VecDeque;

// == Access Order ==
/// Recency list of keys.
///
/// - Front = Most recently used
/// - Back = Least recently used
#[derive(Debug, Default, Clone)]
pub struct AccessOrder {
    order: VecDeque<String>,
}

impl AccessOrder {
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Touch ==
    /// Moves a key to the most-recent position, inserting it if new.
    pub fn touch(&mut self, key: &str) {
        self.remove(key);
        self.order.push_front(key.to_string());
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }

    // == Least Recent ==
    /// Returns the least recently used key without removing it.
    pub fn least_recent(&self) -> Option<&str> {
        self.order.back().map(String::as_str)
    }

    /// Iterates keys from least to most recently used.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &str> {
        self.order.iter().rev().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[allow(dead_code)]
    pub fn contains(&self, key: &str) -> bool {
        self.order.iter().any(|k| k == key)
    }
}
