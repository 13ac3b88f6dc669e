//! Network Module
//!
//! Strategy-driven HTTP fetching on top of a [`CacheEngine`](crate::cache::CacheEngine).

mod facade;
mod fetcher;
mod request;
mod response_cache;
mod strategy;

pub use facade::NetworkCache;
pub use fetcher::{Fetcher, HttpFetcher};
pub use request::{FetchRequest, FetchResponse};
pub use response_cache::ResponseCache;
pub use strategy::{CacheStrategy, FetchOptions};
