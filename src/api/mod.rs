//! API Module
//!
//! Admin HTTP surface over one [`CacheEngine`](crate::cache::CacheEngine).
//!
//! # Endpoints
//! - `PUT /set` - Store a value with optional ttl, priority, metadata, persist
//! - `GET /get/:key` - Retrieve a value and its metadata
//! - `DELETE /del/:key` - Delete a key from both tiers
//! - `POST /clear` - Empty the cache and reset stats
//! - `GET /stats` - Cache statistics
//! - `GET /export` / `POST /import` - Bulk snapshot transfer
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
