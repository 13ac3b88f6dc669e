//! Request and Response models for the admin API
//!
//! DTOs used for serializing/deserializing HTTP request and response bodies.
//! Import bodies reuse [`CacheSnapshot`](crate::cache::CacheSnapshot) directly.

pub mod requests;
pub mod responses;

pub use requests::{validate_key, SetRequest};
pub use responses::{
    BulkResponse, DeleteResponse, ErrorResponse, GetResponse, HealthResponse, SetResponse,
    StatsResponse,
};
