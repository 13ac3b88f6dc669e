//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror. Only capacity, cache-only
//! and network failures ever reach a caller; codec and persistence failures are
//! recovered inside the engine and surface in logs only.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A single entry cannot fit even after maximal eviction
    #[error("Capacity exceeded: entry '{key}' needs {size} bytes, max size is {max_size}")]
    CapacityExceeded {
        key: String,
        size: u64,
        max_size: u64,
    },

    /// `cache-only` fetch with nothing cached
    #[error("No cached response for {0}")]
    NoCachedResponse(String),

    /// Underlying fetch failed
    #[error("Network error: {0}")]
    Network(String),

    /// Compression or decompression failed
    #[error("Codec failure: {0}")]
    Codec(String),

    /// Durable tier read or write failed
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Persistence(err.to_string())
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        CacheError::Network(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) | CacheError::NoCachedResponse(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::CapacityExceeded { .. } => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Network(_) => StatusCode::BAD_GATEWAY,
            CacheError::Codec(_) | CacheError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
