//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{CacheEngine, CacheSnapshot};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key, BulkResponse, DeleteResponse, GetResponse, HealthResponse, SetRequest,
    SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub engine: CacheEngine,
}

impl AppState {
    pub fn new(engine: CacheEngine) -> Self {
        Self { engine }
    }

    /// Builds the engine from the cache section of `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(CacheEngine::new(config.cache.clone()))
    }
}

fn check_key(key: &str) -> Result<()> {
    match validate_key(key) {
        Some(msg) => Err(CacheError::InvalidRequest(msg)),
        None => Ok(()),
    }
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let (key, value, options) = req.into_parts();
    state.engine.set(key.clone(), value, options).await?;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    check_key(&key)?;
    let snapshot = state
        .engine
        .get_entry(&key)
        .await
        .ok_or(CacheError::NotFound(key))?;

    Ok(Json(GetResponse::from(snapshot)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    check_key(&key)?;
    if !state.engine.delete(&key).await {
        return Err(CacheError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<BulkResponse> {
    state.engine.clear().await;
    Json(BulkResponse::cleared())
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::collect(&state.engine).await)
}

/// Handler for GET /export
pub async fn export_handler(State(state): State<AppState>) -> Json<CacheSnapshot> {
    Json(state.engine.export().await)
}

/// Handler for POST /import
///
/// Accepts the body produced by GET /export.
pub async fn import_handler(
    State(state): State<AppState>,
    Json(snapshot): Json<CacheSnapshot>,
) -> Result<Json<BulkResponse>> {
    let imported = state.engine.import(snapshot).await?;
    Ok(Json(BulkResponse::imported(imported)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    fn state() -> AppState {
        AppState::new(CacheEngine::new(CacheConfig {
            max_size: 4096,
            max_entries: 100,
            ..CacheConfig::default()
        }))
    }

    fn set_request(key: &str, value: serde_json::Value) -> SetRequest {
        SetRequest {
            key: key.to_string(),
            value,
            ttl: None,
            priority: None,
            metadata: None,
            persist: None,
        }
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = state();

        let req = set_request("test_key", serde_json::json!("test_value"));
        assert!(set_handler(State(state.clone()), Json(req)).await.is_ok());

        let response = get_handler(State(state), Path("test_key".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, serde_json::json!("test_value"));
        assert_eq!(response.access_count, 1);
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let result = get_handler(State(state()), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = state();
        let req = set_request("to_delete", serde_json::json!(1));
        set_handler(State(state.clone()), Json(req)).await.unwrap();

        assert!(delete_handler(State(state.clone()), Path("to_delete".to_string()))
            .await
            .is_ok());
        assert!(delete_handler(State(state), Path("to_delete".to_string()))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_oversized_value_is_rejected() {
        let req = set_request("big", serde_json::json!("x".repeat(5000)));
        let result = set_handler(State(state()), Json(req)).await;
        assert!(matches!(result, Err(CacheError::CapacityExceeded { .. })));
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let req = set_request("", serde_json::json!("value"));
        let result = set_handler(State(state()), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_clear_resets_stats() {
        let state = state();
        set_handler(State(state.clone()), Json(set_request("a", serde_json::json!(1))))
            .await
            .unwrap();
        let _ = get_handler(State(state.clone()), Path("a".to_string())).await;

        clear_handler(State(state.clone())).await;
        let stats = stats_handler(State(state)).await;
        assert_eq!(stats.stats.entry_count, 0);
        assert_eq!(stats.stats.hits, 0);
    }

    #[tokio::test]
    async fn test_export_then_import() {
        let source = state();
        set_handler(State(source.clone()), Json(set_request("a", serde_json::json!("1"))))
            .await
            .unwrap();

        let Json(snapshot) = export_handler(State(source)).await;
        let target = state();
        let response = import_handler(State(target.clone()), Json(snapshot))
            .await
            .unwrap();

        assert_eq!(response.count, Some(1));
        assert!(target.engine.contains("a").await);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
