//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheEngine;

/// Spawns a background task that sweeps expired entries every `interval`.
///
/// The sweep takes the store lock once per entry, so foreground reads and
/// writes interleave with it. Abort the returned handle to stop the task.
///
/// # Example
/// ```ignore
/// let engine = CacheEngine::new(CacheConfig::default());
/// let cleanup_handle = spawn_cleanup_task(engine.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(engine: CacheEngine, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting expiry sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = engine.cleanup_expired().await;
            if removed > 0 {
                info!(removed, "Expiry sweep removed entries");
            } else {
                debug!("Expiry sweep found nothing to remove");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SetOptions;
    use crate::config::CacheConfig;

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let engine = CacheEngine::new(CacheConfig::default());
        engine
            .set("expire_soon", "value", SetOptions::new().ttl(Duration::from_millis(50)))
            .await
            .unwrap();

        let handle = spawn_cleanup_task(engine.clone(), Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(350)).await;

        // Swept without any read touching it
        assert_eq!(engine.len().await, 0);
        assert_eq!(engine.stats().await.misses, 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let engine = CacheEngine::new(CacheConfig::default());
        engine
            .set("long_lived", "value", SetOptions::new().ttl(Duration::from_secs(3600)))
            .await
            .unwrap();

        let handle = spawn_cleanup_task(engine.clone(), Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(engine.contains("long_lived").await, "Valid entry should not be removed");

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let engine = CacheEngine::new(CacheConfig::default());
        let handle = spawn_cleanup_task(engine, Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
