//! Memory Pressure Monitor
//!
//! Polls an injected pressure signal and triggers emergency eviction when
//! usage crosses a threshold.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheEngine;

/// Source of memory usage readings, as a fraction of the host's budget.
///
/// Any `Fn() -> f64` closure is a signal, so a host can feed in its own
/// metric without implementing the trait.
#[async_trait]
pub trait PressureSignal: Send + Sync {
    async fn usage(&self) -> f64;
}

#[async_trait]
impl<F> PressureSignal for F
where
    F: Fn() -> f64 + Send + Sync,
{
    async fn usage(&self) -> f64 {
        self()
    }
}

/// Signal derived from the engine's own `total_size / max_size`.
#[derive(Debug, Clone)]
pub struct CapacityPressure {
    engine: CacheEngine,
}

impl CapacityPressure {
    pub fn new(engine: CacheEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl PressureSignal for CapacityPressure {
    async fn usage(&self) -> f64 {
        self.engine.usage_ratio().await
    }
}

/// Spawns a task that samples `signal` every `interval` and calls
/// [`CacheEngine::relieve_pressure`] whenever usage exceeds `threshold`.
pub fn spawn_pressure_monitor(
    engine: CacheEngine,
    signal: Arc<dyn PressureSignal>,
    interval: Duration,
    threshold: f64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, threshold, "Starting memory pressure monitor");

        loop {
            tokio::time::sleep(interval).await;

            let usage = signal.usage().await;
            if usage > threshold {
                warn!(usage, threshold, "Memory pressure detected");
                engine.relieve_pressure().await;
            } else {
                debug!(usage, "Memory pressure normal");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SetOptions;
    use crate::config::CacheConfig;
    use std::sync::atomic::{AtomicBool, Ordering};

    async fn filled_engine(count: usize) -> CacheEngine {
        let engine = CacheEngine::new(CacheConfig::default());
        for i in 0..count {
            engine
                .set(format!("key{}", i), "value", SetOptions::new())
                .await
                .unwrap();
        }
        engine
    }

    #[tokio::test]
    async fn test_high_pressure_evicts_a_quarter() {
        let engine = filled_engine(8).await;
        let fired = Arc::new(AtomicBool::new(false));
        let once = fired.clone();
        // High reading on the first sample only
        let signal = move || if once.swap(true, Ordering::SeqCst) { 0.0 } else { 0.99 };

        let handle = spawn_pressure_monitor(
            engine.clone(),
            Arc::new(signal),
            Duration::from_millis(20),
            0.9,
        );
        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.abort();

        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(engine.len().await, 6);
        assert_eq!(engine.stats().await.evictions, 2);
    }

    #[tokio::test]
    async fn test_low_pressure_leaves_entries() {
        let engine = filled_engine(4).await;
        let handle = spawn_pressure_monitor(
            engine.clone(),
            Arc::new(CapacityPressure::new(engine.clone())),
            Duration::from_millis(20),
            0.9,
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert_eq!(engine.len().await, 4);
    }

    #[tokio::test]
    async fn test_capacity_pressure_reports_usage_ratio() {
        let engine = CacheEngine::new(CacheConfig {
            max_size: 100,
            ..CacheConfig::default()
        });
        engine.set("k", "x".repeat(49), SetOptions::new()).await.unwrap();

        let usage = CapacityPressure::new(engine).usage().await;
        assert!((usage - 0.5).abs() < f64::EPSILON);
    }
}
