//! Mini Cache server binary
//!
//! Runs one cache engine behind the admin HTTP API with the expiry sweep
//! and memory pressure monitor in the background.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mini_cache::api::{create_router, AppState};
use mini_cache::config::Config;
use mini_cache::tasks::{spawn_cleanup_task, spawn_pressure_monitor, CapacityPressure};

/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache engine
/// 4. Start the expiry sweep and pressure monitor
/// 5. Serve the admin API until SIGINT/SIGTERM
/// 6. Stop background tasks and flush the durable queue
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mini_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mini Cache server");

    let config = Config::from_env();
    info!(
        max_size = config.cache.max_size,
        max_entries = config.cache.max_entries,
        default_ttl_secs = config.cache.default_ttl.as_secs(),
        policy = %config.cache.eviction_policy,
        port = config.server_port,
        "Configuration loaded"
    );

    let state = AppState::from_config(&config);
    let engine = state.engine.clone();

    let background = vec![
        spawn_cleanup_task(
            engine.clone(),
            Duration::from_secs(config.cleanup_interval),
        ),
        spawn_pressure_monitor(
            engine.clone(),
            Arc::new(CapacityPressure::new(engine.clone())),
            Duration::from_secs(config.pressure_interval),
            config.pressure_threshold,
        ),
    ];
    info!("Background tasks started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(background))
        .await
        .context("server error")?;

    engine.sync_durable().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM, then aborts the background tasks.
async fn shutdown_signal(background: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for handle in background {
        handle.abort();
    }
    warn!("Background tasks aborted");
}
