//! Mini Memcached - A byte-bounded in-memory cache server
//!
//! Runs the text protocol listener and the admin HTTP API side by side over
//! one shared cache.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mini_memcached::api::{create_router, AppState};
use mini_memcached::cache::{self, CacheStore};
use mini_memcached::{run_server, Config, Dispatcher, TaskExecutor, WorkerMode};

/// Main entry point for the cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Create the shared cache and, in pooled mode, start the executor
/// 4. Bind the protocol and admin listeners
/// 5. Serve until SIGINT/SIGTERM, then drain the executor
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mini_memcached=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mini Memcached Cache Server");

    let config = Config::from_env().context("invalid configuration")?;
    config.validate().context("invalid configuration")?;
    info!(
        "Configuration loaded: max_bytes={}, port={}, admin_port={}, worker_mode={}",
        config.max_bytes, config.server_port, config.admin_port, config.worker_mode
    );

    let cache = cache::shared(CacheStore::new(config.max_bytes));
    let dispatcher = match config.worker_mode {
        WorkerMode::Inline => Dispatcher::inline(cache),
        WorkerMode::Pooled => {
            let executor = TaskExecutor::new(config.executor_config());
            executor.start().context("failed to start executor")?;
            info!(
                "Executor started: low={}, high={}, queue={}, idle_timeout={}ms",
                config.executor_low_watermark,
                config.executor_high_watermark,
                config.executor_max_queue,
                config.executor_idle_timeout_ms
            );
            Dispatcher::pooled(cache, Arc::new(executor))
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let admin_addr = SocketAddr::from(([0, 0, 0, 0], config.admin_port));
    let admin_listener = TcpListener::bind(admin_addr)
        .await
        .with_context(|| format!("failed to bind {}", admin_addr))?;
    info!("Admin API listening on http://{}", admin_addr);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let app = create_router(AppState::from_dispatcher(&dispatcher));
    let mut admin_shutdown = shutdown_rx.clone();
    let admin = tokio::spawn(async move {
        axum::serve(admin_listener, app)
            .with_graceful_shutdown(async move {
                let _ = admin_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    });

    let server = tokio::spawn(run_server(listener, dispatcher.clone(), shutdown_rx));

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    server.await.context("protocol server task failed")??;
    admin.await.context("admin server task failed")??;

    if let Some(executor) = dispatcher.executor().cloned() {
        info!("Draining executor");
        tokio::task::spawn_blocking(move || executor.stop(true))
            .await
            .context("executor shutdown failed")?;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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
}
