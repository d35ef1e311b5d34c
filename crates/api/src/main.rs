use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::body::Bytes;
use sliceosm_core::density::DensityRaster;
use sliceosm_core::freshness::FreshnessCache;
use sliceosm_core::tool::ExtractTool;
use sliceosm_worker::{
    outcome_channel, report_outcomes, Dispatcher, ProgressRegistry, ResultStore, TaskQueue,
    WorkerConfig, WorkerPool,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sliceosm_api::config::ServerConfig;
use sliceosm_api::router::build_app_router;
use sliceosm_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "sliceosm_api=debug,sliceosm_worker=debug,sliceosm_core=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        files_dir = %config.files_dir.display(),
        dataset = %config.dataset.display(),
        workers = config.worker_count,
        "Loaded server configuration",
    );

    // --- Density raster ---
    let raster_png = tokio::fs::read(&config.density_raster)
        .await
        .with_context(|| format!("Failed to read {}", config.density_raster.display()))?;
    let raster = DensityRaster::from_png(&raster_png).context("Failed to decode density raster")?;
    tracing::info!(zoom = raster.reference_zoom(), "Density raster loaded");

    // --- Storage ---
    tokio::fs::create_dir_all(&config.files_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.files_dir.display()))?;
    let store = Arc::new(ResultStore::new(&config.files_dir));

    // --- Queue, registry and workers ---
    let registry = Arc::new(ProgressRegistry::new());
    let (queue, receiver) = TaskQueue::bounded(config.queue_capacity);
    let tool = ExtractTool::new(&config.osmx_exec, &config.dataset);

    let (outcome_tx, outcome_rx) = outcome_channel();
    let reporter_handle = tokio::spawn(report_outcomes(outcome_rx));

    let pool = WorkerPool::start(
        WorkerConfig {
            workers: config.worker_count,
            tmp_dir: config.tmp_dir.clone(),
        },
        receiver,
        Arc::clone(&registry),
        Arc::clone(&store),
        tool.clone(),
        outcome_tx,
    );

    let dispatcher = Dispatcher::new(
        Arc::new(raster),
        config.nodes_limit,
        queue,
        registry,
        store,
    );

    // --- App state ---
    let state = AppState {
        dispatcher,
        freshness: Arc::new(FreshnessCache::new(tool)),
        raster_png: Bytes::from(raster_png),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let host = config
        .host
        .parse::<IpAddr>()
        .with_context(|| format!("Invalid HOST address {:?}", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining workers");

    // The reporter ends once the last worker drops its outcome sender.
    pool.shutdown(Duration::from_secs(config.shutdown_timeout_secs))
        .await;
    let _ = tokio::time::timeout(Duration::from_secs(5), reporter_handle).await;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
