//! Vivid Queue Daemon - admission control for the rate-limited image generator

mod config;
mod telemetry;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

use vivid_api_rpc::{RateLimiter, RpcHandler, RpcServer};
use vivid_core::application::{shutdown_channel, AdmissionController, QueueSweeper};
use vivid_core::port::id_provider::UuidProvider;
use vivid_core::port::time_provider::SystemTimeProvider;
use vivid_infra_sqlite::{create_pool, run_migrations, SqliteRateWindowRepository};

use crate::config::DaemonConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SWEEPER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration (fails fast on malformed VIVID_* values)
    let config = DaemonConfig::from_env()?;

    // 2. Logging
    let _telemetry = telemetry::init_tracing(config.log_format)?;
    info!("Vivid queue daemon v{} starting...", VERSION);

    // 3. Database (rate window only; queue membership is in memory)
    if let Some(dir) = config.db_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let db_url = config.db_path.to_string_lossy().into_owned();
    info!(db_path = %db_url, "Initializing database...");

    let pool = create_pool(&db_url)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 4. DI wiring
    let time_provider = Arc::new(SystemTimeProvider);
    let rate_window_repo = Arc::new(SqliteRateWindowRepository::new(
        pool.clone(),
        time_provider.clone(),
    ));
    let controller = Arc::new(AdmissionController::new(
        config.admission.clone(),
        Arc::new(UuidProvider),
        time_provider,
        rate_window_repo,
    ));

    // 5. Restore the rate window so a restart cannot bypass the interval
    match controller.restore().await {
        Ok(Some(at)) => info!(last_completed_at = at, "Rate window recovered"),
        Ok(None) => info!("No completed generation on record (cold start)"),
        Err(e) => error!(error = %e, "Rate window recovery failed, starting cold"),
    }

    // 6. Liveness sweeper
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let sweeper = QueueSweeper::new(controller.clone(), config.sweep_interval);
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown_rx));

    // 7. JSON-RPC server
    info!("Starting JSON-RPC server...");
    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limit_burst,
        config.rate_limit_rate,
    ));
    let handler = Arc::new(RpcHandler::new(controller, rate_limiter));
    let started = Instant::now();
    let (addr, rpc_handle) = RpcServer::new(config.rpc.clone(), handler)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(
        addr = %addr,
        interval_ms = config.admission.interval_ms,
        "✅ System ready. Accepting queue requests"
    );
    info!("Press Ctrl+C to shutdown");

    // 8. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 9. Graceful shutdown
    shutdown_tx.shutdown();
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    rpc_handle.stopped().await;
    let _ = tokio::time::timeout(SWEEPER_STOP_TIMEOUT, sweeper_handle).await;
    pool.close().await;

    info!(uptime_seconds = started.elapsed().as_secs(), "Shutdown complete.");

    Ok(())
}
