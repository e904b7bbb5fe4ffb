//! filemeta service entry point.
//!
//! Connects to the database, applies migrations, and runs the stale upload
//! sweeper until shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use filemeta_common::{Config, IdGenerator, config::LoggingConfig};
use filemeta_core::UploadService;
use filemeta_db::repositories::FileRecordRepository;
use tokio::{signal, time::MissedTickBehavior};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Periodically soft-delete uploads that never finished.
async fn run_sweeper(service: UploadService, config: &Config) {
    // A zero period makes `interval` panic.
    let period = config.upload.sweep_interval().max(Duration::from_secs(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match service
            .sweep_stale_uploads(config.upload.stale_after(), config.upload.sweep_batch_size)
            .await
        {
            Ok(0) => {}
            Ok(swept) => info!(swept, "Stale upload sweep finished"),
            Err(e) if e.is_retryable() => {
                error!(error = %e, "Stale upload sweep failed, retrying next tick");
            }
            Err(e) => error!(error = %e, code = e.error_code(), "Stale upload sweep failed"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    info!("Starting filemeta...");

    let db = filemeta_db::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    filemeta_db::migrate(&db).await?;

    let id_gen = IdGenerator::new(config.node.worker_id)?;
    let file_repo = FileRecordRepository::new(Arc::new(db), id_gen.clone());
    let upload_service = UploadService::new(file_repo, id_gen);

    info!(
        worker_id = config.node.worker_id,
        stale_after_secs = config.upload.stale_after_secs,
        sweep_interval_secs = config.upload.sweep_interval_secs,
        "Upload sweeper running"
    );

    tokio::select! {
        () = run_sweeper(upload_service, &config) => {},
        () = shutdown_signal() => {},
    }

    info!("Shutdown complete");
    Ok(())
}
