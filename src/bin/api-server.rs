//! TradeDash API Server
//!
//! Serves the scheduler control surface and runs the periodic analysis of
//! favorite symbols against the KI trading model.

use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tradedash::config::{self, SchedulerConfig};
use tradedash::core::http::{start_server, AppState};
use tradedash::core::scheduler::FavoritesScheduler;
use tradedash::db::{AnalysisStore, MemoryAnalysisStore, PostgresAnalysisStore};
use tradedash::logging;
use tradedash::metrics::Metrics;
use tradedash::services::{FavoritesProvider, KiTradingClient, RecommendationSource};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging();

    let port = config::get_port();
    let env = config::get_environment();
    let scheduler_config = SchedulerConfig::from_env();
    info!("Starting TradeDash API Server");
    info!(environment = %env, "Environment");
    info!(port = port, "HTTP Server: http://0.0.0.0:{}", port);

    let metrics = Arc::new(Metrics::new()?);

    let ki_client = Arc::new(KiTradingClient::from_env()?);
    info!(url = %ki_client.base_url(), "KI trading model API");
    match ki_client.health_check().await {
        Ok(health) => info!(health = %health, "KI trading model reachable"),
        Err(e) => warn!(error = %e, "KI trading model health check failed - passes will log per-symbol failures"),
    }

    info!("Initializing Postgres connection...");
    let store: Arc<dyn AnalysisStore> = match PostgresAnalysisStore::new().await {
        Ok(db) => {
            info!("Postgres connected");
            metrics.database_connected.set(1.0);
            Arc::new(db)
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to Postgres");
            warn!("Continuing without database - scheduled analyses are kept in memory only");
            metrics.database_connected.set(0.0);
            Arc::new(MemoryAnalysisStore::new())
        }
    };

    let favorites: Arc<dyn FavoritesProvider> = ki_client.clone();
    let source: Arc<dyn RecommendationSource> = ki_client;
    let scheduler = Arc::new(
        FavoritesScheduler::new(favorites, source, store, &scheduler_config)
            .with_metrics(metrics.clone()),
    );

    if scheduler_config.autostart {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            let status = scheduler.start().await;
            info!(
                analyzed_symbols = status.analyzed_symbols,
                "Scheduler autostarted"
            );
        });
    } else {
        info!("Scheduler idle - POST /api/v1/scheduler/start to enable periodic analysis");
    }

    let state = AppState::new(scheduler.clone(), metrics)
        .with_cors_origins(config::get_cors_origins());

    let shutdown = CancellationToken::new();
    let server_shutdown = shutdown.clone();
    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(port, state, server_shutdown).await {
            error!(error = %e, "HTTP server error");
        }
    });

    info!("API server started, waiting for shutdown signal...");
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down API server...");
            shutdown.cancel();
            scheduler.stop().await;
            let _ = (&mut server_handle).await;
            info!("API server stopped");
        }
        _ = &mut server_handle => {
            error!("HTTP server stopped");
            scheduler.stop().await;
        }
    }

    Ok(())
}
