use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use autolavado::api::{self, AppState};
use autolavado::config::Config;
use autolavado::reports::ReportsClient;
use autolavado::service::{ParkingService, StatsRefresher};
use autolavado::storage;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.check_reports_backend()?;
    info!("Loaded configuration");

    // Initialize storage and load the registry
    let store = storage::open_store(&config.storage).await?;
    let service = Arc::new(
        ParkingService::load(store, config.spaces.registry_settings())
            .await
            .context("failed to load registry state")?,
    );

    let refresher = StatsRefresher::spawn(
        Arc::clone(&service),
        Duration::from_secs(config.stats_refresh_secs),
    );

    let reports = Arc::new(
        ReportsClient::new(&config.reports.api_base, config.reports.timeout_secs)
            .context("failed to build report backend client")?,
    );
    info!("Report backend: {}", config.reports.api_base);

    if let Some(ref static_dir) = config.frontend.static_dir {
        info!("Serving frontend from directory: {}", static_dir);
    }

    let state = Arc::new(AppState {
        service,
        reports,
        display_offset: config.display.offset(),
    });
    let router = api::create_api_router(state, config.frontend.static_dir.clone());

    let addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("API server listening on http://{}", addr);
    info!("   - API endpoints available at http://{}/api/...", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresher.shutdown().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
