//! Flight delay prediction service
//!
//! Loads the airport dataset and the delay model, then serves predictions
//! over HTTP until interrupted.

use anyhow::{Context, Result};
use delay_api::{api, config::AppConfig};
use delay_lib::{
    health::{components, HealthRegistry},
    observability::{ServiceMetrics, StructuredLogger},
    BundleFile, CsvAirportFile, PredictionService,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs, RUST_LOG overrides the default level
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting delay-api");

    let config = AppConfig::load()?;
    info!(
        airports_path = %config.airports_path.display(),
        model_path = %config.model_path.display(),
        lazy_init = config.lazy_init,
        "Service configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::AIRPORT_DIRECTORY).await;
    health_registry.register(components::DELAY_PREDICTOR).await;

    let metrics = ServiceMetrics::new().context("Failed to register metrics")?;
    let logger = StructuredLogger::new(&config.instance_name);

    let service = Arc::new(PredictionService::new(
        CsvAirportFile::new(&config.airports_path),
        BundleFile::new(&config.model_path),
    ));

    let app_state = Arc::new(
        api::AppState::new(service, health_registry, metrics, logger.clone())
            .with_lazy_init(config.lazy_init),
    );

    // A failed load leaves the server up; health reports it and lazy
    // initialization retries on the next request.
    if !api::initialize_service(&app_state).await {
        warn!("Serving without loaded data");
    }

    logger.log_startup(SERVICE_VERSION, &config.bind_addr());

    let shutdown_logger = logger.clone();
    api::serve(&config, app_state, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        shutdown_logger.log_shutdown("SIGINT received");
    })
    .await?;

    info!("Shut down");
    Ok(())
}
