use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use weatherwatch::{
    AlertEvaluator, DailyAggregator, FjallSummaryStore, OpenWeatherClient, Poller, SystemClock,
    WeatherService, WeatherWatchConfig, telemetry, web,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional config path as the only argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = WeatherWatchConfig::load_from_path(config_path)?;
    let telemetry = telemetry::init(&config.logging)?;

    info!(
        version = weatherwatch::VERSION,
        cities = ?config.poller.cities,
        timezone = %config.timezone(),
        "Starting WeatherWatch"
    );

    let store = Arc::new(
        FjallSummaryStore::open(&config.store.location).context("Failed to open summary store")?,
    );
    let source = Arc::new(OpenWeatherClient::new(&config.source)?);
    let clock = Arc::new(SystemClock);
    let evaluator = Arc::new(AlertEvaluator::new(
        config.alerts.temperature_threshold,
        config.alerts.confirmation_threshold,
    ));
    info!(
        threshold = evaluator.threshold(),
        confirmation = evaluator.confirmation(),
        "Temperature alerts enabled"
    );
    let aggregator = Arc::new(DailyAggregator::new(
        store.clone(),
        config.alerts.temperature_threshold,
        config.store_timeout(),
    ));

    let poller = Arc::new(Poller::new(
        config.poller.cities.clone(),
        config.poll_interval(),
        config.fetch_timeout(),
        config.timezone(),
        source.clone(),
        aggregator,
        evaluator.clone(),
        clock.clone(),
    ));
    let service = Arc::new(WeatherService::new(
        config.poller.cities.clone(),
        config.timezone(),
        config.fetch_timeout(),
        config.store.history_max_days,
        source,
        store,
        evaluator,
        clock,
    ));

    let poller = poller.spawn();
    let served = web::run(config.web.port, service, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown requested");
    })
    .await;

    poller.stop().await;
    telemetry.shutdown();
    served
}
