use std::sync::Arc;

use aggregation_service::{
    config::AppConfig,
    http::{self, AppState},
    metrics_server, observability,
    rollup::{ConsumptionAggregator, ConsumptionRollup, WeatherAggregator, WeatherRollup},
    store::{PgConsumptionStore, PgWeatherStore},
};
use anyhow::Result;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    // Schema is expected to be applied out-of-band via `sql/schema/*.sql`.
    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    let consumption = ConsumptionAggregator::new(
        ConsumptionRollup::from_config(&cfg.consumption),
        Arc::new(PgConsumptionStore::new(pool.clone())),
    );
    let weather = WeatherAggregator::new(
        WeatherRollup::from_config(&cfg.weather),
        Arc::new(PgWeatherStore::new(pool)),
    );

    http::serve(&cfg.http.bind_addr, AppState::new(consumption, weather)).await
}
