use std::{env, sync::Arc};

use aggregation_service::{
    config::AppConfig,
    observability,
    pipeline::{parse_day, window_bounds},
    rollup::{ConsumptionAggregator, ConsumptionRollup, WeatherAggregator, WeatherRollup},
    store::{PgConsumptionStore, PgWeatherStore},
    WindowReport,
};
use anyhow::{bail, Context, Result};
use daily_client::db::{consumption_queries, weather_queries};
use sqlx::postgres::PgPoolOptions;

const USAGE: &str = "usage: aggregate_window <consumption|weather> <entity_code> <start YYYY-MM-DD> <end YYYY-MM-DD>";

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 5 {
        bail!(USAGE);
    }
    let kind = args[1].as_str();
    let entity_code = args[2].as_str();
    if entity_code.trim().is_empty() {
        bail!("entity_code must not be blank");
    }
    let start = parse_day(&args[3]).with_context(|| format!("invalid start date {:?}", args[3]))?;
    let end = parse_day(&args[4]).with_context(|| format!("invalid end date {:?}", args[4]))?;
    if start > end {
        bail!("start ({start}) must not be after end ({end})");
    }

    // Point AGGREGATION_CONFIG at another file to run against a different database.
    let cfg = AppConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    let (from, to) = window_bounds(start, end);
    let report: WindowReport = match kind {
        "consumption" => {
            let raw = consumption_queries::count_readings_in_range(&pool, entity_code, from, to).await?;
            tracing::info!(kind, entity_code, raw, "raw readings in window");

            ConsumptionAggregator::new(
                ConsumptionRollup::from_config(&cfg.consumption),
                Arc::new(PgConsumptionStore::new(pool)),
            )
            .aggregate(entity_code, start, end)
            .await?
        }
        "weather" => {
            let raw = weather_queries::count_observations_in_range(&pool, entity_code, from, to).await?;
            tracing::info!(kind, entity_code, raw, "raw observations in window");

            WeatherAggregator::new(
                WeatherRollup::from_config(&cfg.weather),
                Arc::new(PgWeatherStore::new(pool)),
            )
            .aggregate(entity_code, start, end)
            .await?
        }
        other => bail!("unknown kind {other:?}; {USAGE}"),
    };

    tracing::info!(
        kind,
        entity_code,
        %start,
        %end,
        raw_rows = report.raw_rows,
        deleted = report.deleted,
        written = report.written,
        skipped = report.skipped_days.len(),
        "window aggregated"
    );

    Ok(())
}
