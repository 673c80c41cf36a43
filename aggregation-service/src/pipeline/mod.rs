use std::sync::Arc;

use daily_client::Measured;
use time::Date;

use crate::store::{DailyStore, WindowWriter};

pub mod window;

pub use window::{bucket_by_day, parse_day, window_bounds};

#[derive(thiserror::Error, Debug)]
pub enum AggregationError {
    #[error("fetch error: {0}")]
    Fetch(String),
    #[error("delete error: {0}")]
    Delete(String),
    #[error("insert error: {0}")]
    Insert(String),
    #[error("transaction error: {0}")]
    Transaction(String),
}

/// Per-day computation of one aggregation kind.
pub trait Rollup: Send + Sync + 'static {
    type Raw: Measured + Send + Sync + 'static;
    type Daily: Send + Sync + 'static;

    /// Short name used in log events and metric labels.
    fn kind(&self) -> &'static str;

    /// Aggregate the raw rows of one calendar day, or `None` to drop the day.
    fn summarize(&self, entity_code: &str, day: Date, rows: &[Self::Raw]) -> Option<Self::Daily>;
}

/// Outcome of one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowReport {
    pub raw_rows: usize,
    pub deleted: u64,
    pub written: usize,
    pub skipped_days: Vec<Date>,
}

impl WindowReport {
    /// True when no raw row was found and the store was left untouched.
    pub fn is_empty_window(&self) -> bool {
        self.raw_rows == 0
    }
}

/// Replaces the daily aggregates of an entity over a date window.
///
/// Runs are load, bucket by day, summarize, then delete and bulk insert in a
/// single transaction. An empty window performs no write at all.
///
/// Two concurrent runs for the same entity and overlapping windows are not
/// coordinated; they may lose rows or fail on the `(entity, day)` key.
pub struct WindowAggregator<P: Rollup> {
    rollup: P,
    store: Arc<dyn DailyStore<P::Raw, P::Daily>>,
}

impl<P: Rollup> WindowAggregator<P> {
    pub fn new(rollup: P, store: Arc<dyn DailyStore<P::Raw, P::Daily>>) -> Self {
        Self { rollup, store }
    }

    pub fn kind(&self) -> &'static str {
        self.rollup.kind()
    }

    pub async fn aggregate(
        &self,
        entity_code: &str,
        start: Date,
        end: Date,
    ) -> Result<WindowReport, AggregationError> {
        let kind = self.rollup.kind();
        metrics::counter!("aggregation_runs_total", "kind" => kind).increment(1);
        tracing::info!(kind, entity_code, %start, %end, "daily aggregation started");

        match self.run(entity_code, start, end).await {
            Ok(report) => {
                if !report.is_empty_window() {
                    tracing::info!(
                        kind,
                        entity_code,
                        raw_rows = report.raw_rows,
                        deleted = report.deleted,
                        written = report.written,
                        skipped = report.skipped_days.len(),
                        "daily aggregation finished"
                    );
                }
                Ok(report)
            }
            Err(e) => {
                tracing::error!(kind, entity_code, error = %e, "daily aggregation failed");
                metrics::counter!("aggregation_failures_total", "kind" => kind).increment(1);
                Err(e)
            }
        }
    }

    /// Stored aggregates of an entity for `start <= day <= end`, by day.
    pub async fn stored(
        &self,
        entity_code: &str,
        start: Date,
        end: Date,
    ) -> Result<Vec<P::Daily>, AggregationError> {
        self.store.list_aggregates_in_range(entity_code, start, end).await
    }

    async fn run(
        &self,
        entity_code: &str,
        start: Date,
        end: Date,
    ) -> Result<WindowReport, AggregationError> {
        let kind = self.rollup.kind();
        let (from, to) = window_bounds(start, end);

        let rows = self.store.fetch_raw_in_range(entity_code, from, to).await?;
        if rows.is_empty() {
            tracing::warn!(kind, entity_code, %start, %end, "no raw rows in window, nothing replaced");
            metrics::counter!("aggregation_empty_windows_total", "kind" => kind).increment(1);
            return Ok(WindowReport::default());
        }

        let raw_rows = rows.len();
        tracing::info!(kind, entity_code, raw_rows, "raw rows loaded");

        let mut days = Vec::new();
        let mut skipped_days = Vec::new();
        for (day, bucket) in bucket_by_day(rows) {
            match self.rollup.summarize(entity_code, day, &bucket) {
                Some(daily) => days.push(daily),
                None => {
                    tracing::warn!(
                        kind,
                        entity_code,
                        %day,
                        raw = bucket.len(),
                        "no valid primary values, day skipped"
                    );
                    skipped_days.push(day);
                }
            }
        }

        let mut writer = self.store.begin().await?;
        let deleted = match replace_window(writer.as_mut(), entity_code, start, end, &days).await {
            Ok(deleted) => deleted,
            Err(e) => {
                if let Err(rb) = writer.rollback().await {
                    tracing::error!(kind, entity_code, error = %rb, "rollback failed");
                }
                return Err(e);
            }
        };
        writer.commit().await?;

        metrics::counter!("aggregation_days_written_total", "kind" => kind).increment(days.len() as u64);
        metrics::counter!("aggregation_days_skipped_total", "kind" => kind)
            .increment(skipped_days.len() as u64);

        Ok(WindowReport {
            raw_rows,
            deleted,
            written: days.len(),
            skipped_days,
        })
    }
}

async fn replace_window<A>(
    writer: &mut dyn WindowWriter<A>,
    entity_code: &str,
    start: Date,
    end: Date,
    days: &[A],
) -> Result<u64, AggregationError>
where
    A: Send + Sync + 'static,
{
    let deleted = writer.delete_aggregates_in_range(entity_code, start, end).await?;
    if !days.is_empty() {
        writer.bulk_insert_aggregates(days).await?;
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollup::{ConsumptionAggregator, ConsumptionRollup, WeatherAggregator, WeatherRollup};
    use crate::store::MemoryStore;
    use daily_client::{
        ConsumptionReading, DailyConsumption, DailyWeather, QualityIndicator, WeatherObservation,
    };
    use rust_decimal::Decimal;
    use time::{
        macros::{date, datetime},
        PrimitiveDateTime,
    };

    type ConsumptionStore = MemoryStore<ConsumptionReading, DailyConsumption>;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn reading(code: &str, ts: PrimitiveDateTime, value: Option<&str>) -> ConsumptionReading {
        ConsumptionReading {
            entity_code: code.to_string(),
            ts,
            value_mw: value.map(dec),
        }
    }

    fn stale(code: &str, day: Date) -> DailyConsumption {
        DailyConsumption {
            entity_code: code.to_string(),
            day,
            mean_mw: dec("999.0000"),
            valid_count: 1,
            quality: QualityIndicator::Suspect,
        }
    }

    fn consumption(store: &Arc<ConsumptionStore>) -> ConsumptionAggregator {
        let store: Arc<dyn DailyStore<ConsumptionReading, DailyConsumption>> = store.clone();
        WindowAggregator::new(ConsumptionRollup::default(), store)
    }

    #[tokio::test]
    async fn empty_window_leaves_aggregates_untouched() {
        let store = Arc::new(ConsumptionStore::new());
        store.seed_daily(vec![stale("11", date!(2024-01-01))]).await;
        store
            .push_raw(vec![reading("11", datetime!(2024-02-01 10:00), Some("5"))])
            .await;

        let report = consumption(&store)
            .aggregate("11", date!(2024-01-01), date!(2024-01-31))
            .await
            .unwrap();

        assert!(report.is_empty_window());
        assert_eq!(store.daily_rows().await, vec![stale("11", date!(2024-01-01))]);
    }

    #[tokio::test]
    async fn stale_rows_in_window_are_replaced_and_others_kept() {
        let store = Arc::new(ConsumptionStore::new());
        store
            .seed_daily(vec![
                stale("11", date!(2023-12-31)),
                stale("11", date!(2024-01-01)),
                stale("11", date!(2024-01-02)),
                stale("24", date!(2024-01-01)),
            ])
            .await;
        store
            .push_raw(vec![
                reading("11", datetime!(2024-01-02 00:30), Some("10")),
                reading("11", datetime!(2024-01-02 01:00), Some("20")),
                reading("24", datetime!(2024-01-02 01:00), Some("70")),
            ])
            .await;

        let report = consumption(&store)
            .aggregate("11", date!(2024-01-01), date!(2024-01-02))
            .await
            .unwrap();

        assert_eq!(report.raw_rows, 2);
        assert_eq!(report.deleted, 2);
        assert_eq!(report.written, 1);

        let rows = store.daily_rows().await;
        assert_eq!(rows.len(), 3);
        assert!(rows.contains(&stale("11", date!(2023-12-31))));
        assert!(rows.contains(&stale("24", date!(2024-01-01))));
        let fresh = rows
            .iter()
            .find(|r| r.entity_code == "11" && r.day == date!(2024-01-02))
            .unwrap();
        assert_eq!(fresh.mean_mw.to_string(), "15.0000");
        assert_eq!(fresh.quality, QualityIndicator::Incomplete);
    }

    #[tokio::test]
    async fn rerunning_the_same_window_is_idempotent() {
        let store = Arc::new(ConsumptionStore::new());
        store
            .push_raw(vec![
                reading("11", datetime!(2024-01-01 00:00), Some("10.0000")),
                reading("11", datetime!(2024-01-01 00:30), Some("20.0000")),
                reading("11", datetime!(2024-01-02 00:00), Some("7.12345")),
            ])
            .await;
        let aggregator = consumption(&store);

        aggregator.aggregate("11", date!(2024-01-01), date!(2024-01-02)).await.unwrap();
        let first = store.daily_rows().await;
        let report = aggregator.aggregate("11", date!(2024-01-01), date!(2024-01-02)).await.unwrap();
        let second = store.daily_rows().await;

        assert_eq!(report.deleted, 2);
        assert_eq!(first, second);
        let rendered: Vec<String> = second.iter().map(|r| r.mean_mw.to_string()).collect();
        assert_eq!(rendered, vec!["15.0000", "7.1235"]);
    }

    #[tokio::test]
    async fn failed_insert_rolls_back_the_delete() {
        let store = Arc::new(ConsumptionStore::new());
        store.seed_daily(vec![stale("11", date!(2024-01-01))]).await;
        store
            .push_raw(vec![reading("11", datetime!(2024-01-01 12:00), Some("3"))])
            .await;
        store.fail_inserts(true);

        let res = consumption(&store)
            .aggregate("11", date!(2024-01-01), date!(2024-01-01))
            .await;

        assert!(matches!(res, Err(AggregationError::Insert(_))));
        assert_eq!(store.daily_rows().await, vec![stale("11", date!(2024-01-01))]);
    }

    #[tokio::test]
    async fn window_with_only_invalid_days_still_clears_old_rows() {
        let store = Arc::new(ConsumptionStore::new());
        store.seed_daily(vec![stale("11", date!(2024-01-01))]).await;
        store
            .push_raw(vec![
                reading("11", datetime!(2024-01-01 10:00), Some("0")),
                reading("11", datetime!(2024-01-01 10:30), Some("-5")),
                reading("11", datetime!(2024-01-01 11:00), None),
            ])
            .await;

        let report = consumption(&store)
            .aggregate("11", date!(2024-01-01), date!(2024-01-01))
            .await
            .unwrap();

        assert_eq!(report.written, 0);
        assert_eq!(report.skipped_days, vec![date!(2024-01-01)]);
        assert!(store.daily_rows().await.is_empty());
    }

    #[tokio::test]
    async fn last_second_of_end_day_is_included() {
        let store = Arc::new(ConsumptionStore::new());
        store
            .push_raw(vec![
                reading("11", datetime!(2024-01-01 23:59:59), Some("4")),
                reading("11", datetime!(2024-01-02 00:00:00), Some("100")),
            ])
            .await;

        consumption(&store)
            .aggregate("11", date!(2024-01-01), date!(2024-01-01))
            .await
            .unwrap();

        let rows = store.daily_rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mean_mw.to_string(), "4.0000");
    }

    #[tokio::test]
    async fn weather_window_is_replaced_through_the_same_engine() {
        let store = Arc::new(MemoryStore::<WeatherObservation, DailyWeather>::new());
        let obs = |ts, temp: Option<&str>| WeatherObservation {
            entity_code: "44".to_string(),
            station_id: "44020001".to_string(),
            ts,
            temperature_c: temp.map(dec),
            humidity_pct: None,
            precipitation_mm: None,
            wind_speed_ms: None,
        };
        store
            .push_raw(vec![
                obs(datetime!(2024-03-01 01:00), Some("4.5")),
                obs(datetime!(2024-03-01 02:00), Some("5.5")),
                obs(datetime!(2024-03-02 01:00), None),
            ])
            .await;
        let dyn_store: Arc<dyn DailyStore<WeatherObservation, DailyWeather>> = store.clone();
        let aggregator: WeatherAggregator = WindowAggregator::new(WeatherRollup::default(), dyn_store);

        let report = aggregator
            .aggregate("44", date!(2024-03-01), date!(2024-03-02))
            .await
            .unwrap();

        assert_eq!(report.written, 1);
        assert_eq!(report.skipped_days, vec![date!(2024-03-02)]);
        let stored = aggregator
            .stored("44", date!(2024-03-01), date!(2024-03-02))
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].mean_temperature_c.map(|d| d.to_string()), Some("5.00".to_string()));
        assert_eq!(stored[0].total_precipitation_mm.to_string(), "0.00");
    }
}
