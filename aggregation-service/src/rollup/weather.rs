use std::collections::HashSet;

use daily_client::{DailyWeather, QualityIndicator, WeatherObservation};
use rust_decimal::Decimal;
use time::Date;

use super::numeric;
use crate::config::WeatherConfig;
use crate::pipeline::{Rollup, WindowAggregator};

/// Temperature observations needed for an `OK` day, out of 24 hourly slots.
pub const DEFAULT_OK_THRESHOLD: usize = 18;
pub const DEFAULT_SCALE: u32 = 2;

pub type WeatherAggregator = WindowAggregator<WeatherRollup>;

/// Daily weather summary of a department.
///
/// Every metric is filtered on its own, so an observation missing humidity
/// still contributes its temperature. Temperature alone decides whether the
/// day is kept and how its quality is rated.
#[derive(Debug, Clone)]
pub struct WeatherRollup {
    ok_threshold: usize,
    scale: u32,
}

impl Default for WeatherRollup {
    fn default() -> Self {
        Self::new(DEFAULT_OK_THRESHOLD, DEFAULT_SCALE)
    }
}

impl WeatherRollup {
    pub fn new(ok_threshold: usize, scale: u32) -> Self {
        Self { ok_threshold, scale }
    }

    pub fn from_config(cfg: &WeatherConfig) -> Self {
        Self::new(cfg.ok_threshold, cfg.scale)
    }

    fn metric_mean<F>(&self, rows: &[WeatherObservation], metric: F) -> Option<Decimal>
    where
        F: Fn(&WeatherObservation) -> Option<Decimal>,
    {
        numeric::mean(rows.iter().filter_map(metric), self.scale)
    }
}

fn station_count(rows: &[WeatherObservation]) -> usize {
    rows.iter()
        .map(|o| o.station_id.as_str())
        .filter(|id| !id.trim().is_empty())
        .collect::<HashSet<_>>()
        .len()
}

impl Rollup for WeatherRollup {
    type Raw = WeatherObservation;
    type Daily = DailyWeather;

    fn kind(&self) -> &'static str {
        "weather"
    }

    fn summarize(&self, entity_code: &str, day: Date, rows: &[WeatherObservation]) -> Option<DailyWeather> {
        let valid_count = rows.iter().filter(|o| o.temperature_c.is_some()).count();
        let mean_temperature_c = self.metric_mean(rows, |o| o.temperature_c)?;

        let mean_humidity_pct = self.metric_mean(rows, |o| o.humidity_pct);
        let mean_wind_speed_ms = self.metric_mean(rows, |o| o.wind_speed_ms);
        let total_precipitation_mm = numeric::total(
            rows.iter().map(|o| o.precipitation_mm.unwrap_or(Decimal::ZERO)),
            self.scale,
        );
        let stations = station_count(rows);
        let quality = QualityIndicator::from_count(valid_count, self.ok_threshold);

        tracing::debug!(
            entity_code,
            %day,
            valid_count,
            raw = rows.len(),
            stations,
            temperature = %mean_temperature_c,
            humidity = ?mean_humidity_pct,
            precipitation = %total_precipitation_mm,
            wind = ?mean_wind_speed_ms,
            quality = %quality,
            "weather day computed"
        );

        Some(DailyWeather {
            entity_code: entity_code.to_string(),
            day,
            mean_temperature_c: Some(mean_temperature_c),
            mean_humidity_pct,
            total_precipitation_mm,
            mean_wind_speed_ms,
            valid_count: u32::try_from(valid_count).unwrap_or(u32::MAX),
            station_count: u32::try_from(stations).unwrap_or(u32::MAX),
            quality,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{
        macros::{date, datetime},
        Duration,
    };

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    /// `n` hourly observations from one station with every metric absent.
    fn hours(n: usize) -> Vec<WeatherObservation> {
        (0..n)
            .map(|i| WeatherObservation {
                entity_code: "44".to_string(),
                station_id: "44020001".to_string(),
                ts: datetime!(2024-06-01 00:00) + Duration::hours(i as i64),
                temperature_c: None,
                humidity_pct: None,
                precipitation_mm: None,
                wind_speed_ms: None,
            })
            .collect()
    }

    fn summarize(rows: &[WeatherObservation]) -> Option<DailyWeather> {
        WeatherRollup::default().summarize("44", date!(2024-06-01), rows)
    }

    #[test]
    fn humidity_mean_uses_only_observations_that_carry_it() {
        let mut rows = hours(20);
        for o in rows.iter_mut() {
            o.temperature_c = Some(dec("15.0"));
        }
        for (o, h) in rows.iter_mut().zip(["50", "60", "70", "80", "90"]) {
            o.humidity_pct = Some(dec(h));
        }

        let day = summarize(&rows).unwrap();

        assert_eq!(day.mean_humidity_pct.unwrap().to_string(), "70.00");
        assert_eq!(day.valid_count, 20);
        assert_eq!(day.quality, QualityIndicator::Ok);
        assert_eq!(day.mean_temperature_c.unwrap().to_string(), "15.00");
    }

    #[test]
    fn absent_precipitation_everywhere_totals_zero() {
        let mut rows = hours(3);
        for o in rows.iter_mut() {
            o.temperature_c = Some(dec("9"));
        }

        let day = summarize(&rows).unwrap();

        assert_eq!(day.total_precipitation_mm.to_string(), "0.00");
        assert_eq!(day.quality, QualityIndicator::Incomplete);
        assert_eq!(day.mean_humidity_pct, None);
        assert_eq!(day.mean_wind_speed_ms, None);
    }

    #[test]
    fn day_without_temperature_is_skipped_even_with_other_metrics() {
        let mut rows = hours(10);
        for o in rows.iter_mut() {
            o.humidity_pct = Some(dec("80"));
            o.precipitation_mm = Some(dec("1.2"));
            o.wind_speed_ms = Some(dec("3.4"));
        }

        assert!(summarize(&rows).is_none());
    }

    #[test]
    fn precipitation_sums_every_observation_treating_absent_as_zero() {
        let mut rows = hours(4);
        rows[0].temperature_c = Some(dec("10"));
        rows[0].precipitation_mm = Some(dec("0.4"));
        rows[1].precipitation_mm = Some(dec("1.25"));
        rows[3].precipitation_mm = Some(dec("0.001"));

        let day = summarize(&rows).unwrap();

        assert_eq!(day.total_precipitation_mm.to_string(), "1.65");
        assert_eq!(day.valid_count, 1);
    }

    #[test]
    fn wind_mean_is_independent_of_temperature() {
        let mut rows = hours(3);
        rows[0].temperature_c = Some(dec("10"));
        rows[1].wind_speed_ms = Some(dec("2.00"));
        rows[2].wind_speed_ms = Some(dec("3.01"));

        let day = summarize(&rows).unwrap();

        assert_eq!(day.mean_wind_speed_ms.unwrap().to_string(), "2.51");
    }

    #[test]
    fn stations_are_counted_across_all_observations() {
        let mut rows = hours(5);
        rows[0].temperature_c = Some(dec("10"));
        rows[1].station_id = "44020002".to_string();
        rows[2].station_id = "44020002".to_string();
        rows[3].station_id = "  ".to_string();
        rows[4].station_id = String::new();

        let day = summarize(&rows).unwrap();

        assert_eq!(day.station_count, 2);
    }

    #[test]
    fn eighteen_temperatures_make_an_ok_day() {
        let mut rows = hours(24);
        for o in rows.iter_mut().take(18) {
            o.temperature_c = Some(dec("1"));
        }
        assert_eq!(summarize(&rows).unwrap().quality, QualityIndicator::Ok);

        rows[17].temperature_c = None;
        assert_eq!(summarize(&rows).unwrap().quality, QualityIndicator::Incomplete);
    }

    #[test]
    fn temperature_mean_rounds_decimal_midpoint_up() {
        let mut rows = hours(2);
        rows[0].temperature_c = Some(dec("1.005"));
        rows[1].temperature_c = Some(dec("1.005"));

        let day = summarize(&rows).unwrap();

        assert_eq!(day.mean_temperature_c.unwrap().to_string(), "1.01");
    }
}
