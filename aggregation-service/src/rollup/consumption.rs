use daily_client::{ConsumptionReading, DailyConsumption, QualityIndicator};
use rust_decimal::Decimal;
use time::Date;

use super::numeric;
use crate::config::ConsumptionConfig;
use crate::pipeline::{Rollup, WindowAggregator};

/// Valid readings needed for an `OK` day, out of 48 half-hourly slots.
pub const DEFAULT_OK_THRESHOLD: usize = 40;
/// Decimal places of the daily mean.
pub const DEFAULT_SCALE: u32 = 4;

pub type ConsumptionAggregator = WindowAggregator<ConsumptionRollup>;

/// Daily mean of the strictly positive consumption readings of a region.
#[derive(Debug, Clone)]
pub struct ConsumptionRollup {
    ok_threshold: usize,
    scale: u32,
}

impl Default for ConsumptionRollup {
    fn default() -> Self {
        Self::new(DEFAULT_OK_THRESHOLD, DEFAULT_SCALE)
    }
}

impl ConsumptionRollup {
    pub fn new(ok_threshold: usize, scale: u32) -> Self {
        Self { ok_threshold, scale }
    }

    pub fn from_config(cfg: &ConsumptionConfig) -> Self {
        Self::new(cfg.ok_threshold, cfg.scale)
    }
}

/// Only present, strictly positive readings count; the rest are dropped, not zeroed.
fn valid_value(r: &ConsumptionReading) -> Option<Decimal> {
    r.value_mw.filter(|v| *v > Decimal::ZERO)
}

impl Rollup for ConsumptionRollup {
    type Raw = ConsumptionReading;
    type Daily = DailyConsumption;

    fn kind(&self) -> &'static str {
        "consumption"
    }

    fn summarize(&self, entity_code: &str, day: Date, rows: &[ConsumptionReading]) -> Option<DailyConsumption> {
        let valid: Vec<Decimal> = rows.iter().filter_map(valid_value).collect();
        let valid_count = valid.len();
        let mean_mw = numeric::mean(valid, self.scale)?;
        let quality = QualityIndicator::from_count(valid_count, self.ok_threshold);

        tracing::debug!(
            entity_code,
            %day,
            valid_count,
            raw = rows.len(),
            mean_mw = %mean_mw,
            quality = %quality,
            "consumption day computed"
        );

        Some(DailyConsumption {
            entity_code: entity_code.to_string(),
            day,
            mean_mw,
            valid_count: u32::try_from(valid_count).unwrap_or(u32::MAX),
            quality,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{
        macros::{date, datetime},
        Duration, PrimitiveDateTime,
    };

    fn readings(values: &[Option<&str>]) -> Vec<ConsumptionReading> {
        let start: PrimitiveDateTime = datetime!(2024-01-15 00:00);
        values
            .iter()
            .enumerate()
            .map(|(i, v)| ConsumptionReading {
                entity_code: "11".to_string(),
                ts: start + Duration::minutes(30 * i as i64),
                value_mw: v.map(|s| s.parse().unwrap()),
            })
            .collect()
    }

    #[test]
    fn three_valid_readings_average_to_scale_four() {
        let rows = readings(&[Some("10.0000"), Some("20.0000"), Some("30.0000")]);

        let day = ConsumptionRollup::default()
            .summarize("11", date!(2024-01-15), &rows)
            .unwrap();

        assert_eq!(day.mean_mw.to_string(), "20.0000");
        assert_eq!(day.valid_count, 3);
        assert_eq!(day.quality, QualityIndicator::Incomplete);
        assert_eq!(day.entity_code, "11");
        assert_eq!(day.day, date!(2024-01-15));
    }

    #[test]
    fn zero_and_negative_only_day_is_skipped() {
        let rows = readings(&[Some("0"), Some("-5")]);
        assert!(ConsumptionRollup::default()
            .summarize("11", date!(2024-01-15), &rows)
            .is_none());
    }

    #[test]
    fn absent_zero_and_negative_values_are_excluded_not_zeroed() {
        let rows = readings(&[Some("12"), None, Some("0"), Some("-3"), Some("18")]);

        let day = ConsumptionRollup::default()
            .summarize("11", date!(2024-01-15), &rows)
            .unwrap();

        assert_eq!(day.valid_count, 2);
        assert_eq!(day.mean_mw.to_string(), "15.0000");
    }

    #[test]
    fn forty_valid_readings_make_an_ok_day() {
        let mut values = vec![Some("100"); 40];
        values.extend(vec![None; 8]);
        let rows = readings(&values);

        let day = ConsumptionRollup::default()
            .summarize("11", date!(2024-01-15), &rows)
            .unwrap();

        assert_eq!(day.valid_count, 40);
        assert_eq!(day.quality, QualityIndicator::Ok);

        let rows = readings(&vec![Some("100"); 39]);
        let day = ConsumptionRollup::default()
            .summarize("11", date!(2024-01-15), &rows)
            .unwrap();
        assert_eq!(day.quality, QualityIndicator::Incomplete);
    }

    #[test]
    fn configured_threshold_and_scale_are_used() {
        let rows = readings(&[Some("1"), Some("2")]);

        let day = ConsumptionRollup::new(2, 1)
            .summarize("11", date!(2024-01-15), &rows)
            .unwrap();

        assert_eq!(day.mean_mw.to_string(), "1.5");
        assert_eq!(day.quality, QualityIndicator::Ok);
    }

    #[test]
    fn mean_rounds_half_up_at_fourth_place() {
        let rows = readings(&[Some("1.00005"), Some("1.00005")]);

        let day = ConsumptionRollup::default()
            .summarize("11", date!(2024-01-15), &rows)
            .unwrap();

        assert_eq!(day.mean_mw.to_string(), "1.0001");
    }
}
