use rust_decimal::Decimal;
use time::{Date, PrimitiveDateTime};

use super::{DailyKeyed, Measured, QualityIndicator};

/// One hourly observation reported by a weather station of a department.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WeatherObservation {
    pub entity_code: String,
    pub station_id: String,
    pub ts: PrimitiveDateTime,
    pub temperature_c: Option<Decimal>,
    pub humidity_pct: Option<Decimal>,
    pub precipitation_mm: Option<Decimal>,
    pub wind_speed_ms: Option<Decimal>,
}

impl Measured for WeatherObservation {
    fn entity_code(&self) -> &str {
        &self.entity_code
    }

    fn ts(&self) -> PrimitiveDateTime {
        self.ts
    }
}

/// Daily weather summary of a department. All decimals carry scale 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyWeather {
    pub entity_code: String,
    pub day: Date,
    pub mean_temperature_c: Option<Decimal>,
    pub mean_humidity_pct: Option<Decimal>,
    pub total_precipitation_mm: Decimal,
    pub mean_wind_speed_ms: Option<Decimal>,
    /// Number of observations carrying a temperature.
    pub valid_count: u32,
    pub station_count: u32,
    pub quality: QualityIndicator,
}

impl DailyKeyed for DailyWeather {
    fn entity_code(&self) -> &str {
        &self.entity_code
    }

    fn day(&self) -> Date {
        self.day
    }
}
