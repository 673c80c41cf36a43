use time::{Date, PrimitiveDateTime};

pub mod consumption;
pub mod quality;
pub mod weather;

pub use consumption::{ConsumptionReading, DailyConsumption};
pub use quality::{QualityIndicator, RowError};
pub use weather::{DailyWeather, WeatherObservation};

/// A raw time-series row belonging to one entity (region or department).
pub trait Measured {
    fn entity_code(&self) -> &str;

    /// Local wall-clock timestamp; its date component is the aggregation day.
    fn ts(&self) -> PrimitiveDateTime;
}

/// A daily aggregate row, unique per `(entity_code, day)`.
pub trait DailyKeyed {
    fn entity_code(&self) -> &str;
    fn day(&self) -> Date;
}
