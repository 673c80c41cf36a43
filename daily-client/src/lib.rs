pub mod db;
pub mod domain;

pub use domain::{
    ConsumptionReading, DailyConsumption, DailyKeyed, DailyWeather, Measured, QualityIndicator,
    WeatherObservation,
};
