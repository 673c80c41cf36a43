pub mod consumption;
pub mod numeric;
pub mod weather;

pub use consumption::{ConsumptionAggregator, ConsumptionRollup};
pub use weather::{WeatherAggregator, WeatherRollup};
