pub mod consumption_queries;
pub mod weather_queries;
