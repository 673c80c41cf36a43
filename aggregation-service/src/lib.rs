pub mod config;
pub mod http;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod rollup;
pub mod store;

pub use pipeline::{AggregationError, WindowAggregator, WindowReport};
