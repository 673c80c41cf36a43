//! HTTP trigger and read endpoints for the daily aggregates.

pub mod error;
pub mod params;
mod routes;

use std::{net::SocketAddr, sync::Arc};

use axum::{routing::get, Router};

use crate::rollup::{ConsumptionAggregator, WeatherAggregator};

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use params::{Window, WindowQuery};

#[derive(Clone)]
pub struct AppState {
    pub consumption: Arc<ConsumptionAggregator>,
    pub weather: Arc<WeatherAggregator>,
}

impl AppState {
    pub fn new(consumption: ConsumptionAggregator, weather: WeatherAggregator) -> Self {
        Self {
            consumption: Arc::new(consumption),
            weather: Arc::new(weather),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/aggregation/consumption",
            get(routes::list_consumption).post(routes::aggregate_consumption),
        )
        .route(
            "/aggregation/weather",
            get(routes::list_weather).post(routes::aggregate_weather),
        )
        .with_state(state)
}

/// Serves the API until the listener fails.
pub async fn serve(bind_addr: &str, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid http bind addr {bind_addr}: {e}"))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "aggregation API listening");
    axum::serve(listener, create_router(state).into_make_service()).await?;
    Ok(())
}
