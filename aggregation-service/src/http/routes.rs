use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use daily_client::{DailyConsumption, DailyWeather};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{error::ApiResult, params::WindowQuery, AppState};
use crate::pipeline::{Rollup, WindowAggregator};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResponse {
    pub message: String,
    pub entity_code: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyConsumptionView {
    pub entity_code: String,
    pub day: String,
    pub mean_mw: String,
    pub valid_count: u32,
    pub quality: String,
}

impl From<DailyConsumption> for DailyConsumptionView {
    fn from(d: DailyConsumption) -> Self {
        Self {
            entity_code: d.entity_code,
            day: d.day.to_string(),
            mean_mw: d.mean_mw.to_string(),
            valid_count: d.valid_count,
            quality: d.quality.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyWeatherView {
    pub entity_code: String,
    pub day: String,
    pub mean_temperature_c: Option<String>,
    pub mean_humidity_pct: Option<String>,
    pub total_precipitation_mm: String,
    pub mean_wind_speed_ms: Option<String>,
    pub valid_count: u32,
    pub station_count: u32,
    pub quality: String,
}

fn opt(v: Option<Decimal>) -> Option<String> {
    v.map(|d| d.to_string())
}

impl From<DailyWeather> for DailyWeatherView {
    fn from(d: DailyWeather) -> Self {
        Self {
            entity_code: d.entity_code,
            day: d.day.to_string(),
            mean_temperature_c: opt(d.mean_temperature_c),
            mean_humidity_pct: opt(d.mean_humidity_pct),
            total_precipitation_mm: d.total_precipitation_mm.to_string(),
            mean_wind_speed_ms: opt(d.mean_wind_speed_ms),
            valid_count: d.valid_count,
            station_count: d.station_count,
            quality: d.quality.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub(super) async fn aggregate_consumption(
    State(state): State<AppState>,
    query: Result<Query<WindowQuery>, QueryRejection>,
) -> ApiResult<Json<AggregationResponse>> {
    let Query(query) = query?;
    trigger(state.consumption.as_ref(), &query).await
}

pub(super) async fn aggregate_weather(
    State(state): State<AppState>,
    query: Result<Query<WindowQuery>, QueryRejection>,
) -> ApiResult<Json<AggregationResponse>> {
    let Query(query) = query?;
    trigger(state.weather.as_ref(), &query).await
}

pub(super) async fn list_consumption(
    State(state): State<AppState>,
    query: Result<Query<WindowQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<DailyConsumptionView>>> {
    let Query(query) = query?;
    let rows = list(state.consumption.as_ref(), &query).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

pub(super) async fn list_weather(
    State(state): State<AppState>,
    query: Result<Query<WindowQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<DailyWeatherView>>> {
    let Query(query) = query?;
    let rows = list(state.weather.as_ref(), &query).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

async fn trigger<P: Rollup>(
    aggregator: &WindowAggregator<P>,
    query: &WindowQuery,
) -> ApiResult<Json<AggregationResponse>> {
    let kind = aggregator.kind();
    metrics::counter!("http_aggregation_requests_total", "kind" => kind, "op" => "aggregate")
        .increment(1);

    let window = query.validate()?;
    let report = aggregator
        .aggregate(&window.entity_code, window.start, window.end)
        .await?;

    let message = if report.is_empty_window() {
        format!("{kind} aggregation completed: no raw data in window")
    } else {
        format!(
            "{kind} aggregation completed: {} day(s) written, {} skipped",
            report.written,
            report.skipped_days.len()
        )
    };

    Ok(Json(AggregationResponse {
        message,
        entity_code: window.entity_code,
        start: window.start.to_string(),
        end: window.end.to_string(),
    }))
}

async fn list<P: Rollup>(
    aggregator: &WindowAggregator<P>,
    query: &WindowQuery,
) -> ApiResult<Vec<P::Daily>> {
    metrics::counter!("http_aggregation_requests_total", "kind" => aggregator.kind(), "op" => "list")
        .increment(1);

    let window = query.validate()?;
    Ok(aggregator
        .stored(&window.entity_code, window.start, window.end)
        .await?)
}
