use std::net::SocketAddr;

use anyhow::Context;
use axum::{routing::get, Router};
use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Counters emitted by the aggregation engine and the HTTP layer, all
/// labelled by `kind` (`consumption` or `weather`).
pub const COUNTERS: &[(&str, &str)] = &[
    ("aggregation_runs_total", "Aggregation runs started"),
    ("aggregation_empty_windows_total", "Runs that found no raw rows and wrote nothing"),
    ("aggregation_days_written_total", "Daily aggregate rows committed"),
    ("aggregation_days_skipped_total", "Days dropped for lack of a valid primary value"),
    ("aggregation_failures_total", "Runs that failed and were rolled back"),
    ("http_aggregation_requests_total", "Aggregation API requests, labelled by op"),
];

/// Installs the Prometheus recorder, describes the service counters and
/// serves `/metrics` on `bind_addr`.
///
/// Must run inside a tokio runtime. Call once per process.
pub fn init(bind_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid metrics bind address {bind_addr}"))?;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus metrics recorder")?;
    if PROM_HANDLE.set(handle).is_err() {
        anyhow::bail!("metrics exporter already initialised");
    }
    for (name, help) in COUNTERS {
        describe_counter!(*name, *help);
    }

    tokio::spawn(async move {
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                tracing::info!(%addr, "metrics exporter listening");
                if let Err(e) = axum::serve(listener, router().into_make_service()).await {
                    tracing::error!(error = %e, "metrics server error");
                }
            }
            Err(e) => {
                tracing::error!(%addr, error = %e, "failed to bind metrics listener");
            }
        }
    });

    Ok(())
}

fn router() -> Router {
    Router::new().route("/metrics", get(render))
}

/// Empty body until `init` has installed the recorder.
async fn render() -> String {
    PROM_HANDLE.get().map(PrometheusHandle::render).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn metrics_route_answers_before_the_recorder_is_installed() {
        let response = router()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn every_counter_is_described_once() {
        let mut names: Vec<&str> = COUNTERS.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names.dedup();

        assert_eq!(names.len(), COUNTERS.len());
        assert!(names.iter().all(|n| n.ends_with("_total")));
    }

    #[test]
    fn bad_bind_address_is_rejected_before_installing_a_recorder() {
        assert!(init("not-an-address").is_err());
        assert!(PROM_HANDLE.get().is_none());
    }
}
