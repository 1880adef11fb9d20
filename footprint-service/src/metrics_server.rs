use std::net::SocketAddr;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Installs the Prometheus recorder once; later calls reuse the first handle.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    PROM_HANDLE
        .get_or_try_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .map_err(|e| anyhow::anyhow!("failed to install Prometheus metrics recorder: {e}"))?;
            describe_metrics();
            Ok(handle)
        })
        .cloned()
}

fn describe_metrics() {
    metrics::describe_counter!("grid_batches_fetched_total", "Auxiliary grid batches fetched, by series");
    metrics::describe_counter!("grid_fetch_errors_total", "Auxiliary grid batch fetches that failed, by series");
    metrics::describe_counter!(
        "grid_batch_start_mismatch_total",
        "Batches whose first period did not start at the planned anchor"
    );
    metrics::describe_counter!("provider_retries_total", "Provider calls retried after a transient failure");
    metrics::describe_counter!("validation_series_rejected_total", "Consumption series rejected before alignment");
    metrics::describe_counter!("footprint_metric_failures_total", "Metric computations that failed, by metric and kind");
    metrics::describe_histogram!("grid_fetch_phase_seconds", "Wall time of one series' fetch phase");
}

/// `/metrics` route, for merging into another router.
pub fn router(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || std::future::ready(handle.render())))
}

/// Installs the recorder and serves `/metrics` on `bind_addr` in the background.
pub fn init(bind_addr: &str) -> anyhow::Result<()> {
    let handle = install_recorder()?;

    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics bind address '{bind_addr}': {e}"))?;

    tokio::spawn(async move {
        let app = router(handle);

        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                tracing::info!(%addr, "metrics server listening");
                if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                    tracing::error!(error = %e, "metrics server error");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to bind metrics listener");
            }
        }
    });

    Ok(())
}
