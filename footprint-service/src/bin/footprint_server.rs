use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use footprint_service::{
    config::{parse_date, AppConfig},
    metrics_server, observability, report, FootprintEngine, FootprintRequest,
};
use serde::Deserialize;

#[derive(Deserialize)]
struct FootprintQuery {
    meter_id: String,
    start_date: String,
    end_date: String,
}

async fn footprint(State(engine): State<Arc<FootprintEngine>>, Query(q): Query<FootprintQuery>) -> Response {
    let request = parse_date(&q.start_date)
        .and_then(|start| Ok((start, parse_date(&q.end_date)?)))
        .map_err(|e| e.to_string())
        .and_then(|(start, end)| FootprintRequest::new(q.meter_id, start, end).map_err(|e| e.to_string()));

    match request {
        Ok(request) => {
            let report = engine.report(&request).await;
            Json(report::to_json(&report)).into_response()
        }
        Err(message) => (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": message }))).into_response(),
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let engine = Arc::new(FootprintEngine::from_config(&cfg)?);

    let mut app = Router::new()
        .route("/footprint", get(footprint))
        .route("/healthz", get(healthz))
        .with_state(engine);

    // Metrics share the report listener unless a dedicated address is configured.
    let handle = metrics_server::install_recorder()?;
    match &cfg.metrics {
        Some(metrics_cfg) => metrics_server::init(&metrics_cfg.bind_addr)?,
        None => app = app.merge(metrics_server::router(handle)),
    }

    let bind_addr = cfg
        .server
        .as_ref()
        .map(|s| s.bind_addr.as_str())
        .unwrap_or("0.0.0.0:8080");
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server.bind_addr: {e}"))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "footprint server listening");
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
