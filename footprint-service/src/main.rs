use anyhow::{bail, Result};
use footprint_service::{
    config::{parse_date, AppConfig},
    metrics_server, observability,
    report::{self, ReportFormat},
    FootprintEngine, FootprintRequest,
};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    // usage: footprint-service [--json] [<meter_id> <start_date> <end_date>]
    let mut format = ReportFormat::Text;
    let mut positional = Vec::new();
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--json" => format = ReportFormat::Json,
            _ => positional.push(arg),
        }
    }

    let (meter_id, start_date, end_date) = match positional.as_slice() {
        [] => (cfg.meter.meter_id.clone(), cfg.meter.start()?, cfg.meter.end()?),
        [meter_id, start, end] => (meter_id.clone(), parse_date(start)?, parse_date(end)?),
        _ => bail!("usage: footprint-service [--json] [<meter_id> <start_date> <end_date>]"),
    };

    let request = FootprintRequest::new(meter_id, start_date, end_date)?;
    let engine = FootprintEngine::from_config(&cfg)?;

    let report = engine.report(&request).await;
    println!("{}", report::render(&report, format)?);

    Ok(())
}
