//! Text and JSON renderings of a [`FootprintReport`].

use std::fmt::Write;

use serde::Serialize;
use serde_json::Value;

use crate::footprint::{FootprintReport, MetricResult};
use crate::pipeline::FootprintError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

pub fn render(report: &FootprintReport, format: ReportFormat) -> anyhow::Result<String> {
    match format {
        ReportFormat::Text => Ok(render_text(report)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(&to_json(report))?),
    }
}

/// Console report, one numbered section per metric.
pub fn render_text(report: &FootprintReport) -> String {
    let mut out = String::new();
    let req = &report.request;
    let _ = writeln!(out, "Meter {} from {} to {}\n", req.meter_id, req.start_date, req.end_date);

    let _ = writeln!(out, "1. The monthly energy consumed by the building (kWh):");
    match &report.monthly_kwh.outcome {
        Ok(kwh) => {
            let _ = writeln!(out, "{kwh:.2} kWh");
        }
        Err(e) => write_error(&mut out, e),
    }
    write_elapsed(&mut out, &report.monthly_kwh);

    let _ = writeln!(out, "2. The amount of CO2 (kgs) emitted by the electricity generated for the building:");
    match &report.co2.outcome {
        Ok(co2) => {
            let _ = writeln!(out, "Total CO2 emissions: {:.2} kg", co2.total_kg);
            if co2.skipped > 0 {
                let _ = writeln!(
                    out,
                    "({} of {} half-hours had no actual intensity and were left out)",
                    co2.skipped,
                    co2.samples + co2.skipped
                );
            }
        }
        Err(e) => write_error(&mut out, e),
    }
    write_elapsed(&mut out, &report.co2);

    let _ = writeln!(out, "3. The % of fuel mix (wind/solar/nuclear/coal/etc) used to generate the electricity:");
    match &report.fuel_mix.outcome {
        Ok(mix) => {
            for (fuel, pct) in mix.iter() {
                let _ = writeln!(out, "{fuel}: {pct:.2}%");
            }
        }
        Err(e) => write_error(&mut out, e),
    }
    write_elapsed(&mut out, &report.fuel_mix);

    out
}

fn write_error(out: &mut String, e: &FootprintError) {
    let _ = writeln!(out, "failed ({}): {e}", e.kind());
}

fn write_elapsed<T>(out: &mut String, m: &MetricResult<T>) {
    let _ = writeln!(out, "Time taken: {:.2} ms\n", m.elapsed.as_secs_f64() * 1000.0);
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    kind: &'a str,
    message: String,
}

fn metric_json<T: Serialize>(m: &MetricResult<T>) -> Value {
    let mut body = match &m.outcome {
        Ok(v) => serde_json::json!({ "value": v }),
        Err(e) => serde_json::json!({
            "error": ErrorBody {
                kind: e.kind(),
                message: e.to_string(),
            }
        }),
    };
    body["elapsed_ms"] = serde_json::json!(m.elapsed.as_secs_f64() * 1000.0);
    body
}

/// Structured report; failed metrics carry `{"error": {"kind", "message"}}` instead of `value`.
pub fn to_json(report: &FootprintReport) -> Value {
    let req = &report.request;
    serde_json::json!({
        "meter_id": req.meter_id,
        "start_date": req.start_date.to_string(),
        "end_date": req.end_date.to_string(),
        "monthly_kwh": metric_json(&report.monthly_kwh),
        "co2": metric_json(&report.co2),
        "fuel_mix": metric_json(&report.fuel_mix),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Co2Summary, FuelAccumulator};
    use crate::footprint::FootprintRequest;
    use grid_client::domain::Fuel;
    use std::time::Duration;
    use time::macros::date;

    fn report() -> FootprintReport {
        let mut acc = FuelAccumulator::new();
        acc.add(Fuel::Wind, 3.0);
        acc.add(Fuel::Gas, 1.0);

        FootprintReport {
            request: FootprintRequest::new("meter-1", date!(2023-01-01), date!(2023-01-31)).unwrap(),
            monthly_kwh: MetricResult {
                outcome: Ok(1234.5),
                elapsed: Duration::from_millis(12),
            },
            co2: MetricResult {
                outcome: Err(FootprintError::MissingData("no actual intensity".to_string())),
                elapsed: Duration::from_millis(40),
            },
            fuel_mix: MetricResult {
                outcome: Ok(acc.percentages()),
                elapsed: Duration::from_millis(55),
            },
        }
    }

    #[test]
    fn text_report_lists_each_metric_and_failure_kind() {
        let text = render_text(&report());

        assert!(text.contains("1234.50 kWh"));
        assert!(text.contains("failed (missing_data)"));
        assert!(text.contains("wind: 75.00%"));
        assert!(text.contains("gas: 25.00%"));
        assert!(text.contains("coal: 0.00%"));
        // Canonical fuel order.
        assert!(text.find("wind:").unwrap() < text.find("imports:").unwrap());
    }

    #[test]
    fn text_report_lists_every_fuel_in_canonical_order() {
        let text = render_text(&report());
        let fuels: Vec<&str> = text
            .lines()
            .filter_map(|line| line.split_once(": ").map(|(name, _)| name))
            .filter(|name| Fuel::ALL.iter().any(|f| f.as_str() == *name))
            .collect();

        assert_eq!(
            fuels,
            ["wind", "solar", "nuclear", "coal", "other", "gas", "biomass", "hydro", "imports"]
        );
    }

    #[test]
    fn text_report_mentions_skipped_samples() {
        let mut r = report();
        r.co2.outcome = Ok(Co2Summary {
            total_kg: 10.0,
            samples: 95,
            skipped: 1,
        });
        assert!(render_text(&r).contains("1 of 96 half-hours"));
    }

    #[test]
    fn json_report_separates_values_and_errors() {
        let json = to_json(&report());

        assert_eq!(json["meter_id"], "meter-1");
        assert_eq!(json["start_date"], "2023-01-01");
        assert_eq!(json["monthly_kwh"]["value"], 1234.5);
        assert_eq!(json["co2"]["error"]["kind"], "missing_data");
        assert!(json["co2"].get("value").is_none());
        assert_eq!(json["fuel_mix"]["value"]["wind"], 75.0);
        assert!(json["fuel_mix"]["elapsed_ms"].as_f64().unwrap() > 0.0);
    }
}
