use std::{collections::BTreeMap, fs::File, path::PathBuf};

use csv::StringRecord;
use grid_client::{
    api::parse_api_timestamp,
    domain::{Granularity, IntervalReading},
};
use time::{Date, OffsetDateTime, Time};

use super::MeteringProvider;
use crate::pipeline::FootprintError;

/// Metering provider over an exported half-hour CSV file.
///
/// Expected header columns (by name):
/// - start_interval (RFC3339 timestamp)
/// - consumption (kWh)
///
/// Other columns (e.g. meter_id) are ignored; the file is assumed to hold one meter.
/// Monthly readings are the half-hour rows summed per calendar month.
pub struct IntervalCsvFileSource {
    path: PathBuf,
}

impl IntervalCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

fn record_to_reading(record: &StringRecord, headers: &StringRecord) -> Result<IntervalReading, FootprintError> {
    let get = |name: &str| -> Result<&str, FootprintError> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| record.get(idx))
            .ok_or_else(|| FootprintError::Parse(format!("missing column '{name}' in CSV record")))
    };

    let start_interval = parse_api_timestamp(get("start_interval")?).map_err(FootprintError::Parse)?;

    let kwh_str = get("consumption")?;
    let consumption: f64 = kwh_str
        .trim()
        .parse()
        .map_err(|e| FootprintError::Parse(format!("invalid consumption '{kwh_str}': {e}")))?;

    Ok(IntervalReading::new(start_interval, consumption))
}

fn read_half_hours(path: &PathBuf) -> Result<Vec<IntervalReading>, FootprintError> {
    let file = File::open(path)
        .map_err(|e| FootprintError::Fetch(format!("failed to open CSV file {}: {e}", path.display())))?;
    let mut rdr = csv::Reader::from_reader(file);
    let headers = rdr
        .headers()
        .map_err(|e| FootprintError::Parse(format!("failed to read CSV headers: {e}")))?
        .clone();

    let mut readings = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| FootprintError::Parse(format!("failed to read CSV record: {e}")))?;
        match record_to_reading(&record, &headers) {
            Ok(r) => readings.push(r),
            Err(e) => {
                metrics::counter!("meter_csv_parse_errors_total").increment(1);
                return Err(e);
            }
        }
    }
    Ok(readings)
}

fn month_start(ts: OffsetDateTime) -> Result<OffsetDateTime, FootprintError> {
    Date::from_calendar_date(ts.year(), ts.month(), 1)
        .map(|d| d.with_time(Time::MIDNIGHT).assume_utc())
        .map_err(|e| FootprintError::Parse(e.to_string()))
}

fn sum_by_month(readings: &[IntervalReading]) -> Result<Vec<IntervalReading>, FootprintError> {
    let mut months: BTreeMap<OffsetDateTime, f64> = BTreeMap::new();
    for r in readings {
        *months.entry(month_start(r.start_interval)?).or_insert(0.0) += r.consumption;
    }
    Ok(months
        .into_iter()
        .map(|(start, kwh)| IntervalReading::new(start, kwh))
        .collect())
}

#[async_trait::async_trait]
impl MeteringProvider for IntervalCsvFileSource {
    async fn interval(
        &self,
        _meter_id: &str,
        granularity: Granularity,
        start_date: Date,
        end_date: Date,
    ) -> Result<Vec<IntervalReading>, FootprintError> {
        // Blocking CSV reader, moved off the async workers.
        let path = self.path.clone();
        let all = tokio::task::spawn_blocking(move || read_half_hours(&path))
            .await
            .map_err(|e| FootprintError::Fetch(format!("CSV reader task failed: {e}")))??;

        let from = start_date.with_time(Time::MIDNIGHT).assume_utc();
        let to = end_date.with_time(Time::MIDNIGHT).assume_utc();
        let in_range: Vec<IntervalReading> = all
            .into_iter()
            .filter(|r| r.start_interval >= from && r.start_interval < to)
            .collect();

        match granularity {
            Granularity::HalfHour => Ok(in_range),
            Granularity::Month => sum_by_month(&in_range),
        }
    }
}
