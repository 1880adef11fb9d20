//! Entry points for the three meter metrics.
//!
//! Each metric is all-or-nothing: a failure while fetching, aligning or folding one
//! metric is reported against that metric only.

use std::{future::Future, sync::Arc, time::Instant};

use grid_client::{
    domain::{Granularity, IntervalReading},
    CarbonIntensityClient, OpenvoltClient,
};
use time::{Date, OffsetDateTime, Time};

use crate::aggregate::{self, Co2Summary, FuelMix, MissingIntensityPolicy};
use crate::config::{AppConfig, BatchingConfig};
use crate::pipeline::{align_auxiliary, FootprintError};
use crate::sources::{
    CarbonIntensityProvider, GridGenerationProvider, GridIntensityProvider, IntervalCsvFileSource,
    MeteringProvider, OpenvoltMeteringProvider, RetryPolicy,
};
use crate::transform;

/// One meter over an inclusive calendar date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootprintRequest {
    pub meter_id: String,
    pub start_date: Date,
    pub end_date: Date,
}

impl FootprintRequest {
    pub fn new(meter_id: impl Into<String>, start_date: Date, end_date: Date) -> Result<Self, FootprintError> {
        let meter_id = meter_id.into();
        if meter_id.trim().is_empty() {
            return Err(FootprintError::InvalidRequest("meter_id must not be empty".to_string()));
        }
        if end_date < start_date {
            return Err(FootprintError::InvalidRequest(format!(
                "end date {end_date} is before start date {start_date}"
            )));
        }
        if end_date.next_day().is_none() {
            return Err(FootprintError::InvalidRequest(format!("end date {end_date} is out of range")));
        }
        Ok(Self {
            meter_id,
            start_date,
            end_date,
        })
    }

    /// Day after `end_date`: the provider's exclusive upper bound.
    fn end_exclusive(&self) -> Date {
        // Checked in `new`.
        self.end_date.next_day().unwrap_or(self.end_date)
    }

    /// `[start 00:00Z, end+1 00:00Z)`.
    pub fn window(&self) -> (OffsetDateTime, OffsetDateTime) {
        (
            self.start_date.with_time(Time::MIDNIGHT).assume_utc(),
            self.end_exclusive().with_time(Time::MIDNIGHT).assume_utc(),
        )
    }
}

/// Outcome of one metric plus the wall time it took.
#[derive(Debug, Clone)]
pub struct MetricResult<T> {
    pub outcome: Result<T, FootprintError>,
    pub elapsed: std::time::Duration,
}

#[derive(Debug, Clone)]
pub struct FootprintReport {
    pub request: FootprintRequest,
    pub monthly_kwh: MetricResult<f64>,
    pub co2: MetricResult<Co2Summary>,
    pub fuel_mix: MetricResult<FuelMix>,
}

#[derive(Clone)]
pub struct Providers {
    pub metering: Arc<dyn MeteringProvider>,
    pub intensity: Arc<dyn GridIntensityProvider>,
    pub generation: Arc<dyn GridGenerationProvider>,
}

pub struct FootprintEngine {
    providers: Providers,
    batching: BatchingConfig,
    missing_intensity: MissingIntensityPolicy,
}

impl FootprintEngine {
    pub fn new(providers: Providers, batching: BatchingConfig, missing_intensity: MissingIntensityPolicy) -> Self {
        Self {
            providers,
            batching,
            missing_intensity,
        }
    }

    /// Wires the HTTP (or CSV) providers described by `cfg`.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let retry = RetryPolicy::new(cfg.http.max_retries, cfg.http.retry_backoff());
        let timeout = cfg.http.request_timeout();

        let metering: Arc<dyn MeteringProvider> = match &cfg.meter.csv_path {
            Some(path) => {
                tracing::info!(path = %path, "reading consumption from CSV export");
                Arc::new(IntervalCsvFileSource::new(path))
            }
            None => {
                let client = OpenvoltClient::new(&cfg.openvolt.base_url, cfg.openvolt_api_key()?, timeout)?;
                Arc::new(OpenvoltMeteringProvider::new(client, retry))
            }
        };

        let grid = Arc::new(CarbonIntensityProvider::new(
            CarbonIntensityClient::new(&cfg.carbon_intensity.base_url, timeout)?,
            retry,
        ));

        let providers = Providers {
            metering,
            intensity: grid.clone(),
            generation: grid,
        };

        Ok(Self::new(providers, cfg.batching.clone(), cfg.aggregation.missing_intensity))
    }

    /// Total consumption (kWh) from the provider's monthly aggregates.
    pub async fn monthly_consumption(&self, req: &FootprintRequest) -> Result<f64, FootprintError> {
        let months = self
            .providers
            .metering
            .interval(&req.meter_id, Granularity::Month, req.start_date, req.end_exclusive())
            .await?;
        let (_, to) = req.window();
        let months = transform::trim_monthly_to_end(months, to);

        if months.is_empty() {
            return Err(FootprintError::InvalidSeries(
                "metering provider returned no monthly readings for the period".to_string(),
            ));
        }
        for m in &months {
            transform::validate_reading(m)?;
        }

        Ok(months.iter().map(|m| m.consumption).sum())
    }

    /// Total CO2 (kg) of the half-hour consumption at the grid's actual intensity.
    pub async fn co2_emissions(&self, req: &FootprintRequest) -> Result<Co2Summary, FootprintError> {
        let series = self.half_hourly_series(req).await?;
        self.co2_for_series(&series).await
    }

    /// Consumption-weighted generation mix (fuel → %).
    pub async fn fuel_mix(&self, req: &FootprintRequest) -> Result<FuelMix, FootprintError> {
        let series = self.half_hourly_series(req).await?;
        self.fuel_mix_for_series(&series).await
    }

    /// All three metrics, concurrently. The half-hour series is fetched once and shared.
    pub async fn report(&self, req: &FootprintRequest) -> FootprintReport {
        tracing::info!(meter_id = %req.meter_id, start = %req.start_date, end = %req.end_date, "computing footprint");

        let monthly = timed("monthly_kwh", self.monthly_consumption(req));
        let weighted = async {
            let started = Instant::now();
            match self.half_hourly_series(req).await {
                Ok(series) => {
                    let series_elapsed = started.elapsed();
                    let (mut co2, mut mix) = tokio::join!(
                        timed("co2", self.co2_for_series(&series)),
                        timed("fuel_mix", self.fuel_mix_for_series(&series)),
                    );
                    co2.elapsed += series_elapsed;
                    mix.elapsed += series_elapsed;
                    (co2, mix)
                }
                Err(e) => {
                    let elapsed = started.elapsed();
                    for metric in ["co2", "fuel_mix"] {
                        record_failure(metric, &e);
                    }
                    (
                        MetricResult {
                            outcome: Err(e.clone()),
                            elapsed,
                        },
                        MetricResult {
                            outcome: Err(e),
                            elapsed,
                        },
                    )
                }
            }
        };

        let (monthly_kwh, (co2, fuel_mix)) = tokio::join!(monthly, weighted);

        FootprintReport {
            request: req.clone(),
            monthly_kwh,
            co2,
            fuel_mix,
        }
    }

    async fn half_hourly_series(&self, req: &FootprintRequest) -> Result<Vec<IntervalReading>, FootprintError> {
        let raw = self
            .providers
            .metering
            .interval(&req.meter_id, Granularity::HalfHour, req.start_date, req.end_exclusive())
            .await?;

        let (from, to) = req.window();
        let series = transform::trim_to_window(raw, from, to);
        transform::validate_series(&series, self.batching.cadence())?;

        tracing::debug!(samples = series.len(), "half-hour series ready");
        Ok(series)
    }

    async fn co2_for_series(&self, series: &[IntervalReading]) -> Result<Co2Summary, FootprintError> {
        let intensity = &self.providers.intensity;
        let aligned = self
            .with_deadline(
                "intensity",
                align_auxiliary(
                    "intensity",
                    series,
                    self.batching.intensity_window(),
                    self.batching.max_in_flight,
                    |anchor| intensity.forward_48h(anchor),
                ),
            )
            .await?;

        aggregate::co2_emissions(series, &aligned, self.missing_intensity)
    }

    async fn fuel_mix_for_series(&self, series: &[IntervalReading]) -> Result<FuelMix, FootprintError> {
        let generation = &self.providers.generation;
        let aligned = self
            .with_deadline(
                "generation",
                align_auxiliary(
                    "generation",
                    series,
                    self.batching.generation_window(),
                    self.batching.max_in_flight,
                    |anchor| generation.past_24h(anchor),
                ),
            )
            .await?;

        aggregate::fuel_mix(series, &aligned)
    }

    async fn with_deadline<T>(
        &self,
        phase: &'static str,
        fut: impl Future<Output = Result<T, FootprintError>>,
    ) -> Result<T, FootprintError> {
        match self.batching.fetch_timeout() {
            Some(deadline) => tokio::time::timeout(deadline, fut).await.map_err(|_| {
                FootprintError::Timeout(format!("{phase} fetch phase exceeded {}s", deadline.as_secs_f64()))
            })?,
            None => fut.await,
        }
    }
}

async fn timed<T>(metric: &'static str, fut: impl Future<Output = Result<T, FootprintError>>) -> MetricResult<T> {
    let started = Instant::now();
    let outcome = fut.await;
    if let Err(e) = &outcome {
        record_failure(metric, e);
    }
    MetricResult {
        outcome,
        elapsed: started.elapsed(),
    }
}

fn record_failure(metric: &'static str, e: &FootprintError) {
    metrics::counter!("footprint_metric_failures_total", "metric" => metric, "kind" => e.kind()).increment(1);
    tracing::error!(metric, kind = e.kind(), error = %e, "metric computation failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn request_window_covers_whole_end_day() {
        let req = FootprintRequest::new("m", date!(2023-01-01), date!(2023-01-31)).unwrap();
        assert_eq!(
            req.window(),
            (datetime!(2023-01-01 00:00:00 UTC), datetime!(2023-02-01 00:00:00 UTC))
        );
    }

    #[test]
    fn request_rejects_reversed_dates_and_blank_meter() {
        assert!(matches!(
            FootprintRequest::new("m", date!(2023-02-01), date!(2023-01-01)),
            Err(FootprintError::InvalidRequest(_))
        ));
        assert!(FootprintRequest::new("  ", date!(2023-01-01), date!(2023-01-01)).is_err());
    }
}
