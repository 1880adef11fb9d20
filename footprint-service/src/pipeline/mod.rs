//! Batched auxiliary-series alignment.
//!
//! A fine-grained consumption series is matched against an auxiliary series that can
//! only be fetched in fixed windows of `span` consecutive samples. [`plan`] picks one
//! anchor per window, [`fetch_batches`] retrieves the windows concurrently while keeping
//! anchor order, and [`AlignedBatches`] resolves sample `i` to record `i % span` of
//! batch `i / span`.

pub mod align;
pub mod fetch;
pub mod planner;

use std::future::Future;

use grid_client::{domain::IntervalReading, ApiError};
use time::{Duration, OffsetDateTime};

pub use align::{fold_aligned, locate, AlignedBatches, TimedRecord};
pub use fetch::fetch_batches;
pub use planner::plan;

/// Metering cadence of the half-hour series.
pub const HALF_HOUR: Duration = Duration::minutes(30);

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FootprintError {
    #[error("fetch error: {0}")]
    Fetch(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("alignment error: {0}")]
    Alignment(String),
    #[error("missing data: {0}")]
    MissingData(String),
    #[error("invalid series: {0}")]
    InvalidSeries(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("timed out: {0}")]
    Timeout(String),
}

impl FootprintError {
    pub fn kind(&self) -> &'static str {
        match self {
            FootprintError::Fetch(_) => "fetch",
            FootprintError::Parse(_) => "parse",
            FootprintError::Alignment(_) => "alignment",
            FootprintError::MissingData(_) => "missing_data",
            FootprintError::InvalidSeries(_) => "invalid_series",
            FootprintError::InvalidRequest(_) => "invalid_request",
            FootprintError::Timeout(_) => "timeout",
        }
    }
}

impl From<ApiError> for FootprintError {
    fn from(e: ApiError) -> Self {
        if e.is_decode() {
            FootprintError::Parse(e.to_string())
        } else {
            FootprintError::Fetch(e.to_string())
        }
    }
}

/// Shape of one fixed-window auxiliary endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchWindow {
    /// Number of consecutive samples covered by one fetch.
    pub span: usize,
    /// Offset added to a stride's first timestamp to obtain the request anchor.
    pub anchor_shift: Duration,
}

impl BatchWindow {
    /// Forward-looking 48h intensity window at half-hour cadence.
    pub const FORWARD_48H: BatchWindow = BatchWindow {
        span: 96,
        anchor_shift: Duration::ZERO,
    };

    /// Trailing 24h generation window; anchored at the window's end.
    pub const PAST_24H: BatchWindow = BatchWindow {
        span: 48,
        anchor_shift: Duration::hours(24),
    };
}

/// Plan, fetch and align one auxiliary series against `series`.
///
/// `label` names the series in logs and metrics.
pub async fn align_auxiliary<R, F, Fut>(
    label: &'static str,
    series: &[IntervalReading],
    window: BatchWindow,
    max_in_flight: usize,
    fetch: F,
) -> Result<AlignedBatches<R>, FootprintError>
where
    R: TimedRecord,
    F: Fn(OffsetDateTime) -> Fut,
    Fut: Future<Output = Result<Vec<R>, FootprintError>>,
{
    let anchors = plan(series, window);
    tracing::debug!(series = label, anchors = anchors.len(), span = window.span, "planned auxiliary batches");

    let started = std::time::Instant::now();
    let batches = fetch_batches(label, &anchors, max_in_flight, fetch).await?;
    metrics::histogram!("grid_fetch_phase_seconds", "series" => label).record(started.elapsed().as_secs_f64());

    let aligned = AlignedBatches::new(window.span, batches);
    aligned.warn_on_start_mismatch(label, &anchors, window.anchor_shift);
    aligned.ensure_covers(series.len())?;
    Ok(aligned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_client::domain::IntensityRecord;
    use time::macros::datetime;

    fn series(len: usize) -> Vec<IntervalReading> {
        let start = datetime!(2023-01-01 00:00:00 UTC);
        (0..len)
            .map(|i| IntervalReading::new(start + HALF_HOUR * i as i32, 1.0))
            .collect()
    }

    fn intensity_batch(anchor: OffsetDateTime, len: usize) -> Vec<IntensityRecord> {
        (0..len)
            .map(|i| IntensityRecord {
                from: anchor + HALF_HOUR * i as i32,
                to: anchor + HALF_HOUR * (i as i32 + 1),
                actual: Some(i as f64),
                forecast: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn aligns_each_sample_to_its_own_period() {
        let s = series(200);
        let aligned = align_auxiliary("intensity", &s, BatchWindow::FORWARD_48H, 4, |anchor| async move {
            Ok(intensity_batch(anchor, 96))
        })
        .await
        .unwrap();

        assert_eq!(aligned.batch_count(), 3);
        for (i, reading) in s.iter().enumerate() {
            assert_eq!(aligned.record(i).unwrap().from, reading.start_interval);
        }
    }

    #[tokio::test]
    async fn short_final_batch_is_an_alignment_error() {
        let s = series(100);
        let err = align_auxiliary("intensity", &s, BatchWindow::FORWARD_48H, 4, |anchor| async move {
            let len = if anchor == datetime!(2023-01-01 00:00:00 UTC) { 96 } else { 2 };
            Ok(intensity_batch(anchor, len))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, FootprintError::Alignment(_)));
    }

    #[tokio::test]
    async fn any_failed_batch_fails_the_series() {
        let s = series(300);
        let err = align_auxiliary::<IntensityRecord, _, _>("intensity", &s, BatchWindow::FORWARD_48H, 4, |anchor| async move {
            if anchor == datetime!(2023-01-03 00:00:00 UTC) {
                Err(FootprintError::Fetch("status 502".to_string()))
            } else {
                Ok(intensity_batch(anchor, 96))
            }
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), "fetch");
    }

    #[test]
    fn api_decode_errors_become_parse_errors() {
        let e = ApiError::Decode {
            url: "u".to_string(),
            reason: "bad".to_string(),
        };
        assert_eq!(FootprintError::from(e).kind(), "parse");

        let e = ApiError::Status {
            url: "u".to_string(),
            status: 500,
        };
        assert_eq!(FootprintError::from(e).kind(), "fetch");
    }
}
