use grid_client::domain::IntervalReading;
use time::{macros::datetime, Duration, OffsetDateTime};

use crate::pipeline::FootprintError;

/// Pure validation of a single `IntervalReading`.
///
/// Rules:
/// - consumption must be finite and non-negative.
/// - start_interval must be within a broad sanity window [2000-01-01, 2100-01-01].
pub fn validate_reading(reading: &IntervalReading) -> Result<(), FootprintError> {
    if !reading.consumption.is_finite() || reading.consumption < 0.0 {
        return Err(FootprintError::InvalidSeries(format!(
            "consumption {} at {} must be finite and non-negative",
            reading.consumption, reading.start_interval
        )));
    }

    let min_ts = datetime!(2000-01-01 00:00:00 UTC);
    let max_ts = datetime!(2100-01-01 00:00:00 UTC);

    if reading.start_interval < min_ts || reading.start_interval > max_ts {
        return Err(FootprintError::InvalidSeries(format!(
            "timestamp {} out of allowed range",
            reading.start_interval
        )));
    }

    Ok(())
}

/// Readings whose interval starts inside `[from, to)`, order preserved.
pub fn trim_to_window(series: Vec<IntervalReading>, from: OffsetDateTime, to: OffsetDateTime) -> Vec<IntervalReading> {
    let before = series.len();
    let trimmed: Vec<IntervalReading> = series
        .into_iter()
        .filter(|r| r.start_interval >= from && r.start_interval < to)
        .collect();

    if trimmed.len() != before {
        tracing::debug!(dropped = before - trimmed.len(), "dropped readings outside the requested window");
    }
    trimmed
}

/// Monthly rows that start before `to`.
///
/// The lower bound is not applied: a provider may label a partial first month with
/// the month's first day rather than the requested start date.
pub fn trim_monthly_to_end(months: Vec<IntervalReading>, to: OffsetDateTime) -> Vec<IntervalReading> {
    let before = months.len();
    let kept: Vec<IntervalReading> = months.into_iter().filter(|m| m.start_interval < to).collect();

    if kept.len() != before {
        tracing::debug!(dropped = before - kept.len(), "dropped monthly rows starting after the requested end");
    }
    kept
}

/// Checks the alignment precondition: every reading valid, timestamps strictly
/// increasing by exactly `cadence`.
pub fn validate_series(series: &[IntervalReading], cadence: Duration) -> Result<(), FootprintError> {
    let res = check_series(series, cadence);
    if res.is_err() {
        metrics::counter!("validation_series_rejected_total").increment(1);
    }
    res
}

fn check_series(series: &[IntervalReading], cadence: Duration) -> Result<(), FootprintError> {
    if series.is_empty() {
        return Err(FootprintError::InvalidSeries(
            "metering provider returned no half-hour readings for the period".to_string(),
        ));
    }

    for reading in series {
        validate_reading(reading)?;
    }

    for (i, pair) in series.windows(2).enumerate() {
        let step = pair[1].start_interval - pair[0].start_interval;
        if step == cadence {
            continue;
        }

        let problem = if step == Duration::ZERO {
            "duplicate interval"
        } else if step < Duration::ZERO {
            "out-of-order interval"
        } else if step > cadence {
            "gap"
        } else {
            "off-cadence interval"
        };

        return Err(FootprintError::InvalidSeries(format!(
            "{problem} between samples {i} ({}) and {} ({})",
            pair[0].start_interval,
            i + 1,
            pair[1].start_interval
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::HALF_HOUR;

    fn series(len: usize) -> Vec<IntervalReading> {
        let start = datetime!(2023-01-01 00:00:00 UTC);
        (0..len)
            .map(|i| IntervalReading::new(start + HALF_HOUR * i as i32, 1.0))
            .collect()
    }

    #[test]
    fn reading_validation_accepts_valid_record() {
        let r = IntervalReading::new(datetime!(2024-01-01 00:00:00 UTC), 1.0);
        assert!(validate_reading(&r).is_ok());
    }

    #[test]
    fn reading_validation_rejects_negative_consumption() {
        let r = IntervalReading::new(datetime!(2024-01-01 00:00:00 UTC), -0.1);
        assert!(matches!(validate_reading(&r), Err(FootprintError::InvalidSeries(_))));
    }

    #[test]
    fn reading_validation_rejects_nan_consumption() {
        let r = IntervalReading::new(datetime!(2024-01-01 00:00:00 UTC), f64::NAN);
        assert!(validate_reading(&r).is_err());
    }

    #[test]
    fn reading_validation_rejects_out_of_range_ts() {
        let r = IntervalReading::new(datetime!(1800-01-01 00:00:00 UTC), 1.0);
        assert!(matches!(validate_reading(&r), Err(FootprintError::InvalidSeries(_))));
    }

    #[test]
    fn gapless_series_passes() {
        assert!(validate_series(&series(96), HALF_HOUR).is_ok());
    }

    #[test]
    fn empty_series_is_rejected() {
        assert!(validate_series(&[], HALF_HOUR).is_err());
    }

    #[test]
    fn gap_is_rejected() {
        let mut s = series(10);
        s.remove(4);
        let err = validate_series(&s, HALF_HOUR).unwrap_err();
        assert!(err.to_string().contains("gap between samples 3"));
    }

    #[test]
    fn duplicate_is_rejected() {
        let mut s = series(10);
        s.insert(5, s[5]);
        let err = validate_series(&s, HALF_HOUR).unwrap_err();
        assert!(err.to_string().contains("duplicate interval"));
    }

    #[test]
    fn out_of_order_is_rejected() {
        // 0, 1, 2, 3, 2, 4, ...: the first off-cadence step goes backwards.
        let mut s = series(10);
        s.insert(4, s[2]);
        let err = validate_series(&s, HALF_HOUR).unwrap_err();
        assert!(err.to_string().contains("out-of-order interval between samples 3"));
    }

    #[test]
    fn monthly_trim_drops_rows_from_the_exclusive_end() {
        let months = vec![
            IntervalReading::new(datetime!(2023-01-01 00:00:00 UTC), 1000.0),
            IntervalReading::new(datetime!(2023-02-01 00:00:00 UTC), 30.0),
        ];
        let kept = trim_monthly_to_end(months.clone(), datetime!(2023-02-01 00:00:00 UTC));
        assert_eq!(kept, months[..1].to_vec());
    }

    #[test]
    fn trimming_keeps_half_open_window() {
        let s = series(10);
        let from = s[2].start_interval;
        let to = s[5].start_interval;
        let trimmed = trim_to_window(s.clone(), from, to);
        assert_eq!(trimmed, s[2..5].to_vec());
    }
}
