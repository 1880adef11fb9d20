use grid_client::domain::{GenerationRecord, IntensityRecord, IntervalReading};
use time::{Duration, OffsetDateTime};

use super::FootprintError;

/// `(batch index, offset within batch)` of sample `index`.
pub fn locate(index: usize, span: usize) -> (usize, usize) {
    (index / span, index % span)
}

/// Auxiliary records that carry the start of the period they describe.
pub trait TimedRecord {
    fn period_start(&self) -> OffsetDateTime;
}

impl TimedRecord for IntensityRecord {
    fn period_start(&self) -> OffsetDateTime {
        self.from
    }
}

impl TimedRecord for GenerationRecord {
    fn period_start(&self) -> OffsetDateTime {
        self.from
    }
}

/// Fetched batches in anchor order, addressable by consumption sample index.
#[derive(Debug, Clone)]
pub struct AlignedBatches<R> {
    span: usize,
    batches: Vec<Vec<R>>,
}

impl<R> AlignedBatches<R> {
    pub fn new(span: usize, batches: Vec<Vec<R>>) -> Self {
        Self { span, batches }
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// The record matched to consumption sample `index`.
    pub fn record(&self, index: usize) -> Result<&R, FootprintError> {
        let (batch, offset) = locate(index, self.span);

        let records = self.batches.get(batch).ok_or_else(|| {
            FootprintError::Alignment(format!(
                "sample {index} maps to batch {batch} but only {} batches were fetched",
                self.batches.len()
            ))
        })?;

        records.get(offset).ok_or_else(|| {
            FootprintError::Alignment(format!(
                "sample {index} maps to offset {offset} of batch {batch} which holds {} records",
                records.len()
            ))
        })
    }

    /// Fails unless every sample in `[0, len)` resolves to a record.
    pub fn ensure_covers(&self, len: usize) -> Result<(), FootprintError> {
        if len == 0 {
            return Ok(());
        }

        // Full batches are required for all but the last one; the last needs one record
        // per remaining sample.
        let (last_batch, last_offset) = locate(len - 1, self.span);
        for batch in 0..=last_batch {
            let needed = if batch == last_batch { last_offset + 1 } else { self.span };
            let index = batch * self.span + needed - 1;
            self.record(index)?;
        }
        Ok(())
    }
}

impl<R: TimedRecord> AlignedBatches<R> {
    /// Logs batches whose first period does not start where the plan expected.
    ///
    /// Only the timestamp drift is reported; alignment stays positional.
    pub fn warn_on_start_mismatch(&self, label: &'static str, anchors: &[OffsetDateTime], anchor_shift: Duration) {
        for (batch, (records, anchor)) in self.batches.iter().zip(anchors).enumerate() {
            let expected = *anchor - anchor_shift;
            if let Some(first) = records.first() {
                if first.period_start() != expected {
                    metrics::counter!("grid_batch_start_mismatch_total", "series" => label).increment(1);
                    tracing::warn!(
                        series = label,
                        batch,
                        expected = %expected,
                        actual = %first.period_start(),
                        "auxiliary batch does not start at its planned period"
                    );
                }
            }
        }
    }
}

/// Folds every `(reading, matched record)` pair of `series` into `acc`.
///
/// Sample `i` is matched to `aux.record(i)`; the first error from `step` or from
/// alignment aborts the fold.
pub fn fold_aligned<R, A, F>(
    series: &[IntervalReading],
    aux: &AlignedBatches<R>,
    mut acc: A,
    mut step: F,
) -> Result<A, FootprintError>
where
    F: FnMut(&mut A, &IntervalReading, &R) -> Result<(), FootprintError>,
{
    for (i, reading) in series.iter().enumerate() {
        let record = aux.record(i)?;
        step(&mut acc, reading, record)?;
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn sample_150_of_a_week_lands_in_second_batch() {
        assert_eq!(locate(150, 96), (1, 54));
        assert_eq!(locate(287, 96), (2, 95));
        assert_eq!(locate(96, 96), (1, 0));
        assert_eq!(locate(47, 48), (0, 47));
    }

    #[test]
    fn record_reports_missing_batch() {
        let aligned = AlignedBatches::new(2, vec![vec![1, 2]]);
        assert_eq!(aligned.record(1), Ok(&2));
        assert!(matches!(aligned.record(2), Err(FootprintError::Alignment(_))));
    }

    #[test]
    fn ensure_covers_accepts_short_last_batch() {
        let aligned = AlignedBatches::new(3, vec![vec![0, 1, 2], vec![3]]);
        assert!(aligned.ensure_covers(4).is_ok());
        assert!(aligned.ensure_covers(5).is_err());
    }

    #[test]
    fn ensure_covers_rejects_short_middle_batch() {
        let aligned = AlignedBatches::new(3, vec![vec![0, 1], vec![3, 4, 5]]);
        assert!(matches!(aligned.ensure_covers(6), Err(FootprintError::Alignment(_))));
    }

    #[test]
    fn fold_pairs_readings_with_matching_records() {
        let start = datetime!(2023-01-01 00:00:00 UTC);
        let series: Vec<IntervalReading> = (0..5)
            .map(|i| IntervalReading::new(start + crate::pipeline::HALF_HOUR * i, i as f64))
            .collect();
        let aligned = AlignedBatches::new(2, vec![vec![10.0, 20.0], vec![30.0, 40.0], vec![50.0]]);

        let total = fold_aligned(&series, &aligned, 0.0, |acc, reading, factor| {
            *acc += reading.consumption * factor;
            Ok(())
        })
        .unwrap();

        // 0*10 + 1*20 + 2*30 + 3*40 + 4*50
        assert_eq!(total, 400.0);
    }
}
