use grid_client::domain::IntervalReading;
use time::OffsetDateTime;

use super::BatchWindow;

/// One anchor per stride of `window.span` samples: the stride's first timestamp plus
/// `window.anchor_shift`.
///
/// Yields `ceil(series.len() / span)` anchors. The series is assumed sorted and gapless;
/// see `transform::validate_series`.
pub fn plan(series: &[IntervalReading], window: BatchWindow) -> Vec<OffsetDateTime> {
    debug_assert!(window.span > 0, "batch span must be non-zero");

    series
        .chunks(window.span.max(1))
        .map(|stride| stride[0].start_interval + window.anchor_shift)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{locate, HALF_HOUR};
    use proptest::prelude::*;
    use time::{macros::datetime, Duration};

    fn series(len: usize) -> Vec<IntervalReading> {
        let start = datetime!(2023-01-01 00:00:00 UTC);
        (0..len)
            .map(|i| IntervalReading::new(start + HALF_HOUR * i as i32, 1.0))
            .collect()
    }

    #[test]
    fn one_month_needs_fifteen_intensity_and_thirty_generation_batches() {
        let month = series(30 * 48);
        assert_eq!(plan(&month, BatchWindow::FORWARD_48H).len(), 15);
        assert_eq!(plan(&month, BatchWindow::PAST_24H).len(), 30);
    }

    #[test]
    fn anchors_are_stride_starts() {
        let anchors = plan(&series(200), BatchWindow::FORWARD_48H);
        assert_eq!(
            anchors,
            vec![
                datetime!(2023-01-01 00:00:00 UTC),
                datetime!(2023-01-03 00:00:00 UTC),
                datetime!(2023-01-05 00:00:00 UTC),
            ]
        );
    }

    #[test]
    fn generation_anchors_are_shifted_to_window_end() {
        let anchors = plan(&series(49), BatchWindow::PAST_24H);
        assert_eq!(
            anchors,
            vec![datetime!(2023-01-02 00:00:00 UTC), datetime!(2023-01-03 00:00:00 UTC)]
        );
    }

    #[test]
    fn empty_series_needs_no_batches() {
        assert!(plan(&[], BatchWindow::FORWARD_48H).is_empty());
    }

    proptest! {
        #[test]
        fn anchors_cover_every_sample_exactly_once(len in 1usize..2_000, span in 1usize..200) {
            let s = series(len);
            let window = BatchWindow { span, anchor_shift: Duration::ZERO };
            let anchors = plan(&s, window);

            prop_assert_eq!(anchors.len(), len.div_ceil(span));

            let mut seen = vec![vec![false; span]; anchors.len()];
            for i in 0..len {
                let (batch, offset) = locate(i, span);
                prop_assert!(batch < anchors.len());
                prop_assert!(!seen[batch][offset]);
                seen[batch][offset] = true;
                // The anchor of a batch is the timestamp of its offset-0 sample.
                prop_assert_eq!(anchors[batch] + HALF_HOUR * offset as i32, s[i].start_interval);
            }

            let covered = seen.iter().flatten().filter(|v| **v).count();
            prop_assert_eq!(covered, len);
        }
    }
}
