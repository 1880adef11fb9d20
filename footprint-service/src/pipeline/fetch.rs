use std::future::Future;

use futures::{stream, StreamExt, TryStreamExt};
use time::OffsetDateTime;

use super::FootprintError;

/// Fetch one batch per anchor with at most `max_in_flight` requests outstanding.
///
/// Results come back in anchor order regardless of completion order. The first failing
/// anchor fails the whole call.
pub async fn fetch_batches<R, F, Fut>(
    label: &'static str,
    anchors: &[OffsetDateTime],
    max_in_flight: usize,
    fetch: F,
) -> Result<Vec<Vec<R>>, FootprintError>
where
    F: Fn(OffsetDateTime) -> Fut,
    Fut: Future<Output = Result<Vec<R>, FootprintError>>,
{
    stream::iter(anchors.iter().copied().enumerate())
        .map(|(batch, anchor)| {
            let request = fetch(anchor);
            async move {
                match request.await {
                    Ok(records) => {
                        metrics::counter!("grid_batches_fetched_total", "series" => label).increment(1);
                        tracing::trace!(series = label, batch, records = records.len(), "batch fetched");
                        Ok(records)
                    }
                    Err(e) => {
                        metrics::counter!("grid_fetch_errors_total", "series" => label).increment(1);
                        tracing::error!(series = label, batch, anchor = %anchor, error = %e, "batch fetch failed");
                        Err(e)
                    }
                }
            }
        })
        .buffered(max_in_flight.max(1))
        .try_collect()
        .await
}
