use grid_client::{
    domain::{Granularity, IntervalReading},
    OpenvoltClient,
};
use time::Date;

use super::{MeteringProvider, RetryPolicy};
use crate::pipeline::FootprintError;

/// Metering provider backed by the Openvolt interval-data API.
pub struct OpenvoltMeteringProvider {
    client: OpenvoltClient,
    retry: RetryPolicy,
}

impl OpenvoltMeteringProvider {
    pub fn new(client: OpenvoltClient, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }
}

#[async_trait::async_trait]
impl MeteringProvider for OpenvoltMeteringProvider {
    async fn interval(
        &self,
        meter_id: &str,
        granularity: Granularity,
        start_date: Date,
        end_date: Date,
    ) -> Result<Vec<IntervalReading>, FootprintError> {
        let readings = self
            .retry
            .run("openvolt_interval_data", || {
                self.client.interval_data(meter_id, granularity, start_date, end_date)
            })
            .await?;

        metrics::counter!("meter_readings_fetched_total", "granularity" => granularity.as_query_param())
            .increment(readings.len() as u64);
        Ok(readings)
    }
}
