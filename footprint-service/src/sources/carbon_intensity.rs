use grid_client::{
    domain::{GenerationRecord, IntensityRecord},
    CarbonIntensityClient,
};
use time::OffsetDateTime;

use super::{GridGenerationProvider, GridIntensityProvider, RetryPolicy};
use crate::pipeline::FootprintError;

/// Grid intensity and generation windows from the Carbon Intensity API.
pub struct CarbonIntensityProvider {
    client: CarbonIntensityClient,
    retry: RetryPolicy,
}

impl CarbonIntensityProvider {
    pub fn new(client: CarbonIntensityClient, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }
}

#[async_trait::async_trait]
impl GridIntensityProvider for CarbonIntensityProvider {
    async fn forward_48h(&self, anchor: OffsetDateTime) -> Result<Vec<IntensityRecord>, FootprintError> {
        Ok(self
            .retry
            .run("intensity_fw48h", || self.client.intensity_fw48h(anchor))
            .await?)
    }
}

#[async_trait::async_trait]
impl GridGenerationProvider for CarbonIntensityProvider {
    async fn past_24h(&self, anchor: OffsetDateTime) -> Result<Vec<GenerationRecord>, FootprintError> {
        Ok(self
            .retry
            .run("generation_pt24h", || self.client.generation_pt24h(anchor))
            .await?)
    }
}
