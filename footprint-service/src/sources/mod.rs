//! Collaborators that supply the consumption series and the grid windows.

pub mod carbon_intensity;
pub mod interval_csv_file;
pub mod openvolt;
pub mod retry;

use grid_client::domain::{GenerationRecord, Granularity, IntensityRecord, IntervalReading};
use time::{Date, OffsetDateTime};

use crate::pipeline::FootprintError;

pub use carbon_intensity::CarbonIntensityProvider;
pub use interval_csv_file::IntervalCsvFileSource;
pub use openvolt::OpenvoltMeteringProvider;
pub use retry::RetryPolicy;

#[async_trait::async_trait]
pub trait MeteringProvider: Send + Sync {
    /// Readings for `meter_id` over `[start_date, end_date)`.
    async fn interval(
        &self,
        meter_id: &str,
        granularity: Granularity,
        start_date: Date,
        end_date: Date,
    ) -> Result<Vec<IntervalReading>, FootprintError>;
}

#[async_trait::async_trait]
pub trait GridIntensityProvider: Send + Sync {
    /// Half-hour intensity records for the 48 hours starting at `anchor`.
    async fn forward_48h(&self, anchor: OffsetDateTime) -> Result<Vec<IntensityRecord>, FootprintError>;
}

#[async_trait::async_trait]
pub trait GridGenerationProvider: Send + Sync {
    /// Half-hour generation mix records for the 24 hours ending at `anchor`.
    async fn past_24h(&self, anchor: OffsetDateTime) -> Result<Vec<GenerationRecord>, FootprintError>;
}
