//! Client for the GB Carbon Intensity API (fixed-window endpoints only).

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use time::OffsetDateTime;

use super::{format_api_timestamp, parse_api_timestamp, read_body, ApiError};
use crate::domain::{FuelShare, GenerationRecord, IntensityRecord};

pub struct CarbonIntensityClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: Vec<T>,
}

#[derive(Deserialize)]
struct WireIntensityPeriod {
    from: String,
    to: String,
    intensity: WireIntensity,
}

#[derive(Deserialize)]
struct WireIntensity {
    forecast: Option<f64>,
    actual: Option<f64>,
}

#[derive(Deserialize)]
struct WireGenerationPeriod {
    from: String,
    to: String,
    generationmix: Vec<FuelShare>,
}

impl CarbonIntensityClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Half-hour intensity records for the 48 hours starting at `from`.
    pub async fn intensity_fw48h(&self, from: OffsetDateTime) -> Result<Vec<IntensityRecord>, ApiError> {
        let url = format!("{}/intensity/{}/fw48h", self.base_url, format_api_timestamp(from)?);
        let body = self.get(&url).await?;
        parse_intensity(&url, &body)
    }

    /// Half-hour generation mix records for the 24 hours ending at `to`.
    pub async fn generation_pt24h(&self, to: OffsetDateTime) -> Result<Vec<GenerationRecord>, ApiError> {
        let url = format!("{}/generation/{}/pt24h", self.base_url, format_api_timestamp(to)?);
        let body = self.get(&url).await?;
        parse_generation(&url, &body)
    }

    async fn get(&self, url: &str) -> Result<String, ApiError> {
        tracing::debug!(url, "requesting grid window");

        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;

        read_body(url, response).await
    }
}

fn parse_intensity(url: &str, body: &str) -> Result<Vec<IntensityRecord>, ApiError> {
    let decode = |reason: String| ApiError::Decode {
        url: url.to_string(),
        reason,
    };

    let parsed: DataEnvelope<WireIntensityPeriod> =
        serde_json::from_str(body).map_err(|e| decode(e.to_string()))?;

    parsed
        .data
        .into_iter()
        .map(|p| {
            Ok(IntensityRecord {
                from: parse_api_timestamp(&p.from).map_err(decode)?,
                to: parse_api_timestamp(&p.to).map_err(decode)?,
                actual: p.intensity.actual,
                forecast: p.intensity.forecast,
            })
        })
        .collect()
}

fn parse_generation(url: &str, body: &str) -> Result<Vec<GenerationRecord>, ApiError> {
    let decode = |reason: String| ApiError::Decode {
        url: url.to_string(),
        reason,
    };

    let parsed: DataEnvelope<WireGenerationPeriod> =
        serde_json::from_str(body).map_err(|e| decode(e.to_string()))?;

    parsed
        .data
        .into_iter()
        .map(|p| {
            Ok(GenerationRecord {
                from: parse_api_timestamp(&p.from).map_err(decode)?,
                to: parse_api_timestamp(&p.to).map_err(decode)?,
                mix: p.generationmix,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Fuel;
    use time::macros::datetime;

    #[test]
    fn intensity_keeps_null_actuals() {
        let body = r#"{"data":[
            {"from":"2023-01-01T00:00Z","to":"2023-01-01T00:30Z","intensity":{"forecast":180,"actual":175,"index":"moderate"}},
            {"from":"2023-01-01T00:30Z","to":"2023-01-01T01:00Z","intensity":{"forecast":182,"actual":null,"index":"moderate"}}
        ]}"#;

        let records = parse_intensity("test", body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].from, datetime!(2023-01-01 00:00:00 UTC));
        assert_eq!(records[0].actual, Some(175.0));
        assert_eq!(records[1].actual, None);
        assert_eq!(records[1].forecast, Some(182.0));
    }

    #[test]
    fn generation_reads_fuel_shares() {
        let body = r#"{"data":[
            {"from":"2023-01-01T00:00Z","to":"2023-01-01T00:30Z","generationmix":[
                {"fuel":"biomass","perc":5.1},{"fuel":"gas","perc":40.2},{"fuel":"wind","perc":54.7}
            ]}
        ]}"#;

        let records = parse_generation("test", body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].mix.len(), 3);
        assert_eq!(records[0].mix[1].fuel, Fuel::Gas);
        assert_eq!(records[0].mix[2].perc, 54.7);
    }

    #[test]
    fn generation_without_mix_is_a_decode_error() {
        let body = r#"{"data":[{"from":"2023-01-01T00:00Z","to":"2023-01-01T00:30Z"}]}"#;
        assert!(parse_generation("test", body).unwrap_err().is_decode());
    }
}
