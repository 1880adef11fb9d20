//! Client for the Openvolt interval-data API.
//!
//! The API key is sent in the `x-api-key` header and is never logged.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use time::{macros::format_description, Date};

use super::{parse_api_timestamp, read_body, ApiError};
use crate::domain::{Granularity, IntervalReading};

pub struct OpenvoltClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct IntervalDataResponse {
    data: Vec<WireReading>,
}

#[derive(Deserialize)]
struct WireReading {
    start_interval: String,
    consumption: WireNumber,
}

/// Openvolt reports consumption as a JSON string in some responses and as a number in others.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireNumber {
    Number(f64),
    Text(String),
}

impl WireNumber {
    fn to_f64(&self) -> Result<f64, String> {
        match self {
            WireNumber::Number(n) => Ok(*n),
            WireNumber::Text(s) => s
                .trim()
                .parse()
                .map_err(|e| format!("invalid consumption '{s}': {e}")),
        }
    }
}

impl OpenvoltClient {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Fetch interval readings for one meter over `[start_date, end_date)`, in provider order.
    pub async fn interval_data(
        &self,
        meter_id: &str,
        granularity: Granularity,
        start_date: Date,
        end_date: Date,
    ) -> Result<Vec<IntervalReading>, ApiError> {
        let url = format!("{}/interval-data", self.base_url);
        let date_fmt = format_description!("[year]-[month]-[day]");
        let start = start_date
            .format(&date_fmt)
            .map_err(|e| ApiError::Setup(e.to_string()))?;
        let end = end_date
            .format(&date_fmt)
            .map_err(|e| ApiError::Setup(e.to_string()))?;

        tracing::debug!(meter_id, granularity = granularity.as_query_param(), %start, %end, "requesting interval data");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("meter_id", meter_id),
                ("granularity", granularity.as_query_param()),
                ("start_date", start.as_str()),
                ("end_date", end.as_str()),
            ])
            .header("accept", "application/json")
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;

        let body = read_body(&url, response).await?;
        parse_interval_data(&url, &body)
    }
}

fn parse_interval_data(url: &str, body: &str) -> Result<Vec<IntervalReading>, ApiError> {
    let decode = |reason: String| ApiError::Decode {
        url: url.to_string(),
        reason,
    };

    let parsed: IntervalDataResponse = serde_json::from_str(body).map_err(|e| decode(e.to_string()))?;

    parsed
        .data
        .iter()
        .map(|r| {
            let start_interval = parse_api_timestamp(&r.start_interval).map_err(decode)?;
            let consumption = r.consumption.to_f64().map_err(decode)?;
            Ok(IntervalReading::new(start_interval, consumption))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parses_string_and_numeric_consumption() {
        let body = r#"{
            "startInterval": "2023-01-01T00:00:00.000Z",
            "granularity": "hh",
            "data": [
                {"start_interval": "2023-01-01T00:00:00.000Z", "meter_id": "m", "consumption": "12.5", "consumption_units": "kWh"},
                {"start_interval": "2023-01-01T00:30:00.000Z", "meter_id": "m", "consumption": 7, "consumption_units": "kWh"}
            ]
        }"#;

        let readings = parse_interval_data("test", body).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].start_interval, datetime!(2023-01-01 00:00:00 UTC));
        assert_eq!(readings[0].consumption, 12.5);
        assert_eq!(readings[1].consumption, 7.0);
    }

    #[test]
    fn rejects_non_numeric_consumption() {
        let body = r#"{"data": [{"start_interval": "2023-01-01T00:00:00.000Z", "consumption": "n/a"}]}"#;
        let err = parse_interval_data("test", body).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn rejects_missing_data_array() {
        let err = parse_interval_data("test", r#"{"message": "unauthorised"}"#).unwrap_err();
        assert!(err.is_decode());
    }
}
