pub mod carbon_intensity;
pub mod openvolt;

use time::{format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime, UtcOffset};

pub use carbon_intensity::CarbonIntensityClient;
pub use openvolt::OpenvoltClient;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("transport error calling {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("unexpected response body from {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error("client setup failed: {0}")]
    Setup(String),
}

impl ApiError {
    /// True for failures where the provider answered but the body was unusable.
    pub fn is_decode(&self) -> bool {
        matches!(self, ApiError::Decode { .. })
    }

    /// Transport failures, 5xx and 429 may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport { .. } => true,
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            ApiError::Decode { .. } | ApiError::Setup(_) => false,
        }
    }
}

/// Formats a timestamp the way the Carbon Intensity API expects it in paths: `YYYY-MM-DDThh:mmZ`.
pub fn format_api_timestamp(ts: OffsetDateTime) -> Result<String, ApiError> {
    let fmt = format_description!("[year]-[month]-[day]T[hour]:[minute]Z");
    ts.to_offset(UtcOffset::UTC)
        .format(&fmt)
        .map_err(|e| ApiError::Setup(format!("cannot format timestamp {ts}: {e}")))
}

/// Parses provider timestamps. Accepts RFC 3339 and the minute-precision `YYYY-MM-DDThh:mmZ` form.
pub fn parse_api_timestamp(raw: &str) -> Result<OffsetDateTime, String> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(ts.to_offset(UtcOffset::UTC));
    }

    let minute_fmt = format_description!("[year]-[month]-[day]T[hour]:[minute]Z");
    time::PrimitiveDateTime::parse(raw, &minute_fmt)
        .map(|dt| dt.assume_utc())
        .map_err(|e| format!("invalid timestamp '{raw}': {e}"))
}

pub(crate) async fn read_body(url: &str, response: reqwest::Response) -> Result<String, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|source| ApiError::Transport {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn formats_minute_precision_utc() {
        let ts = datetime!(2023-01-03 00:30:00 UTC);
        assert_eq!(format_api_timestamp(ts).unwrap(), "2023-01-03T00:30Z");
    }

    #[test]
    fn formats_non_utc_offsets_in_utc() {
        let ts = datetime!(2023-01-03 01:30:00 +01:00);
        assert_eq!(format_api_timestamp(ts).unwrap(), "2023-01-03T00:30Z");
    }

    #[test]
    fn parses_both_timestamp_forms() {
        let expected = datetime!(2023-01-01 00:30:00 UTC);
        assert_eq!(parse_api_timestamp("2023-01-01T00:30Z").unwrap(), expected);
        assert_eq!(parse_api_timestamp("2023-01-01T00:30:00.000Z").unwrap(), expected);
        assert_eq!(parse_api_timestamp("2023-01-01T00:30:00+00:00").unwrap(), expected);
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        let status = |status| ApiError::Status {
            url: "u".to_string(),
            status,
        };
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!ApiError::Decode {
            url: "u".to_string(),
            reason: "x".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(parse_api_timestamp("yesterday").is_err());
    }
}
