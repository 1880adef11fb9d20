use serde::Deserialize;
use std::{fs, time::Duration};
use time::{macros::format_description, Date};

use crate::aggregate::MissingIntensityPolicy;
use crate::pipeline::BatchWindow;

/// Meter and reporting period. Dates are inclusive calendar dates.
#[derive(Debug, Clone, Deserialize)]
pub struct MeterConfig {
    pub meter_id: String,
    pub start_date: String,
    pub end_date: String,
    /// Read half-hour readings from this CSV export instead of the Openvolt API.
    #[serde(default)]
    pub csv_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenvoltConfig {
    #[serde(default = "default_openvolt_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CarbonIntensityConfig {
    #[serde(default = "default_carbon_intensity_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

/// Fields left out of a `[batching]` section keep their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchingConfig {
    pub cadence_minutes: i64,
    pub intensity_span: usize,
    pub generation_span: usize,
    pub generation_anchor_shift_hours: i64,
    pub max_in_flight: usize,
    /// Deadline for each metric's fetch phase. `0` disables it.
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregationConfig {
    #[serde(default)]
    pub missing_intensity: MissingIntensityPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub meter: MeterConfig,
    pub openvolt: OpenvoltConfig,
    #[serde(default)]
    pub carbon_intensity: CarbonIntensityConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub batching: BatchingConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    pub metrics: Option<MetricsConfig>,
    pub server: Option<ServerConfig>,
}

fn default_openvolt_base_url() -> String {
    "https://api.openvolt.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENVOLT_API_KEY".to_string()
}

fn default_carbon_intensity_base_url() -> String {
    "https://api.carbonintensity.org.uk".to_string()
}

impl Default for CarbonIntensityConfig {
    fn default() -> Self {
        Self {
            base_url: default_carbon_intensity_base_url(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            cadence_minutes: 30,
            intensity_span: BatchWindow::FORWARD_48H.span,
            generation_span: BatchWindow::PAST_24H.span,
            generation_anchor_shift_hours: 24,
            max_in_flight: 16,
            fetch_timeout_secs: 60,
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl BatchingConfig {
    pub fn cadence(&self) -> time::Duration {
        time::Duration::minutes(self.cadence_minutes)
    }

    pub fn intensity_window(&self) -> BatchWindow {
        BatchWindow {
            span: self.intensity_span,
            anchor_shift: time::Duration::ZERO,
        }
    }

    pub fn generation_window(&self) -> BatchWindow {
        BatchWindow {
            span: self.generation_span,
            anchor_shift: time::Duration::hours(self.generation_anchor_shift_hours),
        }
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        (self.fetch_timeout_secs > 0).then(|| Duration::from_secs(self.fetch_timeout_secs))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cadence_minutes <= 0 {
            anyhow::bail!("batching.cadence_minutes must be positive");
        }
        if self.intensity_span == 0 || self.generation_span == 0 {
            anyhow::bail!("batching spans must be non-zero");
        }
        if self.max_in_flight == 0 {
            anyhow::bail!("batching.max_in_flight must be non-zero");
        }
        Ok(())
    }
}

impl MeterConfig {
    pub fn start(&self) -> anyhow::Result<Date> {
        parse_date(&self.start_date)
    }

    pub fn end(&self) -> anyhow::Result<Date> {
        parse_date(&self.end_date)
    }
}

/// Parses `YYYY-MM-DD`, with or without zero padding (`2023-1-1`).
pub fn parse_date(raw: &str) -> anyhow::Result<Date> {
    let fmt = format_description!("[year]-[month padding:none]-[day padding:none]");
    Date::parse(raw.trim(), &fmt).map_err(|e| anyhow::anyhow!("invalid date '{raw}': {e}"))
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("FOOTPRINT_CONFIG").unwrap_or_else(|_| "footprint-config.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config {path}: {e}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.batching.validate()?;
        cfg.meter.start()?;
        cfg.meter.end()?;
        Ok(cfg)
    }

    /// The Openvolt API key from the configured environment variable.
    pub fn openvolt_api_key(&self) -> anyhow::Result<String> {
        std::env::var(&self.openvolt.api_key_env)
            .map_err(|_| anyhow::anyhow!("environment variable {} is not set", self.openvolt.api_key_env))
    }
}
