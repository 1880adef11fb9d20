use time::OffsetDateTime;

/// One metered interval: consumption (kWh) over the interval starting at `start_interval`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalReading {
    pub start_interval: OffsetDateTime,
    pub consumption: f64,
}

impl IntervalReading {
    pub fn new(start_interval: OffsetDateTime, consumption: f64) -> Self {
        Self {
            start_interval,
            consumption,
        }
    }
}

/// Granularity at which the metering provider aggregates readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    HalfHour,
    Month,
}

impl Granularity {
    pub fn as_query_param(self) -> &'static str {
        match self {
            Granularity::HalfHour => "hh",
            Granularity::Month => "month",
        }
    }
}
