use time::OffsetDateTime;

/// A half-hour grid carbon intensity sample, in gCO2/kWh.
///
/// `actual` is null for periods the grid operator has not yet settled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityRecord {
    pub from: OffsetDateTime,
    pub to: OffsetDateTime,
    pub actual: Option<f64>,
    pub forecast: Option<f64>,
}
