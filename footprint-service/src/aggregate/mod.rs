//! Weighted reductions over aligned (reading, grid record) pairs.

use std::collections::BTreeMap;

use grid_client::domain::{Fuel, GenerationRecord, IntensityRecord, IntervalReading};
use serde::{Deserialize, Serialize};

use crate::pipeline::{fold_aligned, AlignedBatches, FootprintError};

/// Intensity is reported in gCO2/kWh; totals are reported in kg.
pub const GRAMS_PER_KILOGRAM: f64 = 1000.0;

/// What to do with a sample whose matched `intensity.actual` is null.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingIntensityPolicy {
    /// Fail the CO2 metric with `MissingData`.
    #[default]
    Abort,
    /// Leave the sample out of the total and count it in `Co2Summary::skipped`.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Co2Summary {
    pub total_kg: f64,
    /// Samples that contributed to the total.
    pub samples: usize,
    /// Samples left out under [`MissingIntensityPolicy::Skip`].
    pub skipped: usize,
}

#[derive(Default)]
struct Co2Tally {
    grams: f64,
    samples: usize,
    skipped: usize,
}

/// Sum of `consumption * intensity.actual` over the series, in kg.
pub fn co2_emissions(
    series: &[IntervalReading],
    intensity: &AlignedBatches<IntensityRecord>,
    policy: MissingIntensityPolicy,
) -> Result<Co2Summary, FootprintError> {
    let tally = fold_aligned(series, intensity, Co2Tally::default(), |tally, reading, record| {
        match (record.actual, policy) {
            (Some(actual), _) => {
                tally.grams += reading.consumption * actual;
                tally.samples += 1;
                Ok(())
            }
            (None, MissingIntensityPolicy::Skip) => {
                tally.skipped += 1;
                Ok(())
            }
            (None, MissingIntensityPolicy::Abort) => Err(FootprintError::MissingData(format!(
                "no actual carbon intensity for interval starting {}",
                reading.start_interval
            ))),
        }
    })?;

    if tally.skipped > 0 {
        tracing::warn!(
            skipped = tally.skipped,
            samples = tally.samples,
            "samples without actual carbon intensity were left out of the CO2 total"
        );
    }

    Ok(Co2Summary {
        total_kg: tally.grams / GRAMS_PER_KILOGRAM,
        samples: tally.samples,
        skipped: tally.skipped,
    })
}

/// Running consumption-weighted generation share per fuel.
#[derive(Debug, Clone, PartialEq)]
pub struct FuelAccumulator {
    totals: BTreeMap<Fuel, f64>,
}

impl Default for FuelAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl FuelAccumulator {
    pub fn new() -> Self {
        Self {
            totals: Fuel::ALL.iter().map(|f| (*f, 0.0)).collect(),
        }
    }

    pub fn add(&mut self, fuel: Fuel, weight: f64) {
        *self.totals.entry(fuel).or_insert(0.0) += weight;
    }

    pub fn weight(&self, fuel: Fuel) -> f64 {
        self.totals.get(&fuel).copied().unwrap_or(0.0)
    }

    /// Grand total of all weighted contributions.
    pub fn total(&self) -> f64 {
        self.totals.values().sum()
    }

    /// Share of each fuel in the grand total, in percent.
    ///
    /// A zero grand total (no consumption or no mix data) yields 0% for every fuel.
    pub fn percentages(&self) -> FuelMix {
        let total = self.total();
        let shares = self
            .totals
            .iter()
            .map(|(fuel, weight)| {
                let pct = if total > 0.0 { weight / total * 100.0 } else { 0.0 };
                (*fuel, pct)
            })
            .collect();
        FuelMix { shares }
    }
}

/// Fuel → percentage of the consumption-weighted generation mix.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FuelMix {
    shares: BTreeMap<Fuel, f64>,
}

impl FuelMix {
    pub fn percentage(&self, fuel: Fuel) -> f64 {
        self.shares.get(&fuel).copied().unwrap_or(0.0)
    }

    /// Shares in canonical fuel order.
    pub fn iter(&self) -> impl Iterator<Item = (Fuel, f64)> + '_ {
        Fuel::ALL
            .iter()
            .filter_map(|f| self.shares.get(f).map(|p| (*f, *p)))
    }

    pub fn total_percentage(&self) -> f64 {
        self.shares.values().sum()
    }
}

/// Weights every fuel share of the matched generation record by the sample's consumption,
/// then normalises by the grand total of weights.
pub fn fuel_mix(
    series: &[IntervalReading],
    generation: &AlignedBatches<GenerationRecord>,
) -> Result<FuelMix, FootprintError> {
    let acc = fold_aligned(series, generation, FuelAccumulator::new(), |acc, reading, record| {
        for share in &record.mix {
            acc.add(share.fuel, reading.consumption * share.perc);
        }
        Ok(())
    })?;

    if acc.total() <= 0.0 {
        tracing::warn!(samples = series.len(), "fuel mix has no weighted generation; reporting 0% for every fuel");
    }

    Ok(acc.percentages())
}
