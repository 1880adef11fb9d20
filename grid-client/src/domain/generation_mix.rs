use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Generation fuel categories reported by the grid.
///
/// Unrecognised fuel names are folded into [`Fuel::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fuel {
    Wind,
    Solar,
    Nuclear,
    Coal,
    Gas,
    Biomass,
    Hydro,
    Imports,
    #[serde(other)]
    Other,
}

impl Fuel {
    /// Canonical report order. Differs from the derived `Ord`, which puts `Other` last.
    pub const ALL: [Fuel; 9] = [
        Fuel::Wind,
        Fuel::Solar,
        Fuel::Nuclear,
        Fuel::Coal,
        Fuel::Other,
        Fuel::Gas,
        Fuel::Biomass,
        Fuel::Hydro,
        Fuel::Imports,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Fuel::Wind => "wind",
            Fuel::Solar => "solar",
            Fuel::Nuclear => "nuclear",
            Fuel::Coal => "coal",
            Fuel::Other => "other",
            Fuel::Gas => "gas",
            Fuel::Biomass => "biomass",
            Fuel::Hydro => "hydro",
            Fuel::Imports => "imports",
        }
    }
}

impl fmt::Display for Fuel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FuelShare {
    pub fuel: Fuel,
    pub perc: f64,
}

/// Generation mix for one half-hour period; shares sum to roughly 100.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRecord {
    pub from: OffsetDateTime,
    pub to: OffsetDateTime,
    pub mix: Vec<FuelShare>,
}
