pub mod carbon_intensity;
pub mod generation_mix;
pub mod interval_reading;

pub use carbon_intensity::IntensityRecord;
pub use generation_mix::{Fuel, FuelShare, GenerationRecord};
pub use interval_reading::{Granularity, IntervalReading};
