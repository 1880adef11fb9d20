pub mod aggregate;
pub mod config;
pub mod footprint;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod sources;
pub mod transform;

pub use footprint::{FootprintEngine, FootprintReport, FootprintRequest, Providers};
pub use pipeline::FootprintError;
