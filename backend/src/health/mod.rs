pub mod aggregator;
pub mod probe;

pub use aggregator::{Dependencies, HealthAggregator};
pub use probe::ProbeKind;
