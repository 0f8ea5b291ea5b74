//! Consumption side of the stats: recorder traits, the outbound snapshot
//! and the exporters that render it.

pub mod exporter;
pub mod snapshot;
pub mod traits;
