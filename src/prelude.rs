pub use crate::builder::{ClassificationMode, StatsBuilder, StatsConfig};
pub use crate::classifier::FlashStats;
pub use crate::counter::Counter;
pub use crate::error::StatsError;
pub use crate::metrics::exporter::{JsonExporter, PrometheusTextExporter};
pub use crate::histogram::CopyForwardHistogram;
pub use crate::lifecycle::{Key, KeyFlags, KeyState, ObjectSize};
pub use crate::registry::{CounterRegistry, names};
pub use crate::sample::{SampleStats, compute_sample_stats};
pub use crate::metrics::snapshot::StatsSnapshot;
pub use crate::metrics::traits::{
    LifecycleRecorder, MetricsExporter, MetricsReset, MetricsSnapshotProvider,
};
pub use crate::window::{SegmentRecord, SegmentWindow};
