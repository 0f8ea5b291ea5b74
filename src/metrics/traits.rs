//! # Recorder Trait Hierarchy
//!
//! Separates *recording*, *snapshotting* and *export*. A simulator drives
//! any [`LifecycleRecorder`] without knowing how its results are consumed.
//!
//! ## Architecture
//!
//! ```text
//!   simulator ──events──► ┌─────────────────────────────┐
//!                         │      LifecycleRecorder       │
//!                         │  access/miss/insert/copyfwd  │
//!                         │  hit/erase/evict/write/...   │
//!                         └──────────────┬──────────────┘
//!                                        │
//!                                        ▼
//!                                  ┌───────────┐
//!                                  │ FlashStats│
//!                                  └─────┬─────┘
//!                                        │
//!   Consumption (decoupled from recording):
//!   ┌──────────────────────────────┐    ┌──────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>   │    │ MetricsExporter<S>           │
//!   │ (reports, tests)             │    │ (Prometheus text, JSON)      │
//!   └──────────────────────────────┘    └──────────────────────────────┘
//! ```
//!
//! Event methods panic on caller-protocol violations; see
//! [`FlashStats`](crate::classifier::FlashStats) for the fallible forms.

use crate::lifecycle::{Key, ObjectSize};

/// Lifecycle events emitted by a flash cache simulator.
pub trait LifecycleRecorder {
    fn on_access(&mut self, size: ObjectSize);
    fn on_miss(&mut self, key: Key, size: ObjectSize);
    fn on_insert_attempt(&mut self, key: Key, size: ObjectSize, inserted: bool, redundant: bool);
    fn on_copyfwd_attempt(&mut self, key: Key, size: ObjectSize, copied: bool, skipped: bool);
    fn on_hit(&mut self, key: Key, size: ObjectSize);
    fn on_erase(&mut self, key: Key, size: ObjectSize);
    fn on_evict(&mut self, key: Key, size: ObjectSize);
    fn on_write(&mut self, size: ObjectSize);
    fn on_container_flush(&mut self, unused_capacity: u64);
    fn on_container_erase(&mut self);
    fn collect_periodic_stats(&mut self, total_size: u64);
}

/// Snapshot provider for reports and tests.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Reset metrics between runs.
pub trait MetricsReset {
    fn reset_metrics(&mut self);
}

/// Publish a snapshot to a reporting backend.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
