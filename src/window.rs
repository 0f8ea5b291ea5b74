//! Segment windowing.
//!
//! Every call to [`SegmentWindow::collect`] closes one segment: it diffs the
//! registry's counters against the previous collection and appends a single
//! [`SegmentRecord`]. Per-metric sequences are projections of that one
//! record list, so they always have the same length and `series[i]` always
//! refers to segment `i`.
//!
//! ## Write amplification
//!
//! Two views are kept per segment:
//!
//! | Field                             | Ratio                                          |
//! |-----------------------------------|------------------------------------------------|
//! | `write_amplification`             | segment flash bytes / segment inserted bytes   |
//! | `cumulative_write_amplification`  | all-time flash bytes / all-time inserted bytes |
//!
//! Reports should pick one and use it throughout. Ratios with a zero
//! denominator are recorded as `0.0`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::counter::Counter;
use crate::error::StatsError;
use crate::registry::{CounterRegistry, names};
use crate::sample::{SampleStats, compute_sample_stats};

/// Deltas and ratios for one closed segment.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub bytes_read: u64,
    pub objects_read: u64,
    pub bytes_hit: u64,
    pub objects_hit: u64,
    pub bytes_missed: u64,
    pub objects_missed: u64,
    pub inserted_bytes: u64,
    pub flash_bytes_written: u64,
    /// Cache occupancy reported by the simulator at collection time.
    pub utilization: u64,
    pub byte_hit_ratio: f64,
    pub object_hit_ratio: f64,
    pub write_amplification: f64,
    pub cumulative_write_amplification: f64,
}

impl SegmentRecord {
    pub fn byte_miss_ratio(&self) -> f64 {
        ratio(self.bytes_missed, self.bytes_read)
    }

    pub fn object_miss_ratio(&self) -> f64 {
        ratio(self.objects_missed, self.objects_read)
    }
}

/// `num / den`, or `0.0` when `den` is zero.
#[inline]
pub fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Ordered per-segment records plus the counters seen at the last collection.
#[derive(Debug, Clone, Default)]
pub struct SegmentWindow {
    period: u64,
    records: Vec<SegmentRecord>,
    last_reads: Counter,
    last_hits: Counter,
    last_misses: Counter,
    last_inserts: Counter,
    last_flash_bytes_written: u64,
}

impl SegmentWindow {
    /// `period` is the number of simulator events per segment; it is only
    /// carried through to reports.
    pub fn new(period: u64) -> Self {
        Self {
            period,
            ..Self::default()
        }
    }

    #[inline]
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Closes the current segment and returns its record.
    pub fn collect(
        &mut self,
        counters: &CounterRegistry,
        flash_bytes_written: u64,
        total_size: u64,
    ) -> &SegmentRecord {
        let reads = counters.get(names::TOTAL_READS);
        let hits = counters.get(names::TOTAL_HITS);
        let misses = counters.get(names::TOTAL_MISSES);
        let inserts = counters.get(names::INSERTS);

        let d_reads = reads.delta_since(&self.last_reads);
        let d_hits = hits.delta_since(&self.last_hits);
        let d_misses = misses.delta_since(&self.last_misses);
        let d_inserts = inserts.delta_since(&self.last_inserts);
        let d_fbw = flash_bytes_written.saturating_sub(self.last_flash_bytes_written);

        let record = SegmentRecord {
            bytes_read: d_reads.byte_count,
            objects_read: u64::from(d_reads.object_count),
            bytes_hit: d_hits.byte_count,
            objects_hit: u64::from(d_hits.object_count),
            bytes_missed: d_misses.byte_count,
            objects_missed: u64::from(d_misses.object_count),
            inserted_bytes: d_inserts.byte_count,
            flash_bytes_written: d_fbw,
            utilization: total_size,
            byte_hit_ratio: ratio(d_hits.byte_count, d_reads.byte_count),
            object_hit_ratio: ratio(
                u64::from(d_hits.object_count),
                u64::from(d_reads.object_count),
            ),
            write_amplification: ratio(d_fbw, d_inserts.byte_count),
            cumulative_write_amplification: ratio(flash_bytes_written, inserts.byte_count),
        };

        self.last_reads = reads;
        self.last_hits = hits;
        self.last_misses = misses;
        self.last_inserts = inserts;
        self.last_flash_bytes_written = flash_bytes_written;

        debug!(
            segment = self.records.len(),
            bhr = record.byte_hit_ratio,
            ohr = record.object_hit_ratio,
            wa = record.write_amplification,
            utilization = total_size,
            "segment closed"
        );
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[SegmentRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&SegmentRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Projects one metric across all segments, in segment order.
    pub fn series<T>(&self, metric: impl Fn(&SegmentRecord) -> T) -> Vec<T> {
        self.records.iter().map(metric).collect()
    }

    pub fn segment_util(&self) -> Vec<u64> {
        self.series(|r| r.utilization)
    }

    pub fn segment_bytes_read(&self) -> Vec<u64> {
        self.series(|r| r.bytes_read)
    }

    pub fn segment_bytes_missed(&self) -> Vec<u64> {
        self.series(|r| r.bytes_missed)
    }

    pub fn segment_objects_read(&self) -> Vec<u64> {
        self.series(|r| r.objects_read)
    }

    pub fn segment_objects_missed(&self) -> Vec<u64> {
        self.series(|r| r.objects_missed)
    }

    pub fn segment_fbw(&self) -> Vec<u64> {
        self.series(|r| r.flash_bytes_written)
    }

    pub fn segment_inserts(&self) -> Vec<u64> {
        self.series(|r| r.inserted_bytes)
    }

    pub fn segment_bhr(&self) -> Vec<f64> {
        self.series(|r| r.byte_hit_ratio)
    }

    pub fn segment_ohr(&self) -> Vec<f64> {
        self.series(|r| r.object_hit_ratio)
    }

    pub fn segment_byte_miss_ratio(&self) -> Vec<f64> {
        self.series(SegmentRecord::byte_miss_ratio)
    }

    pub fn segment_obj_miss_ratio(&self) -> Vec<f64> {
        self.series(SegmentRecord::object_miss_ratio)
    }

    pub fn segment_wa(&self) -> Vec<f64> {
        self.series(|r| r.write_amplification)
    }

    /// Mean and spread of one metric over all closed segments.
    pub fn summarize(
        &self,
        metric: impl Fn(&SegmentRecord) -> f64,
    ) -> Result<SampleStats, StatsError> {
        compute_sample_stats(&self.series(metric))
    }

    /// Mean utilization over all segments, `0.0` before the first collection.
    pub fn average_occupancy(&self) -> f64 {
        self.summarize(|r| r.utilization as f64)
            .map(|stats| stats.mean)
            .unwrap_or(0.0)
    }

    /// Drops all records and restarts deltas from zero.
    pub fn reset(&mut self) {
        *self = Self::new(self.period);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
