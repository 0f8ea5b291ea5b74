//! Lifecycle event classifier.
//!
//! [`FlashStats`] receives every lifecycle event of a flash cache simulator
//! and turns it into named counter increments. Per-key flags (see
//! [`lifecycle`](crate::lifecycle)) let a single miss or erase be attributed
//! to the decision that caused it without the simulator passing hints.
//!
//! ## Transitions
//!
//! | Event                | Guard                            | Counters                                   |
//! |----------------------|----------------------------------|--------------------------------------------|
//! | `on_access`          | always                           | `total_reads`                              |
//! | `on_miss`            | key unseen                       | `total_misses`, `compulsory_misses`        |
//! | `on_miss`            | `SKIPPED_INSERT` or `SKIPPED_CF` | `total_misses`, `wa_skip_misses`           |
//! | `on_miss`            | otherwise (`INSERTED` required)  | `total_misses`, `capacity_misses`          |
//! | `on_insert_attempt`  | inserted                         | `inserts` (+ `reinserts` if `INSERTED`)    |
//! | `on_insert_attempt`  | skipped, not redundant           | `skipped_inserts`                          |
//! | `on_copyfwd_attempt` | skipped (`INSERTED` required)    | `skipped_copyfwds`                         |
//! | `on_copyfwd_attempt` | copied                           | `copy_forwards`                            |
//! | `on_hit`             | always                           | `total_hits` (+ `copyfwd_hits` if `CF`)    |
//! | `on_erase`           | `INSERTED` required              | `one_hit_misses` if not `READ`; histogram  |
//! | `on_write`           | always                           | `objects_written`, flash bytes             |
//!
//! Events whose guard fails are caller-protocol violations. The `on_*`
//! methods panic on them with the key, size and flags; the `try_on_*` forms
//! return [`StatsError::ProtocolViolation`] and leave all state untouched.
//!
//! ## Example Usage
//!
//! ```
//! use flashstats::classifier::FlashStats;
//! use flashstats::registry::names;
//!
//! let mut stats = FlashStats::new(1_000);
//! stats.on_access(100);
//! stats.on_miss(1, 100);
//! stats.on_insert_attempt(1, 100, true, false);
//! stats.on_access(100);
//! stats.on_hit(1, 100);
//! stats.on_erase(1, 100);
//!
//! assert_eq!(stats.counter(names::COMPULSORY_MISSES).byte_count, 100);
//! assert_eq!(stats.counter(names::ONE_HIT_MISSES).object_count, 0);
//! assert_eq!(stats.copyfwd_histogram().get(0), 1);
//! ```

use tracing::{error, trace, warn};

use crate::builder::{ClassificationMode, StatsConfig};
use crate::counter::Counter;
use crate::error::StatsError;
use crate::histogram::CopyForwardHistogram;
use crate::lifecycle::{Key, KeyFlags, KeyState, LifecycleTable, ObjectSize};
use crate::metrics::snapshot::{NamedCounter, StatsSnapshot};
use crate::metrics::traits::{LifecycleRecorder, MetricsReset, MetricsSnapshotProvider};
use crate::registry::{CounterRegistry, names};
use crate::window::{SegmentRecord, SegmentWindow, ratio};

/// Counters, per-key state and segment history for one simulation run.
#[derive(Debug, Clone)]
pub struct FlashStats {
    config: StatsConfig,
    counters: CounterRegistry,
    keys: LifecycleTable,
    copyfwd_hist: CopyForwardHistogram,
    window: SegmentWindow,
    flash_bytes_written: u64,
    containers_written: u64,
    containers_erased: u64,
    erases: u64,
}

impl FlashStats {
    /// Creates a stats instance with default options and the given segment period.
    ///
    /// # Panics
    ///
    /// Panics if `inst_stats_period` is zero. Use
    /// [`StatsBuilder::try_build`](crate::builder::StatsBuilder::try_build)
    /// to handle that as an error.
    pub fn new(inst_stats_period: u64) -> Self {
        crate::builder::StatsBuilder::new(inst_stats_period).build()
    }

    pub(crate) fn from_config(config: StatsConfig) -> Self {
        Self {
            counters: CounterRegistry::new(config.strict_metrics),
            keys: LifecycleTable::new(),
            copyfwd_hist: CopyForwardHistogram::new(),
            window: SegmentWindow::new(config.inst_stats_period),
            flash_bytes_written: 0,
            containers_written: 0,
            containers_erased: 0,
            erases: 0,
            config,
        }
    }

    #[inline]
    fn full(&self) -> bool {
        self.config.mode == ClassificationMode::Full
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn on_access(&mut self, size: ObjectSize) {
        self.counters.bump(names::TOTAL_READS, size);
    }

    /// Classifies a miss.
    ///
    /// # Panics
    ///
    /// Panics if the key was seen but neither inserted nor skipped.
    pub fn on_miss(&mut self, key: Key, size: ObjectSize) {
        if let Err(err) = self.try_on_miss(key, size) {
            fatal(err);
        }
    }

    pub fn try_on_miss(&mut self, key: Key, size: ObjectSize) -> Result<(), StatsError> {
        if !self.full() {
            self.counters.bump(names::TOTAL_MISSES, size);
            return Ok(());
        }

        let state = self.keys.state(key);
        let kind = match state.flags() {
            None => names::COMPULSORY_MISSES,
            Some(flags) if flags.has_skip() => {
                if flags.skipped_cf && !flags.inserted {
                    return Err(StatsError::violation("miss", key, size, state));
                }
                names::WA_SKIP_MISSES
            },
            Some(flags) => {
                if !flags.inserted {
                    return Err(StatsError::violation("miss", key, size, state));
                }
                names::CAPACITY_MISSES
            },
        };

        self.counters.bump(names::TOTAL_MISSES, size);
        self.counters.bump(kind, size);
        let flags = self.keys.record_mut(key);
        flags.skipped_insert = false;
        flags.skipped_cf = false;
        trace!(key, size, kind, "miss");
        Ok(())
    }

    pub fn on_hit(&mut self, key: Key, size: ObjectSize) {
        self.counters.bump(names::TOTAL_HITS, size);
        if !self.full() {
            return;
        }
        let flags = self.keys.record_mut(key);
        let copied_forward = flags.cf;
        flags.read = true;
        if copied_forward {
            self.counters.bump(names::COPYFWD_HITS, size);
        }
        trace!(key, size, copied_forward, "hit");
    }

    pub fn on_dram_hit(&mut self, size: ObjectSize) {
        self.counters.bump(names::DRAM_HITS, size);
    }

    pub fn on_dram_miss(&mut self, size: ObjectSize) {
        self.counters.bump(names::DRAM_MISSES, size);
    }

    // -----------------------------------------------------------------------
    // Admission and placement
    // -----------------------------------------------------------------------

    /// Records the policy's admission decision for `key`.
    ///
    /// A redundant skip (the object was already cached) changes nothing.
    pub fn on_insert_attempt(
        &mut self,
        key: Key,
        size: ObjectSize,
        inserted: bool,
        redundant: bool,
    ) {
        if inserted {
            self.counters.bump(names::INSERTS, size);
            if !self.full() {
                return;
            }
            let flags = self.keys.record_mut(key);
            let reinsert = flags.inserted;
            flags.inserted = true;
            flags.skipped_insert = false;
            flags.skipped_cf = false;
            if reinsert {
                self.counters.bump(names::REINSERTS, size);
            }
            trace!(key, size, reinsert, "insert");
        } else if !redundant {
            self.counters.bump(names::SKIPPED_INSERTS, size);
            if self.full() {
                self.keys.record_mut(key).skipped_insert = true;
            }
            trace!(key, size, "insert skipped");
        }
    }

    /// Records a copy-forward decision.
    ///
    /// # Panics
    ///
    /// Panics if a copy-forward is skipped for a key that was never inserted.
    pub fn on_copyfwd_attempt(&mut self, key: Key, size: ObjectSize, copied: bool, skipped: bool) {
        if let Err(err) = self.try_on_copyfwd_attempt(key, size, copied, skipped) {
            fatal(err);
        }
    }

    pub fn try_on_copyfwd_attempt(
        &mut self,
        key: Key,
        size: ObjectSize,
        copied: bool,
        skipped: bool,
    ) -> Result<(), StatsError> {
        if skipped {
            if self.full() {
                let state = self.keys.state(key);
                if !state.flags().is_some_and(|flags| flags.inserted) {
                    return Err(StatsError::violation(
                        "skipped copy-forward",
                        key,
                        size,
                        state,
                    ));
                }
                self.keys.record_mut(key).skipped_cf = true;
            }
            self.counters.bump(names::SKIPPED_COPYFWDS, size);
            trace!(key, size, "copy-forward skipped");
        } else if copied {
            self.counters.bump(names::COPY_FORWARDS, size);
            if self.full() {
                self.keys.record_mut(key).cf = true;
                self.keys.note_copy_forward(key);
            }
            trace!(key, size, "copy-forward");
        }
        Ok(())
    }

    pub fn on_zone_insert(&mut self, size: ObjectSize) {
        self.counters.bump(names::TOTAL_PLACEMENTS, size);
    }

    // -----------------------------------------------------------------------
    // Removal
    // -----------------------------------------------------------------------

    /// Records the final disposition of `key` and forgets its transient state.
    ///
    /// # Panics
    ///
    /// Panics if the key has no live record or was never inserted.
    pub fn on_erase(&mut self, key: Key, size: ObjectSize) {
        if let Err(err) = self.try_on_erase(key, size) {
            fatal(err);
        }
    }

    pub fn try_on_erase(&mut self, key: Key, size: ObjectSize) -> Result<(), StatsError> {
        if !self.full() {
            self.erases += 1;
            return Ok(());
        }

        let flags = match self.keys.state(key) {
            KeyState::Live(flags) if flags.inserted => flags,
            state => return Err(StatsError::violation("erase", key, size, state)),
        };

        if !flags.read {
            self.counters.bump(names::ONE_HIT_MISSES, size);
        }
        let copyfwds = self.keys.retire(key);
        self.copyfwd_hist.record(copyfwds);
        self.erases += 1;
        trace!(key, size, read = flags.read, copyfwds, "erase");
        Ok(())
    }

    /// Reserved hook; evictions are classified when the key is next missed.
    pub fn on_evict(&mut self, key: Key, size: ObjectSize) {
        trace!(key, size, "evict");
    }

    // -----------------------------------------------------------------------
    // Flash accounting
    // -----------------------------------------------------------------------

    /// Object bytes written to the medium.
    pub fn on_write(&mut self, size: ObjectSize) {
        self.counters.bump(names::OBJECTS_WRITTEN, size);
        self.flash_bytes_written += u64::from(size);
    }

    /// A container was closed; its unused tail still costs flash writes.
    pub fn on_container_flush(&mut self, unused_capacity: u64) {
        self.flash_bytes_written += unused_capacity;
        self.containers_written += 1;
    }

    pub fn on_container_erase(&mut self) {
        self.containers_erased += 1;
    }

    // -----------------------------------------------------------------------
    // Custom counters and segments
    // -----------------------------------------------------------------------

    /// Increments an ad-hoc counter; see [`CounterRegistry::increment`].
    pub fn increment(&mut self, name: &str, size: ObjectSize) -> Result<(), StatsError> {
        self.counters.increment(name, size)
    }

    /// Closes the current segment. `total_size` is the cache occupancy now.
    pub fn collect_periodic_stats(&mut self, total_size: u64) -> &SegmentRecord {
        self.window
            .collect(&self.counters, self.flash_bytes_written, total_size)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    pub fn counters(&self) -> &CounterRegistry {
        &self.counters
    }

    pub fn counter(&self, name: &str) -> Counter {
        self.counters.get(name)
    }

    /// Live flags of `key`; `None` if unseen or erased.
    pub fn flags(&self, key: Key) -> Option<KeyFlags> {
        self.keys.flags(key)
    }

    pub fn key_state(&self, key: Key) -> KeyState {
        self.keys.state(key)
    }

    pub fn copy_forward_count(&self, key: Key) -> u8 {
        self.keys.copy_forward_count(key)
    }

    /// Number of keys holding a live state record.
    pub fn tracked_keys(&self) -> usize {
        self.keys.live_len()
    }

    pub fn copyfwd_histogram(&self) -> &CopyForwardHistogram {
        &self.copyfwd_hist
    }

    /// Erases accepted so far.
    pub fn erase_count(&self) -> u64 {
        self.erases
    }

    pub fn window(&self) -> &SegmentWindow {
        &self.window
    }

    pub fn flash_bytes_written(&self) -> u64 {
        self.flash_bytes_written
    }

    pub fn containers_written(&self) -> u64 {
        self.containers_written
    }

    pub fn containers_erased(&self) -> u64 {
        self.containers_erased
    }

    /// All-time hit ratio over bytes; `0.0` (with a warning) before any read.
    pub fn overall_byte_hit_ratio(&self) -> f64 {
        all_time_ratio(
            "byte_hit_ratio",
            self.counter(names::TOTAL_HITS).byte_count,
            self.counter(names::TOTAL_READS).byte_count,
        )
    }

    pub fn overall_object_hit_ratio(&self) -> f64 {
        all_time_ratio(
            "object_hit_ratio",
            u64::from(self.counter(names::TOTAL_HITS).object_count),
            u64::from(self.counter(names::TOTAL_READS).object_count),
        )
    }

    /// All-time flash bytes written per inserted byte.
    pub fn overall_write_amplification(&self) -> f64 {
        all_time_ratio(
            "write_amplification",
            self.flash_bytes_written,
            self.counter(names::INSERTS).byte_count,
        )
    }

    /// Verifies cross-counter invariants.
    ///
    /// - compulsory + capacity + wa-skip misses equal total misses (full mode)
    /// - histogram total equals the number of erases (full mode; totals-only
    ///   erases are counted but never folded)
    /// - every live key with `SKIPPED_CF` also has `INSERTED`
    pub fn check_invariants(&self) -> Result<(), StatsError> {
        if self.full() {
            let total = self.counter(names::TOTAL_MISSES);
            let parts = [
                self.counter(names::COMPULSORY_MISSES),
                self.counter(names::CAPACITY_MISSES),
                self.counter(names::WA_SKIP_MISSES),
            ];
            let bytes: u64 = parts.iter().map(|c| c.byte_count).sum();
            let objects: u64 = parts.iter().map(|c| u64::from(c.object_count)).sum();
            if bytes != total.byte_count || objects != u64::from(total.object_count) {
                return Err(StatsError::Invariant(format!(
                    "miss breakdown {bytes}B/{objects} != total_misses {}B/{}",
                    total.byte_count, total.object_count
                )));
            }

            let folded = self.copyfwd_hist.total();
            if folded != self.erases {
                return Err(StatsError::Invariant(format!(
                    "copy-forward histogram holds {folded} objects but {} erases were recorded",
                    self.erases
                )));
            }
        }

        if let Some((key, flags)) = self.keys.iter_live().find(|(_, f)| !f.is_consistent()) {
            return Err(StatsError::Invariant(format!(
                "key {key} has SKIPPED_CF without INSERTED ({flags})"
            )));
        }
        Ok(())
    }
}

impl Default for FlashStats {
    fn default() -> Self {
        Self::from_config(StatsConfig::default())
    }
}

/// [`ratio`] for whole-run figures; warns on a zero denominator.
fn all_time_ratio(name: &'static str, numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        warn!(ratio = name, "all-time ratio requested with a zero denominator");
    }
    ratio(numerator, denominator)
}

#[cold]
fn fatal(err: StatsError) -> ! {
    error!(%err, "caller protocol violation");
    panic!("{err}");
}

impl LifecycleRecorder for FlashStats {
    fn on_access(&mut self, size: ObjectSize) {
        FlashStats::on_access(self, size);
    }

    fn on_miss(&mut self, key: Key, size: ObjectSize) {
        FlashStats::on_miss(self, key, size);
    }

    fn on_insert_attempt(&mut self, key: Key, size: ObjectSize, inserted: bool, redundant: bool) {
        FlashStats::on_insert_attempt(self, key, size, inserted, redundant);
    }

    fn on_copyfwd_attempt(&mut self, key: Key, size: ObjectSize, copied: bool, skipped: bool) {
        FlashStats::on_copyfwd_attempt(self, key, size, copied, skipped);
    }

    fn on_hit(&mut self, key: Key, size: ObjectSize) {
        FlashStats::on_hit(self, key, size);
    }

    fn on_erase(&mut self, key: Key, size: ObjectSize) {
        FlashStats::on_erase(self, key, size);
    }

    fn on_evict(&mut self, key: Key, size: ObjectSize) {
        FlashStats::on_evict(self, key, size);
    }

    fn on_write(&mut self, size: ObjectSize) {
        FlashStats::on_write(self, size);
    }

    fn on_container_flush(&mut self, unused_capacity: u64) {
        FlashStats::on_container_flush(self, unused_capacity);
    }

    fn on_container_erase(&mut self) {
        FlashStats::on_container_erase(self);
    }

    fn collect_periodic_stats(&mut self, total_size: u64) {
        FlashStats::collect_periodic_stats(self, total_size);
    }
}

impl MetricsSnapshotProvider<StatsSnapshot> for FlashStats {
    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            counters: self
                .counters
                .iter()
                .map(|(name, counter)| NamedCounter {
                    name: name.to_string(),
                    counter: *counter,
                })
                .collect(),
            flash_bytes_written: self.flash_bytes_written,
            containers_written: self.containers_written,
            containers_erased: self.containers_erased,
            copyfwd_hist: self.copyfwd_hist.clone(),
            segment_period: self.window.period(),
            segments: self.window.records().to_vec(),
            average_occupancy: self.window.average_occupancy(),
            overall_byte_hit_ratio: self.overall_byte_hit_ratio(),
            overall_object_hit_ratio: self.overall_object_hit_ratio(),
            overall_write_amplification: self.overall_write_amplification(),
        }
    }
}

impl MetricsReset for FlashStats {
    fn reset_metrics(&mut self) {
        self.counters.reset();
        self.keys.clear();
        self.copyfwd_hist.reset();
        self.window.reset();
        self.flash_bytes_written = 0;
        self.containers_written = 0;
        self.containers_erased = 0;
        self.erases = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> FlashStats {
        FlashStats::new(100)
    }

    fn objects(stats: &FlashStats, name: &str) -> u32 {
        stats.counter(name).object_count
    }

    // -- misses -----------------------------------------------------------

    #[test]
    fn first_miss_is_compulsory() {
        let mut s = stats();
        s.on_miss(1, 100);
        assert_eq!(s.counter(names::COMPULSORY_MISSES).byte_count, 100);
        assert_eq!(objects(&s, names::COMPULSORY_MISSES), 1);
        assert_eq!(objects(&s, names::TOTAL_MISSES), 1);
        assert_eq!(s.flags(1), Some(KeyFlags::default()));
    }

    #[test]
    fn miss_after_skipped_insert_is_wa_skip() {
        let mut s = stats();
        s.on_miss(1, 10);
        s.on_insert_attempt(1, 10, false, false);
        assert!(s.flags(1).unwrap().skipped_insert);
        assert_eq!(objects(&s, names::SKIPPED_INSERTS), 1);

        s.on_miss(1, 10);
        assert_eq!(objects(&s, names::WA_SKIP_MISSES), 1);
        assert!(!s.flags(1).unwrap().skipped_insert);
    }

    #[test]
    fn miss_after_skipped_copyfwd_is_wa_skip() {
        let mut s = stats();
        s.on_miss(2, 50);
        s.on_insert_attempt(2, 50, true, false);
        s.on_copyfwd_attempt(2, 50, false, true);
        assert!(s.flags(2).unwrap().skipped_cf);
        assert_eq!(s.counter(names::SKIPPED_COPYFWDS).byte_count, 50);

        s.on_miss(2, 50);
        assert_eq!(s.counter(names::WA_SKIP_MISSES).byte_count, 50);
        assert!(!s.flags(2).unwrap().skipped_cf);
    }

    #[test]
    fn miss_on_inserted_key_is_capacity() {
        let mut s = stats();
        s.on_miss(3, 10);
        s.on_insert_attempt(3, 10, true, false);
        s.on_miss(3, 10);
        assert_eq!(objects(&s, names::CAPACITY_MISSES), 1);
    }

    #[test]
    fn miss_after_erase_is_capacity() {
        let mut s = stats();
        s.on_miss(4, 10);
        s.on_insert_attempt(4, 10, true, false);
        s.on_erase(4, 10);
        assert_eq!(s.flags(4), None);

        s.on_miss(4, 10);
        assert_eq!(objects(&s, names::CAPACITY_MISSES), 1);
        assert_eq!(objects(&s, names::COMPULSORY_MISSES), 1);
        assert_eq!(
            s.flags(4),
            Some(KeyFlags {
                inserted: true,
                ..KeyFlags::default()
            })
        );
    }

    #[test]
    fn skipped_copyfwd_survives_erase() {
        let mut s = stats();
        s.on_miss(6, 10);
        s.on_insert_attempt(6, 10, true, false);
        s.on_copyfwd_attempt(6, 10, false, true);
        s.on_erase(6, 10);
        s.on_miss(6, 10);
        assert_eq!(objects(&s, names::WA_SKIP_MISSES), 1);
        assert_eq!(objects(&s, names::CAPACITY_MISSES), 0);
        // the skip explains one miss only
        s.on_insert_attempt(6, 10, false, false);
        s.on_miss(6, 10);
        assert_eq!(objects(&s, names::WA_SKIP_MISSES), 2);
        s.on_insert_attempt(6, 10, true, false);
        s.on_miss(6, 10);
        assert_eq!(objects(&s, names::CAPACITY_MISSES), 1);
    }

    #[test]
    fn unexplained_second_miss_is_violation() {
        let mut s = stats();
        s.on_miss(5, 10);
        let err = s.try_on_miss(5, 10).unwrap_err();
        assert!(matches!(
            err,
            StatsError::ProtocolViolation {
                event: "miss",
                key: 5,
                size: 10,
                ..
            }
        ));
        // rejected event leaves counters untouched
        assert_eq!(objects(&s, names::TOTAL_MISSES), 1);
    }

    #[test]
    #[should_panic(expected = "protocol violation on miss")]
    fn unexplained_second_miss_panics() {
        let mut s = stats();
        s.on_miss(5, 10);
        s.on_miss(5, 10);
    }

    // -- inserts ----------------------------------------------------------

    #[test]
    fn reinsert_counted_once_inserted() {
        let mut s = stats();
        s.on_miss(1, 8);
        s.on_insert_attempt(1, 8, true, false);
        assert_eq!(objects(&s, names::REINSERTS), 0);
        s.on_erase(1, 8);
        s.on_miss(1, 8);
        s.on_insert_attempt(1, 8, true, false);
        assert_eq!(objects(&s, names::INSERTS), 2);
        assert_eq!(objects(&s, names::REINSERTS), 1);
    }

    #[test]
    fn insertion_clears_skip_flags() {
        let mut s = stats();
        s.on_miss(1, 8);
        s.on_insert_attempt(1, 8, true, false);
        s.on_copyfwd_attempt(1, 8, false, true);
        s.on_insert_attempt(1, 8, false, false);
        s.on_insert_attempt(1, 8, true, false);
        let flags = s.flags(1).unwrap();
        assert!(flags.inserted);
        assert!(!flags.skipped_insert);
        assert!(!flags.skipped_cf);
    }

    #[test]
    fn redundant_skip_changes_nothing() {
        let mut s = stats();
        s.on_miss(1, 8);
        s.on_insert_attempt(1, 8, false, true);
        assert_eq!(objects(&s, names::SKIPPED_INSERTS), 0);
        assert_eq!(objects(&s, names::INSERTS), 0);
        assert_eq!(s.flags(1), Some(KeyFlags::default()));
    }

    // -- copy-forward -----------------------------------------------------

    #[test]
    fn copy_forward_sets_flag_and_count() {
        let mut s = stats();
        s.on_miss(1, 8);
        s.on_insert_attempt(1, 8, true, false);
        s.on_copyfwd_attempt(1, 8, true, false);
        s.on_copyfwd_attempt(1, 8, true, false);
        assert!(s.flags(1).unwrap().cf);
        assert_eq!(s.copy_forward_count(1), 2);
        assert_eq!(objects(&s, names::COPY_FORWARDS), 2);
    }

    #[test]
    fn neither_copied_nor_skipped_is_ignored() {
        let mut s = stats();
        s.on_copyfwd_attempt(1, 8, false, false);
        assert_eq!(objects(&s, names::COPY_FORWARDS), 0);
        assert_eq!(s.tracked_keys(), 0);
    }

    #[test]
    fn skipped_copyfwd_on_uninserted_key_is_violation() {
        let mut s = stats();
        s.on_miss(1, 8);
        let err = s.try_on_copyfwd_attempt(1, 8, false, true).unwrap_err();
        assert!(err.is_fatal());
        assert!(!s.flags(1).unwrap().skipped_cf);
        assert_eq!(objects(&s, names::SKIPPED_COPYFWDS), 0);
    }

    #[test]
    fn hit_after_copy_forward_counts_copyfwd_hit() {
        let mut s = stats();
        s.on_miss(1, 8);
        s.on_insert_attempt(1, 8, true, false);
        s.on_hit(1, 8);
        assert_eq!(objects(&s, names::COPYFWD_HITS), 0);
        s.on_copyfwd_attempt(1, 8, true, false);
        s.on_hit(1, 8);
        assert_eq!(objects(&s, names::COPYFWD_HITS), 1);
        assert_eq!(objects(&s, names::TOTAL_HITS), 2);
    }

    // -- erase ------------------------------------------------------------

    #[test]
    fn erase_without_read_is_one_hit_miss() {
        let mut s = stats();
        s.on_miss(1, 30);
        s.on_insert_attempt(1, 30, true, false);
        s.on_copyfwd_attempt(1, 30, true, false);
        s.on_erase(1, 30);
        assert_eq!(s.counter(names::ONE_HIT_MISSES).byte_count, 30);
        assert_eq!(s.copyfwd_histogram().get(1), 1);
        assert_eq!(s.tracked_keys(), 0);
        assert_eq!(s.copy_forward_count(1), 0);
    }

    #[test]
    fn erase_of_unseen_key_is_violation() {
        let mut s = stats();
        let err = s.try_on_erase(9, 1).unwrap_err();
        assert_eq!(err, StatsError::violation("erase", 9, 1, KeyState::Unseen));
        assert_eq!(s.erase_count(), 0);
    }

    #[test]
    #[should_panic(expected = "protocol violation on erase")]
    fn erase_of_uninserted_key_panics() {
        let mut s = stats();
        s.on_miss(9, 1);
        s.on_erase(9, 1);
    }

    #[test]
    fn double_erase_is_violation() {
        let mut s = stats();
        s.on_miss(1, 1);
        s.on_insert_attempt(1, 1, true, false);
        s.on_erase(1, 1);
        let err = s.try_on_erase(1, 1).unwrap_err();
        let retained = KeyFlags {
            inserted: true,
            ..KeyFlags::default()
        };
        assert_eq!(
            err,
            StatsError::violation("erase", 1, 1, KeyState::Retired(retained))
        );
        assert!(err.to_string().contains("retired INSERTED"));
        assert_eq!(s.erase_count(), 1);
        assert_eq!(s.copyfwd_histogram().total(), 1);
    }

    // -- flash accounting -------------------------------------------------

    #[test]
    fn flash_bytes_include_unused_container_space() {
        let mut s = stats();
        s.on_write(100);
        s.on_write(200);
        s.on_container_flush(724);
        s.on_container_erase();
        assert_eq!(s.flash_bytes_written(), 1024);
        assert_eq!(s.containers_written(), 1);
        assert_eq!(s.containers_erased(), 1);
        assert_eq!(objects(&s, names::OBJECTS_WRITTEN), 2);
    }

    #[test]
    fn overall_ratios() {
        let mut s = stats();
        assert_eq!(s.overall_byte_hit_ratio(), 0.0);
        assert_eq!(s.overall_write_amplification(), 0.0);
        s.on_access(100);
        s.on_miss(1, 100);
        s.on_insert_attempt(1, 100, true, false);
        s.on_write(100);
        s.on_container_flush(100);
        s.on_access(100);
        s.on_hit(1, 100);
        assert_eq!(s.overall_byte_hit_ratio(), 0.5);
        assert_eq!(s.overall_object_hit_ratio(), 0.5);
        assert_eq!(s.overall_write_amplification(), 2.0);
    }

    /// Runs `f` under a WARN-level subscriber and returns what it logged.
    fn capture_warnings(f: impl FnOnce()) -> String {
        use std::sync::{Arc, Mutex};

        #[derive(Clone)]
        struct Sink(Arc<Mutex<Vec<u8>>>);

        impl std::io::Write for Sink {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let sink = Sink(Arc::new(Mutex::new(Vec::new())));
        let writer = sink.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = sink.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn empty_all_time_ratio_warns() {
        let s = stats();
        let logged = capture_warnings(|| {
            assert_eq!(s.overall_write_amplification(), 0.0);
        });
        assert!(logged.contains("WARN"), "{logged}");
        assert!(logged.contains("write_amplification"), "{logged}");
        assert!(logged.contains("zero denominator"), "{logged}");
    }

    #[test]
    fn populated_ratios_and_segments_stay_quiet() {
        let mut s = stats();
        let logged = capture_warnings(|| {
            // an empty segment has zero denominators too
            s.collect_periodic_stats(0);
            s.on_access(10);
            s.on_miss(1, 10);
            s.on_insert_attempt(1, 10, true, false);
            s.on_write(10);
            let _ = s.overall_byte_hit_ratio();
            let _ = s.overall_object_hit_ratio();
            let _ = s.overall_write_amplification();
        });
        assert!(logged.is_empty(), "{logged}");
    }

    #[test]
    fn placements_and_dram_counters() {
        let mut s = stats();
        s.on_zone_insert(10);
        s.on_dram_hit(20);
        s.on_dram_miss(30);
        assert_eq!(s.counter(names::TOTAL_PLACEMENTS).byte_count, 10);
        assert_eq!(s.counter(names::DRAM_HITS).byte_count, 20);
        assert_eq!(s.counter(names::DRAM_MISSES).byte_count, 30);
    }

    // -- modes and maintenance --------------------------------------------

    #[test]
    fn totals_only_mode_keeps_no_key_state() {
        let mut s = crate::builder::StatsBuilder::new(10)
            .mode(ClassificationMode::TotalsOnly)
            .build();
        s.on_miss(1, 10);
        s.on_miss(1, 10);
        s.on_insert_attempt(1, 10, true, false);
        s.on_insert_attempt(1, 10, true, false);
        s.on_copyfwd_attempt(2, 10, false, true);
        s.on_erase(3, 10);
        assert_eq!(objects(&s, names::TOTAL_MISSES), 2);
        assert_eq!(objects(&s, names::COMPULSORY_MISSES), 0);
        assert_eq!(objects(&s, names::INSERTS), 2);
        assert_eq!(objects(&s, names::REINSERTS), 0);
        assert_eq!(objects(&s, names::SKIPPED_COPYFWDS), 1);
        assert_eq!(s.tracked_keys(), 0);
        assert_eq!(s.erase_count(), 1);
        assert_eq!(s.copyfwd_histogram().total(), 0);
        assert!(s.check_invariants().is_ok());
    }

    #[test]
    fn strict_custom_counter() {
        let mut s = crate::builder::StatsBuilder::new(10)
            .strict_metrics(true)
            .build();
        assert!(s.increment(names::DRAM_HITS, 1).is_ok());
        assert!(matches!(
            s.increment("gc_runs", 1),
            Err(StatsError::UnknownMetric { .. })
        ));
    }

    #[test]
    fn collect_returns_new_segment() {
        let mut s = stats();
        s.on_access(10);
        s.on_hit(1, 10);
        let record = *s.collect_periodic_stats(512);
        assert_eq!(record.byte_hit_ratio, 1.0);
        assert_eq!(record.utilization, 512);
        assert_eq!(s.window().len(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let mut s = stats();
        s.on_miss(1, 1);
        s.on_insert_attempt(1, 1, true, false);
        s.on_write(1);
        s.on_erase(1, 1);
        s.collect_periodic_stats(1);
        s.reset_metrics();
        assert!(s.counter(names::INSERTS).is_zero());
        assert_eq!(s.erase_count(), 0);
        assert_eq!(s.flash_bytes_written(), 0);
        assert!(s.window().is_empty());
        assert_eq!(s.key_state(1), KeyState::Unseen);
    }

    #[test]
    fn invariants_hold_after_mixed_events() {
        let mut s = stats();
        for key in 0..10 {
            s.on_access(key);
            s.on_miss(key, key);
            s.on_insert_attempt(key, key, key % 3 != 0, false);
        }
        for key in 0..10 {
            if key % 3 != 0 {
                s.on_copyfwd_attempt(key, key, false, key % 2 == 0);
            }
        }
        assert!(s.check_invariants().is_ok());
    }

    // ==============================================
    // Property Tests
    // ==============================================

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Access(u32),
            Miss(u32),
            Insert(u32, bool, bool),
            CopyFwd(u32, bool, bool),
            Hit(u32),
            Erase(u32),
            Collect(u64),
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0u32..4096).prop_map(Op::Access),
                (0u32..20).prop_map(Op::Miss),
                (0u32..20, any::<bool>(), any::<bool>()).prop_map(|(k, i, r)| Op::Insert(k, i, r)),
                (0u32..20, any::<bool>(), any::<bool>()).prop_map(|(k, c, s)| Op::CopyFwd(k, c, s)),
                (0u32..20).prop_map(Op::Hit),
                (0u32..20).prop_map(Op::Erase),
                (0u64..1 << 20).prop_map(Op::Collect),
            ]
        }

        /// Applies `op` through the fallible entry points; violations are
        /// rejected without state change, so arbitrary streams stay valid.
        fn apply(s: &mut FlashStats, op: &Op, erases: &mut u64, collects: &mut usize) {
            match *op {
                Op::Access(size) => s.on_access(size),
                Op::Miss(k) => {
                    let _ = s.try_on_miss(k, k + 1);
                },
                Op::Insert(k, inserted, redundant) => {
                    s.on_insert_attempt(k, k + 1, inserted, redundant)
                },
                Op::CopyFwd(k, copied, skipped) => {
                    let _ = s.try_on_copyfwd_attempt(k, k + 1, copied, skipped);
                },
                Op::Hit(k) => s.on_hit(k, k + 1),
                Op::Erase(k) => {
                    if s.try_on_erase(k, k + 1).is_ok() {
                        *erases += 1;
                    }
                },
                Op::Collect(total) => {
                    s.collect_periodic_stats(total);
                    *collects += 1;
                },
            }
        }

        proptest! {
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_invariants_always_hold(ops in prop::collection::vec(op_strategy(), 0..200)) {
                let mut s = FlashStats::new(10);
                let (mut erases, mut collects) = (0, 0);
                for op in &ops {
                    apply(&mut s, op, &mut erases, &mut collects);
                    prop_assert!(s.check_invariants().is_ok());
                }
                prop_assert_eq!(s.erase_count(), erases);
                prop_assert_eq!(s.window().len(), collects);
            }

            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_inserted_never_cleared(ops in prop::collection::vec(op_strategy(), 0..200)) {
                let mut s = FlashStats::new(10);
                let (mut erases, mut collects) = (0, 0);
                let mut ever_inserted = std::collections::HashSet::new();
                for op in &ops {
                    apply(&mut s, op, &mut erases, &mut collects);
                    if let Op::Insert(k, true, _) = *op {
                        ever_inserted.insert(k);
                    }
                    for &k in &ever_inserted {
                        let state = s.key_state(k);
                        prop_assert!(state.flags().is_some_and(|f| f.inserted), "key {} lost INSERTED: {:?}", k, state);
                    }
                }
            }
        }
    }
}
