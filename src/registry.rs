//! Named counter registry.
//!
//! Maps metric names to [`Counter`]s. Every name in [`names::WELL_KNOWN`] is
//! present from construction, so reports always carry them even when zero.
//! Further ad-hoc names are created on first increment unless the registry
//! is strict.
//!
//! Names keep their insertion order (well-known names first, in the order
//! listed, then ad-hoc names in first-use order); reports iterate in that
//! order.
//!
//! ## Example Usage
//!
//! ```
//! use flashstats::registry::{names, CounterRegistry};
//!
//! let mut registry = CounterRegistry::new(false);
//! registry.increment(names::TOTAL_READS, 4096).unwrap();
//! registry.increment("gc_passes", 0).unwrap();
//!
//! assert_eq!(registry.get(names::TOTAL_READS).byte_count, 4096);
//! assert_eq!(registry.get("gc_passes").object_count, 1);
//! assert_eq!(registry.get("never_touched").object_count, 0);
//! ```

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::counter::Counter;
use crate::error::StatsError;
use crate::lifecycle::ObjectSize;

/// Well-known counter names.
pub mod names {
    pub const TOTAL_READS: &str = "total_reads";
    pub const TOTAL_MISSES: &str = "total_misses";
    pub const TOTAL_HITS: &str = "total_hits";
    pub const COMPULSORY_MISSES: &str = "compulsory_misses";
    pub const CAPACITY_MISSES: &str = "capacity_misses";
    pub const WA_SKIP_MISSES: &str = "wa_skip_misses";
    pub const ONE_HIT_MISSES: &str = "one_hit_misses";
    pub const COPYFWD_HITS: &str = "copyfwd_hits";
    pub const COPY_FORWARDS: &str = "copy_forwards";
    pub const INSERTS: &str = "inserts";
    pub const REINSERTS: &str = "reinserts";
    pub const SKIPPED_COPYFWDS: &str = "skipped_copyfwds";
    pub const SKIPPED_INSERTS: &str = "skipped_inserts";
    pub const OBJECTS_WRITTEN: &str = "objects_written";
    pub const TOTAL_PLACEMENTS: &str = "total_placements";
    pub const DRAM_HITS: &str = "dram_hits";
    pub const DRAM_MISSES: &str = "dram_misses";

    /// Names pre-populated in every registry, in report order.
    pub const WELL_KNOWN: [&str; 17] = [
        TOTAL_READS,
        TOTAL_MISSES,
        TOTAL_HITS,
        COMPULSORY_MISSES,
        CAPACITY_MISSES,
        WA_SKIP_MISSES,
        ONE_HIT_MISSES,
        COPYFWD_HITS,
        COPY_FORWARDS,
        INSERTS,
        REINSERTS,
        SKIPPED_COPYFWDS,
        SKIPPED_INSERTS,
        OBJECTS_WRITTEN,
        TOTAL_PLACEMENTS,
        DRAM_HITS,
        DRAM_MISSES,
    ];

    pub fn is_well_known(name: &str) -> bool {
        WELL_KNOWN.contains(&name)
    }
}

/// Insertion-ordered mapping from metric name to [`Counter`].
///
/// Each name is allocated once and shared between the lookup index and the
/// ordered entries.
#[derive(Debug, Clone)]
pub struct CounterRegistry {
    index: FxHashMap<Arc<str>, usize>,
    entries: Vec<(Arc<str>, Counter)>,
    strict: bool,
}

impl CounterRegistry {
    /// Creates a registry holding every well-known name at zero.
    ///
    /// A `strict` registry refuses increments of names outside
    /// [`names::WELL_KNOWN`].
    pub fn new(strict: bool) -> Self {
        let mut registry = Self {
            index: FxHashMap::with_capacity_and_hasher(names::WELL_KNOWN.len(), Default::default()),
            entries: Vec::with_capacity(names::WELL_KNOWN.len()),
            strict,
        };
        for name in names::WELL_KNOWN {
            registry.slot(name);
        }
        registry
    }

    #[inline]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Adds `size` bytes and one object to `name`.
    ///
    /// Fails with [`StatsError::UnknownMetric`] only when the registry is
    /// strict and `name` is not well-known; otherwise creates the counter on
    /// first use.
    pub fn increment(&mut self, name: &str, size: ObjectSize) -> Result<(), StatsError> {
        if self.strict && !names::is_well_known(name) {
            warn!(metric = name, "strict registry rejected unknown metric");
            return Err(StatsError::UnknownMetric {
                name: name.to_string(),
            });
        }
        self.bump(name, size);
        Ok(())
    }

    /// Infallible increment used by the classifier for well-known names.
    #[inline]
    pub(crate) fn bump(&mut self, name: &str, size: ObjectSize) {
        let slot = self.slot(name);
        self.entries[slot].1.increment(size);
    }

    /// Returns a copy of the named counter, or a zero counter if absent.
    pub fn get(&self, name: &str) -> Counter {
        self.index
            .get(name)
            .map(|&slot| self.entries[slot].1)
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterates counters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Counter)> {
        self.entries
            .iter()
            .map(|(name, counter)| (&**name, counter))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Zeroes every counter; names (including ad-hoc ones) are kept.
    pub fn reset(&mut self) {
        for (_, counter) in &mut self.entries {
            *counter = Counter::new();
        }
    }

    fn slot(&mut self, name: &str) -> usize {
        if let Some(&slot) = self.index.get(name) {
            return slot;
        }
        let slot = self.entries.len();
        let name: Arc<str> = Arc::from(name);
        self.entries.push((Arc::clone(&name), Counter::new()));
        self.index.insert(name, slot);
        slot
    }
}

impl Default for CounterRegistry {
    fn default() -> Self {
        Self::new(false)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
