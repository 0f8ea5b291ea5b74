//! Copy-forward histogram.
//!
//! Bucket `i` counts erased objects that had been copied forward exactly
//! `i` times since their last insertion. Per-key counts saturate at 255, so
//! bucket 255 also absorbs anything copied forward more often.

use serde::{Deserialize, Serialize};

/// Number of buckets; one per possible `u8` copy-forward count.
pub const BUCKETS: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CopyForwardHistogram {
    buckets: Vec<u64>,
}

impl CopyForwardHistogram {
    pub fn new() -> Self {
        Self {
            buckets: vec![0; BUCKETS],
        }
    }

    /// Folds one erased object that had been copied forward `count` times.
    #[inline]
    pub fn record(&mut self, count: u8) {
        self.buckets[usize::from(count)] += 1;
    }

    #[inline]
    pub fn get(&self, count: u8) -> u64 {
        self.buckets[usize::from(count)]
    }

    /// Total objects folded, i.e. the number of classified erases.
    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.buckets
    }

    /// Non-empty buckets as `(copy_forwards, objects)`.
    pub fn iter_nonzero(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.buckets
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, n)| n > 0)
    }

    pub fn reset(&mut self) {
        self.buckets.iter_mut().for_each(|n| *n = 0);
    }
}

impl Default for CopyForwardHistogram {
    fn default() -> Self {
        Self::new()
    }
}
