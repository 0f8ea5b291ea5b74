//! Byte/object counter pair.
//!
//! A [`Counter`] is the unit every named metric is measured in: the number
//! of bytes touched and the number of objects touched. Counters only move
//! forward; segment deltas are computed against an earlier copy with
//! [`Counter::delta_since`].

use serde::{Deserialize, Serialize};

use crate::lifecycle::ObjectSize;

/// Monotonic `(bytes, objects)` pair.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "bytes")]
    pub byte_count: u64,
    #[serde(rename = "objects")]
    pub object_count: u32,
}

impl Counter {
    #[inline]
    pub const fn new() -> Self {
        Self {
            byte_count: 0,
            object_count: 0,
        }
    }

    /// Adds `size` bytes and one object.
    #[inline]
    pub fn increment(&mut self, size: ObjectSize) {
        self.byte_count = self.byte_count.saturating_add(u64::from(size));
        self.object_count = self.object_count.saturating_add(1);
    }

    /// Difference between `self` and an earlier snapshot of the same counter.
    ///
    /// Saturates at zero, so a snapshot taken after a reset never underflows.
    #[inline]
    pub fn delta_since(&self, earlier: &Counter) -> Counter {
        Counter {
            byte_count: self.byte_count.saturating_sub(earlier.byte_count),
            object_count: self.object_count.saturating_sub(earlier.object_count),
        }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.byte_count == 0 && self.object_count == 0
    }
}
