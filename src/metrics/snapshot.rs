//! Read-only end-of-run (or mid-run) view of a [`FlashStats`] instance.
//!
//! [`FlashStats`]: crate::classifier::FlashStats

use serde::{Deserialize, Serialize};

use crate::counter::Counter;
use crate::histogram::CopyForwardHistogram;
use crate::window::SegmentRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedCounter {
    pub name: String,
    #[serde(flatten)]
    pub counter: Counter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Registry contents in insertion order.
    pub counters: Vec<NamedCounter>,
    pub flash_bytes_written: u64,
    pub containers_written: u64,
    pub containers_erased: u64,
    pub copyfwd_hist: CopyForwardHistogram,
    pub segment_period: u64,
    pub segments: Vec<SegmentRecord>,
    pub average_occupancy: f64,
    pub overall_byte_hit_ratio: f64,
    pub overall_object_hit_ratio: f64,
    pub overall_write_amplification: f64,
}

impl StatsSnapshot {
    /// Named counter, or zero if the registry never held it.
    pub fn counter(&self, name: &str) -> Counter {
        self.counters
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.counter)
            .unwrap_or_default()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
