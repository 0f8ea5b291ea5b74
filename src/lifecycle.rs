//! Per-key lifecycle state.
//!
//! Records what has happened to each object since its last insertion so the
//! classifier can explain a later miss or erase without hints from the
//! simulator.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────┐  first miss / insert / hit   ┌──────────────────┐
//!   │  Unseen  │ ───────────────────────────► │  Live(KeyFlags)  │ ◄─┐
//!   └──────────┘                              └────────┬─────────┘   │
//!                                                      │ erase       │ any later event
//!                                                      ▼             │
//!                                             ┌──────────────────┐   │
//!                                             │ Retired(KeyFlags)│ ──┘
//!                                             └──────────────────┘
//! ```
//!
//! - `Live` keys own a [`KeyFlags`] record and a copy-forward count.
//! - Erase drops the live record and the count. What outlives the object
//!   is `INSERTED` (never reset) and any pending skip flag, so the next
//!   miss is still attributed to a capacity eviction or to the skip that
//!   caused it, and the next insertion is a reinsert.
//!
//! ## Flag lifetimes
//!
//! | Flag             | Set on                      | Cleared on               |
//! |------------------|-----------------------------|--------------------------|
//! | `INSERTED`       | successful insertion        | never                    |
//! | `READ`           | hit                         | erase                    |
//! | `SKIPPED_INSERT` | non-redundant skipped insert| insertion, classified miss |
//! | `SKIPPED_CF`     | pruned copy-forward         | insertion, classified miss |
//! | `CF`             | successful copy-forward     | erase                    |

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Object identifier as issued by the simulator.
pub type Key = u32;

/// Object size in bytes.
pub type ObjectSize = u32;

/// What has happened to a key since its most recent insertion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyFlags {
    /// Written into the cache at some point.
    pub inserted: bool,
    /// Hit since the most recent insertion.
    pub read: bool,
    /// Missed and the policy declined to admit it.
    pub skipped_insert: bool,
    /// Came up for copy-forward and was pruned instead.
    pub skipped_cf: bool,
    /// Copied forward since the most recent insertion.
    pub cf: bool,
}

impl KeyFlags {
    /// `true` when a prior skip decision explains a miss.
    #[inline]
    pub fn has_skip(&self) -> bool {
        self.skipped_insert || self.skipped_cf
    }

    /// `SKIPPED_CF` implies `INSERTED`.
    #[inline]
    pub fn is_consistent(&self) -> bool {
        !self.skipped_cf || self.inserted
    }
}

impl fmt::Display for KeyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let named = [
            (self.inserted, "INSERTED"),
            (self.read, "READ"),
            (self.skipped_insert, "SKIPPED_INSERT"),
            (self.skipped_cf, "SKIPPED_CF"),
            (self.cf, "CF"),
        ];
        let mut first = true;
        for (set, name) in named {
            if !set {
                continue;
            }
            if !first {
                f.write_str("|")?;
            }
            f.write_str(name)?;
            first = false;
        }
        if first {
            f.write_str("-")?;
        }
        Ok(())
    }
}

/// Observed state of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Unseen,
    Live(KeyFlags),
    /// Erased; carries the flags that survive erase.
    Retired(KeyFlags),
}

impl KeyState {
    /// Flags the classifier reasons about, live or retired.
    pub fn flags(&self) -> Option<KeyFlags> {
        match self {
            KeyState::Unseen => None,
            KeyState::Live(flags) | KeyState::Retired(flags) => Some(*flags),
        }
    }
}

impl fmt::Display for KeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyState::Unseen => f.write_str("<unseen>"),
            KeyState::Live(flags) => write!(f, "live {flags}"),
            KeyState::Retired(flags) => write!(f, "retired {flags}"),
        }
    }
}

/// Table of per-key flags and copy-forward counts.
#[derive(Debug, Default, Clone)]
pub struct LifecycleTable {
    live: FxHashMap<Key, KeyFlags>,
    retired: FxHashMap<Key, KeyFlags>,
    copyfwds: FxHashMap<Key, u8>,
}

impl LifecycleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, key: Key) -> KeyState {
        if let Some(flags) = self.live.get(&key) {
            KeyState::Live(*flags)
        } else if let Some(flags) = self.retired.get(&key) {
            KeyState::Retired(*flags)
        } else {
            KeyState::Unseen
        }
    }

    /// Live record for `key`, if any.
    #[inline]
    pub fn flags(&self, key: Key) -> Option<KeyFlags> {
        self.live.get(&key).copied()
    }

    /// Live record for `key`, creating it from the key's history if needed.
    pub fn record_mut(&mut self, key: Key) -> &mut KeyFlags {
        let retired = &mut self.retired;
        self.live
            .entry(key)
            .or_insert_with(|| retired.remove(&key).unwrap_or_default())
    }

    /// Bumps the copy-forward count of `key`, saturating at 255.
    pub fn note_copy_forward(&mut self, key: Key) {
        let count = self.copyfwds.entry(key).or_insert(0);
        *count = count.saturating_add(1);
    }

    #[inline]
    pub fn copy_forward_count(&self, key: Key) -> u8 {
        self.copyfwds.get(&key).copied().unwrap_or(0)
    }

    /// Drops the live record and copy-forward count of `key`, keeping the
    /// flags that survive erase (`READ` and `CF` are cleared).
    ///
    /// Returns the copy-forward count the key had (zero if it never had one).
    pub fn retire(&mut self, key: Key) -> u8 {
        let mut flags = self.live.remove(&key).unwrap_or_default();
        flags.read = false;
        flags.cf = false;
        self.retired.insert(key, flags);
        self.copyfwds.remove(&key).unwrap_or(0)
    }

    /// Number of keys with a live record.
    pub fn live_len(&self) -> usize {
        self.live.len()
    }

    pub fn retired_len(&self) -> usize {
        self.retired.len()
    }

    pub fn iter_live(&self) -> impl Iterator<Item = (Key, KeyFlags)> + '_ {
        self.live.iter().map(|(&key, &flags)| (key, flags))
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.retired.clear();
        self.copyfwds.clear();
    }
}
