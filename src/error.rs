//! Error types for the flashstats library.
//!
//! ## Key Components
//!
//! - [`StatsError`]: the single error taxonomy for the crate.
//!
//! | Variant                             | Raised by                               | Recoverable |
//! |-------------------------------------|-----------------------------------------|-------------|
//! | [`StatsError::UnknownMetric`]       | strict counter increments               | yes         |
//! | [`StatsError::EmptyInput`]          | [`compute_sample_stats`]                | yes         |
//! | [`StatsError::ProtocolViolation`]   | `try_on_*` lifecycle events             | no          |
//! | [`StatsError::InvalidConfig`]       | [`StatsBuilder::try_build`]             | yes         |
//! | [`StatsError::Invariant`]           | [`FlashStats::check_invariants`]        | no          |
//!
//! Protocol violations mean the simulator emitted events in an order the
//! classifier cannot explain. The infallible `on_*` entry points panic on
//! them; the `try_on_*` forms hand them back for callers that want to
//! report before aborting.
//!
//! ## Example Usage
//!
//! ```
//! use flashstats::error::StatsError;
//! use flashstats::sample::compute_sample_stats;
//!
//! let err = compute_sample_stats(&[]).unwrap_err();
//! assert_eq!(err, StatsError::EmptyInput);
//! ```
//!
//! [`compute_sample_stats`]: crate::sample::compute_sample_stats
//! [`StatsBuilder::try_build`]: crate::builder::StatsBuilder::try_build
//! [`FlashStats::check_invariants`]: crate::classifier::FlashStats::check_invariants

use thiserror::Error;

use crate::lifecycle::{Key, KeyState, ObjectSize};

/// Errors produced by counter lookups, lifecycle classification, sample
/// statistics and configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// A strict increment named a counter outside the well-known set.
    #[error("unknown metric: '{name}'")]
    UnknownMetric { name: String },

    /// Sample statistics were requested over an empty sample.
    #[error("cannot compute statistics of an empty sample")]
    EmptyInput,

    /// The caller emitted an event its key's lifecycle state cannot explain.
    ///
    /// `state` is the key's state observed *before* the event, including
    /// the flags an erased key still carries.
    #[error("protocol violation on {event}: key {key}, size {size}, state {state}")]
    ProtocolViolation {
        event: &'static str,
        key: Key,
        size: ObjectSize,
        state: KeyState,
    },

    /// Construction parameters were rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An internal consistency check failed.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl StatsError {
    pub(crate) fn violation(
        event: &'static str,
        key: Key,
        size: ObjectSize,
        state: KeyState,
    ) -> Self {
        StatsError::ProtocolViolation {
            event,
            key,
            size,
            state,
        }
    }

    /// Returns `true` for errors that indicate a caller bug and must end the run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StatsError::ProtocolViolation { .. } | StatsError::Invariant(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
