//! flashstats: lifecycle event classification and segment metrics for
//! flash-backed cache simulators.
//!
//! A simulator reports every access, miss, insertion decision,
//! copy-forward, hit and erase to a [`classifier::FlashStats`]. The
//! classifier attributes each miss to its cause (compulsory, capacity, or a
//! deliberate write-amplification skip), tracks one-hit objects and
//! copy-forward depth, and cuts the run into segments whose hit ratios and
//! write amplification can be reported over time.

pub mod builder;
pub mod classifier;
pub mod counter;
pub mod error;
pub mod histogram;
pub mod lifecycle;
pub mod metrics;
pub mod prelude;
pub mod registry;
pub mod sample;
pub mod window;
