//! Mean and population standard deviation of a numeric sample.

use serde::{Deserialize, Serialize};

use crate::error::StatsError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleStats {
    pub mean: f64,
    /// Population standard deviation (divides by `n`, not `n - 1`).
    pub stddev: f64,
}

impl From<SampleStats> for (f64, f64) {
    fn from(stats: SampleStats) -> Self {
        (stats.mean, stats.stddev)
    }
}

/// Computes `(mean, stddev)` of `values`.
///
/// # Errors
///
/// [`StatsError::EmptyInput`] when `values` is empty.
///
/// # Example
///
/// ```
/// use flashstats::sample::compute_sample_stats;
///
/// let stats = compute_sample_stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
/// assert_eq!(stats.mean, 5.0);
/// assert_eq!(stats.stddev, 2.0);
/// ```
pub fn compute_sample_stats(values: &[f64]) -> Result<SampleStats, StatsError> {
    if values.is_empty() {
        return Err(StatsError::EmptyInput);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    Ok(SampleStats {
        mean,
        stddev: variance.sqrt(),
    })
}
