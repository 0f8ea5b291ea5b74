//! Configuration and construction of [`FlashStats`].
//!
//! ## Example
//!
//! ```rust
//! use flashstats::builder::{ClassificationMode, StatsBuilder};
//!
//! let stats = StatsBuilder::new(100_000)
//!     .strict_metrics(true)
//!     .mode(ClassificationMode::Full)
//!     .build();
//! assert_eq!(stats.config().inst_stats_period, 100_000);
//!
//! assert!(StatsBuilder::new(0).try_build().is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::classifier::FlashStats;
use crate::error::StatsError;

/// How much of the lifecycle classification runs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMode {
    /// Full miss/erase classification with per-key state.
    #[default]
    Full,
    /// Legacy instrumentation: totals only, no per-key state, no ordering
    /// checks and no copy-forward histogram.
    TotalsOnly,
}

/// Construction parameters for a stats instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Simulator events per segment. Carried through to reports.
    pub inst_stats_period: u64,
    /// Reject custom counter names outside the well-known set.
    pub strict_metrics: bool,
    pub mode: ClassificationMode,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            inst_stats_period: 1_000_000,
            strict_metrics: false,
            mode: ClassificationMode::Full,
        }
    }
}

impl StatsConfig {
    pub fn validate(&self) -> Result<(), StatsError> {
        if self.inst_stats_period == 0 {
            return Err(StatsError::InvalidConfig(
                "inst_stats_period must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON config; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, StatsError> {
        let config: StatsConfig =
            serde_json::from_str(json).map_err(|e| StatsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Builder for [`FlashStats`].
#[derive(Debug, Clone, Default)]
pub struct StatsBuilder {
    config: StatsConfig,
}

impl StatsBuilder {
    pub fn new(inst_stats_period: u64) -> Self {
        Self {
            config: StatsConfig {
                inst_stats_period,
                ..StatsConfig::default()
            },
        }
    }

    pub fn from_config(config: StatsConfig) -> Self {
        Self { config }
    }

    pub fn strict_metrics(mut self, strict: bool) -> Self {
        self.config.strict_metrics = strict;
        self
    }

    pub fn mode(mut self, mode: ClassificationMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Builds the stats instance.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid. Use
    /// [`try_build`](Self::try_build) for a fallible variant.
    pub fn build(self) -> FlashStats {
        match self.try_build() {
            Ok(stats) => stats,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_build(self) -> Result<FlashStats, StatsError> {
        self.config.validate()?;
        Ok(FlashStats::from_config(self.config))
    }
}
