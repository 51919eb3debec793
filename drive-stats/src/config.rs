//! Engine configuration types
//!
//! The threshold and the day bounds are plain values handed to the engine,
//! so callers (and tests) can vary them per run.

use crate::types::{DriveStatsError, Result};
use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

/// Default stop length still counted as travel, in seconds
pub const DEFAULT_THRESHOLD_SECS: i64 = 120;

/// Largest accepted threshold; no interval within one day can exceed it
pub const MAX_THRESHOLD_SECS: i64 = 86_400;

/// Configuration for the drive statistics engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Longest stop (seconds) still classified as travel; longer stops are parking
    #[serde(default = "default_threshold_secs")]
    pub threshold_secs: i64,

    /// Time-of-day the observed day starts at (default: 00:00:00)
    #[serde(default = "default_day_start")]
    pub day_start: NaiveTime,

    /// Time-of-day the observed day ends at (default: 23:59:59)
    #[serde(default = "default_day_end")]
    pub day_end: NaiveTime,
}

fn default_threshold_secs() -> i64 {
    DEFAULT_THRESHOLD_SECS
}

fn default_day_start() -> NaiveTime {
    NaiveTime::MIN
}

fn default_day_end() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold_secs: default_threshold_secs(),
            day_start: default_day_start(),
            day_end: default_day_end(),
        }
    }
}

impl EngineConfig {
    /// Create a new engine configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the stop threshold in seconds
    pub fn with_threshold_secs(mut self, secs: i64) -> Self {
        self.threshold_secs = secs;
        self
    }

    /// Builder method: set the start of the observed day
    pub fn with_day_start(mut self, start: NaiveTime) -> Self {
        self.day_start = start;
        self
    }

    /// Builder method: set the end of the observed day
    pub fn with_day_end(mut self, end: NaiveTime) -> Self {
        self.day_end = end;
        self
    }

    /// Threshold as a duration
    ///
    /// Out-of-range values saturate at one day, which classifies every
    /// interval the same way the raw value would.
    pub fn threshold(&self) -> Duration {
        Duration::seconds(self.threshold_secs.clamp(-MAX_THRESHOLD_SECS, MAX_THRESHOLD_SECS))
    }

    /// Length of the observed day
    pub fn day_length(&self) -> Duration {
        self.day_end.signed_duration_since(self.day_start)
    }

    /// Reject configurations the engine cannot produce sane totals for
    pub fn validate(&self) -> Result<()> {
        if self.threshold_secs < 0 {
            return Err(DriveStatsError::InvalidConfig(format!(
                "threshold must not be negative (got {}s)",
                self.threshold_secs
            )));
        }

        if self.threshold_secs > MAX_THRESHOLD_SECS {
            return Err(DriveStatsError::InvalidConfig(format!(
                "threshold must not exceed {}s (got {}s)",
                MAX_THRESHOLD_SECS, self.threshold_secs
            )));
        }

        if self.day_end < self.day_start {
            return Err(DriveStatsError::InvalidConfig(format!(
                "day end {} is before day start {}",
                self.day_end, self.day_start
            )));
        }

        Ok(())
    }
}
