//! Core types for the drive statistics library
//!
//! This module defines the values flowing through the pipeline: samples read
//! from the log, the per-vehicle totals produced by the engine, and the error
//! type shared by every stage.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;
use std::fmt;

/// Timestamp type used throughout the library (local time, no timezone)
pub type Timestamp = NaiveDateTime;

/// Result type for drive statistics operations
pub type Result<T> = std::result::Result<T, DriveStatsError>;

/// A single speed observation for one vehicle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Local date-time of the observation
    pub timestamp: Timestamp,
    /// Vehicle identifier as written in the log
    pub vehicle_id: String,
    /// Reported speed; zero means stopped
    pub speed: i64,
}

impl Sample {
    /// Create a new sample
    pub fn new(timestamp: Timestamp, vehicle_id: impl Into<String>, speed: i64) -> Self {
        Self {
            timestamp,
            vehicle_id: vehicle_id.into(),
            speed,
        }
    }
}

/// How an interval of time is attributed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activity {
    Travel,
    Parking,
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activity::Travel => write!(f, "travel"),
            Activity::Parking => write!(f, "parking"),
        }
    }
}

/// Accumulated travel and parking time for one vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveTotals {
    pub travel: Duration,
    pub parking: Duration,
}

impl Default for DriveTotals {
    fn default() -> Self {
        Self {
            travel: Duration::zero(),
            parking: Duration::zero(),
        }
    }
}

impl DriveTotals {
    /// Add an interval to the accumulator matching `activity`
    pub fn add(&mut self, activity: Activity, interval: Duration) {
        match activity {
            Activity::Travel => self.travel = self.travel + interval,
            Activity::Parking => self.parking = self.parking + interval,
        }
    }

    /// Total time accounted for
    pub fn total(&self) -> Duration {
        self.travel + self.parking
    }
}

/// Final output of the engine: totals per vehicle, ordered by vehicle id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriveReport {
    pub vehicles: BTreeMap<String, DriveTotals>,
}

impl DriveReport {
    /// Look up totals for a vehicle
    pub fn get(&self, vehicle_id: &str) -> Option<&DriveTotals> {
        self.vehicles.get(vehicle_id)
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Iterate vehicles in id order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &DriveTotals)> {
        self.vehicles.iter()
    }
}

/// Errors that can occur while reading, analyzing or reporting
#[derive(Debug, thiserror::Error)]
pub enum DriveStatsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("Invalid timestamp at line {line}: {value:?}")]
    InvalidTimestamp { line: usize, value: String },

    #[error("Invalid speed at line {line}: {value:?}")]
    InvalidSpeed { line: usize, value: String },

    #[error("Out-of-order sample for vehicle {vehicle_id}: {current} is before {previous}")]
    OutOfOrderSample {
        vehicle_id: String,
        previous: Timestamp,
        current: Timestamp,
    },

    #[error("Sample for vehicle {vehicle_id} at {time} is outside the observed day {day_start}-{day_end}")]
    OutsideObservedDay {
        vehicle_id: String,
        time: NaiveTime,
        day_start: NaiveTime,
        day_end: NaiveTime,
    },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DriveStatsError {
    /// Row-level problems the pipeline logs and skips instead of aborting on
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DriveStatsError::MalformedRow { .. }
                | DriveStatsError::InvalidTimestamp { .. }
                | DriveStatsError::InvalidSpeed { .. }
                | DriveStatsError::OutOfOrderSample { .. }
                | DriveStatsError::OutsideObservedDay { .. }
        )
    }
}
