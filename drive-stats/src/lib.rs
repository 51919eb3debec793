//! Drive Statistics Library
//!
//! Reads a speed log of many vehicles and splits each vehicle's day into
//! travel time and parking time.
//!
//! # Architecture
//!
//! - [`reader`] decodes comma-separated rows into [`Sample`]s, in file order
//! - [`engine`] runs the per-vehicle state machine and accumulates durations
//! - [`report`] renders the totals as text or JSON
//! - [`Analyzer`] wires reader and engine together for a single file
//!
//! Stops no longer than the configured threshold (120 seconds by default)
//! count as travel, so waiting at a traffic light is not parking.
//!
//! The library does NOT parse command lines or initialise logging; that lives
//! in the application layer (drive-stats-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use drive_stats::{report, Analyzer, EngineConfig, OutputFormat};
//! use std::path::Path;
//!
//! let config = EngineConfig::new().with_threshold_secs(120);
//! let analyzer = Analyzer::new(config).unwrap();
//!
//! let analysis = analyzer.analyze_file(Path::new("speed.csv")).unwrap();
//! report::write_report(&analysis.report, Path::new("report.txt"), OutputFormat::Txt).unwrap();
//! ```

// Public modules
pub mod analyzer;
pub mod config;
pub mod engine;
pub mod reader;
pub mod report;
pub mod types;

// Re-export main types for convenience
pub use analyzer::{Analysis, Analyzer, RunStats};
pub use config::EngineConfig;
pub use engine::{calc_drive_stats, classify, DriveState, DriveStatsEngine, MotionState};
pub use reader::SampleReader;
pub use report::OutputFormat;
pub use types::{
    Activity, DriveReport, DriveStatsError, DriveTotals, Result, Sample, Timestamp,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: default configuration is usable
        let analyzer = Analyzer::new(EngineConfig::default()).unwrap();
        assert_eq!(analyzer.config().threshold_secs, 120);
    }
}
