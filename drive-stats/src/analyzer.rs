//! Main analyzer API
//!
//! The Analyzer wires the sample reader into the engine and reports what was
//! read along the way.

use crate::config::EngineConfig;
use crate::engine::DriveStatsEngine;
use crate::reader::{SampleIter, SampleReader};
use crate::types::{DriveReport, Result};
use std::io::BufRead;
use std::path::Path;

/// Counters describing one analysis run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Non-blank input rows
    pub rows_read: usize,
    /// Rows dropped by the reader (too few fields, bad timestamp or speed)
    pub rows_skipped: usize,
    /// Samples applied to the engine
    pub samples_processed: usize,
    /// Samples rejected by the engine (out of order or outside the day)
    pub samples_rejected: usize,
    /// Vehicles in the report
    pub vehicles: usize,
}

/// Result of analyzing one log
#[derive(Debug, Clone)]
pub struct Analysis {
    pub report: DriveReport,
    pub stats: RunStats,
}

/// Entry point: speed log in, drive report out
pub struct Analyzer {
    config: EngineConfig,
}

impl Analyzer {
    /// Create an analyzer with a validated configuration
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze a speed log file
    ///
    /// # Example
    /// ```no_run
    /// use drive_stats::{Analyzer, EngineConfig};
    /// use std::path::Path;
    ///
    /// let analyzer = Analyzer::new(EngineConfig::default()).unwrap();
    /// let analysis = analyzer.analyze_file(Path::new("speed.csv")).unwrap();
    /// for (id, totals) in analysis.report.iter() {
    ///     println!("{}: {}s moving", id, totals.travel.num_seconds());
    /// }
    /// ```
    pub fn analyze_file(&self, path: &Path) -> Result<Analysis> {
        log::info!("Start parse file from {:?}", path);
        let samples = SampleReader::open(path)?;
        let analysis = self.run(samples)?;
        log::info!("End parse file");
        Ok(analysis)
    }

    /// Analyze a speed log from any buffered source
    pub fn analyze_reader<R: BufRead>(&self, reader: R) -> Result<Analysis> {
        self.run(SampleReader::from_reader(reader))
    }

    fn run<R: BufRead>(&self, mut samples: SampleIter<R>) -> Result<Analysis> {
        let mut engine = DriveStatsEngine::new(self.config.clone());
        engine.consume(samples.by_ref())?;

        let reader_stats = samples.stats();
        let engine_stats = engine.stats();
        let report = engine.finish();

        let stats = RunStats {
            rows_read: reader_stats.rows_read,
            rows_skipped: reader_stats.rows_skipped,
            samples_processed: engine_stats.samples_processed,
            samples_rejected: engine_stats.samples_rejected,
            vehicles: report.len(),
        };
        log::debug!("Run stats: {:?}", stats);

        Ok(Analysis { report, stats })
    }
}
