//! Drive statistics engine
//!
//! Splits each vehicle's day into travel and parking time. Every vehicle runs
//! its own small state machine (`Unseen -> Moving | Stopped`) fed by speed
//! samples in arrival order:
//!
//! | previous | current | attributed interval                       |
//! |----------|---------|-------------------------------------------|
//! | unseen   | any     | day start -> sample, by the gap rule      |
//! | moving   | stopped | previous -> current, travel               |
//! | stopped  | stopped | nothing yet                               |
//! | stopped  | moving  | zero-run start -> current, by the gap rule|
//! | moving   | moving  | previous -> current, travel               |
//!
//! After the input is exhausted each vehicle is closed out: an unresolved
//! trailing stop is classified, then the gap to the end of the day.
//!
//! The gap rule: an interval longer than the threshold is parking, anything
//! up to and including the threshold is travel.
//!
//! All intervals are time-of-day differences; the date part of a timestamp is
//! ignored.

use crate::config::EngineConfig;
use crate::types::{
    Activity, DriveReport, DriveStatsError, DriveTotals, Result, Sample, Timestamp,
};
use chrono::{Duration, NaiveTime};
use std::collections::HashMap;

/// Motion state derived from the last reported speed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Moving,
    Stopped,
}

impl MotionState {
    pub fn from_speed(speed: i64) -> Self {
        if speed == 0 {
            MotionState::Stopped
        } else {
            MotionState::Moving
        }
    }
}

/// Running state of one vehicle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveState {
    pub vehicle_id: String,
    pub totals: DriveTotals,
    pub last_sample_time: Timestamp,
    pub last_speed: i64,
    /// Start of the current zero-speed run; only meaningful while stopped
    pub zero_run_start: Timestamp,
}

impl DriveState {
    pub fn motion(&self) -> MotionState {
        MotionState::from_speed(self.last_speed)
    }

    /// True if the vehicle ended on a stop spanning more than one sample
    pub fn has_open_stop(&self) -> bool {
        self.motion() == MotionState::Stopped && self.zero_run_start != self.last_sample_time
    }
}

/// Counters kept by the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub samples_processed: usize,
    pub samples_rejected: usize,
}

/// Classify an interval by the gap rule
pub fn classify(config: &EngineConfig, interval: Duration) -> Activity {
    if interval > config.threshold() {
        Activity::Parking
    } else {
        Activity::Travel
    }
}

/// Time-of-day difference between two timestamps
fn time_of_day_delta(from: NaiveTime, to: NaiveTime) -> Duration {
    to.signed_duration_since(from)
}

/// Per-vehicle travel/parking accumulator
pub struct DriveStatsEngine {
    config: EngineConfig,
    vehicles: HashMap<String, DriveState>,
    stats: EngineStats,
}

impl DriveStatsEngine {
    /// Create an engine with the given configuration
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            vehicles: HashMap::new(),
            stats: EngineStats::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Current state of a vehicle, if it has been seen
    pub fn vehicle(&self, vehicle_id: &str) -> Option<&DriveState> {
        self.vehicles.get(vehicle_id)
    }

    /// Apply one sample
    ///
    /// A sample earlier (by time-of-day) than the vehicle's previous sample is
    /// rejected with [`DriveStatsError::OutOfOrderSample`], and one outside the
    /// configured day with [`DriveStatsError::OutsideObservedDay`]. Either way
    /// the vehicle's state is left untouched.
    pub fn process(&mut self, sample: Sample) -> Result<()> {
        let time = sample.timestamp.time();
        if time < self.config.day_start || time > self.config.day_end {
            self.stats.samples_rejected += 1;
            return Err(DriveStatsError::OutsideObservedDay {
                vehicle_id: sample.vehicle_id,
                time,
                day_start: self.config.day_start,
                day_end: self.config.day_end,
            });
        }

        if let Some(state) = self.vehicles.get_mut(&sample.vehicle_id) {
            if time < state.last_sample_time.time() {
                self.stats.samples_rejected += 1;
                return Err(DriveStatsError::OutOfOrderSample {
                    vehicle_id: sample.vehicle_id,
                    previous: state.last_sample_time,
                    current: sample.timestamp,
                });
            }
            advance(&self.config, state, &sample);
        } else {
            let state = start(&self.config, &sample);
            self.vehicles.insert(sample.vehicle_id, state);
        }

        self.stats.samples_processed += 1;
        Ok(())
    }

    /// Feed a reader stream into the engine
    ///
    /// Recoverable errors (bad rows, rejected samples) are logged and skipped;
    /// anything else aborts the run.
    pub fn consume<I>(&mut self, samples: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<Sample>>,
    {
        for item in samples {
            match item.and_then(|sample| self.process(sample)) {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => log::warn!("Skipping sample: {}", e),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Close out every vehicle and produce the final report
    pub fn finish(self) -> DriveReport {
        log::debug!("Closing out {} vehicle(s)", self.vehicles.len());

        let mut report = DriveReport::default();
        for (vehicle_id, mut state) in self.vehicles {
            close_out(&self.config, &mut state);
            report.vehicles.insert(vehicle_id, state.totals);
        }
        report
    }
}

/// First sample of a vehicle: attribute the gap since the start of the day
fn start(config: &EngineConfig, sample: &Sample) -> DriveState {
    let mut totals = DriveTotals::default();

    let gap = time_of_day_delta(config.day_start, sample.timestamp.time());
    let activity = classify(config, gap);
    totals.add(activity, gap);

    log::trace!(
        "{}: first sample at {}, day-start gap {}s -> {}",
        sample.vehicle_id,
        sample.timestamp,
        gap.num_seconds(),
        activity
    );

    DriveState {
        vehicle_id: sample.vehicle_id.clone(),
        totals,
        last_sample_time: sample.timestamp,
        last_speed: sample.speed,
        zero_run_start: sample.timestamp,
    }
}

/// Subsequent sample of a known vehicle
fn advance(config: &EngineConfig, state: &mut DriveState, sample: &Sample) {
    let now = sample.timestamp;

    match (state.motion(), MotionState::from_speed(sample.speed)) {
        (MotionState::Moving, MotionState::Stopped) => {
            let interval = time_of_day_delta(state.last_sample_time.time(), now.time());
            state.totals.add(Activity::Travel, interval);
            state.zero_run_start = now;
        }
        (MotionState::Stopped, MotionState::Stopped) => {}
        (MotionState::Stopped, MotionState::Moving) => {
            let interval = time_of_day_delta(state.zero_run_start.time(), now.time());
            let activity = classify(config, interval);
            state.totals.add(activity, interval);
            log::trace!(
                "{}: stop {} -> {} ({}s) -> {}",
                state.vehicle_id,
                state.zero_run_start,
                now,
                interval.num_seconds(),
                activity
            );
        }
        (MotionState::Moving, MotionState::Moving) => {
            let interval = time_of_day_delta(state.last_sample_time.time(), now.time());
            state.totals.add(Activity::Travel, interval);
        }
    }

    state.last_speed = sample.speed;
    state.last_sample_time = now;
}

/// Resolve a trailing stop, then attribute the gap to the end of the day
fn close_out(config: &EngineConfig, state: &mut DriveState) {
    if state.has_open_stop() {
        let interval = time_of_day_delta(
            state.zero_run_start.time(),
            state.last_sample_time.time(),
        );
        let activity = classify(config, interval);
        state.totals.add(activity, interval);
        log::trace!(
            "{}: trailing stop of {}s -> {}",
            state.vehicle_id,
            interval.num_seconds(),
            activity
        );
    }

    let gap = time_of_day_delta(state.last_sample_time.time(), config.day_end);
    state.totals.add(classify(config, gap), gap);
}

/// Run the engine over a complete sample sequence
///
/// Out-of-order samples are logged and skipped.
pub fn calc_drive_stats<I>(samples: I, config: EngineConfig) -> DriveReport
where
    I: IntoIterator<Item = Sample>,
{
    log::info!("Start calculation of drive statistics");

    let mut engine = DriveStatsEngine::new(config);
    for sample in samples {
        if let Err(e) = engine.process(sample) {
            log::warn!("Skipping sample: {}", e);
        }
    }

    let report = engine.finish();
    log::info!("End calculation of drive statistics ({} vehicles)", report.len());
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const FULL_DAY: i64 = 86399;

    fn at(h: u32, m: u32, s: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn sample(h: u32, m: u32, s: u32, id: &str, speed: i64) -> Sample {
        Sample::new(at(h, m, s), id, speed)
    }

    fn secs(d: Duration) -> i64 {
        d.num_seconds()
    }

    #[test]
    fn test_threshold_boundary() {
        let config = EngineConfig::default();

        assert_eq!(classify(&config, Duration::seconds(120)), Activity::Travel);
        assert_eq!(classify(&config, Duration::seconds(121)), Activity::Parking);
        assert_eq!(classify(&config, Duration::zero()), Activity::Travel);
    }

    #[test]
    fn test_day_start_gap_boundary() {
        let report = calc_drive_stats(
            vec![sample(0, 2, 0, "A", 10), sample(0, 2, 1, "B", 10)],
            EngineConfig::default(),
        );

        // Both end moving; end gaps are long and go to parking
        let a = report.get("A").unwrap();
        assert_eq!(secs(a.travel), 120);
        assert_eq!(secs(a.parking), FULL_DAY - 120);

        let b = report.get("B").unwrap();
        assert_eq!(secs(b.travel), 0);
        assert_eq!(secs(b.parking), FULL_DAY);
    }

    #[test]
    fn test_interleaved_vehicles() {
        let samples = vec![
            sample(8, 0, 0, "V1", 50),
            sample(8, 15, 0, "V2", 0),
            sample(8, 16, 0, "V2", 0),
            sample(8, 30, 0, "V1", 0),
            sample(8, 31, 0, "V1", 0),
            sample(8, 17, 1, "V2", 20),
            sample(8, 32, 0, "V1", 40),
            sample(18, 0, 0, "V1", 0),
        ];

        let report = calc_drive_stats(samples, EngineConfig::default());
        assert_eq!(report.len(), 2);

        // 1800 (moving->stopped) + 120 (stop at threshold) + 34080 (moving->stopped)
        let v1 = report.get("V1").unwrap();
        assert_eq!(secs(v1.travel), 36000);
        assert_eq!(secs(v1.parking), 28800 + 21599);

        // 121s stop is one second over the threshold
        let v2 = report.get("V2").unwrap();
        assert_eq!(secs(v2.travel), 0);
        assert_eq!(secs(v2.parking), FULL_DAY);
    }

    #[test]
    fn test_totals_cover_whole_day() {
        let samples = vec![
            sample(5, 10, 7, "A", 0),
            sample(6, 0, 0, "B", 30),
            sample(6, 0, 30, "A", 12),
            sample(6, 1, 0, "A", 0),
            sample(6, 2, 59, "A", 0),
            sample(9, 45, 0, "B", 0),
            sample(12, 0, 0, "A", 70),
            sample(12, 0, 0, "A", 70),
            sample(23, 59, 0, "C", 0),
            sample(23, 59, 30, "C", 0),
        ];

        let report = calc_drive_stats(samples, EngineConfig::default());
        assert_eq!(report.len(), 3);
        for (id, totals) in report.iter() {
            assert_eq!(secs(totals.total()), FULL_DAY, "vehicle {}", id);
        }
    }

    #[test]
    fn test_moving_to_moving_never_parks() {
        let samples = vec![
            sample(10, 0, 0, "V", 60),
            sample(10, 10, 0, "V", 55),
            sample(23, 59, 0, "V", 40),
        ];

        let report = calc_drive_stats(samples, EngineConfig::default());
        let totals = report.get("V").unwrap();

        // Only the day-start gap is parking
        assert_eq!(secs(totals.parking), 36000);
        assert_eq!(secs(totals.travel), 600 + 49740 + 59);
    }

    #[test]
    fn test_moving_to_stopped_is_travel_regardless_of_length() {
        let mut engine = DriveStatsEngine::new(EngineConfig::default());
        engine.process(sample(8, 0, 0, "V", 50)).unwrap();
        engine.process(sample(9, 0, 0, "V", 0)).unwrap();

        let state = engine.vehicle("V").unwrap();
        assert_eq!(secs(state.totals.travel), 3600);
        assert_eq!(state.zero_run_start, at(9, 0, 0));
        assert_eq!(state.motion(), MotionState::Stopped);
        assert!(!state.has_open_stop());
    }

    #[test]
    fn test_stopped_run_resolves_when_moving_again() {
        let mut engine = DriveStatsEngine::new(EngineConfig::default());
        engine.process(sample(7, 0, 0, "V", 30)).unwrap();
        engine.process(sample(7, 5, 0, "V", 0)).unwrap();
        engine.process(sample(7, 6, 0, "V", 0)).unwrap();
        engine.process(sample(7, 7, 0, "V", 0)).unwrap();

        let before = engine.vehicle("V").unwrap().totals;
        assert!(engine.vehicle("V").unwrap().has_open_stop());

        engine.process(sample(7, 12, 0, "V", 30)).unwrap();
        let after = engine.vehicle("V").unwrap().totals;

        // Whole 7:05 -> 7:12 stop resolved at once
        assert_eq!(secs(after.parking - before.parking), 420);
        assert_eq!(after.travel, before.travel);
    }

    #[test]
    fn test_scenario_stop_at_midnight_then_drive() {
        let samples = vec![sample(0, 0, 0, "V1", 0), sample(0, 5, 0, "V1", 50)];
        let report = calc_drive_stats(samples, EngineConfig::default());
        let v1 = report.get("V1").unwrap();

        // 0s start gap travel, 300s stop parking, 86099s end gap parking
        assert_eq!(secs(v1.travel), 0);
        assert_eq!(secs(v1.parking), 300 + 86099);
    }

    #[test]
    fn test_trailing_stop_closeout() {
        let samples = vec![sample(12, 0, 0, "V", 0), sample(12, 1, 30, "V", 0)];
        let report = calc_drive_stats(samples, EngineConfig::default());
        let totals = report.get("V").unwrap();

        // 90s closeout is travel; start and end gaps are parking
        assert_eq!(secs(totals.travel), 90);
        assert_eq!(secs(totals.parking), 43200 + 43109);
    }

    #[test]
    fn test_trailing_stop_over_threshold_is_parking() {
        let samples = vec![sample(12, 0, 0, "V", 0), sample(12, 2, 1, "V", 0)];
        let report = calc_drive_stats(samples, EngineConfig::default());
        let totals = report.get("V").unwrap();

        // 121s closeout is parking, like both boundary gaps
        assert_eq!(secs(totals.travel), 0);
        assert_eq!(secs(totals.parking), FULL_DAY);
    }

    #[test]
    fn test_trailing_stop_at_threshold_is_travel() {
        let samples = vec![sample(12, 0, 0, "V", 0), sample(12, 2, 0, "V", 0)];
        let report = calc_drive_stats(samples, EngineConfig::default());
        let totals = report.get("V").unwrap();

        assert_eq!(secs(totals.travel), 120);
        assert_eq!(secs(totals.parking), FULL_DAY - 120);
    }

    #[test]
    fn test_single_zero_sample_has_no_closeout() {
        let samples = vec![sample(23, 58, 0, "V", 0)];
        let report = calc_drive_stats(samples, EngineConfig::default());
        let totals = report.get("V").unwrap();

        // 119s to day end is travel
        assert_eq!(secs(totals.travel), 119);
        assert_eq!(secs(totals.parking), 86280);
    }

    #[test]
    fn test_out_of_order_sample_rejected() {
        let mut engine = DriveStatsEngine::new(EngineConfig::default());
        engine.process(sample(10, 0, 0, "V", 20)).unwrap();
        let before = engine.vehicle("V").unwrap().clone();

        let err = engine.process(sample(9, 59, 0, "V", 0)).unwrap_err();
        assert!(matches!(err, DriveStatsError::OutOfOrderSample { .. }));
        assert_eq!(engine.vehicle("V").unwrap(), &before);
        assert_eq!(
            engine.stats(),
            EngineStats {
                samples_processed: 1,
                samples_rejected: 1
            }
        );
    }

    #[test]
    fn test_consume_skips_recoverable_errors() {
        let items = vec![
            Ok(sample(1, 0, 0, "V", 10)),
            Err(DriveStatsError::MalformedRow {
                line: 2,
                reason: "expected at least 3 fields, found 2".to_string(),
            }),
            Ok(sample(1, 1, 0, "V", 10)),
        ];

        let mut engine = DriveStatsEngine::new(EngineConfig::default());
        engine.consume(items).unwrap();
        assert_eq!(engine.stats().samples_processed, 2);

        let io = vec![Err(DriveStatsError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "truncated",
        )))];
        assert!(engine.consume(io).is_err());
    }

    #[test]
    fn test_custom_threshold() {
        let samples = vec![
            sample(0, 0, 0, "V", 0),
            sample(0, 5, 0, "V", 30),
            sample(23, 55, 0, "V", 30),
        ];

        let strict = calc_drive_stats(samples.clone(), EngineConfig::default());
        let lenient = calc_drive_stats(samples, EngineConfig::new().with_threshold_secs(600));

        // 300s stop plus the 299s gap to day end
        assert_eq!(secs(strict.get("V").unwrap().parking), 599);
        assert_eq!(secs(lenient.get("V").unwrap().parking), 0);
        assert_eq!(secs(lenient.get("V").unwrap().travel), FULL_DAY);
    }

    #[test]
    fn test_huge_threshold_counts_everything_as_travel() {
        let samples = vec![sample(10, 0, 0, "V", 0), sample(14, 0, 0, "V", 30)];
        let report = calc_drive_stats(samples, EngineConfig::new().with_threshold_secs(i64::MAX));
        let totals = report.get("V").unwrap();

        assert_eq!(secs(totals.travel), FULL_DAY);
        assert_eq!(secs(totals.parking), 0);
    }

    #[test]
    fn test_custom_day_bounds() {
        let config = EngineConfig::new()
            .with_day_start(NaiveTime::from_hms_opt(6, 0, 0).unwrap())
            .with_day_end(NaiveTime::from_hms_opt(22, 0, 0).unwrap());

        let report = calc_drive_stats(
            vec![sample(6, 1, 0, "V", 10), sample(21, 59, 0, "V", 10)],
            config.clone(),
        );
        let totals = report.get("V").unwrap();

        assert_eq!(totals.total(), config.day_length());
        assert_eq!(secs(totals.travel), 60 + 57480 + 60);
    }

    #[test]
    fn test_samples_outside_day_bounds_rejected() {
        let config = EngineConfig::new()
            .with_day_start(NaiveTime::from_hms_opt(6, 0, 0).unwrap())
            .with_day_end(NaiveTime::from_hms_opt(22, 0, 0).unwrap());

        let mut engine = DriveStatsEngine::new(config.clone());
        let err = engine.process(sample(5, 0, 0, "V", 10)).unwrap_err();
        assert!(matches!(err, DriveStatsError::OutsideObservedDay { .. }));
        assert!(engine.vehicle("V").is_none());

        engine.process(sample(7, 0, 0, "V", 10)).unwrap();
        assert!(engine.process(sample(22, 0, 1, "V", 0)).is_err());
        assert_eq!(engine.stats().samples_rejected, 2);

        let report = engine.finish();
        assert_eq!(report.get("V").unwrap().total(), config.day_length());
    }

    #[test]
    fn test_idempotent() {
        let samples = vec![
            sample(3, 0, 0, "X", 0),
            sample(3, 1, 0, "Y", 40),
            sample(3, 4, 0, "X", 25),
            sample(4, 0, 0, "Y", 0),
        ];

        let first = calc_drive_stats(samples.clone(), EngineConfig::default());
        let second = calc_drive_stats(samples, EngineConfig::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_input() {
        let report = calc_drive_stats(Vec::new(), EngineConfig::default());
        assert!(report.is_empty());
    }
}
