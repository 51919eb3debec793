//! Report generation
//!
//! Writes the per-vehicle totals either as the plain text report or as JSON.
//! Vehicles are always emitted in id order.

use crate::types::{DriveReport, DriveStatsError, DriveTotals, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// Block separator of the text report
const SEPARATOR: &str = "----";

/// Output file format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Txt,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Txt => write!(f, "txt"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = DriveStatsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(OutputFormat::Txt),
            "json" => Ok(OutputFormat::Json),
            other => Err(DriveStatsError::InvalidArguments(format!(
                "unknown output format: {}",
                other
            ))),
        }
    }
}

/// Duration in hours rounded to one decimal place
///
/// Only whole hours and whole minutes count; seconds are dropped before
/// rounding half away from zero.
pub fn rounded_hours(duration: Duration) -> f64 {
    let hours = duration.num_hours() as f64;
    let minutes = (duration.num_minutes() % 60) as f64;
    (10.0 * (hours + minutes / 60.0)).round() / 10.0
}

fn render_vehicle(out: &mut String, vehicle_id: &str, totals: &DriveTotals) {
    out.push_str(&format!("id: {}\n", vehicle_id));
    out.push_str(&format!("время в пути: {:.1}h\n", rounded_hours(totals.travel)));
    out.push_str(&format!("время стоянки: {:.1}h\n", rounded_hours(totals.parking)));
    out.push_str(SEPARATOR);
    out.push('\n');
}

/// Render the plain text report
pub fn render_txt(report: &DriveReport) -> String {
    let mut out = String::new();
    out.push_str(SEPARATOR);
    out.push('\n');

    for (vehicle_id, totals) in report.iter() {
        render_vehicle(&mut out, vehicle_id, totals);
    }

    out
}

/// One vehicle in the JSON report
#[derive(Debug, Serialize)]
struct VehicleRecord<'a> {
    id: &'a str,
    travel_secs: i64,
    parking_secs: i64,
    travel_hours: f64,
    parking_hours: f64,
}

/// Render the report as a pretty-printed JSON array
pub fn render_json(report: &DriveReport) -> Result<String> {
    let records: Vec<VehicleRecord<'_>> = report
        .iter()
        .map(|(vehicle_id, totals)| VehicleRecord {
            id: vehicle_id,
            travel_secs: totals.travel.num_seconds(),
            parking_secs: totals.parking.num_seconds(),
            travel_hours: rounded_hours(totals.travel),
            parking_hours: rounded_hours(totals.parking),
        })
        .collect();

    serde_json::to_string_pretty(&records)
        .map_err(|e| DriveStatsError::Serialization(e.to_string()))
}

/// Render `report` in `format`
pub fn render(report: &DriveReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Txt => Ok(render_txt(report)),
        OutputFormat::Json => render_json(report),
    }
}

/// Write the report to `path`, replacing any existing file
pub fn write_report(report: &DriveReport, path: &Path, format: OutputFormat) -> Result<()> {
    log::info!("Start write output into {:?} ({})", path, format);

    let content = render(report, format)?;

    let file = File::create(path).map_err(|e| {
        log::error!("Failed to open {:?} for writing: {}", path, e);
        DriveStatsError::Io(e)
    })?;

    let mut writer = BufWriter::new(file);
    writer.write_all(content.as_bytes())?;
    writer.flush()?;

    log::info!("End write output ({} vehicles)", report.len());
    Ok(())
}
