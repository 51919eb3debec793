//! Comma-separated speed log reader
//!
//! Each row is `"<yyyy-MM-dd hh:mm:ss>",<vehicle id>,<speed>[,...]`.
//! The first field is wrapped in a one-character quote on both sides which is
//! stripped before decoding. Fields past the third are ignored.
//!
//! Rows that cannot be decoded are yielded as recoverable errors so the caller
//! decides whether to log and continue; the iterator itself never stops on a
//! bad row. Only I/O failures end the stream.

use crate::types::{DriveStatsError, Result, Sample, Timestamp};
use chrono::NaiveDateTime;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Date-time pattern of the first field
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Minimum number of comma-separated fields in a row
const REQUIRED_FIELDS: usize = 3;

/// Speed log reader
pub struct SampleReader;

impl SampleReader {
    /// Open a log file and return an iterator over its samples
    pub fn open(path: &Path) -> Result<SampleIter<BufReader<File>>> {
        log::info!("Opening speed log: {:?}", path);

        let file = File::open(path).map_err(|e| {
            log::error!("Failed to open speed log {:?}: {}", path, e);
            DriveStatsError::Io(e)
        })?;

        Ok(Self::from_reader(BufReader::new(file)))
    }

    /// Read samples from any buffered source
    pub fn from_reader<R: BufRead>(reader: R) -> SampleIter<R> {
        SampleIter {
            reader,
            line_buf: Vec::new(),
            line_no: 0,
            stats: ReaderStats::default(),
        }
    }
}

/// Row counters kept while reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Non-blank rows seen
    pub rows_read: usize,
    /// Rows that could not be decoded into a sample
    pub rows_skipped: usize,
}

/// Iterator over samples of a speed log, in file order
pub struct SampleIter<R> {
    reader: R,
    line_buf: Vec<u8>,
    line_no: usize,
    stats: ReaderStats,
}

impl<R> SampleIter<R> {
    /// Counters for the rows consumed so far
    pub fn stats(&self) -> ReaderStats {
        self.stats
    }
}

impl<R: BufRead> Iterator for SampleIter<R> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line_buf.clear();
            match self.reader.read_until(b'\n', &mut self.line_buf) {
                Ok(0) => return None,
                Ok(_) => self.line_no += 1,
                Err(e) => return Some(Err(DriveStatsError::Io(e))),
            }

            // Each row is decoded on its own so one badly encoded row is skippable
            let row = match std::str::from_utf8(&self.line_buf) {
                Ok(text) => {
                    let line = text.trim_end_matches(['\r', '\n']);
                    if line.trim().is_empty() {
                        continue;
                    }
                    parse_row(line, self.line_no)
                }
                Err(_) => Err(DriveStatsError::MalformedRow {
                    line: self.line_no,
                    reason: "invalid UTF-8".to_string(),
                }),
            };

            self.stats.rows_read += 1;
            if row.is_err() {
                self.stats.rows_skipped += 1;
            }
            return Some(row);
        }
    }
}

/// Decode one row into a sample
///
/// `line` is used only for error reporting.
pub fn parse_row(row: &str, line: usize) -> Result<Sample> {
    let fields: Vec<&str> = row.split(',').collect();
    if fields.len() < REQUIRED_FIELDS {
        return Err(DriveStatsError::MalformedRow {
            line,
            reason: format!(
                "expected at least {} fields, found {}",
                REQUIRED_FIELDS,
                fields.len()
            ),
        });
    }

    let timestamp = parse_timestamp(fields[0], line)?;

    let vehicle_id = fields[1].trim();
    if vehicle_id.is_empty() {
        return Err(DriveStatsError::MalformedRow {
            line,
            reason: "empty vehicle id".to_string(),
        });
    }

    let speed_field = fields[2].trim();
    let speed = speed_field
        .parse::<i64>()
        .map_err(|_| DriveStatsError::InvalidSpeed {
            line,
            value: speed_field.to_string(),
        })?;

    Ok(Sample::new(timestamp, vehicle_id, speed))
}

/// Strip the one-character wrapper and decode the date-time
fn parse_timestamp(field: &str, line: usize) -> Result<Timestamp> {
    let quoted = field.trim();
    let inner = strip_wrapper(quoted);

    NaiveDateTime::parse_from_str(inner, TIMESTAMP_FORMAT).map_err(|_| {
        DriveStatsError::InvalidTimestamp {
            line,
            value: quoted.to_string(),
        }
    })
}

/// Drop the first and last character, whatever they are
fn strip_wrapper(field: &str) -> &str {
    let mut chars = field.chars();
    if chars.next().is_none() || chars.next_back().is_none() {
        return "";
    }
    chars.as_str()
}
