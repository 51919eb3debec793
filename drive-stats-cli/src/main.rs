//! Drive Statistics CLI Application
//!
//! Command-line front end of the drive-stats library:
//! - reads a comma-separated speed log
//! - splits each vehicle's day into travel and parking time
//! - writes the per-vehicle report (TXT/JSON)

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use drive_stats::{report, Analyzer, DriveStatsError, OutputFormat};
use std::path::{Path, PathBuf};

mod config;

use config::AppConfig;

/// Drive Statistics - split vehicle speed logs into travel and parking time
#[derive(Parser, Debug)]
#[command(name = "drive-stats-cli")]
#[command(about = "Compute per-vehicle travel and parking time from a speed log", long_about = None)]
#[command(version)]
struct Args {
    /// Speed log to read (comma-separated: "datetime",vehicle,speed)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Report file to write
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Longest stop in seconds still counted as travel (default: 120)
    #[arg(long, value_name = "SECS")]
    threshold_secs: Option<i64>,

    /// Report format: txt or json
    #[arg(short, long, value_name = "FORMAT")]
    format: Option<OutputFormat>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = parse_args()?;

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Drive Stats CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using drive-stats library v{}", drive_stats::VERSION);

    let config = load_app_config(&args)?;
    run(&args.input, &args.output, &config)
}

/// Parse arguments, turning usage errors into `InvalidArguments`
fn parse_args() -> Result<Args> {
    match Args::try_parse() {
        Ok(args) => Ok(args),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            // Print clap's usage text before bailing out
            let _ = e.print();
            Err(DriveStatsError::InvalidArguments(e.kind().to_string()).into())
        }
    }
}

/// Config file (if any) with command-line overrides applied
fn load_app_config(args: &Args) -> Result<AppConfig> {
    let base = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            let config = config::load_config(path)?;
            log::debug!("Configuration loaded successfully");
            config
        }
        None => AppConfig::default(),
    };

    let config = base.with_overrides(args.threshold_secs, args.format);
    config.engine.validate()?;
    Ok(config)
}

/// Read, analyze, write
///
/// A report that cannot be written is logged and the run still ends normally.
fn run(input: &Path, output: &Path, config: &AppConfig) -> Result<()> {
    log::info!("Start program");

    let analyzer = Analyzer::new(config.engine.clone())?;
    let analysis = analyzer.analyze_file(input)?;

    let stats = analysis.stats;
    log::info!(
        "Vehicles: {}, rows: {}, skipped rows: {}, rejected samples: {}",
        stats.vehicles,
        stats.rows_read,
        stats.rows_skipped,
        stats.samples_rejected
    );

    if let Err(e) = report::write_report(&analysis.report, output, config.output.format) {
        log::error!("Report not written to {:?}: {}", output, e);
        return Ok(());
    }

    log::info!("End program");
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
