/// Structured logging for the storm monitoring service
///
/// Installs a `log` backend that tags every line with the data source it
/// concerns (carried as the log target), timestamps it in UTC, and mirrors it
/// to an append-only file for daemon operation.

use chrono::Utc;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

/// Log targets, one per data source. Use with `log::info!(target: ...)`.
pub mod targets {
    pub const NHC: &str = "NHC";
    pub const NWS: &str = "NWS";
    pub const STATE: &str = "STATE";
    pub const SYSTEM: &str = "SYS";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Forecast cones (NHC or a local snapshot of them).
    Nhc,
    Nws,
    State,
    System,
}

impl DataSource {
    pub fn target(self) -> &'static str {
        match self {
            DataSource::Nhc => targets::NHC,
            DataSource::Nws => targets::NWS,
            DataSource::State => targets::STATE,
            DataSource::System => targets::SYSTEM,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target())
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - no active storms, empty feed, quiet season
    Expected,
    /// Unexpected failure - indicates service degradation or configuration issue
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classify a data source failure from its error text.
pub fn classify_failure(error_message: &str) -> FailureType {
    if error_message.starts_with("No data available") {
        FailureType::Expected
    } else if error_message.contains("HTTP") || error_message.contains("timed out") {
        FailureType::Unexpected
    } else if error_message.contains("Parse error") {
        // Parse errors suggest API changes or bugs
        FailureType::Unexpected
    } else {
        FailureType::Unknown
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

pub struct Logger {
    /// Minimum log level to display
    min_level: LevelFilter,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    pub fn new(min_level: LevelFilter, log_file: Option<String>, console_timestamps: bool) -> Self {
        Self {
            min_level,
            log_file,
            console_timestamps,
        }
    }

    fn format_entry(record: &Record) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        format!(
            "{} {:<5} {}: {}",
            timestamp,
            level_label(record.level()),
            record.target(),
            record.args()
        )
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

fn level_label(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug | Level::Trace => "DEBUG",
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.min_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let log_entry = Self::format_entry(record);
        let source = record.target();

        // Console output
        if self.console_timestamps {
            match record.level() {
                Level::Error => eprintln!("{}", log_entry),
                Level::Warn => eprintln!("   {}", log_entry),
                Level::Info => println!("   {}", record.args()),
                Level::Debug | Level::Trace => println!("   [DEBUG] {}", record.args()),
            }
        } else {
            match record.level() {
                Level::Error => eprintln!("   ✗ {}: {}", source, record.args()),
                Level::Warn => eprintln!("   ⚠ {}: {}", source, record.args()),
                Level::Info => println!("   {}", record.args()),
                Level::Debug | Level::Trace => {} // Skip debug in non-timestamp mode
            }
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn flush(&self) {}
}

/// Parses a level name from config ("debug", "info", "warn", "error", "off").
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    LevelFilter::from_str(name.trim()).ok()
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Install the service logger as the global `log` backend.
///
/// Only the first call takes effect; later calls return `false`.
pub fn init_logger(min_level: LevelFilter, log_file: Option<&str>, console_timestamps: bool) -> bool {
    let logger = Logger::new(min_level, log_file.map(String::from), console_timestamps);
    match log::set_boxed_logger(Box::new(logger)) {
        Ok(()) => {
            log::set_max_level(min_level);
            true
        }
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a data source failure with automatic classification
pub fn log_source_failure(source: DataSource, operation: &str, err: &dyn std::error::Error) {
    let error_msg = err.to_string();
    let failure_type = classify_failure(&error_msg);

    let message = format!("{} failed [{}]: {}", operation, failure_type, error_msg);

    match failure_type {
        FailureType::Expected => log::debug!(target: source.target(), "{}", message),
        FailureType::Unexpected => log::error!(target: source.target(), "{}", message),
        FailureType::Unknown => log::warn!(target: source.target(), "{}", message),
    }
}

// ---------------------------------------------------------------------------
// Collection Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of one signal collection pass
pub fn log_collection_summary(total: usize, successful: usize, failed: usize) {
    let message = format!(
        "Signal collection complete: {}/{} sources successful, {} failed",
        successful, total, failed
    );

    log::log!(target: targets::SYSTEM, summary_level(successful, failed), "{}", message);
}

/// Info when everything answered, error when nothing did, warn in between.
pub fn summary_level(successful: usize, failed: usize) -> Level {
    if failed == 0 {
        Level::Info
    } else if successful == 0 {
        Level::Error
    } else {
        Level::Warn
    }
}
