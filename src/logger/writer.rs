//! Log writer module
//!
//! Provides thread-safe log writing to files or stdout/stderr.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use super::{tagged, LogLevel, Logger};
use crate::config::LoggingConfig;

/// Log output target
enum LogTarget {
    /// Write to stdout
    Stdout,
    /// Write to stderr
    Stderr,
    /// Write to file
    File(Mutex<File>),
}

impl LogTarget {
    fn open(path: Option<&str>, fallback: Self) -> io::Result<Self> {
        match path {
            Some(p) => Ok(Self::File(Mutex::new(open_log_file(p)?))),
            None => Ok(fallback),
        }
    }

    fn write_line(&self, message: &str) {
        match self {
            Self::Stdout => println!("{message}"),
            Self::Stderr => eprintln!("{message}"),
            Self::File(file) => {
                if let Ok(mut f) = file.lock() {
                    let _ = writeln!(f, "{message}");
                }
            }
        }
    }
}

/// Thread-safe log writer
pub struct LogWriter {
    level: LogLevel,
    /// Access log target
    access: LogTarget,
    /// Error log target
    error: LogTarget,
}

impl LogWriter {
    /// Create a log writer from the logging section of the config
    ///
    /// Returns error if log files cannot be opened.
    pub fn new(config: &LoggingConfig) -> io::Result<Self> {
        Ok(Self {
            level: LogLevel::parse(&config.level),
            access: LogTarget::open(config.access_log_file.as_deref(), LogTarget::Stdout)?,
            error: LogTarget::open(config.error_log_file.as_deref(), LogTarget::Stderr)?,
        })
    }

    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl Logger for LogWriter {
    fn log(&self, level: LogLevel, message: &str) {
        if level > self.level {
            return;
        }
        let line = tagged(level, message);
        // Lifecycle chatter goes with the access stream, problems with the error stream
        if level <= LogLevel::Warn {
            self.error.write_line(&line);
        } else {
            self.access.write_line(&line);
        }
    }

    fn access(&self, line: &str) {
        self.access.write_line(line);
    }
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}
