//! Logger module
//!
//! Provides logging utilities for the HTTP server including:
//! - The `Logger` trait handed to every connection handler
//! - Access logging with multiple formats
//! - File-based logging support

mod format;
pub mod writer;

pub use format::{AccessLogEntry, Outcome};
pub use writer::LogWriter;

use std::fmt;
use std::net::SocketAddr;

use crate::config::Config;

/// Severity of a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    /// Parse a config level string, falling back to `Info`
    pub fn parse(level: &str) -> Self {
        match level.trim().to_ascii_lowercase().as_str() {
            "error" => Self::Error,
            "warn" | "warning" => Self::Warn,
            "debug" | "trace" => Self::Debug,
            _ => Self::Info,
        }
    }

    const fn tag(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Observability sink shared by the server loop and connection handlers
pub trait Logger: Send + Sync {
    /// Write a diagnostic message
    fn log(&self, level: LogLevel, message: &str);

    /// Write a pre-formatted access log line
    fn access(&self, line: &str);

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }
}

/// Prefix a message with its level tag
pub fn tagged(level: LogLevel, message: &str) -> String {
    format!("[{level}] {message}")
}

pub fn log_server_start(logger: &dyn Logger, addr: &SocketAddr, config: &Config) {
    logger.info("======================================");
    logger.info("Server started successfully");
    logger.info(&format!("Listening on: http://{addr}"));
    logger.info(&format!("Content root: {}", config.content.root));
    logger.info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        logger.info(&format!("Worker threads: {workers}"));
    }
    if let Some(max_conn) = config.server.max_connections {
        logger.info(&format!("Max connections: {max_conn}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        logger.info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        logger.info(&format!("Error log: {path}"));
    }
    logger.info("======================================");
}
