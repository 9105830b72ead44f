// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Sentence substituted for the server-description marker
pub const DEFAULT_SERVER_DESCRIPTION: &str = "I am very tired. On my desk I have a Coke Zero bottle. \
It is glass. It is smaller than the plastic Coke Zero bottles, but I like it more.";

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub template: TemplateConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener configuration (used by the accept loop only)
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    #[serde(default = "default_backlog")]
    pub backlog: u32,
    #[serde(default)]
    pub max_connections: Option<u64>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_backlog() -> u32 {
    128
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
            backlog: default_backlog(),
            max_connections: None,
        }
    }
}

/// Content root configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    /// Directory resource paths are resolved against
    pub root: String,
    /// Reject resource paths that escape `root` after canonicalization
    #[serde(default)]
    pub confine_to_root: bool,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            confine_to_root: false,
        }
    }
}

/// Fixed response header values
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub content_type: String,
    pub server_name: String,
    pub connection: String,
    /// Upper bound on the bytes consumed while reading the request head
    pub max_head_size: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            content_type: "text/html".to_string(),
            server_name: "Jon's very own server".to_string(),
            connection: "close".to_string(),
            max_head_size: 8192,
        }
    }
}

/// Marker substitution configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TemplateConfig {
    #[serde(default = "default_server_description")]
    pub server_description: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_server_description() -> String {
    DEFAULT_SERVER_DESCRIPTION.to_string()
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            server_description: default_server_description(),
        }
    }
}

/// Performance configuration
///
/// Timeouts are in seconds; `0` disables the deadline.
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub read_timeout: u64,
    pub write_timeout: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            read_timeout: 30,
            write_timeout: 30,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "common".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            access_log: true,
            access_log_format: default_access_log_format(),
            access_log_file: None,
            error_log_file: None,
        }
    }
}
