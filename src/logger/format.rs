//! Access log format module
//!
//! Supports multiple log formats:
//! - `common` (Common Log Format - CLF)
//! - `json` (JSON structured logging)
//! - Custom patterns with variables

use chrono::Local;

/// How the requested resource was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// File content was served
    Served,
    /// The not-found payload was served
    NotFound,
}

impl Outcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Served => "served",
            Self::NotFound => "not_found",
        }
    }
}

/// Access log entry for one request/response exchange
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    /// Client address, `-` when unknown
    pub remote_addr: String,
    /// Request timestamp
    pub time: chrono::DateTime<Local>,
    /// First recognized request line, if any
    pub request_line: Option<String>,
    /// Resource path extracted from the request line
    pub path: Option<String>,
    pub outcome: Outcome,
    /// Response status code
    pub status: u16,
    /// Response body size in bytes
    pub body_bytes: usize,
    /// Request processing time in microseconds
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Create a new access log entry with current timestamp
    pub fn new(remote_addr: Option<String>) -> Self {
        Self {
            remote_addr: remote_addr.unwrap_or_else(|| "-".to_string()),
            time: Local::now(),
            request_line: None,
            path: None,
            outcome: Outcome::NotFound,
            status: 200,
            body_bytes: 0,
            request_time_us: 0,
        }
    }

    /// Format the log entry according to the specified format
    pub fn format(&self, format: &str) -> String {
        match format {
            "common" => self.format_common(),
            "json" => self.format_json(),
            custom => self.format_custom(custom),
        }
    }

    /// Common Log Format (CLF)
    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.request_line.as_deref().unwrap_or("-"),
            self.status,
            self.body_bytes,
        )
    }

    /// JSON structured log format
    fn format_json(&self) -> String {
        let optional = |value: Option<&str>| {
            value.map_or_else(|| "null".to_string(), |v| format!("\"{}\"", escape_json(v)))
        };

        format!(
            r#"{{"remote_addr":"{}","time":"{}","request":{},"path":{},"outcome":"{}","status":{},"body_bytes":{},"request_time_us":{}}}"#,
            escape_json(&self.remote_addr),
            self.time.to_rfc3339(),
            optional(self.request_line.as_deref()),
            optional(self.path.as_deref()),
            self.outcome.as_str(),
            self.status,
            self.body_bytes,
            self.request_time_us,
        )
    }

    /// Custom format with variable substitution
    ///
    /// Supported variables:
    /// - `$remote_addr` - Client address
    /// - `$time_local` - Local time in Common Log Format
    /// - `$time_iso8601` - ISO 8601 timestamp
    /// - `$request` - Request line as received
    /// - `$path` - Resolved resource path
    /// - `$outcome` - `served` or `not_found`
    /// - `$status` - Response status code
    /// - `$body_bytes_sent` - Response body size
    /// - `$request_time` - Request processing time in seconds (3 decimal places)
    fn format_custom(&self, pattern: &str) -> String {
        let mut result = pattern.to_string();

        result = result.replace("$remote_addr", &self.remote_addr);
        result = result.replace(
            "$time_local",
            &self.time.format("%d/%b/%Y:%H:%M:%S %z").to_string(),
        );
        result = result.replace("$time_iso8601", &self.time.to_rfc3339());
        // $request_time must come before $request
        #[allow(clippy::cast_precision_loss)]
        let request_time = self.request_time_us as f64 / 1_000_000.0;
        result = result.replace("$request_time", &format!("{request_time:.3}"));
        result = result.replace("$request", self.request_line.as_deref().unwrap_or("-"));
        result = result.replace("$path", self.path.as_deref().unwrap_or("-"));
        result = result.replace("$outcome", self.outcome.as_str());
        result = result.replace("$status", &self.status.to_string());
        result = result.replace("$body_bytes_sent", &self.body_bytes.to_string());

        result
    }
}

/// Escape special characters for JSON string
fn escape_json(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}
