// Configuration module entry point
// Layers config file, environment and defaults into a `Config`

mod types;

use std::net::SocketAddr;
use std::time::Duration;

// Re-export public types
pub use types::{
    Config, ContentConfig, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig,
    TemplateConfig, DEFAULT_SERVER_DESCRIPTION,
};

impl Config {
    /// Load configuration from specified file path (without extension)
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false));
        Self::finish(builder)
    }

    /// Load configuration from an in-memory toml document
    pub fn from_toml_str(toml: &str) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml));
        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        let settings = builder
            .add_source(
                config::Environment::with_prefix("SERVER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.backlog", 128)?
            .set_default("content.root", ".")?
            .set_default("content.confine_to_root", false)?
            .set_default("http.content_type", "text/html")?
            .set_default("http.server_name", "Jon's very own server")?
            .set_default("http.connection", "close")?
            .set_default("http.max_head_size", 8192)?
            .set_default("template.server_description", DEFAULT_SERVER_DESCRIPTION)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "common")?
            .build()?;

        settings.try_deserialize()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

impl PerformanceConfig {
    /// Read deadline, `None` when disabled
    pub const fn read_deadline(&self) -> Option<Duration> {
        seconds(self.read_timeout)
    }

    /// Write deadline, `None` when disabled
    pub const fn write_deadline(&self) -> Option<Duration> {
        seconds(self.write_timeout)
    }
}

const fn seconds(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}
