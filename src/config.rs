//! Configuration loading and constants.
//!
//! Loads configuration from an optional TOML file and defines the defaults for
//! the start command, readiness polling, the post-ready hold, and logging.
//! `AppConfig` is the root configuration struct containing all settings.

use const_format::formatcp;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

// =============================================================================
// Service Defaults
// =============================================================================

/// Display name used in status output
pub const DEFAULT_SERVICE_NAME: &str = "neo4j";

/// Command run once to start the service; it is expected to daemonize and exit
pub const DEFAULT_START_COMMAND: &[&str] = &["neo4j", "start"];

// =============================================================================
// Readiness Polling
// =============================================================================

/// Neo4j browser/HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 7474;

/// Endpoint polled for readiness
pub const DEFAULT_READINESS_URL: &str = formatcp!("http://localhost:{}/", DEFAULT_HTTP_PORT);

/// Status code that means "ready"
pub const DEFAULT_SUCCESS_CODE: u16 = 200;

/// Fixed delay between unsuccessful attempts
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// Upper bound on a single GET, so a hung connection counts as a failed attempt
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Emit a warning every this many failed attempts
pub const READINESS_WARN_EVERY: u32 = 30;

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "awaitdb=info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub hold: HoldConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How the service is started
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Name shown in the ready message
    #[serde(default = "ServiceConfig::default_name")]
    pub name: String,
    /// Start command as argv. Empty skips the start step.
    #[serde(default = "ServiceConfig::default_start_command")]
    pub start_command: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            start_command: Self::default_start_command(),
        }
    }
}

impl ServiceConfig {
    fn default_name() -> String {
        DEFAULT_SERVICE_NAME.to_string()
    }

    fn default_start_command() -> Vec<String> {
        DEFAULT_START_COMMAND.iter().map(|s| s.to_string()).collect()
    }
}

/// Readiness polling settings
#[derive(Debug, Clone, Deserialize)]
pub struct ReadinessConfig {
    #[serde(default = "ReadinessConfig::default_url")]
    pub url: String,
    #[serde(default = "ReadinessConfig::default_success_code")]
    pub success_code: u16,
    #[serde(default = "ReadinessConfig::default_interval")]
    pub interval_seconds: u64,
    #[serde(default = "ReadinessConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Overall deadline. Unset waits forever.
    pub timeout_seconds: Option<u64>,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            success_code: Self::default_success_code(),
            interval_seconds: Self::default_interval(),
            request_timeout_seconds: Self::default_request_timeout(),
            timeout_seconds: None,
        }
    }
}

impl ReadinessConfig {
    fn default_url() -> String {
        DEFAULT_READINESS_URL.to_string()
    }

    fn default_success_code() -> u16 {
        DEFAULT_SUCCESS_CODE
    }

    fn default_interval() -> u64 {
        DEFAULT_POLL_INTERVAL_SECS
    }

    fn default_request_timeout() -> u64 {
        DEFAULT_REQUEST_TIMEOUT_SECS
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

/// What to do once the service is ready
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HoldConfig {
    /// Sleep this long, then exit. Unset holds until SIGINT/SIGTERM.
    pub seconds: Option<u64>,
}

impl HoldConfig {
    pub fn duration(&self) -> Option<Duration> {
        self.seconds.map(Duration::from_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl LoggingConfig {
    fn default_format() -> String {
        DEFAULT_LOG_FORMAT.to_string()
    }
}

impl AppConfig {
    /// Load from a TOML file. Missing sections and keys take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let readiness = &self.readiness;

        if readiness.url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "readiness.url must not be empty".to_string(),
            ));
        }
        // Must be an absolute http(s) URL
        let url = reqwest::Url::parse(&readiness.url).map_err(|e| {
            ConfigError::Validation(format!(
                "readiness.url \"{}\" is invalid: {}",
                readiness.url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "readiness.url must use http or https, got \"{}\"",
                url.scheme()
            )));
        }
        if !(100..=599).contains(&readiness.success_code) {
            return Err(ConfigError::Validation(format!(
                "readiness.success_code {} is not an HTTP status code",
                readiness.success_code
            )));
        }
        // A zero interval would turn the poll loop into a busy loop
        if readiness.interval_seconds == 0 {
            return Err(ConfigError::Validation(
                "readiness.interval_seconds must be at least 1".to_string(),
            ));
        }
        if readiness.request_timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "readiness.request_timeout_seconds must be at least 1".to_string(),
            ));
        }
        if readiness.timeout_seconds == Some(0) {
            return Err(ConfigError::Validation(
                "readiness.timeout_seconds must be at least 1 when set".to_string(),
            ));
        }
        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "logging.format must be \"text\" or \"json\", got \"{}\"",
                    other
                )))
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}
