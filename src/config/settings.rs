//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// stdio transport settings.
    #[serde(default)]
    pub stdio: StdioConfig,

    /// TCP socket transport settings.
    #[serde(default)]
    pub socket: SocketConfig,

    /// HTTP/SSE transport settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Session lifecycle settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.stdio.enabled && !self.socket.enabled && !self.http.enabled {
            return Err(ConfigError::ValidationError {
                message: "at least one transport must be enabled".to_string(),
            });
        }
        if self.session.idle_timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "session.idle_timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.session.heartbeat_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "session.heartbeat_secs must be greater than zero".to_string(),
            });
        }
        if self.session.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "session.request_timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.socket.enabled && self.socket.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::ValidationError {
                message: format!("socket.bind is not a valid address: {}", self.socket.bind),
            });
        }
        if self.http.enabled && self.http.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::ValidationError {
                message: format!("http.bind is not a valid address: {}", self.http.bind),
            });
        }
        Ok(())
    }
}

/// stdio transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StdioConfig {
    /// Whether the stdio transport is served.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for StdioConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

/// TCP socket transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocketConfig {
    /// Whether the socket transport is served.
    #[serde(default)]
    pub enabled: bool,

    /// Bind address for the listener.
    #[serde(default = "default_socket_bind")]
    pub bind: String,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: default_socket_bind(),
        }
    }
}

fn default_socket_bind() -> String {
    "127.0.0.1:7420".to_string()
}

/// HTTP/SSE transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Whether the HTTP transport is served.
    #[serde(default)]
    pub enabled: bool,

    /// Bind address for the listener.
    #[serde(default = "default_http_bind")]
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: default_http_bind(),
        }
    }
}

fn default_http_bind() -> String {
    "127.0.0.1:7421".to_string()
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Idle window in seconds after which a session is evicted.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Interval in seconds between SSE heartbeat events.
    #[serde(default = "default_heartbeat")]
    pub heartbeat_secs: u64,

    /// Per-request processing budget in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            heartbeat_secs: default_heartbeat(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

const fn default_idle_timeout() -> u64 {
    300
}

const fn default_heartbeat() -> u64 {
    15
}

const fn default_request_timeout() -> u64 {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

const fn default_true() -> bool {
    true
}
