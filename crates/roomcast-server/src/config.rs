//! Runtime configuration for the relay server.
//!
//! Settings come from a TOML file when one exists, otherwise from
//! defaults with `ROOMCAST_*` environment overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Top-level settings, one section per concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Interface the server binds.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port for the HTTP listener.
    #[serde(default = "default_port")]
    pub port: u16,

    /// HTTP surface configuration.
    #[serde(default)]
    pub http: HttpConfig,

    /// Relay limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Metrics exporter settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// HTTP surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Path for the WebSocket endpoint.
    #[serde(default = "default_ws_path")]
    pub websocket_path: String,

    /// Directory served for static assets.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

/// Relay limits configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum participants per room.
    #[serde(default = "default_room_capacity")]
    pub room_capacity: usize,

    /// Messages retained per room for newcomer replay.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Maximum display name length in characters.
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,

    /// Maximum message text length in characters.
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,

    /// Maximum inbound WebSocket message size in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

/// Metrics exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether to run the Prometheus exporter.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Port the exporter listens on.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Serde default helpers
fn default_host() -> String {
    std::env::var("ROOMCAST_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())
}

fn default_port() -> u16 {
    std::env::var("ROOMCAST_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000)
}

fn default_true() -> bool {
    true
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

fn default_static_dir() -> String {
    "public".to_string()
}

fn default_room_capacity() -> usize {
    2
}

fn default_history_limit() -> usize {
    100
}

fn default_max_name_length() -> usize {
    32
}

fn default_max_text_length() -> usize {
    2000
}

fn default_max_frame_bytes() -> usize {
    64 * 1024
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            http: HttpConfig::default(),
            limits: LimitsConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            websocket_path: default_ws_path(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            room_capacity: default_room_capacity(),
            history_limit: default_history_limit(),
            max_name_length: default_max_name_length(),
            max_text_length: default_max_text_length(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Resolve configuration from the first file found, or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        // Check the usual file locations first
        let config_paths = [
            "roomcast.toml",
            "/etc/roomcast/roomcast.toml",
            "~/.config/roomcast/roomcast.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // No file anywhere, so defaults plus env overrides
        Ok(Self::default())
    }

    /// Parse configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Invalid TOML in config file: {}", path.display()))?;

        Ok(config)
    }

    /// Socket address assembled from `host` and `port`.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("host and port do not form a socket address")
    }
}
