//! Terminal configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use kiosk_client::ApiConfig;
use kiosk_utils::LogFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Settings for one kiosk terminal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Base URL of the kiosk backend.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Shared credential sent as `X-Terminal-Token` on every request.
    #[serde(default)]
    pub terminal_token: String,

    /// Whole-request timeout in milliseconds. A capture tick that exceeds it
    /// fails and ends the session in `ERROR`.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Directory the camera process drops JPEG stills into.
    #[serde(default = "default_frames_dir")]
    pub frames_dir: PathBuf,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8000".into()
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

fn default_frames_dir() -> PathBuf {
    PathBuf::from("./frames")
}

fn default_log_level() -> String {
    "info".into()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl TerminalConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Connection settings for the backend clients.
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_base_url.clone(),
            terminal_token: self.terminal_token.clone(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            terminal_token: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            frames_dir: default_frames_dir(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}
