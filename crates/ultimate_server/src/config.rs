//! Server configuration.

use crate::matchmaking::{DEFAULT_MATCH_SIZE, DEFAULT_TICK_INTERVAL};
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Runtime settings, loaded from TOML and overridable from the command line.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    host: String,

    /// Port to bind.
    port: u16,

    /// Directory for UGN game records.
    games_dir: PathBuf,

    /// Milliseconds between matchmaking ticks.
    tick_interval_ms: u64,

    /// Players per Simple-mode match.
    match_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 39171,
            games_dir: PathBuf::from("games"),
            tick_interval_ms: DEFAULT_TICK_INTERVAL.as_millis() as u64,
            match_size: DEFAULT_MATCH_SIZE,
        }
    }
}

/// Values that replace whatever the file said.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Address to bind.
    pub host: Option<String>,
    /// Port to bind.
    pub port: Option<u16>,
    /// Directory for game records.
    pub games_dir: Option<PathBuf>,
    /// Milliseconds between ticks.
    pub tick_interval_ms: Option<u64>,
}

impl ServerConfig {
    /// Loads configuration from a TOML file. Missing keys take defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        info!(port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Applies command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the result is invalid.
    pub fn merge(mut self, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(dir) = overrides.games_dir {
            self.games_dir = dir;
        }
        if let Some(ms) = overrides.tick_interval_ms {
            self.tick_interval_ms = ms;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::new("tick_interval_ms must be positive"));
        }
        if self.match_size < 2 {
            return Err(ConfigError::new(format!(
                "match_size must be at least 2, got {}",
                self.match_size
            )));
        }
        Ok(())
    }

    /// `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Tick interval as a duration.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
