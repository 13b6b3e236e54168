//! Command-line interface for ultimate_server.

use crate::config::{ConfigError, ConfigOverrides, ServerConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing::instrument;

/// Ultimate tic-tac-toe server with matchmaking
#[derive(Parser, Debug)]
#[command(name = "ultimate_server")]
#[command(about = "WebSocket server that pairs players for ultimate tic-tac-toe", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, env = "ULTIMATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, env = "ULTIMATE_HOST")]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long, env = "ULTIMATE_PORT")]
    pub port: Option<u16>,

    /// Directory for UGN game records
    #[arg(long, env = "ULTIMATE_GAMES_DIR")]
    pub games_dir: Option<PathBuf>,

    /// Milliseconds between matchmaking ticks
    #[arg(long)]
    pub tick_ms: Option<u64>,
}

impl Cli {
    /// Builds the effective configuration: file (or defaults), then flags.
    #[instrument(skip(self))]
    pub fn load_config(self) -> Result<ServerConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };
        base.merge(ConfigOverrides {
            host: self.host,
            port: self.port,
            games_dir: self.games_dir,
            tick_interval_ms: self.tick_ms,
        })
    }
}
