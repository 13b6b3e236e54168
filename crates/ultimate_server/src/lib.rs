//! Ultimate tic-tac-toe matchmaking server.
//!
//! Clients connect over a WebSocket, wait in a matchmaking queue and are
//! paired into game sessions that enforce turns, resignation and draws by
//! agreement. Finished games are written as UGN records.
//!
//! # Architecture
//!
//! - **Matchmaking**: per-mode queues drained by a periodic scheduler
//! - **Session**: one board and two seats behind a read-write lock
//! - **Registry**: live sessions, indexed by session and player id
//! - **Recorder**: UGN move notation and game files
//! - **Server**: axum WebSocket transport and command routing
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ultimate_server::{GameServer, ServerConfig};
//!
//! # async fn example() -> std::io::Result<()> {
//! let server = Arc::new(GameServer::new(ServerConfig::default()));
//! server
//!     .serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod cli;
mod command;
mod config;
mod connection;
mod ids;
mod matchmaking;
mod messages;
mod recorder;
mod registry;
mod server;
mod session;

// Crate-level exports - Configuration
pub use cli::Cli;
pub use config::{ConfigError, ConfigOverrides, ServerConfig};

// Crate-level exports - Client plumbing
pub use command::{Command, HELP_TEXT};
pub use connection::{ClientGone, ClientHandle};
pub use ids::{MATCH_ID_LEN, PLAYER_ID_LEN, generate_match_id, generate_player_id};
pub use messages::{
    BoardStateData, DrawOfferPayload, GameOverPayload, GameStatePayload, MovePayload,
    ServerMessage, SubBoardData, TextPayload, WelcomePayload, outcome_label,
};

// Crate-level exports - Matchmaking
pub use matchmaking::{
    DEFAULT_MATCH_SIZE, DEFAULT_TICK_INTERVAL, FifoMatchmaker, GameMatch, MatchError,
    MatchHandler, MatchMode, MatchScheduler, Matchmaker, MatchmakingError, PlayerRequest,
};

// Crate-level exports - Sessions
pub use registry::{GameRegistry, RegistryError};
pub use session::{
    GameResult, GameSession, Player, PlayerId, SessionError, SessionId, SessionPhase,
    SessionSnapshot,
};

// Crate-level exports - Recording
pub use recorder::{GameRecorder, RecorderError, UgnGame, UgnMetadata, UgnMove, UgnRecorder};

// Crate-level exports - Server
pub use server::{GameServer, INDEX_TEXT, MAX_NAME_LEN, PlayerConnection, clean_name};
