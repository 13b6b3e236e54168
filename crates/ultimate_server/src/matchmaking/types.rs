//! Matchmaking data types, errors and the pluggable traits.

use crate::connection::ClientHandle;
use crate::session::PlayerId;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Pairing policy a player asked for.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MatchMode {
    /// First come, first served.
    #[default]
    Simple,
    /// Reserved for custom matchmakers.
    Custom,
}

/// A waiting player.
#[derive(Debug, Clone)]
pub struct PlayerRequest {
    /// Player's unique ID.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Outbound channel to the player's client.
    pub handle: ClientHandle,
    /// When the player entered the queue.
    pub joined_at: Instant,
    /// Requested mode.
    pub mode: MatchMode,
}

impl PlayerRequest {
    /// Creates a request in `mode`, stamped now.
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>, handle: ClientHandle, mode: MatchMode) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            handle,
            joined_at: Instant::now(),
            mode,
        }
    }
}

/// Players selected to play each other.
#[derive(Debug, Clone)]
pub struct GameMatch {
    /// Match id, reused as the session id.
    pub id: String,
    /// Players in queue order.
    pub players: Vec<PlayerRequest>,
    /// When the match was formed.
    pub created_at: Instant,
    /// Mode that produced the match.
    pub mode: MatchMode,
}

/// Queue operation failures. The queue is unchanged on error.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum MatchmakingError {
    /// The player is already queued.
    #[display("Player {} already in queue", player_id)]
    DuplicateId {
        /// Duplicate player.
        player_id: PlayerId,
    },

    /// The player is not queued.
    #[display("Player {} not found in queue", player_id)]
    NotFound {
        /// Missing player.
        player_id: PlayerId,
    },

    /// Neither the requested mode nor the fallback has a matchmaker.
    #[display("No matchmaker registered for mode {}", mode)]
    NoMatchmaker {
        /// Requested mode.
        mode: MatchMode,
    },
}

/// A pairing policy.
///
/// Implementations own their queue and lock it internally, so every method
/// takes `&self`.
pub trait Matchmaker: Send + Sync + std::fmt::Debug {
    /// Mode this matchmaker serves.
    fn mode(&self) -> MatchMode;

    /// Queues a player.
    ///
    /// # Errors
    ///
    /// Returns [`MatchmakingError::DuplicateId`] if the id is already queued.
    fn add_player(&self, request: PlayerRequest) -> Result<(), MatchmakingError>;

    /// Removes a queued player.
    ///
    /// # Errors
    ///
    /// Returns [`MatchmakingError::NotFound`] if the id is not queued.
    fn remove_player(&self, player_id: &str) -> Result<(), MatchmakingError>;

    /// Drains every complete match from the queue.
    fn find_matches(&self) -> Vec<GameMatch>;

    /// Number of queued players.
    fn queue_size(&self) -> usize;

    /// Copies of the queued requests in queue order.
    fn queued_players(&self) -> Vec<PlayerRequest>;
}

/// Failure reported by a [`MatchHandler`].
#[derive(Debug, Clone, Display, Error)]
#[display("Match {} failed: {}", match_id, message)]
pub struct MatchError {
    /// Match that could not be started.
    pub match_id: String,
    /// What went wrong.
    pub message: String,
}

impl MatchError {
    /// Creates a handler error for `match_id`.
    pub fn new(match_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            match_id: match_id.into(),
            message: message.into(),
        }
    }
}

/// Receives each match the scheduler forms.
pub trait MatchHandler: Send + Sync {
    /// Starts a game for `game_match`.
    ///
    /// # Errors
    ///
    /// Errors are logged by the scheduler and do not stop the tick.
    fn on_match(&self, game_match: GameMatch) -> Result<(), MatchError>;
}

impl<F> MatchHandler for F
where
    F: Fn(GameMatch) -> Result<(), MatchError> + Send + Sync,
{
    fn on_match(&self, game_match: GameMatch) -> Result<(), MatchError> {
        self(game_match)
    }
}
