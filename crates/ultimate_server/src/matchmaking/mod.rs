//! Matchmaking queue and scheduler.
//!
//! Players are queued per [`MatchMode`]. A [`MatchScheduler`] periodically
//! drains every registered [`Matchmaker`] and passes each [`GameMatch`] to a
//! [`MatchHandler`], which turns it into a game session.

mod fifo;
mod scheduler;
mod types;

pub use fifo::{DEFAULT_MATCH_SIZE, FifoMatchmaker};
pub use scheduler::{DEFAULT_TICK_INTERVAL, MatchScheduler};
pub use types::{
    GameMatch, MatchError, MatchHandler, MatchMode, Matchmaker, MatchmakingError, PlayerRequest,
};
