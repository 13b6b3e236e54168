//! First-in, first-out matchmaking.

use super::{GameMatch, MatchMode, Matchmaker, MatchmakingError, PlayerRequest};
use crate::ids::generate_match_id;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Players needed for one game.
pub const DEFAULT_MATCH_SIZE: usize = 2;

/// Pairs the earliest joiners in batches of `match_size`.
#[derive(Debug)]
pub struct FifoMatchmaker {
    mode: MatchMode,
    match_size: usize,
    queue: Mutex<VecDeque<PlayerRequest>>,
}

impl FifoMatchmaker {
    /// Creates a matchmaker for `mode`. A size below 1 is raised to 1.
    pub fn new(mode: MatchMode, match_size: usize) -> Self {
        Self {
            mode,
            match_size: match_size.max(1),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// The built-in Simple mode matchmaker.
    pub fn simple() -> Self {
        Self::new(MatchMode::Simple, DEFAULT_MATCH_SIZE)
    }

    /// Players per match.
    pub fn match_size(&self) -> usize {
        self.match_size
    }
}

impl Matchmaker for FifoMatchmaker {
    fn mode(&self) -> MatchMode {
        self.mode
    }

    #[instrument(skip(self, request), fields(mode = %self.mode, player_id = %request.id))]
    fn add_player(&self, mut request: PlayerRequest) -> Result<(), MatchmakingError> {
        let mut queue = self.queue.lock();
        if queue.iter().any(|p| p.id == request.id) {
            return Err(MatchmakingError::DuplicateId {
                player_id: request.id,
            });
        }
        request.joined_at = Instant::now();
        queue.push_back(request);
        info!(queue_size = queue.len(), "Player joined queue");
        Ok(())
    }

    #[instrument(skip(self), fields(mode = %self.mode))]
    fn remove_player(&self, player_id: &str) -> Result<(), MatchmakingError> {
        let mut queue = self.queue.lock();
        let index = queue
            .iter()
            .position(|p| p.id == player_id)
            .ok_or_else(|| MatchmakingError::NotFound {
                player_id: player_id.to_string(),
            })?;
        queue.remove(index);
        info!(queue_size = queue.len(), "Player left queue");
        Ok(())
    }

    fn find_matches(&self) -> Vec<GameMatch> {
        let mut queue = self.queue.lock();
        let mut matches = Vec::new();

        while queue.len() >= self.match_size {
            let players: Vec<_> = queue.drain(..self.match_size).collect();
            let game_match = GameMatch {
                id: generate_match_id(),
                players,
                created_at: Instant::now(),
                mode: self.mode,
            };
            debug!(match_id = %game_match.id, mode = %self.mode, "Match formed");
            matches.push(game_match);
        }

        matches
    }

    fn queue_size(&self) -> usize {
        self.queue.lock().len()
    }

    fn queued_players(&self) -> Vec<PlayerRequest> {
        self.queue.lock().iter().cloned().collect()
    }
}
