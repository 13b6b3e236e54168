//! Game sessions: one board, two seats, turn and lifecycle enforcement.

use crate::connection::ClientHandle;
use crate::matchmaking::GameMatch;
use crate::messages::{BoardStateData, GameStatePayload, ServerMessage};
use crate::recorder::GameRecorder;
use derive_more::{Display, Error, From};
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use ultimate_board::{IllegalMove, Mark, Move, MoveReport, Outcome, UltimateBoard};

/// Unique identifier for a game session.
pub type SessionId = String;

/// Unique identifier for a player.
pub type PlayerId = String;

/// A seated player.
#[derive(Debug, Clone)]
pub struct Player {
    /// Player's unique ID.
    pub id: PlayerId,
    /// Player's display name.
    pub name: String,
    /// Mark assigned when the session was created.
    pub mark: Mark,
    /// Outbound channel to the player's client.
    pub handle: ClientHandle,
}

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameResult {
    /// The mark won.
    Winner(Mark),
    /// Drawn on the board or by agreement.
    Draw,
}

impl GameResult {
    /// Returns the winning mark, if any.
    pub fn winner(self) -> Option<Mark> {
        match self {
            GameResult::Winner(mark) => Some(mark),
            GameResult::Draw => None,
        }
    }

    fn from_outcome(outcome: Outcome) -> Option<Self> {
        match outcome {
            Outcome::Undecided => None,
            Outcome::Won(mark) => Some(GameResult::Winner(mark)),
            Outcome::Draw => Some(GameResult::Draw),
        }
    }
}

impl std::fmt::Display for GameResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameResult::Winner(mark) => write!(f, "{}", mark),
            GameResult::Draw => write!(f, "Draw"),
        }
    }
}

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionPhase {
    /// Fewer than two players have been seated.
    Pending,
    /// Both seats were filled; moves are accepted.
    Active,
    /// Terminal.
    Finished,
}

/// Why a session rejected an operation. No state changes on error.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error, From)]
pub enum SessionError {
    /// The second player has not joined yet.
    #[display("Game has not started yet")]
    NotStarted,

    /// The game is over.
    #[display("Game is already finished")]
    AlreadyFinished,

    /// The other mark is to move.
    #[display("Not your turn (waiting for {})", expected)]
    WrongTurn {
        /// The mark to move.
        expected: Mark,
    },

    /// The board rejected the move.
    #[display("{}", _0)]
    #[from]
    IllegalMove(IllegalMove),

    /// A draw offer is already waiting for an answer.
    #[display("A draw offer is already pending")]
    DrawAlreadyOffered,

    /// There is no draw offer to answer.
    #[display("No draw offer pending")]
    NoPendingOffer,

    /// Players cannot answer their own draw offer.
    #[display("Cannot answer your own draw offer")]
    SelfOffer,

    /// Both seats are taken, or the game already started.
    #[display("Game session is full")]
    SessionFull,

    /// The other seated player already holds this mark.
    #[display("Mark {} is already taken", mark)]
    MarkTaken {
        /// The contested mark.
        mark: Mark,
    },

    /// The player holds no seat in this session.
    #[display("Player {} is not in this session", player_id)]
    NotSeated {
        /// The unknown player.
        player_id: PlayerId,
    },

    /// The player is already seated.
    #[display("Player {} is already in this session", player_id)]
    AlreadySeated {
        /// The duplicate player.
        player_id: PlayerId,
    },

    /// A match did not contain exactly two players.
    #[display("Invalid match: expected 2 players, got {}", players)]
    InvalidMatch {
        /// Number of players in the match.
        players: usize,
    },
}

/// Point-in-time copy of a session's state.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Session id.
    pub id: SessionId,
    /// Lifecycle phase.
    pub phase: SessionPhase,
    /// The board.
    pub board: UltimateBoard,
    /// Result, once finished.
    pub result: Option<GameResult>,
    /// Player with an unanswered draw offer.
    pub draw_offered_by: Option<PlayerId>,
    /// Accepted moves in play order.
    pub history: Vec<Move>,
    /// Seated players (empty seats omitted).
    pub players: Vec<Player>,
}

#[derive(Debug)]
struct SessionState {
    board: UltimateBoard,
    seats: [Option<Player>; 2],
    names: [Option<String>; 2],
    started: bool,
    finished: bool,
    result: Option<GameResult>,
    draw_offered_by: Option<PlayerId>,
    history: Vec<Move>,
    recorder: Option<Arc<Mutex<Box<dyn GameRecorder>>>>,
}

/// Recorder work produced by a mutation, replayed once the session lock
/// is released.
#[derive(Debug)]
enum RecordCall {
    Start { x_name: String, o_name: String },
    Move(MoveReport),
    End {
        result: GameResult,
        comment: Option<String>,
    },
}

impl RecordCall {
    /// Applies the call, logging instead of propagating failures. Moves
    /// and endings are skipped unless a record is open.
    fn apply(self, recorder: &mut dyn GameRecorder, session_id: &str) {
        let (what, outcome) = match self {
            RecordCall::Start { x_name, o_name } => (
                "start_game",
                recorder.start_game(session_id, &x_name, &o_name),
            ),
            _ if !recorder.is_started() => return,
            RecordCall::Move(report) => ("log_move", recorder.log_move(&report)),
            RecordCall::End {
                result,
                comment: None,
            } => ("end_game", recorder.end_game(result)),
            RecordCall::End {
                result,
                comment: Some(comment),
            } => ("end_game", recorder.end_game_with_comment(result, &comment)),
        };
        if let Err(e) = outcome {
            warn!(call = what, error = %e, "Game recorder failed");
        }
    }
}

fn mark_slot(mark: Mark) -> usize {
    match mark {
        Mark::X => 0,
        Mark::O => 1,
    }
}

impl SessionState {
    fn phase(&self) -> SessionPhase {
        if self.finished {
            SessionPhase::Finished
        } else if self.started {
            SessionPhase::Active
        } else {
            SessionPhase::Pending
        }
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        match self.phase() {
            SessionPhase::Pending => Err(SessionError::NotStarted),
            SessionPhase::Finished => Err(SessionError::AlreadyFinished),
            SessionPhase::Active => Ok(()),
        }
    }

    fn seated(&self) -> impl Iterator<Item = &Player> {
        self.seats.iter().flatten()
    }

    fn finish(&mut self, result: GameResult) {
        self.finished = true;
        self.result = Some(result);
        self.draw_offered_by = None;
    }

    fn seat_of(&self, player_id: &str) -> Result<&Player, SessionError> {
        self.seated()
            .find(|p| p.id == player_id)
            .ok_or_else(|| SessionError::NotSeated {
                player_id: player_id.to_string(),
            })
    }
}

/// A game between two players.
///
/// All mutation happens under the session's write lock, so moves are
/// applied one at a time; reads take the shared lock. Recorder I/O runs
/// after the write lock is released.
#[derive(Debug)]
pub struct GameSession {
    id: SessionId,
    state: RwLock<SessionState>,
}

impl GameSession {
    /// Creates an empty session waiting for players.
    #[instrument]
    pub fn new(id: SessionId) -> Self {
        info!(session_id = %id, "Creating new game session");
        Self {
            id,
            state: RwLock::new(SessionState {
                board: UltimateBoard::new(),
                seats: [None, None],
                names: [None, None],
                started: false,
                finished: false,
                result: None,
                draw_offered_by: None,
                history: Vec::new(),
                recorder: None,
            }),
        }
    }

    /// Creates a started session for a match, assigning marks by coin flip.
    ///
    /// The recorder, if given, is attached before the players so that it
    /// sees the start of the game.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidMatch`] unless the match holds exactly
    /// two players.
    #[instrument(skip(game_match, recorder, rng), fields(match_id = %game_match.id))]
    pub fn from_match(
        game_match: &GameMatch,
        recorder: Option<Box<dyn GameRecorder>>,
        rng: &mut impl Rng,
    ) -> Result<Self, SessionError> {
        let [first, second] = game_match.players.as_slice() else {
            return Err(SessionError::InvalidMatch {
                players: game_match.players.len(),
            });
        };

        let session = Self::new(game_match.id.clone());
        if let Some(recorder) = recorder {
            session.set_recorder(recorder);
        }

        let first_mark = if rng.gen_bool(0.5) { Mark::X } else { Mark::O };
        for (request, mark) in [(first, first_mark), (second, first_mark.opponent())] {
            session.attach_player(Player {
                id: request.id.clone(),
                name: request.name.clone(),
                mark,
                handle: request.handle.clone(),
            })?;
        }

        Ok(session)
    }

    /// Returns the session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Attaches a recorder, replacing any previous one.
    pub fn set_recorder(&self, recorder: Box<dyn GameRecorder>) {
        self.state.write().recorder = Some(Arc::new(Mutex::new(recorder)));
    }

    /// Runs `change` under the write lock, then replays the recorder calls
    /// it queued. The recorder's own lock is taken before the session lock
    /// is dropped, so records arrive in the order the session changed.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut SessionState, &mut Vec<RecordCall>) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let mut calls = Vec::new();
        let mut state = self.state.write();
        let value = change(&mut *state, &mut calls)?;

        let slot = state.recorder.clone().filter(|_| !calls.is_empty());
        let mut recorder = slot.as_ref().map(|r| r.lock());
        drop(state);

        if let Some(recorder) = recorder.as_deref_mut() {
            for call in calls {
                call.apply(&mut **recorder, &self.id);
            }
        }
        Ok(value)
    }

    /// Seats a player.
    ///
    /// Seating the second player starts the game and opens the record.
    /// Returns the seat index.
    ///
    /// # Errors
    ///
    /// Fails if the game already started, both seats are taken, the player
    /// is already seated or the mark is held by the other player.
    #[instrument(skip(self, player), fields(session_id = %self.id, player_id = %player.id, mark = %player.mark))]
    pub fn attach_player(&self, player: Player) -> Result<usize, SessionError> {
        self.mutate(|state, records| {
            if state.started {
                warn!("Session already started");
                return Err(SessionError::SessionFull);
            }
            if state.seated().any(|p| p.id == player.id) {
                return Err(SessionError::AlreadySeated {
                    player_id: player.id,
                });
            }
            if state.seated().any(|p| p.mark == player.mark) {
                return Err(SessionError::MarkTaken { mark: player.mark });
            }
            let slot = state
                .seats
                .iter()
                .position(Option::is_none)
                .ok_or(SessionError::SessionFull)?;

            info!(slot, "Seating player");
            state.names[mark_slot(player.mark)] = Some(player.name.clone());
            state.seats[slot] = Some(player);

            if state.seats.iter().all(Option::is_some) {
                state.started = true;
                let x_name = state.names[mark_slot(Mark::X)].clone().unwrap_or_default();
                let o_name = state.names[mark_slot(Mark::O)].clone().unwrap_or_default();
                info!(%x_name, %o_name, "Game started");
                records.push(RecordCall::Start { x_name, o_name });
            }

            Ok(slot)
        })
    }

    /// Empties the seat of a disconnected player.
    ///
    /// The board and result are untouched so the remaining player can
    /// still see the final state. Seats are never refilled.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn detach_player(&self, player_id: &str) -> Option<Player> {
        let mut state = self.state.write();
        let seat = state
            .seats
            .iter_mut()
            .find(|s| matches!(s, Some(p) if p.id == player_id))?;
        let player = seat.take();
        info!("Player left the session");
        player
    }

    /// Makes a move for the seated player `player_id`, who must hold the
    /// mark to move.
    ///
    /// # Errors
    ///
    /// Fails with a lifecycle error, [`SessionError::NotSeated`],
    /// [`SessionError::WrongTurn`], or the board's [`IllegalMove`]. The
    /// board is unchanged on error.
    #[instrument(skip(self, mv), fields(session_id = %self.id, mv = %mv))]
    pub fn make_move(&self, player_id: &str, mv: Move) -> Result<MoveReport, SessionError> {
        self.mutate(|state, records| {
            state.ensure_active()?;
            let mark = state.seat_of(player_id)?.mark;

            let expected = state.board.current_turn();
            if mark != expected {
                warn!(player_mark = %mark, %expected, "Player tried to move out of turn");
                return Err(SessionError::WrongTurn { expected });
            }

            let report = state.board.apply(mv).inspect_err(|e| {
                warn!(error = %e, "Invalid move");
            })?;
            state.history.push(mv);
            records.push(RecordCall::Move(report));

            if let Some(result) = GameResult::from_outcome(report.game_after) {
                state.finish(result);
                info!(%result, "Game finished");
                records.push(RecordCall::End {
                    result,
                    comment: None,
                });
            }

            debug!(next_board = ?report.next_board, "Move completed successfully");
            Ok(report)
        })
    }

    /// Resigns for the seated player `player_id`; the opponent wins.
    ///
    /// # Errors
    ///
    /// Fails if the game is not active or the player is not seated.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn resign(&self, player_id: &str) -> Result<GameResult, SessionError> {
        self.mutate(|state, records| {
            state.ensure_active()?;
            let winner = state.seat_of(player_id)?.mark.opponent();

            let result = GameResult::Winner(winner);
            state.finish(result);
            info!(%winner, "Player resigned");

            records.push(RecordCall::End {
                result,
                comment: Some(format!("{} wins by resignation", winner)),
            });
            Ok(result)
        })
    }

    /// Offers a draw to the opponent.
    ///
    /// # Errors
    ///
    /// Fails if the game is not active, the player is not seated or an
    /// offer is already pending.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn offer_draw(&self, player_id: &str) -> Result<(), SessionError> {
        let mut state = self.state.write();
        state.ensure_active()?;
        state.seat_of(player_id)?;
        if state.draw_offered_by.is_some() {
            return Err(SessionError::DrawAlreadyOffered);
        }
        state.draw_offered_by = Some(player_id.to_string());
        info!("Draw offered");
        Ok(())
    }

    fn check_draw_answer(state: &SessionState, responder_id: &str) -> Result<(), SessionError> {
        if state.finished {
            return Err(SessionError::AlreadyFinished);
        }
        state.seat_of(responder_id)?;
        match &state.draw_offered_by {
            None => Err(SessionError::NoPendingOffer),
            Some(offerer) if offerer == responder_id => Err(SessionError::SelfOffer),
            Some(_) => Ok(()),
        }
    }

    /// Accepts the opponent's draw offer, ending the game as a draw.
    ///
    /// # Errors
    ///
    /// Fails if the game is finished, the responder is not seated, no
    /// offer is pending, or the responder made the offer.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn accept_draw(&self, responder_id: &str) -> Result<(), SessionError> {
        self.mutate(|state, records| {
            Self::check_draw_answer(state, responder_id)?;

            state.finish(GameResult::Draw);
            info!("Draw accepted");
            records.push(RecordCall::End {
                result: GameResult::Draw,
                comment: Some("agreement".to_string()),
            });
            Ok(())
        })
    }

    /// Declines the opponent's draw offer. Play continues.
    ///
    /// # Errors
    ///
    /// Same conditions as [`GameSession::accept_draw`].
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn decline_draw(&self, responder_id: &str) -> Result<(), SessionError> {
        let mut state = self.state.write();
        Self::check_draw_answer(&state, responder_id)?;
        state.draw_offered_by = None;
        info!("Draw declined");
        Ok(())
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.state.read().phase()
    }

    /// Result of a finished game.
    pub fn result(&self) -> Option<GameResult> {
        self.state.read().result
    }

    /// Whether the game is over.
    pub fn is_finished(&self) -> bool {
        self.state.read().finished
    }

    /// Whether a draw offer is waiting.
    pub fn draw_offer_pending(&self) -> bool {
        self.state.read().draw_offered_by.is_some()
    }

    /// Mark to move next.
    pub fn current_turn(&self) -> Mark {
        self.state.read().board.current_turn()
    }

    /// Seated player with the given id.
    pub fn player(&self, player_id: &str) -> Option<Player> {
        self.state
            .read()
            .seated()
            .find(|p| p.id == player_id)
            .cloned()
    }

    /// Seated players.
    pub fn players(&self) -> Vec<Player> {
        self.state.read().seated().cloned().collect()
    }

    /// The other seated player, if still connected.
    pub fn opponent_of(&self, player_id: &str) -> Option<Player> {
        self.state
            .read()
            .seated()
            .find(|p| p.id != player_id)
            .cloned()
    }

    /// Seated player whose turn it is, once the game has started.
    pub fn current_player(&self) -> Option<Player> {
        let state = self.state.read();
        if !state.started {
            return None;
        }
        let turn = state.board.current_turn();
        state.seated().find(|p| p.mark == turn).cloned()
    }

    /// Name recorded for a mark, kept after the player leaves.
    pub fn name_of(&self, mark: Mark) -> Option<String> {
        self.state.read().names[mark_slot(mark)].clone()
    }

    /// Human-readable status line.
    pub fn status_line(&self) -> String {
        let state = self.state.read();
        match state.phase() {
            SessionPhase::Pending => format!(
                "Waiting for players ({}/2 connected)",
                state.seated().count()
            ),
            SessionPhase::Finished => match state.result {
                Some(GameResult::Winner(mark)) => format!("Game Over - {} Wins!", mark),
                _ => "Game Over - Draw!".to_string(),
            },
            SessionPhase::Active => {
                let turn = state.board.current_turn();
                match state.seated().find(|p| p.mark == turn) {
                    Some(p) => format!("Game in progress - {}'s turn ({})", p.name, turn),
                    None => "Game in progress".to_string(),
                }
            }
        }
    }

    /// Game state from one player's point of view.
    ///
    /// Unknown ids get a spectator view with no mark.
    pub fn state_for(&self, player_id: &str) -> GameStatePayload {
        let state = self.state.read();
        let mark = state.seated().find(|p| p.id == player_id).map(|p| p.mark);
        let turn = state.board.current_turn();
        let playing = state.phase() == SessionPhase::Active;

        GameStatePayload {
            game_id: self.id.clone(),
            board: BoardStateData::from(&state.board),
            current_turn: turn.to_string(),
            your_symbol: mark.map(|m| m.to_string()).unwrap_or_default(),
            active_board: state
                .board
                .active_board()
                .and_then(|b| i32::try_from(b).ok())
                .unwrap_or(-1),
            game_status: match state.phase() {
                SessionPhase::Pending => "waiting",
                SessionPhase::Active => "in_progress",
                SessionPhase::Finished => "finished",
            }
            .to_string(),
            winner: state.result.map(|r| r.to_string()).unwrap_or_default(),
            player_x_name: state.names[mark_slot(Mark::X)].clone().unwrap_or_default(),
            player_o_name: state.names[mark_slot(Mark::O)].clone().unwrap_or_default(),
            ugn_moves: state
                .recorder
                .as_ref()
                .map(|r| r.lock().moves())
                .unwrap_or_default(),
            is_your_turn: playing && mark == Some(turn),
        }
    }

    /// Copies the whole session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read();
        SessionSnapshot {
            id: self.id.clone(),
            phase: state.phase(),
            board: state.board.clone(),
            result: state.result,
            draw_offered_by: state.draw_offered_by.clone(),
            history: state.history.clone(),
            players: state.seated().cloned().collect(),
        }
    }

    /// Sends a message to every seated player.
    ///
    /// Dead connections are skipped.
    pub fn broadcast(&self, message: &ServerMessage) {
        for player in self.state.read().seated() {
            if player.handle.send(message.clone()).is_err() {
                debug!(session_id = %self.id, player_id = %player.id, "Dropping message for closed client");
            }
        }
    }

    /// Sends each seated player their own game state.
    pub fn broadcast_state(&self) {
        for player in self.players() {
            let message = ServerMessage::GameState(Box::new(self.state_for(&player.id)));
            if player.handle.send(message).is_err() {
                debug!(session_id = %self.id, player_id = %player.id, "Dropping state for closed client");
            }
        }
    }

    /// Sends a message to one seated player. Returns whether it was queued.
    pub fn send_to(&self, player_id: &str, message: ServerMessage) -> bool {
        self.player(player_id)
            .is_some_and(|p| p.handle.send(message).is_ok())
    }
}
