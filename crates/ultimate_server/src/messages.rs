//! JSON messages sent from the server to clients.
//!
//! Every message is an envelope `{"type": "...", "payload": {...}}`.

use serde::{Deserialize, Serialize};
use ultimate_board::{Cell, Outcome, SubBoard, UltimateBoard};

/// A message pushed to one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once after the connection is accepted.
    Welcome(WelcomePayload),
    /// Full game state from the recipient's point of view.
    GameState(Box<GameStatePayload>),
    /// A move was accepted.
    Move(MovePayload),
    /// A command from the recipient failed.
    Error(TextPayload),
    /// Informational text.
    Info(TextPayload),
    /// The game ended.
    GameOver(GameOverPayload),
    /// The opponent offered a draw.
    DrawOffer(DrawOfferPayload),
}

impl ServerMessage {
    /// Builds an info message.
    pub fn info(message: impl Into<String>) -> Self {
        Self::Info(TextPayload {
            message: message.into(),
        })
    }

    /// Builds an error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(TextPayload {
            message: message.into(),
        })
    }
}

/// Greeting with the assigned player id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomePayload {
    /// Generated player id.
    pub player_id: String,
    /// Display name.
    pub player_name: String,
    /// Greeting text.
    pub message: String,
}

/// Plain text payload for info and error messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPayload {
    /// Message text.
    pub message: String,
}

/// Game state as seen by one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatePayload {
    /// Session id.
    pub game_id: String,
    /// Cells and outcomes of every sub-board.
    pub board: BoardStateData,
    /// `"X"` or `"O"`.
    pub current_turn: String,
    /// The recipient's mark, empty for spectators.
    pub your_symbol: String,
    /// Required sub-board, `-1` for any.
    pub active_board: i32,
    /// `"waiting"`, `"in_progress"` or `"finished"`.
    pub game_status: String,
    /// `"X"`, `"O"`, `"Draw"`, or empty while running.
    pub winner: String,
    /// Name of the X player.
    pub player_x_name: String,
    /// Name of the O player.
    pub player_o_name: String,
    /// Recorded moves in UGN notation.
    pub ugn_moves: Vec<String>,
    /// Whether the recipient is to move.
    pub is_your_turn: bool,
}

/// Cells and outcomes of the nine sub-boards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardStateData {
    /// Sub-boards in row-major order.
    pub boards: Vec<SubBoardData>,
    /// Outcome label per sub-board.
    pub board_states: Vec<String>,
}

/// One sub-board on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubBoardData {
    /// `"X"`, `"O"` or empty per cell.
    pub cells: Vec<String>,
    /// `"undecided"`, `"X"`, `"O"` or `"draw"`.
    pub state: String,
}

fn cell_label(cell: Cell) -> String {
    cell.mark().map(|m| m.to_string()).unwrap_or_default()
}

/// Wire label for a sub-board outcome.
pub fn outcome_label(outcome: Outcome) -> String {
    match outcome {
        Outcome::Undecided => "undecided".to_string(),
        Outcome::Won(mark) => mark.to_string(),
        Outcome::Draw => "draw".to_string(),
    }
}

impl From<&SubBoard> for SubBoardData {
    fn from(sub: &SubBoard) -> Self {
        Self {
            cells: sub.cells().iter().copied().map(cell_label).collect(),
            state: outcome_label(sub.outcome()),
        }
    }
}

impl From<&UltimateBoard> for BoardStateData {
    fn from(board: &UltimateBoard) -> Self {
        Self {
            boards: board.sub_boards().iter().map(SubBoardData::from).collect(),
            board_states: board
                .sub_boards()
                .iter()
                .map(|s| outcome_label(s.outcome()))
                .collect(),
        }
    }
}

/// Broadcast after an accepted move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePayload {
    /// Mover's name.
    pub player_name: String,
    /// Mover's mark.
    pub player_symbol: String,
    /// Move in notation, e.g. `E5`.
    pub r#move: String,
    /// Sub-board index (0-8).
    pub board_index: usize,
    /// Cell index (0-8).
    pub position: usize,
}

/// Broadcast when a game ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOverPayload {
    /// `"X"`, `"O"` or `"Draw"`.
    pub winner: String,
    /// Winner's name, or `"Draw"`.
    pub winner_name: String,
    /// Human-readable summary.
    pub message: String,
    /// How the game ended, e.g. `"resignation"` or `"agreement"`.
    pub comment: String,
}

/// Sent to the opponent of a player offering a draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawOfferPayload {
    /// Name of the offering player.
    pub offered_by: String,
    /// Instructions for the recipient.
    pub message: String,
}
