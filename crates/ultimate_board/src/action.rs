//! Moves and the reasons a move can be rejected.

use super::types::{Mark, Outcome};
use serde::{Deserialize, Serialize};

/// A move: a cell on one of the nine sub-boards.
///
/// Both indices are row-major in 0-8. Board letters A-I and cell digits
/// 1-9 are the notation form (see [`Move::from_str`](std::str::FromStr)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    board: usize,
    cell: usize,
}

impl Move {
    /// Creates a move. Indices are validated when the move is applied.
    pub fn new(board: usize, cell: usize) -> Self {
        Self { board, cell }
    }

    /// Returns the sub-board index (0-8).
    pub fn board(&self) -> usize {
        self.board
    }

    /// Returns the cell index within the sub-board (0-8).
    pub fn cell(&self) -> usize {
        self.cell
    }
}

/// Why a move was rejected by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum IllegalMove {
    /// Board or cell index is outside 0-8.
    #[display("Move out of range: board {}, cell {}", board, cell)]
    OutOfRange {
        /// Requested board index.
        board: usize,
        /// Requested cell index.
        cell: usize,
    },

    /// The previous move sent play to another board.
    #[display("Must play on board {}, not {}", board_letter(*required), board_letter(*attempted))]
    WrongBoard {
        /// Board the mover is constrained to.
        required: usize,
        /// Board the mover tried.
        attempted: usize,
    },

    /// The target sub-board is already won or drawn.
    #[display("Board {} is already decided", board_letter(*_0))]
    BoardDecided(#[error(not(source))] usize),

    /// The target cell is taken.
    #[display("Cell {}{} is already occupied", board_letter(*board), cell + 1)]
    CellOccupied {
        /// Board index.
        board: usize,
        /// Cell index.
        cell: usize,
    },

    /// The game is over.
    #[display("Game is already over")]
    GameOver,
}

/// What a single accepted move changed.
///
/// Carries the outcomes before and after the placement so that
/// observers can annotate the move without re-deriving state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveReport {
    /// The applied move.
    pub mv: Move,
    /// Mark that was placed.
    pub mark: Mark,
    /// Outcome of the target sub-board before the move.
    pub sub_before: Outcome,
    /// Outcome of the target sub-board after the move.
    pub sub_after: Outcome,
    /// Game outcome before the move.
    pub game_before: Outcome,
    /// Game outcome after the move.
    pub game_after: Outcome,
    /// Board the next mover is constrained to, if any.
    pub next_board: Option<usize>,
}

/// Letter (A-I) for a board index; `?` for out-of-range indices.
pub fn board_letter(board: usize) -> char {
    if board < 9 {
        (b'A' + board as u8) as char
    } else {
        '?'
    }
}
