//! Pure ultimate tic-tac-toe game logic.
//!
//! Nine 3x3 sub-boards form a 3x3 meta board. Winning a sub-board claims
//! that square of the meta board; three claimed squares in a row win the
//! game. The cell chosen by each move decides which sub-board the opponent
//! must play on next.
//!
//! # Example
//!
//! ```
//! use ultimate_board::{Mark, Move, UltimateBoard};
//!
//! let mut board = UltimateBoard::new();
//! board.apply("A5".parse::<Move>()?)?;
//! assert_eq!(board.active_board(), Some(4));
//! assert_eq!(board.current_turn(), Mark::O);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod board;
mod notation;
mod rules;
mod sub_board;
mod types;

pub use action::{IllegalMove, Move, MoveReport, board_letter};
pub use board::UltimateBoard;
pub use notation::ParseMoveError;
pub use rules::{LINES, line_winner};
pub use sub_board::SubBoard;
pub use types::{Cell, Mark, Outcome};
