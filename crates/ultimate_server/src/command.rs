//! Text commands sent by clients.

use std::str::FromStr;
use ultimate_board::{Move, ParseMoveError};

/// Help shown for `HELP` and `?`.
pub const HELP_TEXT: &str = "Commands:\n\
    \x20 A1-I9: Make a move (e.g., A1, B5, I9)\n\
    \x20 R or resign: Resign from the game\n\
    \x20 draw: Offer a draw\n\
    \x20 accept_draw / decline_draw: Answer a draw offer\n\
    \x20 board/show: Request board update\n\
    \x20 status: Show game status\n\
    \x20 quit/exit: Leave the game";

/// One parsed client line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Place the mover's mark.
    Move(Move),
    /// Give up the game.
    Resign,
    /// Offer a draw.
    OfferDraw,
    /// Accept the opponent's draw offer.
    AcceptDraw,
    /// Decline the opponent's draw offer.
    DeclineDraw,
    /// Game state, or queue size while waiting.
    Status,
    /// Resend the board.
    Board,
    /// Show [`HELP_TEXT`].
    Help,
    /// Leave.
    Quit,
}

impl Command {
    /// Whether the command needs a game to act on.
    pub fn needs_session(&self) -> bool {
        !matches!(self, Command::Status | Command::Help | Command::Quit)
    }
}

impl FromStr for Command {
    type Err = ParseMoveError;

    /// Parses a line case-insensitively. Anything that is not a keyword must
    /// be a move.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s.trim().to_ascii_uppercase();
        let command = match word.as_str() {
            "R" | "RESIGN" => Command::Resign,
            "DRAW" => Command::OfferDraw,
            "ACCEPT_DRAW" => Command::AcceptDraw,
            "DECLINE_DRAW" => Command::DeclineDraw,
            "STATUS" => Command::Status,
            "BOARD" | "SHOW" => Command::Board,
            "HELP" | "?" => Command::Help,
            "QUIT" | "EXIT" => Command::Quit,
            _ => Command::Move(word.parse()?),
        };
        Ok(command)
    }
}
