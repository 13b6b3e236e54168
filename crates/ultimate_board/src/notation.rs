//! Board-letter + cell-digit move notation (`A1`..`I9`).

use super::action::{Move, board_letter};
use std::str::FromStr;

/// A move string that does not match `[A-I][1-9]`.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("Invalid move format: {} (expected format: A1-I9)", input)]
pub struct ParseMoveError {
    /// The rejected input, trimmed and upper-cased.
    pub input: String,
}

impl FromStr for Move {
    type Err = ParseMoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        let err = || ParseMoveError {
            input: normalized.clone(),
        };

        let &[letter, digit] = normalized.as_bytes() else {
            return Err(err());
        };
        if !(b'A'..=b'I').contains(&letter) || !(b'1'..=b'9').contains(&digit) {
            return Err(err());
        }

        Ok(Move::new(
            usize::from(letter - b'A'),
            usize::from(digit - b'1'),
        ))
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", board_letter(self.board()), self.cell() + 1)
    }
}
