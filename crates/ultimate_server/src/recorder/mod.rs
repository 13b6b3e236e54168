//! Game records in UGN notation.
//!
//! A session reports its lifecycle to a [`GameRecorder`]. Recording is
//! best-effort: the session logs recorder failures and keeps playing.

mod error;
mod logger;
mod ugn;

pub use error::RecorderError;
pub use logger::UgnRecorder;
pub use ugn::{UgnGame, UgnMetadata, UgnMove};

use crate::session::GameResult;
use ultimate_board::MoveReport;

/// Receives the events of one game.
pub trait GameRecorder: Send + Sync + std::fmt::Debug {
    /// Begins a record once both players are seated.
    fn start_game(
        &mut self,
        match_id: &str,
        player_x: &str,
        player_o: &str,
    ) -> Result<(), RecorderError>;

    /// Records an accepted move.
    ///
    /// The report carries the outcomes before and after the move, from
    /// which the annotation is derived.
    fn log_move(&mut self, report: &MoveReport) -> Result<(), RecorderError>;

    /// Finishes the record.
    fn end_game(&mut self, result: GameResult) -> Result<(), RecorderError> {
        self.end_game_with_comment(result, "")
    }

    /// Finishes the record with a comment such as `"agreement"`.
    fn end_game_with_comment(
        &mut self,
        result: GameResult,
        comment: &str,
    ) -> Result<(), RecorderError>;

    /// Whether a record is open.
    fn is_started(&self) -> bool;

    /// Moves recorded so far, in notation.
    fn moves(&self) -> Vec<String>;
}
