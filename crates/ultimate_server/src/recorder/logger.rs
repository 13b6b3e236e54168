//! File-backed recorder writing one `.ugn` file per finished game.

use super::{GameRecorder, RecorderError, UgnGame, UgnMove};
use crate::session::GameResult;
use std::path::PathBuf;
use tracing::{debug, info, instrument};
use ultimate_board::MoveReport;

/// Buffers a game in memory and writes it under `games_dir` when it ends.
#[derive(Debug)]
pub struct UgnRecorder {
    games_dir: PathBuf,
    game: Option<UgnGame>,
    started: bool,
}

impl UgnRecorder {
    /// Creates a recorder that writes into `games_dir`.
    pub fn new(games_dir: impl Into<PathBuf>) -> Self {
        Self {
            games_dir: games_dir.into(),
            game: None,
            started: false,
        }
    }

    /// The record being written, if any.
    pub fn current_game(&self) -> Option<&UgnGame> {
        self.game.as_ref()
    }

    fn open_game(&mut self) -> Result<&mut UgnGame, RecorderError> {
        if !self.started {
            return Err(RecorderError::new("Game logging not started"));
        }
        self.game
            .as_mut()
            .ok_or_else(|| RecorderError::new("Game logging not started"))
    }
}

impl GameRecorder for UgnRecorder {
    #[instrument(skip(self), fields(games_dir = %self.games_dir.display()))]
    fn start_game(
        &mut self,
        match_id: &str,
        player_x: &str,
        player_o: &str,
    ) -> Result<(), RecorderError> {
        std::fs::create_dir_all(&self.games_dir).map_err(|e| {
            RecorderError::new(format!("Failed to create games directory: {}", e))
        })?;
        self.game = Some(UgnGame::new(match_id, player_x, player_o));
        self.started = true;
        info!("Game record started");
        Ok(())
    }

    #[instrument(skip(self, report), fields(mv = %report.mv))]
    fn log_move(&mut self, report: &MoveReport) -> Result<(), RecorderError> {
        let game = self.open_game()?;
        let mv = UgnMove::from_report(report);
        game.moves.push(mv);
        debug!(notation = %mv, total = game.moves.len(), "Move recorded");
        Ok(())
    }

    #[instrument(skip(self))]
    fn end_game_with_comment(
        &mut self,
        result: GameResult,
        comment: &str,
    ) -> Result<(), RecorderError> {
        let games_dir = self.games_dir.clone();
        let game = self.open_game()?;
        game.metadata.result = result.to_string();
        if !comment.is_empty() {
            game.metadata.comment = Some(comment.to_string());
        }

        let path = games_dir.join(game.file_name());
        game.write_file(&path)
            .map_err(|e| RecorderError::new(format!("Failed to save UGN file: {}", e.message)))?;
        self.started = false;
        info!(path = %path.display(), "Game record saved");
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started
    }

    fn moves(&self) -> Vec<String> {
        self.game
            .as_ref()
            .map(|g| g.moves.iter().map(UgnMove::to_string).collect())
            .unwrap_or_default()
    }
}
