//! The ultimate board: nine sub-boards played as one meta game.

use super::action::{IllegalMove, Move, MoveReport};
use super::rules::line_winner;
use super::sub_board::SubBoard;
use super::types::{Mark, Outcome};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Hierarchical board state machine.
///
/// The target cell of each move selects the sub-board the opponent must
/// play on next. When that sub-board is already decided, the opponent may
/// play on any undecided sub-board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UltimateBoard {
    boards: [SubBoard; 9],
    outcome: Outcome,
    active_board: Option<usize>,
    current_turn: Mark,
    move_count: usize,
}

impl UltimateBoard {
    /// Creates an empty board with X to move anywhere.
    #[instrument]
    pub fn new() -> Self {
        Self {
            boards: Default::default(),
            outcome: Outcome::Undecided,
            active_board: None,
            current_turn: Mark::X,
            move_count: 0,
        }
    }

    /// Returns the sub-board at `index` (0-8).
    pub fn sub_board(&self, index: usize) -> Option<&SubBoard> {
        self.boards.get(index)
    }

    /// Returns all sub-boards.
    pub fn sub_boards(&self) -> &[SubBoard; 9] {
        &self.boards
    }

    /// Returns the meta game outcome.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Returns the mark to move next.
    pub fn current_turn(&self) -> Mark {
        self.current_turn
    }

    /// Returns the number of accepted moves.
    pub fn move_count(&self) -> usize {
        self.move_count
    }

    /// Returns the sub-board the next move is constrained to, or `None` for any.
    ///
    /// A constraint pointing at a board that has since been decided is
    /// treated as free choice.
    pub fn active_board(&self) -> Option<usize> {
        self.active_board
            .filter(|&b| self.boards[b].outcome() == Outcome::Undecided)
    }

    /// Checks whether a move is legal right now.
    pub fn is_legal(&self, board: usize, cell: usize) -> bool {
        self.check_move(Move::new(board, cell)).is_ok()
    }

    /// Validates a move, reporting why it is illegal.
    ///
    /// # Errors
    ///
    /// Returns the first failed [`IllegalMove`] condition.
    #[instrument(level = "debug", skip(self), fields(mv = %mv))]
    pub fn check_move(&self, mv: Move) -> Result<(), IllegalMove> {
        let (board, cell) = (mv.board(), mv.cell());

        if self.outcome.is_decided() {
            return Err(IllegalMove::GameOver);
        }
        if board >= 9 || cell >= 9 {
            return Err(IllegalMove::OutOfRange { board, cell });
        }
        if let Some(required) = self.active_board()
            && required != board
        {
            return Err(IllegalMove::WrongBoard {
                required,
                attempted: board,
            });
        }

        let target = &self.boards[board];
        if target.outcome().is_decided() {
            return Err(IllegalMove::BoardDecided(board));
        }
        if !target.accepts(cell) {
            return Err(IllegalMove::CellOccupied { board, cell });
        }

        Ok(())
    }

    /// Applies a move for the current mark.
    ///
    /// Recomputes the target sub-board outcome, the next active board and
    /// the meta outcome, then passes the turn.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalMove`] and leaves the board untouched when the move
    /// is not legal.
    #[instrument(skip(self), fields(mv = %mv, mark = %self.current_turn))]
    pub fn apply(&mut self, mv: Move) -> Result<MoveReport, IllegalMove> {
        self.check_move(mv)?;

        let mark = self.current_turn;
        let game_before = self.outcome;
        let sub_before = self.boards[mv.board()].outcome();

        if !self.boards[mv.board()].place(mv.cell(), mark) {
            return Err(IllegalMove::CellOccupied {
                board: mv.board(),
                cell: mv.cell(),
            });
        }
        let sub_after = self.boards[mv.board()].outcome();

        self.active_board = if self.boards[mv.cell()].outcome() == Outcome::Undecided {
            Some(mv.cell())
        } else {
            None
        };

        self.update_outcome();
        self.current_turn = mark.opponent();
        self.move_count += 1;

        debug!(
            ?sub_after,
            game = ?self.outcome,
            next_board = ?self.active_board,
            "Move applied"
        );

        Ok(MoveReport {
            mv,
            mark,
            sub_before,
            sub_after,
            game_before,
            game_after: self.outcome,
            next_board: self.active_board,
        })
    }

    /// Undecided sub-boards the next move may target.
    ///
    /// Empty once the game is decided.
    pub fn legal_boards(&self) -> Vec<usize> {
        if self.outcome.is_decided() {
            return Vec::new();
        }
        match self.active_board() {
            Some(board) => vec![board],
            None => (0..9)
                .filter(|&b| self.boards[b].outcome() == Outcome::Undecided)
                .collect(),
        }
    }

    /// Every legal move for the current mark.
    pub fn legal_moves(&self) -> Vec<Move> {
        self.legal_boards()
            .into_iter()
            .flat_map(|b| {
                let sub = &self.boards[b];
                (0..9).filter(|&c| sub.accepts(c)).map(move |c| Move::new(b, c))
            })
            .collect()
    }

    fn update_outcome(&mut self) {
        if self.outcome.is_decided() {
            return;
        }
        let meta = self.boards.each_ref().map(|b| b.outcome().winner());
        if let Some(winner) = line_winner(&meta) {
            self.outcome = Outcome::Won(winner);
        } else if self.boards.iter().all(|b| b.outcome().is_decided()) {
            self.outcome = Outcome::Draw;
        }
    }
}

impl Default for UltimateBoard {
    fn default() -> Self {
        Self::new()
    }
}
