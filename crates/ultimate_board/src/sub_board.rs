//! One of the nine local 3x3 boards.

use super::rules::line_winner;
use super::types::{Cell, Mark, Outcome};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// A local 3x3 board with its derived outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubBoard {
    /// Cells in row-major order (0-8).
    cells: [Cell; 9],
    /// Outcome recomputed after every placement.
    outcome: Outcome,
}

impl SubBoard {
    /// Creates a new empty sub-board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the cell at the given position (0-8).
    pub fn get(&self, pos: usize) -> Option<Cell> {
        self.cells.get(pos).copied()
    }

    /// Returns all cells.
    pub fn cells(&self) -> &[Cell; 9] {
        &self.cells
    }

    /// Returns the sub-board outcome.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Checks if the board is full.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| !c.is_empty())
    }

    /// Checks if a mark may be placed at `pos`.
    pub fn accepts(&self, pos: usize) -> bool {
        self.outcome == Outcome::Undecided && matches!(self.get(pos), Some(Cell::Empty))
    }

    /// Places a mark and recomputes the outcome.
    ///
    /// Returns `false` without touching the board if the placement is not accepted.
    #[instrument(level = "debug", skip(self), fields(outcome = ?self.outcome))]
    pub(crate) fn place(&mut self, pos: usize, mark: Mark) -> bool {
        if !self.accepts(pos) {
            return false;
        }
        self.cells[pos] = Cell::Occupied(mark);
        self.update_outcome();
        true
    }

    fn update_outcome(&mut self) {
        if let Some(winner) = line_winner(&self.cells.map(Cell::mark)) {
            self.outcome = Outcome::Won(winner);
        } else if self.is_full() {
            self.outcome = Outcome::Draw;
        }
    }
}
