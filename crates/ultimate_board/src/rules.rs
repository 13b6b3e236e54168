//! Line detection shared by sub-boards and the meta board.

use super::types::Mark;
use tracing::instrument;

/// The 8 winning lines of a 3x3 grid in row-major indices.
pub const LINES: [[usize; 3]; 8] = [
    // Rows
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    // Columns
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    // Diagonals
    [0, 4, 8],
    [2, 4, 6],
];

/// Returns the mark holding a complete line, if any.
///
/// `None` entries count for neither mark, which is how drawn sub-boards
/// take part in the meta board check.
#[instrument(level = "trace")]
pub fn line_winner(grid: &[Option<Mark>; 9]) -> Option<Mark> {
    for [a, b, c] in LINES {
        if let Some(mark) = grid[a]
            && grid[b] == Some(mark)
            && grid[c] == Some(mark)
        {
            return Some(mark);
        }
    }

    None
}
