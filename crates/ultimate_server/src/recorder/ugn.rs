//! UGN (ultimate game notation) records.
//!
//! A record is a block of `[Key "Value"]` tags, a blank line, the moves
//! two per line, and a result line:
//!
//! ```text
//! [GameID "K3J9Q2ZA"]
//! [Date "2025-01-31"]
//! [Time "18:04:55"]
//! [PlayerX "ann"]
//! [PlayerO "bob"]
//! [Result "X"]
//!
//! E5 E1
//! A5 E9
//! 1-0
//! ```
//!
//! Each move may carry annotations: `!` won its sub-board, `/` drew its
//! sub-board, `%` drew the game, `#` won the game.

use super::RecorderError;
use std::io::{BufRead, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, instrument};
use ultimate_board::{Move, MoveReport, Outcome, board_letter};

/// One annotated move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UgnMove {
    /// Sub-board index (0-8).
    pub board: usize,
    /// Cell index (0-8).
    pub cell: usize,
    /// The move won its sub-board.
    pub sub_won: bool,
    /// The move drew its sub-board.
    pub sub_drawn: bool,
    /// The move drew the game.
    pub game_drawn: bool,
    /// The move won the game.
    pub game_won: bool,
}

impl UgnMove {
    /// Annotates a move by diffing the outcomes before and after it.
    pub fn from_report(report: &MoveReport) -> Self {
        let sub_fresh = report.sub_before == Outcome::Undecided;
        let game_fresh = report.game_before == Outcome::Undecided;
        Self {
            board: report.mv.board(),
            cell: report.mv.cell(),
            sub_won: sub_fresh && matches!(report.sub_after, Outcome::Won(_)),
            sub_drawn: sub_fresh && report.sub_after == Outcome::Draw,
            game_drawn: game_fresh && report.game_after == Outcome::Draw,
            game_won: game_fresh && matches!(report.game_after, Outcome::Won(_)),
        }
    }

    /// The plain move without annotations.
    pub fn to_move(self) -> Move {
        Move::new(self.board, self.cell)
    }
}

impl std::fmt::Display for UgnMove {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", board_letter(self.board), self.cell + 1)?;
        if self.sub_won {
            f.write_str("!")?;
        }
        if self.sub_drawn {
            f.write_str("/")?;
        }
        if self.game_drawn {
            f.write_str("%")?;
        }
        if self.game_won {
            f.write_str("#")?;
        }
        Ok(())
    }
}

impl FromStr for UgnMove {
    type Err = RecorderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .char_indices()
            .nth(2)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        let (head, marks) = s.split_at(split);

        let mv: Move = head
            .parse()
            .map_err(|_| RecorderError::new(format!("Invalid UGN move format: {}", s)))?;
        if let Some(bad) = marks.chars().find(|c| !"!/%#".contains(*c)) {
            return Err(RecorderError::new(format!(
                "Invalid UGN annotation '{}' in {}",
                bad, s
            )));
        }

        Ok(Self {
            board: mv.board(),
            cell: mv.cell(),
            sub_won: marks.contains('!'),
            sub_drawn: marks.contains('/'),
            game_drawn: marks.contains('%'),
            game_won: marks.contains('#'),
        })
    }
}

/// Tag block of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UgnMetadata {
    /// Match id.
    pub game_id: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// `HH:MM:SS`.
    pub time: String,
    /// X player's name.
    pub player_x: String,
    /// O player's name.
    pub player_o: String,
    /// `"X"`, `"O"`, `"Draw"` or `"In Progress"`.
    pub result: String,
    /// Optional note on how the game ended.
    pub comment: Option<String>,
}

/// A complete game record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UgnGame {
    /// Tags.
    pub metadata: UgnMetadata,
    /// Moves in play order.
    pub moves: Vec<UgnMove>,
}

impl UgnGame {
    /// Starts a record stamped with the local date and time.
    #[instrument]
    pub fn new(game_id: &str, player_x: &str, player_o: &str) -> Self {
        let now = chrono::Local::now();
        Self {
            metadata: UgnMetadata {
                game_id: game_id.to_string(),
                date: now.format("%Y-%m-%d").to_string(),
                time: now.format("%H:%M:%S").to_string(),
                player_x: player_x.to_string(),
                player_o: player_o.to_string(),
                result: "In Progress".to_string(),
                comment: None,
            },
            moves: Vec::new(),
        }
    }

    /// Moves joined by spaces.
    pub fn moves_string(&self) -> String {
        self.moves
            .iter()
            .map(UgnMove::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// File name `YYYYMMDD_HHMMSS_<GameID>.ugn`.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.ugn",
            self.metadata.date.replace('-', ""),
            self.metadata.time.replace(':', ""),
            self.metadata.game_id
        )
    }

    /// Result line for the record's result tag.
    pub fn result_line(&self) -> &'static str {
        match self.metadata.result.as_str() {
            "X" => "1-0",
            "O" => "0-1",
            "Draw" => "1/2-1/2",
            _ => "*",
        }
    }

    /// Writes the record.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn write_to(&self, mut out: impl Write) -> Result<(), RecorderError> {
        let meta = &self.metadata;
        writeln!(out, "[GameID \"{}\"]", tag_value(&meta.game_id))?;
        writeln!(out, "[Date \"{}\"]", tag_value(&meta.date))?;
        writeln!(out, "[Time \"{}\"]", tag_value(&meta.time))?;
        writeln!(out, "[PlayerX \"{}\"]", tag_value(&meta.player_x))?;
        writeln!(out, "[PlayerO \"{}\"]", tag_value(&meta.player_o))?;
        writeln!(out, "[Result \"{}\"]", tag_value(&meta.result))?;
        if let Some(comment) = meta.comment.as_deref().filter(|c| !c.is_empty()) {
            writeln!(out, "[Comment \"{}\"]", tag_value(comment))?;
        }
        writeln!(out)?;

        for pair in self.moves.chunks(2) {
            let line = pair
                .iter()
                .map(UgnMove::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(out, "{}", line)?;
        }
        writeln!(out, "{}", self.result_line())?;
        Ok(())
    }

    /// Writes the record to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<(), RecorderError> {
        let file = std::fs::File::create(path.as_ref())?;
        let mut out = std::io::BufWriter::new(file);
        self.write_to(&mut out)?;
        out.flush()?;
        debug!(moves = self.moves.len(), "UGN file written");
        Ok(())
    }

    /// Parses a record.
    ///
    /// Unknown tags and result lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error on unreadable input or a malformed move.
    pub fn parse(input: impl BufRead) -> Result<Self, RecorderError> {
        let mut game = UgnGame::default();
        let mut in_tags = true;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();

            if in_tags {
                if line.is_empty() {
                    in_tags = false;
                } else if let Some((key, value)) = parse_tag(line) {
                    game.set_tag(key, value);
                }
                continue;
            }

            if line.is_empty() || matches!(line, "1-0" | "0-1" | "1/2-1/2" | "*") {
                continue;
            }
            for token in line.split_whitespace() {
                game.moves.push(token.parse()?);
            }
        }

        Ok(game)
    }

    /// Parses a record from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self, RecorderError> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::parse(std::io::BufReader::new(file))
    }

    fn set_tag(&mut self, key: &str, value: &str) {
        let meta = &mut self.metadata;
        let value = value.to_string();
        match key {
            "GameID" => meta.game_id = value,
            "Date" => meta.date = value,
            "Time" => meta.time = value,
            "PlayerX" => meta.player_x = value,
            "PlayerO" => meta.player_o = value,
            "Result" => meta.result = value,
            "Comment" => meta.comment = Some(value),
            _ => debug!(key, "Ignoring unknown UGN tag"),
        }
    }
}

/// A tag value must stay on its own line; control characters become spaces.
fn tag_value(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Splits `[Key "Value"]` into its parts.
fn parse_tag(line: &str) -> Option<(&str, &str)> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    let (key, rest) = inner.split_once(char::is_whitespace)?;
    let value = rest.trim().strip_prefix('"')?.strip_suffix('"')?;
    if key.is_empty() || !key.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    Some((key, value))
}
