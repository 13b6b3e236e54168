//! UGN files written by the recorder and read back.

use ultimate_board::{Move, MoveReport, UltimateBoard};
use ultimate_server::{GameRecorder, GameResult, UgnGame, UgnMove, UgnRecorder};

/// Plays `moves` and returns their reports.
fn play(moves: &[&str]) -> Vec<MoveReport> {
    let mut board = UltimateBoard::new();
    moves
        .iter()
        .map(|m| board.apply(m.parse::<Move>().unwrap()).unwrap())
        .collect()
}

#[test]
fn test_recorder_writes_parseable_file() {
    let dir = tempfile::tempdir().unwrap();
    let games_dir = dir.path().join("games");
    let mut recorder = UgnRecorder::new(&games_dir);

    // X takes sub-board A with A1 A2 A3.
    let reports = play(&["A1", "A4", "D5", "E1", "A2", "B1", "A3"]);
    recorder.start_game("AB12CD34", "ann", "bob").unwrap();
    for report in &reports {
        recorder.log_move(report).unwrap();
    }
    assert_eq!(recorder.moves().last().map(String::as_str), Some("A3!"));
    recorder.end_game(GameResult::Winner(ultimate_board::Mark::X)).unwrap();
    assert!(!recorder.is_started());

    let files: Vec<_> = std::fs::read_dir(&games_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.ends_with("_AB12CD34.ugn"), "{}", name);
    assert_eq!(name.len(), "YYYYMMDD_HHMMSS_AB12CD34.ugn".len());

    let text = std::fs::read_to_string(&files[0]).unwrap();
    assert!(text.contains("[Result \"X\"]"));
    assert!(text.contains("\nA1 A4\n"));
    assert!(text.trim_end().ends_with("1-0"));

    let parsed = UgnGame::parse_file(&files[0]).unwrap();
    assert_eq!(parsed.metadata.game_id, "AB12CD34");
    assert_eq!(parsed.metadata.player_x, "ann");
    assert_eq!(parsed.metadata.player_o, "bob");
    assert_eq!(parsed.metadata.result, "X");
    assert_eq!(parsed.metadata.comment, None);
    let moves: Vec<Move> = parsed.moves.iter().map(|m| m.to_move()).collect();
    let played: Vec<Move> = reports.iter().map(|r| r.mv).collect();
    assert_eq!(moves, played);
    assert!(parsed.moves[6].sub_won);
}

#[test]
fn test_comment_and_draw_result() {
    let dir = tempfile::tempdir().unwrap();
    let mut recorder = UgnRecorder::new(dir.path());
    recorder.start_game("DRAWN001", "ann", "bob").unwrap();
    for report in play(&["E5", "E1"]) {
        recorder.log_move(&report).unwrap();
    }
    recorder
        .end_game_with_comment(GameResult::Draw, "agreement")
        .unwrap();

    let game = recorder.current_game().unwrap();
    let path = dir.path().join(game.file_name());
    let parsed = UgnGame::parse_file(&path).unwrap();
    assert_eq!(parsed.metadata.result, "Draw");
    assert_eq!(parsed.metadata.comment.as_deref(), Some("agreement"));
    assert_eq!(parsed.moves_string(), "E5 E1");
    assert_eq!(parsed.result_line(), "1/2-1/2");
}

#[test]
fn test_log_before_start_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut recorder = UgnRecorder::new(dir.path());
    let reports = play(&["E5"]);
    assert!(recorder.log_move(&reports[0]).is_err());
    assert!(recorder.end_game(GameResult::Draw).is_err());
    assert!(recorder.moves().is_empty());
}

#[test]
fn test_parse_skips_unknown_tags() {
    let text = "[GameID \"X1\"]\n[Event \"club night\"]\n[Result \"O\"]\n\nE5 E1!\nA5#\n0-1\n";
    let game = UgnGame::parse(text.as_bytes()).unwrap();
    assert_eq!(game.metadata.game_id, "X1");
    assert_eq!(game.moves.len(), 3);
    assert!(game.moves[1].sub_won);
    assert!(game.moves[2].game_won);
    assert_eq!(game.moves[2], "A5#".parse::<UgnMove>().unwrap());
}

#[test]
fn test_parse_rejects_bad_move() {
    let text = "[GameID \"X1\"]\n\nE5 Q9\n*\n";
    assert!(UgnGame::parse(text.as_bytes()).is_err());
}
