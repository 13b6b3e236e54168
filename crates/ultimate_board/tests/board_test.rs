//! Tests for the ultimate board state machine.

use ultimate_board::{Cell, IllegalMove, Mark, Move, Outcome, UltimateBoard, line_winner};

fn play(board: &mut UltimateBoard, moves: &[&str]) {
    for notation in moves {
        let mv: Move = notation.parse().expect("valid notation");
        board
            .apply(mv)
            .unwrap_or_else(|e| panic!("{notation} rejected: {e}"));
    }
}

/// Small deterministic generator so playouts are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

#[test]
fn test_a5_forces_board_e() {
    let mut board = UltimateBoard::new();
    play(&mut board, &["A5"]);

    assert_eq!(board.active_board(), Some(4));
    assert_eq!(board.legal_boards(), vec![4]);
    for other in [0, 1, 2, 3, 5, 6, 7, 8] {
        assert!(!board.is_legal(other, 0));
        assert!(matches!(
            board.apply(Move::new(other, 0)),
            Err(IllegalMove::WrongBoard { required: 4, .. })
        ));
    }
    assert!(board.is_legal(4, 0));
}

#[test]
fn test_three_in_a_row_decides_sub_board_immediately() {
    let mut board = UltimateBoard::new();
    play(&mut board, &["A1", "A4", "D5", "E1", "A2", "B1"]);
    assert_eq!(board.sub_board(0).unwrap().outcome(), Outcome::Undecided);

    play(&mut board, &["A3"]);
    assert_eq!(board.sub_board(0).unwrap().outcome(), Outcome::Won(Mark::X));
    assert_eq!(board.outcome(), Outcome::Undecided);
}

#[test]
fn test_decided_board_cannot_be_targeted() {
    let mut board = UltimateBoard::new();
    play(&mut board, &["A1", "A4", "D5", "E1", "A2", "B1", "A3"]);
    // X's A3 sends O to C; O's C1 sends X to the decided board A.
    play(&mut board, &["C1"]);

    assert_eq!(board.active_board(), None);
    assert!(!board.legal_boards().contains(&0));
    assert_eq!(board.apply(Move::new(0, 8)), Err(IllegalMove::BoardDecided(0)));
}

#[test]
fn test_wrong_turn_is_impossible_to_express_and_turns_alternate() {
    let mut board = UltimateBoard::new();
    assert_eq!(board.current_turn(), Mark::X);
    play(&mut board, &["E5"]);
    assert_eq!(board.current_turn(), Mark::O);
    assert!(board.apply(Move::new(4, 4)).is_err());
    assert_eq!(board.current_turn(), Mark::O, "rejected move must not flip the turn");
    play(&mut board, &["E1"]);
    assert_eq!(board.current_turn(), Mark::X);
}

#[test]
fn test_random_playouts_hold_invariants() {
    for seed in 1..=40u64 {
        let mut rng = Lcg(seed);
        let mut board = UltimateBoard::new();

        loop {
            let legal = board.legal_moves();
            if legal.is_empty() {
                break;
            }
            let mv = legal[rng.next(legal.len())];
            let before = board.clone();
            let report = board.apply(mv).expect("legal move accepted");

            assert_eq!(report.mark, before.current_turn());
            assert_eq!(board.current_turn(), before.current_turn().opponent());
            assert_eq!(board.move_count(), before.move_count() + 1);

            // Outcomes never revert.
            if before.outcome().is_decided() {
                assert_eq!(board.outcome(), before.outcome());
            }
            for i in 0..9 {
                let was = before.sub_board(i).unwrap().outcome();
                if was.is_decided() {
                    assert_eq!(board.sub_board(i).unwrap().outcome(), was);
                }
            }

            // Draw means full with no line.
            for sub in board.sub_boards() {
                if sub.outcome() == Outcome::Draw {
                    assert!(sub.cells().iter().all(|c| *c != Cell::Empty));
                    assert_eq!(line_winner(&sub.cells().map(Cell::mark)), None);
                }
            }

            // Target cell selects the next board.
            if !board.outcome().is_decided() {
                let target = board.sub_board(mv.cell()).unwrap();
                let expected: Vec<usize> = if target.outcome() == Outcome::Undecided {
                    vec![mv.cell()]
                } else {
                    (0..9)
                        .filter(|&b| board.sub_board(b).unwrap().outcome() == Outcome::Undecided)
                        .collect()
                };
                assert_eq!(board.legal_boards(), expected);
            }
        }

        assert!(board.outcome().is_decided(), "seed {seed} ended undecided");
        assert!(board.legal_boards().is_empty());
    }
}

#[test]
fn test_board_serializes() {
    let mut board = UltimateBoard::new();
    play(&mut board, &["I9"]);
    let json = serde_json::to_string(&board).expect("serialize");
    let back: UltimateBoard = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, board);
}
