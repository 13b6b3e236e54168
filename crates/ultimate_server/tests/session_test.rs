//! Session lifecycle, turn enforcement and the draw handshake.

use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;
use ultimate_board::{IllegalMove, Mark, Move, MoveReport};
use ultimate_server::{
    ClientHandle, GameMatch, GameRecorder, GameResult, GameSession, MatchMode, Player,
    PlayerRequest, RecorderError, SessionError, SessionPhase,
};

fn request(id: &str) -> PlayerRequest {
    let (handle, rx) = ClientHandle::channel();
    std::mem::forget(rx);
    PlayerRequest::new(id, format!("{}-name", id), handle, MatchMode::Simple)
}

fn game_match(ids: &[&str]) -> GameMatch {
    GameMatch {
        id: "TESTGAME".into(),
        players: ids.iter().map(|id| request(id)).collect(),
        created_at: std::time::Instant::now(),
        mode: MatchMode::Simple,
    }
}

fn started(seed: u64) -> (GameSession, Player, Player) {
    let mut rng = StdRng::seed_from_u64(seed);
    let session = GameSession::from_match(&game_match(&["p1", "p2"]), None, &mut rng).unwrap();
    let players = session.players();
    let x = players.iter().find(|p| p.mark == Mark::X).cloned().unwrap();
    let o = players.iter().find(|p| p.mark == Mark::O).cloned().unwrap();
    (session, x, o)
}

fn seat(id: &str, mark: Mark) -> Player {
    let (handle, rx) = ClientHandle::channel();
    std::mem::forget(rx);
    Player {
        id: id.into(),
        name: id.into(),
        mark,
        handle,
    }
}

#[test]
fn test_match_starts_game_with_both_marks() {
    for seed in 0..8 {
        let (session, x, o) = started(seed);
        assert_eq!(session.phase(), SessionPhase::Active);
        assert_ne!(x.id, o.id);
        assert_eq!(session.current_player().map(|p| p.id), Some(x.id));
    }
}

#[test]
fn test_match_needs_two_players() {
    let mut rng = StdRng::seed_from_u64(1);
    let err = GameSession::from_match(&game_match(&["a", "b", "c"]), None, &mut rng).unwrap_err();
    assert_eq!(err, SessionError::InvalidMatch { players: 3 });
}

#[test]
fn test_move_before_start() {
    let session = GameSession::new("S".into());
    let x = seat("x", Mark::X);
    session.attach_player(x.clone()).unwrap();
    assert_eq!(
        session.make_move(&x.id, Move::new(4, 4)),
        Err(SessionError::NotStarted)
    );
    assert_eq!(session.snapshot().board.move_count(), 0);
}

#[test]
fn test_wrong_turn_leaves_board_unchanged() {
    let (session, x, o) = started(7);
    assert_eq!(
        session.make_move(&o.id, Move::new(4, 4)),
        Err(SessionError::WrongTurn { expected: Mark::X })
    );
    assert_eq!(session.snapshot().board.move_count(), 0);

    session.make_move(&x.id, Move::new(0, 4)).unwrap();
    assert_eq!(
        session.make_move(&o.id, Move::new(0, 0)),
        Err(SessionError::IllegalMove(IllegalMove::WrongBoard {
            required: 4,
            attempted: 0
        }))
    );
    assert_eq!(session.current_turn(), Mark::O);
}

#[test]
fn test_resign_ends_game() {
    let (session, x, o) = started(3);
    assert_eq!(session.resign(&x.id), Ok(GameResult::Winner(Mark::O)));
    assert_eq!(session.phase(), SessionPhase::Finished);
    assert_eq!(session.result(), Some(GameResult::Winner(Mark::O)));
    assert_eq!(
        session.make_move(&x.id, Move::new(4, 4)),
        Err(SessionError::AlreadyFinished)
    );
    assert_eq!(session.resign(&o.id), Err(SessionError::AlreadyFinished));
    assert_eq!(session.offer_draw(&o.id), Err(SessionError::AlreadyFinished));
    assert_eq!(session.status_line(), "Game Over - O Wins!");
}

#[test]
fn test_draw_handshake() {
    let (session, x, o) = started(11);

    assert_eq!(session.accept_draw(&o.id), Err(SessionError::NoPendingOffer));
    session.offer_draw(&x.id).unwrap();
    assert_eq!(session.offer_draw(&o.id), Err(SessionError::DrawAlreadyOffered));
    assert_eq!(session.accept_draw(&x.id), Err(SessionError::SelfOffer));
    assert_eq!(session.decline_draw(&x.id), Err(SessionError::SelfOffer));

    session.decline_draw(&o.id).unwrap();
    assert!(!session.draw_offer_pending());
    assert_eq!(session.phase(), SessionPhase::Active);

    session.offer_draw(&o.id).unwrap();
    session.accept_draw(&x.id).unwrap();
    assert_eq!(session.result(), Some(GameResult::Draw));
    assert!(!session.draw_offer_pending());
    assert_eq!(session.accept_draw(&o.id), Err(SessionError::AlreadyFinished));
}

#[test]
fn test_unseated_player_cannot_act() {
    let (session, x, _o) = started(2);
    let not_seated = |id: &str| SessionError::NotSeated {
        player_id: id.into(),
    };

    assert_eq!(
        session.make_move("ghost", Move::new(4, 4)),
        Err(not_seated("ghost"))
    );
    assert_eq!(session.resign("ghost"), Err(not_seated("ghost")));
    assert_eq!(session.offer_draw("ghost"), Err(not_seated("ghost")));
    session.offer_draw(&x.id).unwrap();
    assert_eq!(session.accept_draw("ghost"), Err(not_seated("ghost")));
    assert_eq!(session.decline_draw("ghost"), Err(not_seated("ghost")));

    assert_eq!(session.phase(), SessionPhase::Active);
    assert_eq!(session.snapshot().board.move_count(), 0);
    assert!(session.draw_offer_pending());

    // A player who left loses their seat along with the right to act.
    session.detach_player(&x.id);
    assert_eq!(
        session.make_move(&x.id, Move::new(4, 4)),
        Err(not_seated(x.id.as_str()))
    );
}

#[test]
fn test_concurrent_moves_apply_once() {
    let (session, x, o) = started(13);
    let session = Arc::new(session);
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let session = Arc::clone(&session);
            let barrier = Arc::clone(&barrier);
            let id = if i % 2 == 0 { x.id.clone() } else { o.id.clone() };
            std::thread::spawn(move || {
                barrier.wait();
                session.make_move(&id, Move::new(4, 4)).is_ok()
            })
        })
        .collect();
    let applied = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(applied, 1);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.board.move_count(), 1);
    assert_eq!(snapshot.history, [Move::new(4, 4)]);
    assert_eq!(session.current_turn(), Mark::O);
}

#[test]
fn test_snapshots_are_consistent_during_play() {
    let (session, x, o) = started(21);
    let session = Arc::new(session);
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let session = Arc::clone(&session);
        let done = Arc::clone(&done);
        std::thread::spawn(move || {
            let mut seen = 0;
            loop {
                let snapshot = session.snapshot();
                assert_eq!(snapshot.history.len(), snapshot.board.move_count());
                seen += 1;
                if done.load(Ordering::Acquire) {
                    return seen;
                }
            }
        })
    };

    while !session.is_finished() {
        let board = session.snapshot().board;
        let mv = board.legal_moves()[0];
        let id = if board.current_turn() == Mark::X { &x.id } else { &o.id };
        session.make_move(id, mv).unwrap();
    }
    done.store(true, Ordering::Release);
    assert!(reader.join().unwrap() > 0);
}

#[test]
fn test_seat_rules() {
    let session = GameSession::new("S".into());
    session.attach_player(seat("a", Mark::X)).unwrap();
    assert_eq!(
        session.attach_player(seat("a", Mark::O)),
        Err(SessionError::AlreadySeated {
            player_id: "a".into()
        })
    );
    session.attach_player(seat("b", Mark::O)).unwrap();
    assert_eq!(
        session.attach_player(seat("c", Mark::O)),
        Err(SessionError::SessionFull)
    );
}

#[test]
fn test_detach_keeps_game_state() {
    let (session, x, o) = started(5);
    session.make_move(&x.id, Move::new(4, 4)).unwrap();

    let gone = session.detach_player(&x.id).map(|p| p.id);
    assert_eq!(gone, Some(x.id.clone()));
    assert!(session.detach_player(&x.id).is_none());

    assert_eq!(session.phase(), SessionPhase::Active);
    assert_eq!(session.snapshot().board.move_count(), 1);
    assert_eq!(session.name_of(Mark::X), Some(x.name.clone()));
    assert!(session.opponent_of(&o.id).is_none());
    assert_eq!(
        session.attach_player(seat("late", Mark::X)),
        Err(SessionError::SessionFull)
    );

    // The remaining player can still act.
    session.make_move(&o.id, Move::new(4, 0)).unwrap();
    assert_eq!(session.resign(&o.id), Ok(GameResult::Winner(Mark::X)));
}

#[test]
fn test_broadcast_skips_closed_clients() {
    let session = GameSession::new("S".into());
    let (open, mut rx) = ClientHandle::channel();
    let (closed, dead_rx) = ClientHandle::channel();
    drop(dead_rx);
    session
        .attach_player(Player {
            id: "a".into(),
            name: "a".into(),
            mark: Mark::X,
            handle: open,
        })
        .unwrap();
    session
        .attach_player(Player {
            id: "b".into(),
            name: "b".into(),
            mark: Mark::O,
            handle: closed,
        })
        .unwrap();

    session.broadcast(&ultimate_server::ServerMessage::info("hi"));
    assert!(rx.try_recv().is_ok());
    assert!(!session.send_to("b", ultimate_server::ServerMessage::info("lost")));
    assert!(!session.send_to("nobody", ultimate_server::ServerMessage::info("lost")));
}

#[derive(Debug, Clone, Default)]
struct Events {
    log: Arc<Mutex<Vec<String>>>,
    started: bool,
    fail: bool,
}

impl GameRecorder for Events {
    fn start_game(&mut self, match_id: &str, x: &str, o: &str) -> Result<(), RecorderError> {
        self.log.lock().push(format!("start {} {} {}", match_id, x, o));
        self.started = true;
        Ok(())
    }

    fn log_move(&mut self, report: &MoveReport) -> Result<(), RecorderError> {
        if self.fail {
            return Err(RecorderError::new("disk full"));
        }
        self.log.lock().push(format!("move {}", report.mv));
        Ok(())
    }

    fn end_game_with_comment(
        &mut self,
        result: GameResult,
        comment: &str,
    ) -> Result<(), RecorderError> {
        self.log.lock().push(format!("end {} {}", result, comment));
        self.started = false;
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started
    }

    fn moves(&self) -> Vec<String> {
        Vec::new()
    }
}

fn recorded(events: Events) -> (GameSession, Player, Player) {
    let mut rng = StdRng::seed_from_u64(42);
    let session = GameSession::from_match(
        &game_match(&["p1", "p2"]),
        Some(Box::new(events)),
        &mut rng,
    )
    .unwrap();
    let x = session.players().into_iter().find(|p| p.mark == Mark::X).unwrap();
    let o = session.players().into_iter().find(|p| p.mark == Mark::O).unwrap();
    (session, x, o)
}

#[test]
fn test_full_game_reaches_recorder() {
    let events = Events::default();
    let log = Arc::clone(&events.log);
    let (session, x, o) = recorded(events);

    let mut moves = 0;
    while !session.is_finished() {
        let board = session.snapshot().board;
        let mv = board.legal_moves()[0];
        let player = if board.current_turn() == Mark::X { &x } else { &o };
        session.make_move(&player.id, mv).unwrap();
        moves += 1;
    }

    let snapshot = session.snapshot();
    assert_eq!(snapshot.history.len(), moves);
    assert_eq!(snapshot.board.move_count(), moves);
    let expected = match snapshot.board.outcome().winner() {
        Some(mark) => GameResult::Winner(mark),
        None => GameResult::Draw,
    };
    assert_eq!(session.result(), Some(expected));

    let log = log.lock();
    assert_eq!(log.len(), moves + 2);
    assert!(log[0].starts_with("start TESTGAME"));
    assert_eq!(log.last().cloned(), Some(format!("end {} ", expected)));
}

#[test]
fn test_resign_and_draw_comments() {
    let events = Events::default();
    let log = Arc::clone(&events.log);
    let (session, x, _o) = recorded(events);
    session.resign(&x.id).unwrap();
    assert_eq!(log.lock().last().cloned(), Some("end O O wins by resignation".into()));

    let events = Events::default();
    let log = Arc::clone(&events.log);
    let (session, x, o) = recorded(events);
    session.offer_draw(&x.id).unwrap();
    session.accept_draw(&o.id).unwrap();
    assert_eq!(log.lock().last().cloned(), Some("end Draw agreement".into()));
}

#[test]
fn test_recorder_failure_does_not_block_play() {
    let events = Events {
        fail: true,
        ..Default::default()
    };
    let (session, x, o) = recorded(events);
    session.make_move(&x.id, Move::new(4, 4)).unwrap();
    session.make_move(&o.id, Move::new(4, 0)).unwrap();
    assert_eq!(session.snapshot().board.move_count(), 2);
}

/// Holds `end_game` until the test has looked at the session.
#[derive(Debug)]
struct Gate {
    barrier: Arc<Barrier>,
    started: bool,
}

impl GameRecorder for Gate {
    fn start_game(&mut self, _: &str, _: &str, _: &str) -> Result<(), RecorderError> {
        self.started = true;
        Ok(())
    }

    fn log_move(&mut self, _: &MoveReport) -> Result<(), RecorderError> {
        Ok(())
    }

    fn end_game_with_comment(&mut self, _: GameResult, _: &str) -> Result<(), RecorderError> {
        self.barrier.wait();
        self.barrier.wait();
        self.started = false;
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started
    }

    fn moves(&self) -> Vec<String> {
        Vec::new()
    }
}

#[test]
fn test_recorder_runs_outside_session_lock() {
    let barrier = Arc::new(Barrier::new(2));
    let gate = Gate {
        barrier: Arc::clone(&barrier),
        started: false,
    };
    let mut rng = StdRng::seed_from_u64(4);
    let session = Arc::new(
        GameSession::from_match(&game_match(&["p1", "p2"]), Some(Box::new(gate)), &mut rng)
            .unwrap(),
    );
    let x = session.players().into_iter().find(|p| p.mark == Mark::X).unwrap();

    let resigning = {
        let session = Arc::clone(&session);
        std::thread::spawn(move || session.resign(&x.id))
    };

    // The recorder is now inside end_game.
    barrier.wait();
    let (tx, rx) = std::sync::mpsc::channel();
    let reader = {
        let session = Arc::clone(&session);
        std::thread::spawn(move || {
            let _ = tx.send(session.phase());
        })
    };
    let phase = rx.recv_timeout(Duration::from_secs(5));
    barrier.wait();

    assert_eq!(phase, Ok(SessionPhase::Finished));
    assert_eq!(resigning.join().unwrap(), Ok(GameResult::Winner(Mark::O)));
    reader.join().unwrap();
}
