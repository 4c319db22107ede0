//! Game tests - command handlers, locking, scoring and top-out

use std::sync::{Arc, Mutex};

use room_tetris::core::{Game, GameHooks, GameSnapshot, GameStatus, PieceQueue, StepOutcome};
use room_tetris::types::{GameAction, PieceKind, Rotation, GARBAGE_CELL};

/// First seed whose sequence opens with `kind`
fn seed_starting_with(kind: PieceKind) -> u32 {
    (1..10_000)
        .find(|&seed| PieceQueue::new(seed).peek(0) == Some(kind))
        .expect("no seed opens with the requested kind")
}

#[derive(Default)]
struct Recorder {
    states: Mutex<Vec<GameSnapshot>>,
    game_overs: Mutex<Vec<GameSnapshot>>,
}

impl Recorder {
    fn hooks(self: &Arc<Self>) -> GameHooks {
        let on_state = Arc::clone(self);
        let on_over = Arc::clone(self);
        GameHooks::new(
            move |snap| on_state.states.lock().unwrap().push(snap.clone()),
            move |snap| on_over.game_overs.lock().unwrap().push(snap.clone()),
        )
    }

    fn state_count(&self) -> usize {
        self.states.lock().unwrap().len()
    }

    fn game_over_count(&self) -> usize {
        self.game_overs.lock().unwrap().len()
    }
}

fn new_game(seed: u32) -> (Game, PieceQueue) {
    let mut queue = PieceQueue::new(seed);
    let game = Game::new(10, 22, GameHooks::silent(), &mut queue, 1, 1);
    (game, queue)
}

#[test]
fn test_i_piece_moves_left_then_right_twice() {
    let (mut game, _queue) = new_game(seed_starting_with(PieceKind::I));

    let piece = game.current_piece().unwrap();
    assert_eq!(piece.kind(), PieceKind::I);
    assert_eq!((piece.x, piece.y), (3, 0));

    assert!(game.move_left());
    assert_eq!(game.current_piece().unwrap().x, 2);

    assert!(game.move_right());
    assert!(game.move_right());
    assert_eq!(game.current_piece().unwrap().x, 4);
}

#[test]
fn test_moves_stop_at_walls() {
    let (mut game, _queue) = new_game(seed_starting_with(PieceKind::I));

    let mut lefts = 0;
    while game.move_left() {
        lefts += 1;
    }
    assert_eq!(lefts, 3);
    assert_eq!(game.current_piece().unwrap().x, 0);

    let mut rights = 0;
    while game.move_right() {
        rights += 1;
    }
    assert_eq!(rights, 6);
    assert_eq!(game.current_piece().unwrap().x, 6);
}

#[test]
fn test_rotation_cycle_returns_to_spawn_state() {
    let (mut game, _queue) = new_game(seed_starting_with(PieceKind::T));
    let spawned = *game.current_piece().unwrap();

    for expected in [Rotation::East, Rotation::South, Rotation::West, Rotation::North] {
        assert!(game.rotate());
        assert_eq!(game.current_piece().unwrap().rotation, expected);
    }
    assert_eq!(*game.current_piece().unwrap(), spawned);
}

#[test]
fn test_rotation_without_room_is_rejected() {
    let (mut game, _queue) = new_game(seed_starting_with(PieceKind::I));
    while game.move_left() {}

    // East I uses matrix column 2, so at x = -2 it sits in board column 0.
    // South would need board columns -2..=1.
    assert!(game.rotate());
    assert!(game.move_left());
    assert!(game.move_left());
    assert_eq!(game.current_piece().unwrap().x, -2);
    assert!(!game.rotate());
    assert_eq!(game.current_piece().unwrap().rotation, Rotation::East);
}

#[test]
fn test_soft_drop_locks_once_then_spawns() {
    let recorder = Arc::new(Recorder::default());
    let mut queue = PieceQueue::new(seed_starting_with(PieceKind::O));
    let mut game = Game::new(10, 22, recorder.hooks(), &mut queue, 1, 1);
    let second = queue.peek(1).unwrap();

    let mut locks = 0;
    for _ in 0..40 {
        if let StepOutcome::Locked(report) = game.soft_drop(&mut queue) {
            locks += 1;
            assert_eq!(report.lines_cleared, 0);
            assert!(!report.topped_out);
            break;
        }
    }

    assert_eq!(locks, 1);
    assert_eq!(game.board().filled_cells(), 4);
    assert_eq!(game.board().get(4, 21), Some(PieceKind::O.id()));
    assert_eq!(game.current_piece().unwrap().kind(), second);
    assert_eq!(game.current_piece().unwrap().y, 0);
    assert_eq!(game.score(), 0);
    // Twenty single-row descents plus the lock.
    assert_eq!(recorder.state_count(), 21);
}

#[test]
fn test_lock_on_full_rows_scores_points() {
    let (mut game, mut queue) = new_game(seed_starting_with(PieceKind::I));

    // Garbage rows are completely filled and clear with the next lock.
    assert!(game.receive_garbage(2));
    let outcome = game.hard_drop(&mut queue);
    let report = outcome.lock().unwrap();

    assert_eq!(report.lines_cleared, 2);
    assert_eq!(report.points, 300);
    assert_eq!(report.attack, 1);
    assert_eq!(game.score(), 300);
    assert_eq!(game.lines(), 2);
    assert_eq!(game.board().filled_cells(), 4);
    assert_eq!(game.board().state()[21][3..7], [PieceKind::I.id(); 4]);
}

#[test]
fn test_apply_action_dispatch() {
    let (mut game, mut queue) = new_game(seed_starting_with(PieceKind::L));

    assert_eq!(game.apply_action(GameAction::MoveLeft, &mut queue), StepOutcome::Moved);
    assert_eq!(game.apply_action(GameAction::Rotate, &mut queue), StepOutcome::Moved);
    assert_eq!(game.apply_action(GameAction::SoftDrop, &mut queue), StepOutcome::Moved);
    assert!(matches!(
        game.apply_action(GameAction::HardDrop, &mut queue),
        StepOutcome::Locked(_)
    ));
}

#[test]
fn test_stacking_in_place_tops_out_once() {
    let recorder = Arc::new(Recorder::default());
    let mut queue = PieceQueue::new(2024);
    let mut game = Game::new(10, 22, recorder.hooks(), &mut queue, 1, 1);
    game.start_gravity(1000);

    let mut drops = 0;
    while !game.is_game_over() {
        game.hard_drop(&mut queue);
        drops += 1;
        assert!(drops < 100, "stack never reached the top");
    }

    assert_eq!(game.status(), GameStatus::GameOver);
    assert!(game.current_piece().is_none());
    assert!(!game.is_gravity_running());
    assert_eq!(recorder.game_over_count(), 1);
    let final_state = recorder.game_overs.lock().unwrap()[0].clone();
    assert!(final_state.game_over);
    assert_eq!(final_state.score, game.score());

    // Game over is terminal.
    let states = recorder.state_count();
    assert!(!game.move_left());
    assert!(!game.move_right());
    assert!(!game.rotate());
    assert_eq!(game.hard_drop(&mut queue), StepOutcome::Ignored);
    assert_eq!(game.gravity_tick(&mut queue), StepOutcome::Ignored);
    assert!(!game.receive_garbage(1));
    assert_eq!(recorder.state_count(), states);
    assert_eq!(recorder.game_over_count(), 1);
}

#[test]
fn test_gravity_tick_descends_like_soft_drop() {
    let (mut game, mut queue) = new_game(seed_starting_with(PieceKind::S));
    assert_eq!(game.gravity_tick(&mut queue), StepOutcome::Ignored);

    assert!(game.start_gravity(500));
    assert_eq!(game.gravity_tick(&mut queue), StepOutcome::Moved);
    assert_eq!(game.current_piece().unwrap().y, 1);

    game.stop();
    assert_eq!(game.gravity_tick(&mut queue), StepOutcome::Ignored);
    assert_eq!(game.current_piece().unwrap().y, 1);
}

#[test]
fn test_snapshot_reflects_game() {
    let (mut game, queue) = new_game(77);
    game.receive_garbage(1);

    let snapshot = game.snapshot();
    assert_eq!(snapshot.player_id, 1);
    assert_eq!(snapshot.board.len(), 22);
    assert_eq!(snapshot.board[21], vec![GARBAGE_CELL; 10]);
    assert_eq!(snapshot.next, queue.peek(1));
    assert_eq!(snapshot.garbage_received, 1);
    assert_eq!(
        snapshot.active.as_ref().map(|a| a.kind),
        game.current_piece().map(|p| p.kind())
    );
    assert!(snapshot.playable());
}

#[test]
fn test_restart_after_game_over() {
    let (mut game, mut queue) = new_game(5);
    let first = game.current_piece().unwrap().kind();
    while !game.is_game_over() {
        game.hard_drop(&mut queue);
    }

    game.restart(&mut queue);
    assert_eq!(game.status(), GameStatus::Active);
    assert_eq!(game.current_piece().unwrap().kind(), first);
    assert_eq!(game.score(), 0);
    assert_eq!(game.board().filled_cells(), 0);
}
