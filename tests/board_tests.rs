//! Board tests - grid storage, collision, line clears and garbage

use room_tetris::core::{template, Board, Piece};
use room_tetris::types::{
    PieceKind, Rotation, BOARD_HEIGHT, BOARD_WIDTH, EMPTY_CELL, GARBAGE_CELL,
};

fn assert_shape(board: &Board, width: usize, height: usize) {
    assert_eq!(board.state().len(), height);
    for row in board.state() {
        assert_eq!(row.len(), width);
    }
}

#[test]
fn test_board_new_empty() {
    let board = Board::default();
    assert_eq!(board.width(), BOARD_WIDTH);
    assert_eq!(board.height(), BOARD_HEIGHT);
    assert_shape(&board, BOARD_WIDTH, BOARD_HEIGHT);
    assert_eq!(board.filled_cells(), 0);
}

#[test]
fn test_board_get_out_of_bounds() {
    let board = Board::new(10, 22);

    assert_eq!(board.get(-1, 0), None);
    assert_eq!(board.get(0, -1), None);
    assert_eq!(board.get(10, 0), None);
    assert_eq!(board.get(0, 22), None);
    assert_eq!(board.get(9, 21), Some(EMPTY_CELL));
}

#[test]
fn test_board_set_and_get() {
    let mut board = Board::new(10, 22);

    assert!(board.set(5, 10, PieceKind::T.id()));
    assert_eq!(board.get(5, 10), Some(3));

    assert!(board.set(5, 10, EMPTY_CELL));
    assert_eq!(board.get(5, 10), Some(EMPTY_CELL));

    assert!(!board.set(-1, 0, 1));
    assert!(!board.set(0, 22, 1));
}

#[test]
fn test_valid_position_bounds() {
    let board = Board::new(10, 22);
    let piece = Piece::spawn(&board, template(PieceKind::I)).unwrap();

    // Horizontal I occupies columns x..x+4 of matrix row 1.
    assert!(board.is_valid_position(0, 0, &piece.shape));
    assert!(board.is_valid_position(6, 0, &piece.shape));
    assert!(!board.is_valid_position(-1, 0, &piece.shape));
    assert!(!board.is_valid_position(7, 0, &piece.shape));
    assert!(board.is_valid_position(3, 20, &piece.shape));
    assert!(!board.is_valid_position(3, 21, &piece.shape));
}

#[test]
fn test_valid_position_allows_rows_above_board() {
    let board = Board::new(10, 22);
    let piece = Piece::spawn(&board, template(PieceKind::T)).unwrap();
    assert!(board.is_valid_position(3, -1, &piece.shape));
    assert!(board.is_valid_position(3, -2, &piece.shape));
}

#[test]
fn test_valid_position_is_pure() {
    let mut board = Board::new(10, 22);
    board.set(4, 1, GARBAGE_CELL);
    let shape = Piece::shape_for(template(PieceKind::O), Rotation::North);

    let before = board.clone();
    let first = board.is_valid_position(3, 0, &shape);
    let second = board.is_valid_position(3, 0, &shape);
    assert!(!first);
    assert_eq!(first, second);
    assert!(board.is_valid_position(5, 0, &shape));
    assert_eq!(board, before);
}

#[test]
fn test_clear_lines_on_clear_board() {
    let mut board = Board::new(10, 22);
    assert_eq!(board.clear_lines(), 0);
    assert_eq!(board, Board::new(10, 22));
}

#[test]
fn test_clear_single_full_row() {
    let mut board = Board::new(10, 22);
    for x in 0..10 {
        board.set(x, 21, PieceKind::I.id());
    }
    board.set(2, 20, PieceKind::S.id());

    assert_eq!(board.clear_lines(), 1);
    assert_eq!(board.get(2, 21), Some(PieceKind::S.id()));
    assert_eq!(board.state()[0], vec![EMPTY_CELL; 10]);
    assert_eq!(board.filled_cells(), 1);
    assert_shape(&board, 10, 22);
}

#[test]
fn test_clear_non_adjacent_rows() {
    let mut board = Board::new(10, 22);
    for x in 0..10 {
        board.set(x, 21, 1);
        board.set(x, 19, 2);
    }
    board.set(0, 20, 5);
    board.set(0, 18, 6);

    assert_eq!(board.clear_lines(), 2);
    assert_eq!(board.get(0, 21), Some(5));
    assert_eq!(board.get(0, 20), Some(6));
    assert_eq!(board.filled_cells(), 2);
}

#[test]
fn test_lock_piece_writes_template_id() {
    let mut board = Board::new(10, 22);
    let piece = Piece::spawn(&board, template(PieceKind::L)).unwrap().shifted(0, 20);

    assert_eq!(board.lock_piece(&piece), 0);
    assert_eq!(board.filled_cells(), 4);
    for (x, y) in piece.cells() {
        assert_eq!(board.get(x, y), Some(PieceKind::L.id()));
    }
}

#[test]
fn test_lock_piece_drops_cells_above_board() {
    let mut board = Board::new(10, 22);
    // T north: one mino on matrix row 0, three on row 1.
    let piece = Piece::spawn(&board, template(PieceKind::T)).unwrap().shifted(0, -1);

    board.lock_piece(&piece);
    assert_eq!(board.filled_cells(), 3);
    assert_shape(&board, 10, 22);
}

#[test]
fn test_lock_piece_clears_completed_rows() {
    let mut board = Board::new(10, 22);
    for x in 0..10 {
        if !(3..7).contains(&x) {
            board.set(x, 21, GARBAGE_CELL);
        }
    }
    let piece = Piece::spawn(&board, template(PieceKind::I)).unwrap().shifted(0, 20);

    assert_eq!(board.lock_piece(&piece), 1);
    assert_eq!(board.filled_cells(), 0);
}

#[test]
fn test_add_garbage_on_empty_board() {
    let mut board = Board::new(10, 22);
    board.add_garbage_lines(3);

    for y in 0..19 {
        assert_eq!(board.state()[y], vec![EMPTY_CELL; 10]);
    }
    for y in 19..22 {
        assert_eq!(board.state()[y], vec![GARBAGE_CELL; 10]);
    }
}

#[test]
fn test_add_zero_garbage_changes_nothing() {
    let mut board = Board::new(10, 22);
    board.set(3, 15, 4);
    let before = board.clone();

    board.add_garbage_lines(0);
    assert_eq!(board, before);
}

#[test]
fn test_garbage_rows_count_as_full() {
    let mut board = Board::new(10, 22);
    board.add_garbage_lines(2);
    assert!(board.is_row_full(21));
    assert_eq!(board.clear_lines(), 2);
    assert_eq!(board.filled_cells(), 0);
}

#[test]
fn test_reset_empties_board() {
    let mut board = Board::new(6, 8);
    board.add_garbage_lines(4);
    board.reset();
    assert_eq!(board.filled_cells(), 0);
    assert_shape(&board, 6, 8);
}
