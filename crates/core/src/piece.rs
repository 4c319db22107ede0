//! Piece module - the falling tetromino
//!
//! A piece is a template, a rotation state, the tagged shape for that state and
//! the board position of the shape's top-left corner. Pieces never validate
//! themselves against a board on construction; callers ask the [`Board`].

use arrayvec::ArrayVec;

use crate::board::Board;
use crate::catalog::{TetrominoTemplate, MATRIX_SIZE};
use crate::types::{Cell, PieceKind, Rotation, EMPTY_CELL};

/// Rotation matrix with filled cells replaced by the template id
pub type Shape = [[Cell; MATRIX_SIZE]; MATRIX_SIZE];

/// Board coordinates of a piece's four minos
pub type PieceCells = ArrayVec<(i32, i32), 4>;

/// Active falling piece
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub template: &'static TetrominoTemplate,
    pub rotation: Rotation,
    pub shape: Shape,
    pub x: i32,
    pub y: i32,
}

impl Piece {
    pub fn new(
        template: &'static TetrominoTemplate,
        rotation: Rotation,
        shape: Shape,
        x: i32,
        y: i32,
    ) -> Self {
        Self {
            template,
            rotation,
            shape,
            x,
            y,
        }
    }

    /// Tagged shape of `template` in `rotation`
    pub fn shape_for(template: &TetrominoTemplate, rotation: Rotation) -> Shape {
        let mut shape = [[EMPTY_CELL; MATRIX_SIZE]; MATRIX_SIZE];
        for (dst, src) in shape.iter_mut().zip(template.matrix(rotation)) {
            for (d, &s) in dst.iter_mut().zip(src) {
                if s != 0 {
                    *d = template.id;
                }
            }
        }
        shape
    }

    /// Place a fresh piece horizontally centered on the top row
    ///
    /// Returns `None` when the spawn position is blocked (top-out).
    pub fn spawn(board: &Board, template: &'static TetrominoTemplate) -> Option<Self> {
        let rotation = Rotation::North;
        let shape = Self::shape_for(template, rotation);
        let x = (board.width() as i32 - MATRIX_SIZE as i32).div_euclid(2);
        let y = 0;

        if !board.is_valid_position(x, y, &shape) {
            return None;
        }

        Some(Self::new(template, rotation, shape, x, y))
    }

    pub fn kind(&self) -> PieceKind {
        self.template.kind
    }

    /// Same piece moved by (dx, dy)
    pub fn shifted(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Same piece in the next clockwise rotation state, at the same position
    pub fn rotated_cw(&self) -> Self {
        let rotation = self.rotation.rotate_cw();
        Self {
            rotation,
            shape: Self::shape_for(self.template, rotation),
            ..*self
        }
    }

    /// Check the piece against a board at its current position
    pub fn fits(&self, board: &Board) -> bool {
        board.is_valid_position(self.x, self.y, &self.shape)
    }

    /// Board coordinates of the filled cells
    pub fn cells(&self) -> PieceCells {
        let mut out = PieceCells::new();
        for (row, line) in self.shape.iter().enumerate() {
            for (col, &cell) in line.iter().enumerate() {
                if cell != EMPTY_CELL && !out.is_full() {
                    out.push((self.x + col as i32, self.y + row as i32));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::template;

    #[test]
    fn shape_is_tagged_with_template_id() {
        let t = template(PieceKind::L);
        let shape = Piece::shape_for(t, Rotation::North);
        let tagged: Vec<Cell> = shape.iter().flatten().copied().filter(|&c| c != 0).collect();
        assert_eq!(tagged, vec![7, 7, 7, 7]);
    }

    #[test]
    fn spawn_centers_on_narrow_board() {
        let board = Board::new(5, 6);
        let piece = Piece::spawn(&board, template(PieceKind::O)).unwrap();
        assert_eq!(piece.x, 0);
        assert_eq!(piece.y, 0);
    }

    #[test]
    fn cells_follow_position() {
        let board = Board::new(10, 22);
        let piece = Piece::spawn(&board, template(PieceKind::I)).unwrap();
        assert_eq!(
            piece.cells().as_slice(),
            &[(3, 1), (4, 1), (5, 1), (6, 1)]
        );
        let moved = piece.shifted(-1, 2);
        assert_eq!(moved.cells()[0], (2, 3));
    }

    #[test]
    fn rotation_keeps_position() {
        let board = Board::new(10, 22);
        let piece = Piece::spawn(&board, template(PieceKind::T)).unwrap();
        let rotated = piece.rotated_cw();
        assert_eq!(rotated.rotation, Rotation::East);
        assert_eq!((rotated.x, rotated.y), (piece.x, piece.y));
        assert_ne!(rotated.shape, piece.shape);
    }
}
