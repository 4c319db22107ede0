//! Catalog module - the seven tetromino templates
//!
//! Every template carries four 4x4 rotation matrices in clockwise order, with
//! state 0 being the spawn orientation. Matrices are indexed `[row][col]` and
//! hold `1` for a filled cell.

use crate::error::CoreError;
use crate::types::{Cell, PieceKind, Rotation, GARBAGE_CELL};

/// Side length of every rotation matrix
pub const MATRIX_SIZE: usize = 4;

/// One rotation state of a template
pub type Matrix = [[u8; MATRIX_SIZE]; MATRIX_SIZE];

/// Immutable definition of a piece kind
#[derive(Debug, PartialEq, Eq)]
pub struct TetrominoTemplate {
    pub id: Cell,
    pub kind: PieceKind,
    pub rotations: [Matrix; 4],
}

impl TetrominoTemplate {
    /// Single letter name
    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Matrix for a rotation state
    pub fn matrix(&self, rotation: Rotation) -> &Matrix {
        &self.rotations[rotation.index()]
    }
}

/// Build a matrix from `(col, row)` mino offsets
const fn matrix(cells: [(usize, usize); 4]) -> Matrix {
    let mut m = [[0u8; MATRIX_SIZE]; MATRIX_SIZE];
    let mut i = 0;
    while i < cells.len() {
        let (col, row) = cells[i];
        m[row][col] = 1;
        i += 1;
    }
    m
}

static TEMPLATES: [TetrominoTemplate; 7] = [
    TetrominoTemplate {
        id: 1,
        kind: PieceKind::I,
        rotations: [
            matrix([(0, 1), (1, 1), (2, 1), (3, 1)]),
            matrix([(2, 0), (2, 1), (2, 2), (2, 3)]),
            matrix([(0, 2), (1, 2), (2, 2), (3, 2)]),
            matrix([(1, 0), (1, 1), (1, 2), (1, 3)]),
        ],
    },
    TetrominoTemplate {
        id: 2,
        kind: PieceKind::O,
        rotations: [
            matrix([(1, 0), (2, 0), (1, 1), (2, 1)]),
            matrix([(1, 0), (2, 0), (1, 1), (2, 1)]),
            matrix([(1, 0), (2, 0), (1, 1), (2, 1)]),
            matrix([(1, 0), (2, 0), (1, 1), (2, 1)]),
        ],
    },
    TetrominoTemplate {
        id: 3,
        kind: PieceKind::T,
        rotations: [
            matrix([(1, 0), (0, 1), (1, 1), (2, 1)]),
            matrix([(1, 0), (1, 1), (2, 1), (1, 2)]),
            matrix([(0, 1), (1, 1), (2, 1), (1, 2)]),
            matrix([(1, 0), (0, 1), (1, 1), (1, 2)]),
        ],
    },
    TetrominoTemplate {
        id: 4,
        kind: PieceKind::S,
        rotations: [
            matrix([(1, 0), (2, 0), (0, 1), (1, 1)]),
            matrix([(1, 0), (1, 1), (2, 1), (2, 2)]),
            matrix([(1, 1), (2, 1), (0, 2), (1, 2)]),
            matrix([(0, 0), (0, 1), (1, 1), (1, 2)]),
        ],
    },
    TetrominoTemplate {
        id: 5,
        kind: PieceKind::Z,
        rotations: [
            matrix([(0, 0), (1, 0), (1, 1), (2, 1)]),
            matrix([(2, 0), (1, 1), (2, 1), (1, 2)]),
            matrix([(0, 1), (1, 1), (1, 2), (2, 2)]),
            matrix([(1, 0), (0, 1), (1, 1), (0, 2)]),
        ],
    },
    TetrominoTemplate {
        id: 6,
        kind: PieceKind::J,
        rotations: [
            matrix([(0, 0), (0, 1), (1, 1), (2, 1)]),
            matrix([(1, 0), (2, 0), (1, 1), (1, 2)]),
            matrix([(0, 1), (1, 1), (2, 1), (2, 2)]),
            matrix([(1, 0), (1, 1), (0, 2), (1, 2)]),
        ],
    },
    TetrominoTemplate {
        id: 7,
        kind: PieceKind::L,
        rotations: [
            matrix([(2, 0), (0, 1), (1, 1), (2, 1)]),
            matrix([(1, 0), (1, 1), (1, 2), (2, 2)]),
            matrix([(0, 1), (1, 1), (2, 1), (0, 2)]),
            matrix([(0, 0), (1, 0), (1, 1), (1, 2)]),
        ],
    },
];

/// All templates in id order
pub fn templates() -> &'static [TetrominoTemplate; 7] {
    &TEMPLATES
}

/// Template for a piece kind
pub fn template(kind: PieceKind) -> &'static TetrominoTemplate {
    match kind {
        PieceKind::I => &TEMPLATES[0],
        PieceKind::O => &TEMPLATES[1],
        PieceKind::T => &TEMPLATES[2],
        PieceKind::S => &TEMPLATES[3],
        PieceKind::Z => &TEMPLATES[4],
        PieceKind::J => &TEMPLATES[5],
        PieceKind::L => &TEMPLATES[6],
    }
}

/// Template lookup by name (case-insensitive)
pub fn template_by_name(name: &str) -> Option<&'static TetrominoTemplate> {
    PieceKind::from_str(name).map(template)
}

/// Check template integrity once at startup
pub fn validate_catalog() -> Result<(), CoreError> {
    let mut seen: [Option<PieceKind>; 8] = [None; 8];

    for t in templates() {
        if t.id == 0 || t.id >= GARBAGE_CELL {
            return Err(CoreError::TemplateIdOutOfRange {
                kind: t.kind,
                id: t.id,
            });
        }
        if let Some(first) = seen[t.id as usize] {
            return Err(CoreError::DuplicateTemplateId {
                id: t.id,
                first,
                second: t.kind,
            });
        }
        seen[t.id as usize] = Some(t.kind);

        for (rotation, m) in t.rotations.iter().enumerate() {
            let cells = m.iter().flatten().filter(|&&c| c != 0).count();
            if cells != 4 {
                return Err(CoreError::MalformedRotation {
                    kind: t.kind,
                    rotation,
                    cells,
                });
            }
        }
    }

    Ok(())
}
