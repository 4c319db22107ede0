use serde::{Deserialize, Serialize};

use crate::piece::Piece;
use crate::types::{Cell, PieceKind, PlayerId, Rotation};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActiveSnapshot {
    pub kind: PieceKind,
    pub rotation: Rotation,
    pub x: i32,
    pub y: i32,
    /// Board coordinates of the four minos, including any above row 0
    pub cells: Vec<(i32, i32)>,
}

impl From<&Piece> for ActiveSnapshot {
    fn from(value: &Piece) -> Self {
        Self {
            kind: value.kind(),
            rotation: value.rotation,
            x: value.x,
            y: value.y,
            cells: value.cells().to_vec(),
        }
    }
}

/// Everything a client needs to draw one player's field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub player_id: PlayerId,
    pub board: Vec<Vec<Cell>>,
    pub active: Option<ActiveSnapshot>,
    pub next: Option<PieceKind>,
    pub score: u32,
    pub lines: u32,
    pub garbage_received: u32,
    pub game_over: bool,
}

impl GameSnapshot {
    pub fn playable(&self) -> bool {
        !self.game_over
    }
}
