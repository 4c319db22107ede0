//! Configuration errors
//!
//! Gameplay never produces errors (rejected moves return `false`, blocked spawns
//! return `None`). These variants only surface while building a room, before any
//! tick runs.

use crate::types::{Cell, PieceKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("template {kind:?} has id {id}, expected a value in 1..=7")]
    TemplateIdOutOfRange { kind: PieceKind, id: Cell },
    #[error("template id {id} is used by both {first:?} and {second:?}")]
    DuplicateTemplateId {
        id: Cell,
        first: PieceKind,
        second: PieceKind,
    },
    #[error("template {kind:?} rotation {rotation} has {cells} filled cells, expected 4")]
    MalformedRotation {
        kind: PieceKind,
        rotation: usize,
        cells: usize,
    },
    #[error("board must be at least {min}x{min}, got {width}x{height}")]
    BoardTooSmall {
        width: usize,
        height: usize,
        min: usize,
    },
    #[error("piece queue low-water mark must be at least 1")]
    InvalidLowWater,
}
