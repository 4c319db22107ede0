use room_tetris_core::CoreError;
use room_tetris_types::PlayerId;

/// Failures surfaced by a room handle
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("room {0} is closed")]
    RoomClosed(String),
    #[error("room {0} command queue is full")]
    Backpressure(String),
    #[error("player {0} already joined this room")]
    AlreadyJoined(PlayerId),
    #[error("player {0} is not in this room")]
    UnknownPlayer(PlayerId),
    #[error(transparent)]
    Core(#[from] CoreError),
}
