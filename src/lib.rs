//! Room Tetris (workspace facade crate).
//!
//! Re-exports the workspace crates as `room_tetris::{types, core, session}` so
//! binaries and integration tests depend on one package.

pub use room_tetris_core as core;
pub use room_tetris_session as session;
pub use room_tetris_types as types;
