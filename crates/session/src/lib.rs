//! Session layer - rooms as tokio actors, plus the TCP front end
//!
//! - [`room_actor`]: one task per room owning the core `Room`, gravity timers
//! - [`protocol`]: line-delimited JSON messages
//! - [`server`]: listener, per-client tasks and event fan-out
//! - [`config`]: `ROOM_TETRIS_*` environment configuration

pub mod config;
pub mod error;
pub mod protocol;
pub mod room_actor;
pub mod server;

pub use config::{room_seed, ServerConfig};
pub use error::SessionError;
pub use protocol::{parse_message, ClientMessage, ErrorCode, ParsedMessage, ServerMessage};
pub use room_actor::{
    spawn_room, spawn_room_with_capacity, RoomEvent, RoomHandle, DEFAULT_ROOM_CAPACITY,
};
pub use server::run_server;
