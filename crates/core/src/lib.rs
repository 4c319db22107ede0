//! Core game logic - synchronous, deterministic and testable
//!
//! This crate holds every gameplay rule of a multiplayer room. Nothing in it
//! blocks, sleeps or touches the network: timers and transport live in the
//! session crate, which drives a [`Room`] from a single task.
//!
//! # Module Structure
//!
//! - [`catalog`]: the seven tetromino templates and their rotation matrices
//! - [`board`]: grid storage, collision checks, line clearing, garbage rows
//! - [`piece`]: the falling piece and its spawn/move/rotate candidates
//! - [`scoring`]: points per lock and attack size
//! - [`rng`]: seeded LCG and the room-wide 7-bag piece sequence
//! - [`game`]: one player's state machine and command handlers
//! - [`room`]: the games sharing a sequence, and garbage between them
//! - [`snapshot`]: serializable state handed to observers
//!
//! # Game Rules
//!
//! - **Shared sequence**: every player in a room gets the same pieces in the
//!   same order, each at their own pace
//! - **Rotation**: clockwise only, in place, no wall kicks
//! - **Scoring**: 100 / 300 / 500 / 800 for 1 to 4 rows cleared by one lock
//! - **Attacks**: clearing `n > 1` rows pushes `n - 1` garbage rows into every
//!   other live board
//! - **Top-out**: a blocked spawn ends the game
//!
//! # Example
//!
//! ```
//! use room_tetris_core::{GameHooks, Room, RoomConfig};
//! use room_tetris_types::GameAction;
//!
//! let mut room = Room::new(RoomConfig::with_seed(12345)).unwrap();
//! room.add_player(1, 1, GameHooks::silent());
//! room.add_player(2, 2, GameHooks::silent());
//!
//! room.apply(1, GameAction::MoveRight);
//! room.apply(1, GameAction::HardDrop);
//!
//! assert_eq!(room.game(1).unwrap().board().filled_cells(), 4);
//! assert_eq!(room.game(2).unwrap().board().filled_cells(), 0);
//! ```

pub mod board;
pub mod catalog;
pub mod error;
pub mod game;
pub mod piece;
pub mod rng;
pub mod room;
pub mod scoring;
pub mod snapshot;

pub use room_tetris_types as types;

pub use board::Board;
pub use catalog::{template, templates, validate_catalog, TetrominoTemplate};
pub use error::CoreError;
pub use game::{Game, GameHooks, GameStatus, LockReport, StepOutcome};
pub use piece::Piece;
pub use rng::{PieceQueue, SimpleRng};
pub use room::{Room, RoomConfig};
pub use scoring::{garbage_for_lines, get_points};
pub use snapshot::{ActiveSnapshot, GameSnapshot};
