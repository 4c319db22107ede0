//! Protocol module - line-delimited JSON messages
//!
//! Every message is one JSON object on its own line, tagged by `type`.

use serde::{Deserialize, Serialize};

use room_tetris_core::GameSnapshot;
use room_tetris_types::PlayerId;

use crate::room_actor::RoomEvent;

// ============== Client -> Server Messages ==============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        room: String,
        player_id: PlayerId,
    },
    Start {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gravity_ms: Option<u64>,
    },
    /// Action names are validated by the server so unknown ones get their own
    /// error code
    Action {
        action: String,
    },
    Stop,
    Restart,
    Leave,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedMessage {
    Client(ClientMessage),
    Unknown { msg_type: String },
}

/// Parse one line from a client
///
/// A well-formed object with an unrecognized `type` is not a parse error.
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    match serde_json::from_str::<ClientMessage>(json) {
        Ok(message) => Ok(ParsedMessage::Client(message)),
        Err(e) => {
            #[derive(Debug, Deserialize)]
            struct TypeOnly {
                #[serde(rename = "type")]
                msg_type: Option<String>,
            }

            let msg_type = serde_json::from_str::<TypeOnly>(json)?
                .msg_type
                .unwrap_or_else(|| "unknown".to_string());

            const KNOWN: [&str; 6] = ["join", "start", "action", "stop", "restart", "leave"];
            if KNOWN.contains(&msg_type.as_str()) {
                return Err(e);
            }

            Ok(ParsedMessage::Unknown { msg_type })
        }
    }
}

// ============== Server -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidMessage,
    NotJoined,
    AlreadyJoined,
    UnknownAction,
    RoomUnavailable,
    Backpressure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Joined {
        room: String,
        player_id: PlayerId,
        state: GameSnapshot,
    },
    State {
        room: String,
        player_id: PlayerId,
        state: GameSnapshot,
    },
    GameOver {
        room: String,
        player_id: PlayerId,
        state: GameSnapshot,
    },
    PlayerLeft {
        room: String,
        player_id: PlayerId,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl ServerMessage {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code,
            message: message.into(),
        }
    }

    /// Serialize to a single line without the trailing newline
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<&RoomEvent> for ServerMessage {
    fn from(event: &RoomEvent) -> Self {
        match event {
            RoomEvent::State {
                room,
                player_id,
                snapshot,
            } => ServerMessage::State {
                room: room.to_string(),
                player_id: *player_id,
                state: snapshot.clone(),
            },
            RoomEvent::GameOver {
                room,
                player_id,
                snapshot,
            } => ServerMessage::GameOver {
                room: room.to_string(),
                player_id: *player_id,
                state: snapshot.clone(),
            },
            RoomEvent::PlayerLeft { room, player_id } => ServerMessage::PlayerLeft {
                room: room.to_string(),
                player_id: *player_id,
            },
        }
    }
}
