//! TCP server for room clients
//!
//! Accepts connections, maps each client line to a room command and fans room
//! events out to every member of the room. Rooms are created on first join and
//! shut down when their last player leaves.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use room_tetris_types::{ConnectionId, GameAction, PlayerId};

use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::protocol::{parse_message, ClientMessage, ErrorCode, ParsedMessage, ServerMessage};
use crate::room_actor::{spawn_room_with_capacity, RoomEvent, RoomHandle};

/// Outbound queues of a room's members
#[derive(Default)]
struct Members {
    senders: BTreeMap<PlayerId, mpsc::UnboundedSender<String>>,
    /// Set once the room has been shut down and dropped from the registry
    retired: bool,
}

/// A live room and its members
///
/// Membership changes and broadcasts for one room serialize on `members`; the
/// registry lock is only held for lookups so a slow room never stalls others.
struct RoomEntry {
    handle: RoomHandle,
    members: Mutex<Members>,
}

/// Shared server state
struct ServerState {
    config: ServerConfig,
    rooms: Mutex<HashMap<String, Arc<RoomEntry>>>,
    events_tx: mpsc::UnboundedSender<RoomEvent>,
}

impl ServerState {
    fn new(config: ServerConfig, events_tx: mpsc::UnboundedSender<RoomEvent>) -> Self {
        Self {
            config,
            rooms: Mutex::new(HashMap::new()),
            events_tx,
        }
    }

    async fn entry(&self, room: &str) -> Option<Arc<RoomEntry>> {
        self.rooms.lock().await.get(room).cloned()
    }

    /// Look up a room, opening it if absent or closed
    async fn open(&self, room: &str) -> Result<Arc<RoomEntry>, SessionError> {
        let mut rooms = self.rooms.lock().await;
        if let Some(entry) = rooms.get(room) {
            if !entry.handle.is_closed() {
                return Ok(Arc::clone(entry));
            }
        }

        let handle = spawn_room_with_capacity(
            room,
            self.config.room_config(room),
            self.events_tx.clone(),
            self.config.max_pending_commands,
        )?;
        let entry = Arc::new(RoomEntry {
            handle,
            members: Mutex::new(Members::default()),
        });
        rooms.insert(room.to_string(), Arc::clone(&entry));
        Ok(entry)
    }

    /// Shut a room down and drop it from the registry
    ///
    /// Called with the room's member lock held.
    async fn retire(&self, room: &str, entry: &Arc<RoomEntry>, members: &mut Members) {
        members.retired = true;
        entry.handle.shutdown().await;

        let mut rooms = self.rooms.lock().await;
        if rooms.get(room).is_some_and(|current| Arc::ptr_eq(current, entry)) {
            rooms.remove(room);
        }
    }

    /// Join `player_id` to `room`, creating the room if needed
    ///
    /// The greeting (`joined`, then the state of every other player) is queued
    /// before the member lock is released so it precedes any broadcast.
    async fn join(
        &self,
        room: &str,
        player_id: PlayerId,
        connection_id: ConnectionId,
        tx: &mpsc::UnboundedSender<String>,
    ) -> Result<RoomHandle, SessionError> {
        loop {
            let entry = self.open(room).await?;
            let mut members = entry.members.lock().await;
            if members.retired {
                // Emptied while we waited; the registry already forgot it.
                continue;
            }
            let handle = entry.handle.clone();

            let state = match handle.join(player_id, connection_id).await {
                Ok(state) => state,
                Err(e) => {
                    if members.senders.is_empty() {
                        self.retire(room, &entry, &mut members).await;
                    }
                    return Err(e);
                }
            };
            members.senders.insert(player_id, tx.clone());

            send(
                tx,
                &ServerMessage::Joined {
                    room: room.to_string(),
                    player_id,
                    state,
                },
            );
            for snapshot in handle.snapshots().await? {
                if snapshot.player_id != player_id {
                    send(
                        tx,
                        &ServerMessage::State {
                            room: room.to_string(),
                            player_id: snapshot.player_id,
                            state: snapshot,
                        },
                    );
                }
            }

            return Ok(handle);
        }
    }

    /// Remove a player; the room is shut down once empty
    async fn leave(&self, room: &str, player_id: PlayerId) {
        let Some(entry) = self.entry(room).await else {
            return;
        };
        let mut members = entry.members.lock().await;

        members.senders.remove(&player_id);
        let remaining = match entry.handle.leave(player_id).await {
            Ok(remaining) => remaining,
            Err(e) => {
                warn!(room, player_id, error = %e, "leave failed");
                0
            }
        };

        if remaining == 0 && members.senders.is_empty() && !members.retired {
            self.retire(room, &entry, &mut members).await;
            info!(room, "room emptied and removed");
        }
    }

    /// Deliver one room event to every member of its room
    async fn dispatch(&self, event: &RoomEvent) {
        let line = match ServerMessage::from(event).to_line() {
            Ok(line) => line,
            Err(e) => {
                warn!(room = event.room(), error = %e, "failed to encode event");
                return;
            }
        };

        let Some(entry) = self.entry(event.room()).await else {
            return;
        };
        let members = entry.members.lock().await;
        for tx in members.senders.values() {
            let _ = tx.send(line.clone());
        }
    }
}

/// The room a connection has joined
struct Membership {
    room: String,
    player_id: PlayerId,
    handle: RoomHandle,
}

/// Start the TCP server
///
/// `ready_tx` receives the bound address once the listener is up.
pub async fn run_server(
    config: ServerConfig,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    let bound = listener.local_addr()?;
    info!(addr = %bound, "TCP server listening");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<RoomEvent>();
    let state = Arc::new(ServerState::new(config, events_tx));

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                state.dispatch(&event).await;
            }
        });
    }

    // Accept incoming connections
    let mut client_id_counter: ConnectionId = 0;
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;

        info!(client_id, %addr, "client connected");

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, client_id, state).await {
                warn!(client_id, error = %e, "client error");
            }
            info!(client_id, "client disconnected");
        });
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    client_id: ConnectionId,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = tokio::io::split(socket);
    let mut reader = BufReader::new(reader);

    // Channel to send lines to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let write_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if writer.write_all(b"\n").await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    let mut membership: Option<Membership> = None;
    let mut line = String::new();

    let result: anyhow::Result<()> = loop {
        line.clear();
        let bytes_read = match reader.read_line(&mut line).await {
            Ok(n) => n,
            Err(e) => break Err(e.into()),
        };

        if bytes_read == 0 {
            break Ok(());
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        debug!(client_id, line = trimmed, "received");

        let reply = match parse_message(trimmed) {
            Ok(ParsedMessage::Client(message)) => {
                handle_message(&state, client_id, &tx, &mut membership, message).await
            }
            Ok(ParsedMessage::Unknown { msg_type }) => Some(ServerMessage::error(
                ErrorCode::InvalidMessage,
                format!("Unknown message type: {}", msg_type),
            )),
            Err(e) => Some(ServerMessage::error(
                ErrorCode::InvalidMessage,
                format!("JSON parse error: {}", e),
            )),
        };

        if let Some(reply) = reply {
            send(&tx, &reply);
        }
    };

    if let Some(m) = membership.take() {
        state.leave(&m.room, m.player_id).await;
    }

    drop(tx);
    let _ = write_task.await;

    result
}

fn send(tx: &mpsc::UnboundedSender<String>, message: &ServerMessage) {
    match message.to_line() {
        Ok(line) => {
            let _ = tx.send(line);
        }
        Err(e) => warn!(error = %e, "failed to encode reply"),
    }
}

fn session_error_reply(error: &SessionError) -> ServerMessage {
    let code = match error {
        SessionError::AlreadyJoined(_) => ErrorCode::AlreadyJoined,
        SessionError::UnknownPlayer(_) => ErrorCode::NotJoined,
        SessionError::Backpressure(_) => ErrorCode::Backpressure,
        SessionError::RoomClosed(_) | SessionError::Core(_) => ErrorCode::RoomUnavailable,
    };
    ServerMessage::error(code, error.to_string())
}

fn not_joined() -> ServerMessage {
    ServerMessage::error(ErrorCode::NotJoined, "Join a room first")
}

/// Apply one client message; returns the direct reply, if any
async fn handle_message(
    state: &ServerState,
    client_id: ConnectionId,
    tx: &mpsc::UnboundedSender<String>,
    membership: &mut Option<Membership>,
    message: ClientMessage,
) -> Option<ServerMessage> {
    match message {
        ClientMessage::Join { room, player_id } => {
            if let Some(m) = membership.as_ref() {
                return Some(ServerMessage::error(
                    ErrorCode::AlreadyJoined,
                    format!("Already playing in room {}", m.room),
                ));
            }

            match state.join(&room, player_id, client_id, tx).await {
                Ok(handle) => {
                    *membership = Some(Membership {
                        room,
                        player_id,
                        handle,
                    });
                    None
                }
                Err(e) => {
                    warn!(client_id, room = %room, player_id, error = %e, "join failed");
                    Some(session_error_reply(&e))
                }
            }
        }

        ClientMessage::Leave => match membership.take() {
            Some(m) => {
                state.leave(&m.room, m.player_id).await;
                None
            }
            None => Some(not_joined()),
        },

        ClientMessage::Start { gravity_ms } => {
            let Some(m) = membership.as_ref() else {
                return Some(not_joined());
            };
            let interval_ms = gravity_ms.unwrap_or(state.config.gravity_ms);
            match m.handle.start_gravity(m.player_id, interval_ms).await {
                Ok(_) => None,
                Err(e) => Some(session_error_reply(&e)),
            }
        }

        ClientMessage::Action { action } => {
            let Some(m) = membership.as_ref() else {
                return Some(not_joined());
            };
            let Some(action) = GameAction::from_str(&action) else {
                return Some(ServerMessage::error(
                    ErrorCode::UnknownAction,
                    format!("Unknown action: {}", action),
                ));
            };
            m.handle
                .action(m.player_id, action)
                .err()
                .map(|e| session_error_reply(&e))
        }

        ClientMessage::Stop => {
            let Some(m) = membership.as_ref() else {
                return Some(not_joined());
            };
            m.handle
                .stop(m.player_id)
                .await
                .err()
                .map(|e| session_error_reply(&e))
        }

        ClientMessage::Restart => {
            let Some(m) = membership.as_ref() else {
                return Some(not_joined());
            };
            m.handle
                .restart(m.player_id)
                .await
                .err()
                .map(|e| session_error_reply(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use room_tetris_core::CoreError;

    #[test]
    fn test_session_errors_map_to_wire_codes() {
        let code = |e: SessionError| match session_error_reply(&e) {
            ServerMessage::Error { code, .. } => code,
            other => panic!("unexpected reply {:?}", other),
        };

        assert_eq!(code(SessionError::AlreadyJoined(1)), ErrorCode::AlreadyJoined);
        assert_eq!(code(SessionError::UnknownPlayer(1)), ErrorCode::NotJoined);
        assert_eq!(code(SessionError::Backpressure("r".into())), ErrorCode::Backpressure);
        assert_eq!(code(SessionError::RoomClosed("r".into())), ErrorCode::RoomUnavailable);
        assert_eq!(
            code(SessionError::Core(CoreError::InvalidLowWater)),
            ErrorCode::RoomUnavailable
        );
    }

    fn test_state() -> (ServerState, mpsc::UnboundedReceiver<RoomEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (ServerState::new(ServerConfig::default(), events_tx), events_rx)
    }

    #[tokio::test]
    async fn test_busy_room_does_not_stall_other_rooms() {
        let (state, _events) = test_state();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        state.join("a", 1, 1, &tx_a).await.unwrap();
        state.join("b", 2, 2, &tx_b).await.unwrap();
        while rx_b.try_recv().is_ok() {}

        // Room "a" is mid-update and holds its member lock.
        let entry_a = state.entry("a").await.unwrap();
        let _busy = entry_a.members.lock().await;

        let event = RoomEvent::PlayerLeft {
            room: Arc::from("b"),
            player_id: 9,
        };
        tokio::time::timeout(std::time::Duration::from_secs(1), state.dispatch(&event))
            .await
            .expect("broadcast to room b waited on room a");
        assert!(rx_b.try_recv().unwrap().contains("player_left"));

        // Joining another room is not held up either.
        let (tx_c, _rx_c) = mpsc::unbounded_channel();
        tokio::time::timeout(std::time::Duration::from_secs(1), state.join("c", 3, 3, &tx_c))
            .await
            .expect("join of room c waited on room a")
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_room_is_retired_and_reopened() {
        let (state, _events) = test_state();
        let (tx, _rx) = mpsc::unbounded_channel();

        let first = state.join("solo", 1, 1, &tx).await.unwrap();
        state.leave("solo", 1).await;
        assert!(state.entry("solo").await.is_none());

        let second = state.join("solo", 1, 2, &tx).await.unwrap();
        assert!(!second.is_closed());
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while !first.is_closed() {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("old room never closed");
    }
}
