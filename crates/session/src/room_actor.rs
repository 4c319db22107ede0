//! Room actor - one task per room
//!
//! The actor task is the only owner of a core [`Room`]. Player commands, gravity
//! ticks and the garbage they trigger are all processed one message at a time
//! inside it, so games never share mutable state across tasks.
//!
//! Game hooks push [`RoomEvent`]s onto an unbounded channel; the actor never
//! touches sockets.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use room_tetris_core::{GameHooks, GameSnapshot, Room, RoomConfig};
use room_tetris_types::{ConnectionId, GameAction, PlayerId};

use crate::error::SessionError;

/// Default command queue depth of a room
pub const DEFAULT_ROOM_CAPACITY: usize = 64;

/// Outbound notification from a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    State {
        room: Arc<str>,
        player_id: PlayerId,
        snapshot: GameSnapshot,
    },
    GameOver {
        room: Arc<str>,
        player_id: PlayerId,
        snapshot: GameSnapshot,
    },
    PlayerLeft {
        room: Arc<str>,
        player_id: PlayerId,
    },
}

impl RoomEvent {
    pub fn room(&self) -> &str {
        match self {
            RoomEvent::State { room, .. }
            | RoomEvent::GameOver { room, .. }
            | RoomEvent::PlayerLeft { room, .. } => room,
        }
    }

    pub fn player_id(&self) -> PlayerId {
        match self {
            RoomEvent::State { player_id, .. }
            | RoomEvent::GameOver { player_id, .. }
            | RoomEvent::PlayerLeft { player_id, .. } => *player_id,
        }
    }
}

#[derive(Debug)]
enum RoomCommand {
    Join {
        player_id: PlayerId,
        connection_id: ConnectionId,
        reply: oneshot::Sender<Result<GameSnapshot, SessionError>>,
    },
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<usize>,
    },
    Action {
        player_id: PlayerId,
        action: GameAction,
    },
    StartGravity {
        player_id: PlayerId,
        interval_ms: u64,
        reply: oneshot::Sender<Result<bool, SessionError>>,
    },
    Stop {
        player_id: PlayerId,
    },
    Restart {
        player_id: PlayerId,
    },
    Snapshot {
        player_id: PlayerId,
        reply: oneshot::Sender<Option<GameSnapshot>>,
    },
    Snapshots {
        reply: oneshot::Sender<Vec<GameSnapshot>>,
    },
    GravityTick {
        player_id: PlayerId,
        generation: u64,
    },
    Shutdown,
}

/// Cloneable handle to a running room
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: Arc<str>,
    tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn closed(&self) -> SessionError {
        SessionError::RoomClosed(self.room_id.to_string())
    }

    async fn send(&self, command: RoomCommand) -> Result<(), SessionError> {
        self.tx.send(command).await.map_err(|_| self.closed())
    }

    /// Queue a command without waiting for room capacity
    fn try_send(&self, command: RoomCommand) -> Result<(), SessionError> {
        self.tx.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SessionError::Backpressure(self.room_id.to_string()),
            mpsc::error::TrySendError::Closed(_) => self.closed(),
        })
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply)).await?;
        rx.await.map_err(|_| self.closed())
    }

    /// Add a player and return their first state
    pub async fn join(
        &self,
        player_id: PlayerId,
        connection_id: ConnectionId,
    ) -> Result<GameSnapshot, SessionError> {
        self.request(|reply| RoomCommand::Join {
            player_id,
            connection_id,
            reply,
        })
        .await?
    }

    /// Remove a player; returns how many players remain
    pub async fn leave(&self, player_id: PlayerId) -> Result<usize, SessionError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply })
            .await
    }

    /// Queue a player command
    ///
    /// Results arrive as [`RoomEvent`]s. Fails with `Backpressure` when the
    /// room queue is full.
    pub fn action(&self, player_id: PlayerId, action: GameAction) -> Result<(), SessionError> {
        self.try_send(RoomCommand::Action { player_id, action })
    }

    /// Start (or restart) a player's gravity timer
    ///
    /// Returns false if that player's game is already over.
    pub async fn start_gravity(
        &self,
        player_id: PlayerId,
        interval_ms: u64,
    ) -> Result<bool, SessionError> {
        self.request(|reply| RoomCommand::StartGravity {
            player_id,
            interval_ms,
            reply,
        })
        .await?
    }

    pub async fn stop(&self, player_id: PlayerId) -> Result<(), SessionError> {
        self.send(RoomCommand::Stop { player_id }).await
    }

    pub async fn restart(&self, player_id: PlayerId) -> Result<(), SessionError> {
        self.send(RoomCommand::Restart { player_id }).await
    }

    pub async fn snapshot(&self, player_id: PlayerId) -> Result<Option<GameSnapshot>, SessionError> {
        self.request(|reply| RoomCommand::Snapshot { player_id, reply })
            .await
    }

    /// States of every player in the room, by player id
    pub async fn snapshots(&self) -> Result<Vec<GameSnapshot>, SessionError> {
        self.request(|reply| RoomCommand::Snapshots { reply }).await
    }

    /// Stop the room; pending commands are dropped
    pub async fn shutdown(&self) {
        let _ = self.tx.send(RoomCommand::Shutdown).await;
    }
}

/// Spawn a room actor with the default queue depth
pub fn spawn_room(
    room_id: impl Into<Arc<str>>,
    config: RoomConfig,
    events: mpsc::UnboundedSender<RoomEvent>,
) -> Result<RoomHandle, SessionError> {
    spawn_room_with_capacity(room_id, config, events, DEFAULT_ROOM_CAPACITY)
}

/// Spawn a room actor
///
/// Must be called from inside a tokio runtime.
pub fn spawn_room_with_capacity(
    room_id: impl Into<Arc<str>>,
    config: RoomConfig,
    events: mpsc::UnboundedSender<RoomEvent>,
    capacity: usize,
) -> Result<RoomHandle, SessionError> {
    let room_id = room_id.into();
    let room = Room::new(config)?;
    let (tx, rx) = mpsc::channel(capacity.max(1));

    let actor = RoomActor {
        room_id: Arc::clone(&room_id),
        room,
        events,
        commands: tx.downgrade(),
        timers: HashMap::new(),
        next_generation: 0,
    };

    info!(room = %room_id, seed = config.seed, "room opened");
    tokio::spawn(actor.run(rx));

    Ok(RoomHandle { room_id, tx })
}

struct GravityTimer {
    generation: u64,
    task: JoinHandle<()>,
}

struct RoomActor {
    room_id: Arc<str>,
    room: Room,
    events: mpsc::UnboundedSender<RoomEvent>,
    /// Weak so that dropping every handle still closes the room
    commands: mpsc::WeakSender<RoomCommand>,
    timers: HashMap<PlayerId, GravityTimer>,
    next_generation: u64,
}

impl RoomActor {
    async fn run(mut self, mut rx: mpsc::Receiver<RoomCommand>) {
        while let Some(command) = rx.recv().await {
            if !self.handle(command) {
                break;
            }
        }

        for (_, timer) in self.timers.drain() {
            timer.task.abort();
        }
        info!(room = %self.room_id, "room closed");
    }

    /// Process one command; false ends the actor
    fn handle(&mut self, command: RoomCommand) -> bool {
        match command {
            RoomCommand::Join {
                player_id,
                connection_id,
                reply,
            } => {
                let _ = reply.send(self.join(player_id, connection_id));
            }
            RoomCommand::Leave { player_id, reply } => {
                self.leave(player_id);
                let _ = reply.send(self.room.len());
            }
            RoomCommand::Action { player_id, action } => {
                if self.room.apply(player_id, action).is_some() {
                    self.reap_finished(player_id);
                }
            }
            RoomCommand::StartGravity {
                player_id,
                interval_ms,
                reply,
            } => {
                let _ = reply.send(self.start_gravity(player_id, interval_ms));
            }
            RoomCommand::Stop { player_id } => {
                self.room.stop(player_id);
                self.cancel_timer(player_id);
            }
            RoomCommand::Restart { player_id } => {
                self.room.restart(player_id);
            }
            RoomCommand::Snapshot { player_id, reply } => {
                let _ = reply.send(self.room.game(player_id).map(|game| game.snapshot()));
            }
            RoomCommand::Snapshots { reply } => {
                let snapshots = self
                    .room
                    .players()
                    .filter_map(|id| self.room.game(id))
                    .map(|game| game.snapshot())
                    .collect();
                let _ = reply.send(snapshots);
            }
            RoomCommand::GravityTick {
                player_id,
                generation,
            } => self.gravity_tick(player_id, generation),
            RoomCommand::Shutdown => return false,
        }
        true
    }

    fn join(
        &mut self,
        player_id: PlayerId,
        connection_id: ConnectionId,
    ) -> Result<GameSnapshot, SessionError> {
        let hooks = self.hooks_for(player_id);
        let snapshot = self
            .room
            .add_player(player_id, connection_id, hooks)
            .map(|game| game.snapshot())
            .ok_or(SessionError::AlreadyJoined(player_id))?;

        info!(room = %self.room_id, player_id, connection_id, "player joined");
        self.emit(RoomEvent::State {
            room: Arc::clone(&self.room_id),
            player_id,
            snapshot: snapshot.clone(),
        });
        Ok(snapshot)
    }

    fn leave(&mut self, player_id: PlayerId) {
        self.cancel_timer(player_id);
        if self.room.remove_player(player_id).is_some() {
            info!(room = %self.room_id, player_id, remaining = self.room.len(), "player left");
            self.emit(RoomEvent::PlayerLeft {
                room: Arc::clone(&self.room_id),
                player_id,
            });
        }
    }

    fn hooks_for(&self, player_id: PlayerId) -> GameHooks {
        let state_tx = self.events.clone();
        let state_room = Arc::clone(&self.room_id);
        let over_tx = self.events.clone();
        let over_room = Arc::clone(&self.room_id);

        GameHooks::new(
            move |snapshot| {
                let _ = state_tx.send(RoomEvent::State {
                    room: Arc::clone(&state_room),
                    player_id,
                    snapshot: snapshot.clone(),
                });
            },
            move |snapshot| {
                let _ = over_tx.send(RoomEvent::GameOver {
                    room: Arc::clone(&over_room),
                    player_id,
                    snapshot: snapshot.clone(),
                });
            },
        )
    }

    fn emit(&self, event: RoomEvent) {
        let _ = self.events.send(event);
    }

    fn start_gravity(&mut self, player_id: PlayerId, interval_ms: u64) -> Result<bool, SessionError> {
        let started = self
            .room
            .start_gravity(player_id, interval_ms)
            .ok_or(SessionError::UnknownPlayer(player_id))?;
        if !started {
            return Ok(false);
        }

        let period = self
            .room
            .game(player_id)
            .and_then(|game| game.gravity_interval())
            .ok_or(SessionError::UnknownPlayer(player_id))?;

        self.cancel_timer(player_id);
        self.next_generation += 1;
        let generation = self.next_generation;
        let task = spawn_gravity(self.commands.clone(), player_id, generation, period);
        self.timers.insert(player_id, GravityTimer { generation, task });

        debug!(room = %self.room_id, player_id, ?period, generation, "gravity started");
        Ok(true)
    }

    fn gravity_tick(&mut self, player_id: PlayerId, generation: u64) {
        let current = self.timers.get(&player_id).map(|timer| timer.generation);
        if current != Some(generation) {
            debug!(room = %self.room_id, player_id, generation, "stale gravity tick dropped");
            return;
        }

        if self.room.gravity_tick(player_id).is_some() {
            self.reap_finished(player_id);
        }
    }

    /// Drop the timer of a game that just ended
    fn reap_finished(&mut self, player_id: PlayerId) {
        let finished = self
            .room
            .game(player_id)
            .is_some_and(|game| game.is_game_over());
        if finished && self.timers.contains_key(&player_id) {
            self.cancel_timer(player_id);
            info!(room = %self.room_id, player_id, "game over, gravity stopped");
        }
    }

    fn cancel_timer(&mut self, player_id: PlayerId) {
        if let Some(timer) = self.timers.remove(&player_id) {
            timer.task.abort();
        }
    }
}

/// Periodic gravity ticks for one player
fn spawn_gravity(
    commands: mpsc::WeakSender<RoomCommand>,
    player_id: PlayerId,
    generation: u64,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let Some(tx) = commands.upgrade() else {
                break;
            };
            let tick = RoomCommand::GravityTick {
                player_id,
                generation,
            };
            if tx.send(tick).await.is_err() {
                break;
            }
        }
    })
}
