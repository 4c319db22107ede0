//! Game module - one player's match
//!
//! A [`Game`] owns its board and falling piece and applies player commands and
//! gravity ticks to them. It never owns the room: the shared [`PieceQueue`] is
//! passed into every operation that may spawn a piece, and attacks are returned
//! to the caller (the room) instead of being pushed into other games directly.
//!
//! Every committed mutation invokes the state-change hook with a fresh snapshot;
//! topping out invokes the game-over hook once.

use std::fmt;
use std::time::Duration;

use crate::board::Board;
use crate::catalog::template;
use crate::piece::Piece;
use crate::rng::PieceQueue;
use crate::scoring::{garbage_for_lines, get_points};
use crate::snapshot::{ActiveSnapshot, GameSnapshot};
use crate::types::{ConnectionId, GameAction, PieceKind, PlayerId, MIN_GRAVITY_MS};

/// Callback receiving a snapshot of the game
pub type SnapshotHook = Box<dyn FnMut(&GameSnapshot) + Send>;

/// Upward channel from a game to whoever broadcasts its state
pub struct GameHooks {
    pub on_state_change: SnapshotHook,
    pub on_game_over: SnapshotHook,
}

impl GameHooks {
    pub fn new(
        on_state_change: impl FnMut(&GameSnapshot) + Send + 'static,
        on_game_over: impl FnMut(&GameSnapshot) + Send + 'static,
    ) -> Self {
        Self {
            on_state_change: Box::new(on_state_change),
            on_game_over: Box::new(on_game_over),
        }
    }

    /// Hooks that drop every notification
    pub fn silent() -> Self {
        Self::new(|_| {}, |_| {})
    }
}

impl Default for GameHooks {
    fn default() -> Self {
        Self::silent()
    }
}

impl fmt::Debug for GameHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameHooks").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameStatus {
    Active,
    GameOver,
}

/// What a single lock did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockReport {
    pub lines_cleared: usize,
    pub points: u32,
    /// Garbage rows owed to every opponent
    pub attack: usize,
    /// The next piece could not spawn
    pub topped_out: bool,
}

/// Result of a command or gravity tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Rejected, or the game is over; nothing changed
    Ignored,
    /// The piece moved or rotated
    Moved,
    /// The piece locked
    Locked(LockReport),
}

impl StepOutcome {
    pub fn is_committed(&self) -> bool {
        !matches!(self, StepOutcome::Ignored)
    }

    pub fn lock(&self) -> Option<LockReport> {
        match self {
            StepOutcome::Locked(report) => Some(*report),
            _ => None,
        }
    }

    pub fn lines_cleared(&self) -> usize {
        self.lock().map_or(0, |r| r.lines_cleared)
    }

    pub fn attack(&self) -> usize {
        self.lock().map_or(0, |r| r.attack)
    }
}

/// Per-player game state
#[derive(Debug)]
pub struct Game {
    board: Board,
    current: Option<Piece>,
    /// Preview of the piece after `current`
    next: Option<PieceKind>,
    /// Position of this game in the room's shared piece sequence
    cursor: usize,
    score: u32,
    lines: u32,
    garbage_received: u32,
    status: GameStatus,
    /// Gravity interval while the timer is running
    gravity: Option<Duration>,
    player_id: PlayerId,
    connection_id: ConnectionId,
    hooks: GameHooks,
}

impl Game {
    /// Create a game and spawn its first piece from the shared queue
    pub fn new(
        width: usize,
        height: usize,
        hooks: GameHooks,
        queue: &mut PieceQueue,
        player_id: PlayerId,
        connection_id: ConnectionId,
    ) -> Self {
        let mut game = Self {
            board: Board::new(width, height),
            current: None,
            next: None,
            cursor: 0,
            score: 0,
            lines: 0,
            garbage_received: 0,
            status: GameStatus::Active,
            gravity: None,
            player_id,
            connection_id,
            hooks,
        };

        if !game.spawn_next_piece(queue) {
            game.emit_game_over();
        }

        game
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_piece(&self) -> Option<&Piece> {
        self.current.as_ref()
    }

    pub fn next_piece(&self) -> Option<PieceKind> {
        self.next
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn garbage_received(&self) -> u32 {
        self.garbage_received
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_game_over(&self) -> bool {
        self.status == GameStatus::GameOver
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn gravity_interval(&self) -> Option<Duration> {
        self.gravity
    }

    pub fn is_gravity_running(&self) -> bool {
        self.gravity.is_some()
    }

    #[cfg(test)]
    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            player_id: self.player_id,
            board: self.board.state().to_vec(),
            active: self.current.as_ref().map(ActiveSnapshot::from),
            next: self.next,
            score: self.score,
            lines: self.lines,
            garbage_received: self.garbage_received,
            game_over: self.is_game_over(),
        }
    }

    fn emit_state(&mut self) {
        let snapshot = self.snapshot();
        (self.hooks.on_state_change)(&snapshot);
    }

    fn emit_game_over(&mut self) {
        let snapshot = self.snapshot();
        (self.hooks.on_game_over)(&snapshot);
    }

    /// Apply a player command
    pub fn apply_action(&mut self, action: GameAction, queue: &mut PieceQueue) -> StepOutcome {
        let moved = match action {
            GameAction::MoveLeft => self.move_left(),
            GameAction::MoveRight => self.move_right(),
            GameAction::Rotate => self.rotate(),
            GameAction::SoftDrop => return self.soft_drop(queue),
            GameAction::HardDrop => return self.hard_drop(queue),
        };

        if moved {
            StepOutcome::Moved
        } else {
            StepOutcome::Ignored
        }
    }

    pub fn move_left(&mut self) -> bool {
        self.try_shift(-1)
    }

    pub fn move_right(&mut self) -> bool {
        self.try_shift(1)
    }

    fn try_shift(&mut self, dx: i32) -> bool {
        if self.is_game_over() {
            return false;
        }
        let Some(piece) = self.current else {
            return false;
        };

        let candidate = piece.shifted(dx, 0);
        if !candidate.fits(&self.board) {
            return false;
        }

        self.current = Some(candidate);
        self.emit_state();
        true
    }

    /// Rotate clockwise in place, with no kicks
    pub fn rotate(&mut self) -> bool {
        if self.is_game_over() {
            return false;
        }
        let Some(piece) = self.current else {
            return false;
        };

        let candidate = piece.rotated_cw();
        if !candidate.fits(&self.board) {
            return false;
        }

        self.current = Some(candidate);
        self.emit_state();
        true
    }

    /// Move down one row, or lock if the piece has landed
    ///
    /// Gravity ticks run through here as well.
    pub fn soft_drop(&mut self, queue: &mut PieceQueue) -> StepOutcome {
        if self.is_game_over() {
            return StepOutcome::Ignored;
        }
        let Some(piece) = self.current else {
            return StepOutcome::Ignored;
        };

        let candidate = piece.shifted(0, 1);
        if candidate.fits(&self.board) {
            self.current = Some(candidate);
            self.emit_state();
            return StepOutcome::Moved;
        }

        StepOutcome::Locked(self.lock_current(queue))
    }

    /// Drop straight to the landing row and lock
    ///
    /// Ends in the same state as repeated soft drops; only the final state is
    /// reported.
    pub fn hard_drop(&mut self, queue: &mut PieceQueue) -> StepOutcome {
        if self.is_game_over() {
            return StepOutcome::Ignored;
        }
        let Some(mut piece) = self.current else {
            return StepOutcome::Ignored;
        };

        while piece.shifted(0, 1).fits(&self.board) {
            piece = piece.shifted(0, 1);
        }
        self.current = Some(piece);

        StepOutcome::Locked(self.lock_current(queue))
    }

    fn lock_current(&mut self, queue: &mut PieceQueue) -> LockReport {
        let lines_cleared = match self.current.take() {
            Some(piece) => self.board.lock_piece(&piece),
            None => 0,
        };
        let points = get_points(lines_cleared);
        self.score = self.score.saturating_add(points);
        self.lines = self.lines.saturating_add(lines_cleared as u32);

        let attack = if lines_cleared > 1 {
            garbage_for_lines(lines_cleared)
        } else {
            0
        };

        tracing::debug!(
            player_id = self.player_id,
            lines_cleared,
            points,
            attack,
            score = self.score,
            "piece locked"
        );

        let topped_out = !self.spawn_next_piece(queue);
        self.emit_state();
        if topped_out {
            tracing::debug!(player_id = self.player_id, score = self.score, "topped out");
            self.emit_game_over();
        }

        LockReport {
            lines_cleared,
            points,
            attack,
            topped_out,
        }
    }

    /// Take the next kind from the shared sequence and spawn it
    ///
    /// A blocked spawn ends the game and stops gravity. Hooks are left to the
    /// caller so the final state is reported once.
    pub fn spawn_next_piece(&mut self, queue: &mut PieceQueue) -> bool {
        let kind = queue.draw(&mut self.cursor);
        self.next = queue.peek(self.cursor);

        match Piece::spawn(&self.board, template(kind)) {
            Some(piece) => {
                self.current = Some(piece);
                true
            }
            None => {
                self.current = None;
                self.status = GameStatus::GameOver;
                self.gravity = None;
                false
            }
        }
    }

    /// Push `lines` garbage rows into this board
    ///
    /// Returns false (and changes nothing) when the game is over or `lines` is 0.
    pub fn receive_garbage(&mut self, lines: usize) -> bool {
        if self.is_game_over() || lines == 0 {
            return false;
        }

        let lines = lines.min(self.board.height());
        self.board.add_garbage_lines(lines);
        self.garbage_received = self.garbage_received.saturating_add(lines as u32);
        self.emit_state();
        true
    }

    /// Arm gravity at `interval_ms` per row
    ///
    /// Intervals below the minimum are raised to it. Returns false once the game
    /// is over.
    pub fn start_gravity(&mut self, interval_ms: u64) -> bool {
        if self.is_game_over() {
            return false;
        }
        self.gravity = Some(Duration::from_millis(interval_ms.max(MIN_GRAVITY_MS)));
        true
    }

    /// Disarm gravity
    pub fn stop(&mut self) {
        self.gravity = None;
    }

    /// One gravity step; ignored unless gravity is running and the game is active
    pub fn gravity_tick(&mut self, queue: &mut PieceQueue) -> StepOutcome {
        if self.gravity.is_none() {
            return StepOutcome::Ignored;
        }
        self.soft_drop(queue)
    }

    /// Start over on an empty board from the beginning of the room sequence
    pub fn restart(&mut self, queue: &mut PieceQueue) {
        self.board.reset();
        self.current = None;
        self.next = None;
        self.cursor = 0;
        self.score = 0;
        self.lines = 0;
        self.garbage_received = 0;
        self.status = GameStatus::Active;

        let spawned = self.spawn_next_piece(queue);
        self.emit_state();
        if !spawned {
            self.emit_game_over();
        }
    }
}
