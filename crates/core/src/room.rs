//! Room module - the games that share one piece sequence
//!
//! A [`Room`] owns the shared [`PieceQueue`] and every player's [`Game`]. It is
//! the only place where one game can reach another: attacks reported by a lock
//! are turned into garbage on every other live board before the call returns.

use std::collections::BTreeMap;

use crate::catalog::validate_catalog;
use crate::error::CoreError;
use crate::game::{Game, GameHooks, StepOutcome};
use crate::rng::PieceQueue;
use crate::scoring::garbage_for_lines;
use crate::types::{
    ConnectionId, GameAction, PlayerId, BOARD_HEIGHT, BOARD_WIDTH, QUEUE_LOW_WATER,
};

/// Smallest board side that still fits every spawn matrix
pub const MIN_BOARD_SIDE: usize = 4;

/// Room construction parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomConfig {
    pub width: usize,
    pub height: usize,
    pub seed: u32,
    pub low_water: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            width: BOARD_WIDTH,
            height: BOARD_HEIGHT,
            seed: 1,
            low_water: QUEUE_LOW_WATER,
        }
    }
}

impl RoomConfig {
    pub fn with_seed(seed: u32) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.width < MIN_BOARD_SIDE || self.height < MIN_BOARD_SIDE {
            return Err(CoreError::BoardTooSmall {
                width: self.width,
                height: self.height,
                min: MIN_BOARD_SIDE,
            });
        }
        if self.low_water == 0 {
            return Err(CoreError::InvalidLowWater);
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Room {
    config: RoomConfig,
    queue: PieceQueue,
    games: BTreeMap<PlayerId, Game>,
}

impl Room {
    pub fn new(config: RoomConfig) -> Result<Self, CoreError> {
        validate_catalog()?;
        config.validate()?;

        Ok(Self {
            config,
            queue: PieceQueue::with_low_water(config.seed, config.low_water),
            games: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn queue(&self) -> &PieceQueue {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.games.keys().copied()
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.games.contains_key(&player_id)
    }

    pub fn game(&self, player_id: PlayerId) -> Option<&Game> {
        self.games.get(&player_id)
    }

    pub fn game_mut(&mut self, player_id: PlayerId) -> Option<&mut Game> {
        self.games.get_mut(&player_id)
    }

    /// Create a game for a new player
    ///
    /// Returns `None` if the player is already in the room.
    pub fn add_player(
        &mut self,
        player_id: PlayerId,
        connection_id: ConnectionId,
        hooks: GameHooks,
    ) -> Option<&Game> {
        if self.games.contains_key(&player_id) {
            return None;
        }

        let game = Game::new(
            self.config.width,
            self.config.height,
            hooks,
            &mut self.queue,
            player_id,
            connection_id,
        );
        tracing::debug!(player_id, connection_id, players = self.games.len() + 1, "player added");

        let game = self.games.entry(player_id).or_insert(game);
        Some(&*game)
    }

    pub fn remove_player(&mut self, player_id: PlayerId) -> Option<Game> {
        self.games.remove(&player_id)
    }

    /// Apply a command to one player's game and deliver its attack
    pub fn apply(&mut self, player_id: PlayerId, action: GameAction) -> Option<StepOutcome> {
        let game = self.games.get_mut(&player_id)?;
        let outcome = game.apply_action(action, &mut self.queue);
        self.settle(player_id, outcome);
        Some(outcome)
    }

    /// One gravity step for one player's game
    pub fn gravity_tick(&mut self, player_id: PlayerId) -> Option<StepOutcome> {
        let game = self.games.get_mut(&player_id)?;
        let outcome = game.gravity_tick(&mut self.queue);
        self.settle(player_id, outcome);
        Some(outcome)
    }

    pub fn start_gravity(&mut self, player_id: PlayerId, interval_ms: u64) -> Option<bool> {
        self.games
            .get_mut(&player_id)
            .map(|game| game.start_gravity(interval_ms))
    }

    pub fn stop(&mut self, player_id: PlayerId) -> bool {
        match self.games.get_mut(&player_id) {
            Some(game) => {
                game.stop();
                true
            }
            None => false,
        }
    }

    pub fn restart(&mut self, player_id: PlayerId) -> bool {
        match self.games.get_mut(&player_id) {
            Some(game) => {
                game.restart(&mut self.queue);
                true
            }
            None => false,
        }
    }

    fn settle(&mut self, sender: PlayerId, outcome: StepOutcome) {
        let lines = outcome.lines_cleared();
        if lines > 1 {
            self.send_garbage_to_others(sender, lines);
        }
    }

    /// Push `lines_cleared - 1` garbage rows into every other live game
    ///
    /// Returns how many games received garbage.
    pub fn send_garbage_to_others(&mut self, sender: PlayerId, lines_cleared: usize) -> usize {
        let amount = garbage_for_lines(lines_cleared);
        if amount == 0 {
            return 0;
        }

        let mut targets = 0;
        for (&player_id, game) in self.games.iter_mut() {
            if player_id == sender || game.is_game_over() {
                continue;
            }
            if game.receive_garbage(amount) {
                targets += 1;
            }
        }

        tracing::debug!(sender, amount, targets, "garbage sent");
        targets
    }
}
