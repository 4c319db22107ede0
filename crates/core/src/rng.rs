//! RNG module - shared 7-bag piece sequence for a room
//!
//! Each room owns one [`PieceQueue`]. The queue is an append-only sequence: every
//! game in the room keeps its own cursor into it, so all players see exactly the
//! same pieces in the same order no matter how fast they play. New bags are
//! shuffled onto the end whenever the furthest cursor gets within `low_water`
//! pieces of the end.
//!
//! Also provides a simple LCG so a room seed fully determines its sequence.

use crate::types::{PieceKind, QUEUE_LOW_WATER};

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        // LCG formula: (a * state + c) mod m
        // Using Numerical Recipes constants: a=1664525, c=1013904223, m=2^32
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max)
    pub fn next_range(&mut self, max: u32) -> u32 {
        self.next_u32() % max
    }

    /// Shuffle a slice using Fisher-Yates
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_range((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }
}

/// Room-wide piece sequence
///
/// Pieces are kept from index 0 so a restarted game can replay from the head.
/// Length is bounded by the furthest cursor plus `low_water` and one bag of slack; rewound
/// cursors add nothing. Memory is one byte per piece of the longest single run.
#[derive(Debug, Clone)]
pub struct PieceQueue {
    pieces: Vec<PieceKind>,
    rng: SimpleRng,
    seed: u32,
    low_water: usize,
}

impl PieceQueue {
    /// Create a new piece queue with the given seed
    pub fn new(seed: u32) -> Self {
        Self::with_low_water(seed, QUEUE_LOW_WATER)
    }

    /// Create a queue that keeps at least `low_water` pieces ahead of any cursor
    pub fn with_low_water(seed: u32, low_water: usize) -> Self {
        let mut queue = Self {
            pieces: Vec::new(),
            rng: SimpleRng::new(seed),
            seed,
            low_water: low_water.max(1),
        };
        queue.replenish(0);
        queue
    }

    /// Append one shuffled bag of all seven kinds
    fn push_bag(&mut self) {
        let mut bag = PieceKind::ALL;
        self.rng.shuffle(&mut bag);
        self.pieces.extend_from_slice(&bag);
    }

    /// Make sure at least `low_water` pieces exist from `cursor` onward
    pub fn replenish(&mut self, cursor: usize) {
        while self.pieces.len() < cursor + self.low_water {
            self.push_bag();
        }
    }

    /// Take the piece at `cursor` and advance it
    pub fn draw(&mut self, cursor: &mut usize) -> PieceKind {
        self.replenish(*cursor);
        let kind = self.pieces[*cursor];
        *cursor += 1;
        self.replenish(*cursor);
        kind
    }

    /// Look at the piece at `cursor` without consuming it
    pub fn peek(&self, cursor: usize) -> Option<PieceKind> {
        self.pieces.get(cursor).copied()
    }

    /// Number of pieces generated so far
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Seed the room was created with
    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn low_water(&self) -> usize {
        self.low_water
    }
}

impl Default for PieceQueue {
    fn default() -> Self {
        Self::new(1)
    }
}
