//! Server configuration
//!
//! Everything is read from `ROOM_TETRIS_*` environment variables; anything
//! missing or unparsable falls back to its default.

use std::hash::Hasher;
use std::str::FromStr;

use room_tetris_core::RoomConfig;
use room_tetris_types::{BOARD_HEIGHT, BOARD_WIDTH, DEFAULT_GRAVITY_MS, QUEUE_LOW_WATER};

/// Stable 64-bit FNV-1a hasher for room seeds.
///
/// `DefaultHasher` output is not guaranteed stable across Rust versions, and a
/// room name must always map to the same piece sequence.
#[derive(Debug, Clone)]
struct Fnv1aHasher {
    state: u64,
}

impl Fnv1aHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// Deterministic piece-sequence seed for a room name
pub fn room_seed(room_id: &str) -> u32 {
    let mut hasher = Fnv1aHasher::new();
    hasher.write(room_id.as_bytes());
    let hash = hasher.finish();
    (hash ^ (hash >> 32)) as u32
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Gravity interval used when `start` omits one
    pub gravity_ms: u64,
    pub board_width: usize,
    pub board_height: usize,
    /// Command queue depth of each room
    pub max_pending_commands: usize,
    /// Fixed seed for every room; per-room hash when unset
    pub seed: Option<u32>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            gravity_ms: DEFAULT_GRAVITY_MS,
            board_width: BOARD_WIDTH,
            board_height: BOARD_HEIGHT,
            max_pending_commands: 64,
            seed: None,
        }
    }
}

impl ServerConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create from any key lookup (environment, test maps)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
            lookup(key).and_then(|s| s.trim().parse().ok())
        }

        let defaults = Self::default();

        let host = lookup("ROOM_TETRIS_HOST")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.host);

        Self {
            host,
            port: parsed(&lookup, "ROOM_TETRIS_PORT").unwrap_or(defaults.port),
            gravity_ms: parsed(&lookup, "ROOM_TETRIS_GRAVITY_MS").unwrap_or(defaults.gravity_ms),
            board_width: parsed(&lookup, "ROOM_TETRIS_BOARD_WIDTH").unwrap_or(defaults.board_width),
            board_height: parsed(&lookup, "ROOM_TETRIS_BOARD_HEIGHT")
                .unwrap_or(defaults.board_height),
            max_pending_commands: parsed(&lookup, "ROOM_TETRIS_MAX_PENDING")
                .unwrap_or(defaults.max_pending_commands),
            seed: parsed(&lookup, "ROOM_TETRIS_SEED"),
        }
    }

    /// Core settings for a room named `room_id`
    pub fn room_config(&self, room_id: &str) -> RoomConfig {
        RoomConfig {
            width: self.board_width,
            height: self.board_height,
            seed: self.seed.unwrap_or_else(|| room_seed(room_id)),
            low_water: QUEUE_LOW_WATER,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_vars_use_defaults() {
        assert_eq!(ServerConfig::from_lookup(|_| None), ServerConfig::default());
    }

    #[test]
    fn test_vars_override_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("ROOM_TETRIS_HOST", "0.0.0.0"),
            ("ROOM_TETRIS_PORT", "9000"),
            ("ROOM_TETRIS_GRAVITY_MS", "250"),
            ("ROOM_TETRIS_BOARD_WIDTH", "12"),
            ("ROOM_TETRIS_MAX_PENDING", "8"),
            ("ROOM_TETRIS_SEED", "42"),
        ]));

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.gravity_ms, 250);
        assert_eq!(config.board_width, 12);
        assert_eq!(config.board_height, BOARD_HEIGHT);
        assert_eq!(config.max_pending_commands, 8);
        assert_eq!(config.room_config("anything").seed, 42);
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("ROOM_TETRIS_PORT", "not-a-port"),
            ("ROOM_TETRIS_SEED", ""),
        ]));
        assert_eq!(config.port, 7878);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_room_seed_is_stable_per_name() {
        assert_eq!(room_seed("lobby"), room_seed("lobby"));
        assert_ne!(room_seed("lobby"), room_seed("lobby-2"));

        let config = ServerConfig::default();
        assert_eq!(config.room_config("lobby").seed, room_seed("lobby"));
    }
}
