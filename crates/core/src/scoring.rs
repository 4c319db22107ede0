//! Scoring module - line-clear points and attack garbage
//!
//! Points depend only on how many rows a single lock cleared. Attacks follow the
//! "no junk for singles" rule: a clear of `n` rows sends `n - 1` garbage rows.

/// Points for clearing 0..=4 rows with one lock
pub const LINE_POINTS: [u32; 5] = [0, 100, 300, 500, 800];

/// Points for one lock that cleared `lines_cleared` rows
///
/// Anything outside 0..=4 scores 0.
pub fn get_points(lines_cleared: usize) -> u32 {
    LINE_POINTS.get(lines_cleared).copied().unwrap_or(0)
}

/// Garbage rows sent to each opponent for one lock
pub fn garbage_for_lines(lines_cleared: usize) -> usize {
    lines_cleared.saturating_sub(1)
}
