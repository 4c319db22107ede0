//! Board module - manages the game grid
//!
//! The board is a `width` x `height` grid of cells (10x22 by default). Each cell is
//! empty (`0`), a locked piece cell (the template id) or a garbage cell (`8`).
//! Coordinates: (x, y) where x grows left to right and y grows top to bottom.
//! Rows above the board (negative y) are a spawn/rotation buffer: shapes may
//! overhang them, but nothing is ever stored there.

use crate::piece::{Piece, Shape};
use crate::types::{Cell, EMPTY_CELL, GARBAGE_CELL};

/// The game board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: usize,
    height: usize,
    /// Rows top to bottom, each exactly `width` cells
    grid: Vec<Vec<Cell>>,
}

impl Board {
    /// Create a new empty board
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            grid: vec![vec![EMPTY_CELL; width]; height],
        }
    }

    /// Get width of the board
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get height of the board
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get cell at position (x, y)
    /// Returns None if out of bounds
    pub fn get(&self, x: i32, y: i32) -> Option<Cell> {
        let (x, y) = self.index(x, y)?;
        Some(self.grid[y][x])
    }

    /// Set cell at position (x, y)
    /// Returns false if out of bounds
    pub fn set(&mut self, x: i32, y: i32, cell: Cell) -> bool {
        match self.index(x, y) {
            Some((x, y)) => {
                self.grid[y][x] = cell;
                true
            }
            None => false,
        }
    }

    #[inline(always)]
    fn index(&self, x: i32, y: i32) -> Option<(usize, usize)> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some((x as usize, y as usize))
    }

    /// Clear the entire board
    pub fn reset(&mut self) {
        for row in &mut self.grid {
            row.fill(EMPTY_CELL);
        }
    }

    /// Check whether `shape` fits with its top-left corner at (x, y)
    ///
    /// Filled cells may sit above the board (negative row) but never left, right
    /// or below it, and never on top of a non-empty cell.
    pub fn is_valid_position(&self, x: i32, y: i32, shape: &Shape) -> bool {
        for (row, line) in shape.iter().enumerate() {
            for (col, &cell) in line.iter().enumerate() {
                if cell == EMPTY_CELL {
                    continue;
                }

                let bx = x + col as i32;
                let by = y + row as i32;

                if bx < 0 || bx as usize >= self.width || by >= self.height as i32 {
                    return false;
                }
                if by >= 0 && self.grid[by as usize][bx as usize] != EMPTY_CELL {
                    return false;
                }
            }
        }

        true
    }

    /// Commit a piece into the grid and clear any completed rows
    ///
    /// Cells above row 0 are dropped. Returns the number of cleared rows.
    pub fn lock_piece(&mut self, piece: &Piece) -> usize {
        for (row, line) in piece.shape.iter().enumerate() {
            for (col, &cell) in line.iter().enumerate() {
                if cell == EMPTY_CELL {
                    continue;
                }
                self.set(piece.x + col as i32, piece.y + row as i32, cell);
            }
        }

        self.clear_lines()
    }

    /// Check if a row is completely filled
    pub fn is_row_full(&self, y: usize) -> bool {
        self.grid
            .get(y)
            .is_some_and(|row| row.iter().all(|&cell| cell != EMPTY_CELL))
    }

    /// Remove every full row at once and refill the top with empty rows
    ///
    /// Returns the number of rows removed.
    pub fn clear_lines(&mut self) -> usize {
        let before = self.grid.len();
        self.grid.retain(|row| row.contains(&EMPTY_CELL));
        let cleared = before - self.grid.len();

        if cleared > 0 {
            let mut rows: Vec<Vec<Cell>> =
                (0..cleared).map(|_| vec![EMPTY_CELL; self.width]).collect();
            rows.append(&mut self.grid);
            self.grid = rows;
        }

        cleared
    }

    /// Push `count` garbage rows in from the bottom
    ///
    /// The top `count` rows fall off the board whatever they contain.
    pub fn add_garbage_lines(&mut self, count: usize) {
        if count == 0 {
            return;
        }

        let count = count.min(self.height);
        self.grid.rotate_left(count);
        for row in &mut self.grid[self.height - count..] {
            row.fill(GARBAGE_CELL);
        }
    }

    /// Read-only view of the grid, top row first
    pub fn state(&self) -> &[Vec<Cell>] {
        &self.grid
    }

    /// Number of non-empty cells (for tests and diagnostics)
    pub fn filled_cells(&self) -> usize {
        self.grid
            .iter()
            .flatten()
            .filter(|&&cell| cell != EMPTY_CELL)
            .count()
    }

    /// Create from rows for testing
    #[cfg(test)]
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        assert!(rows.iter().all(|row| row.len() == width));
        Self {
            width,
            height,
            grid: rows,
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(crate::types::BOARD_WIDTH, crate::types::BOARD_HEIGHT)
    }
}
