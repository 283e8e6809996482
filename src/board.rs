//! Board: fixed grid of locked cells, locking, line clear and collision.

use crate::piece::Piece;
use crate::tetromino::TetrominoKind;
use std::collections::VecDeque;

pub const DEFAULT_COLS: u16 = 10;
pub const DEFAULT_ROWS: u16 = 20;

/// Single cell: either empty or a locked block of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Filled(TetrominoKind),
}

impl Cell {
    #[inline]
    pub fn is_filled(self) -> bool {
        matches!(self, Self::Filled(_))
    }
}

/// A cell removed by a line clear, in pre-removal coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearedCell {
    pub x: usize,
    pub y: usize,
    pub kind: TetrominoKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearedLines {
    pub count: u32,
    pub cells: Vec<ClearedCell>,
}

/// Grid of cells. y=0 is top; rows[0] is the top row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cols: usize,
    rows: VecDeque<Vec<Cell>>,
}

impl Board {
    pub fn new(cols: u16, rows: u16) -> Self {
        let (w, h) = (cols.max(1) as usize, rows.max(1) as usize);
        Self {
            cols: w,
            rows: (0..h).map(|_| vec![Cell::Empty; w]).collect(),
        }
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        self.rows.get(y).and_then(|row| row.get(x)).copied()
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if let Some(slot) = self.rows.get_mut(y).and_then(|row| row.get_mut(x)) {
            *slot = cell;
        }
    }

    /// Rows top to bottom, for rendering.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Column in [0, cols) and row in [-piece_height, rows).
    pub fn is_inside(&self, x: i32, y: i32, piece_height: usize) -> bool {
        x >= 0 && (x as usize) < self.cols && y >= -(piece_height as i32) && y < self.rows() as i32
    }

    /// Write the piece's cells into the grid. Cells above row 0 are dropped.
    pub fn lock_piece(&mut self, piece: &Piece) {
        let height = piece.height();
        for (x, y) in piece.cells() {
            if y >= 0 && self.is_inside(x, y, height) {
                self.set(x as usize, y as usize, Cell::Filled(piece.kind));
            }
        }
    }

    /// Remove every full row, inserting an empty row on top for each.
    /// Scans bottom-up and re-checks the same index after a removal.
    pub fn clear_lines(&mut self) -> ClearedLines {
        let mut cleared = ClearedLines::default();
        // Index shift: rows removed so far all sat below the current index, and each
        // removal pushed the rows above down by one, so original row = idx - removed.
        let mut y = self.rows();
        while y > 0 {
            let idx = y - 1;
            let full = self.rows[idx].iter().all(|c| c.is_filled());
            if !full {
                y -= 1;
                continue;
            }
            let original_y = idx - cleared.count as usize;
            if let Some(row) = self.rows.remove(idx) {
                cleared.cells.extend(row.iter().enumerate().filter_map(|(x, c)| match c {
                    Cell::Filled(kind) => Some(ClearedCell { x, y: original_y, kind: *kind }),
                    Cell::Empty => None,
                }));
            }
            self.rows.push_front(vec![Cell::Empty; self.cols]);
            cleared.count += 1;
        }
        cleared
    }

    /// Any block in the top row.
    pub fn game_over(&self) -> bool {
        self.rows.front().is_some_and(|row| row.iter().any(|c| c.is_filled()))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(DEFAULT_COLS, DEFAULT_ROWS)
    }
}

/// True if any block of the piece is past a wall or the floor, or on a locked cell.
/// Rows above the board never collide.
pub fn has_collision(board: &Board, piece: &Piece) -> bool {
    piece.cells().any(|(x, y)| {
        if x < 0 || x as usize >= board.cols() || y >= board.rows() as i32 {
            return true;
        }
        if y < 0 {
            return false;
        }
        board.get(x as usize, y as usize).is_some_and(Cell::is_filled)
    })
}
