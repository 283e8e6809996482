//! Falling piece: rectangular shape matrix, colour tag and top-left anchor.

use crate::tetromino::TetrominoKind;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("shape has no rows or no columns")]
    Empty,
    #[error("row {row} has {len} cells, expected {expected}")]
    Ragged { row: usize, len: usize, expected: usize },
}

/// Rectangular occupancy matrix. rows[y][x] = block present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    rows: Vec<Vec<bool>>,
}

impl Shape {
    // In-game pieces come from `Shape::of`; this is the checked path for arbitrary input.
    #[allow(dead_code)]
    pub fn from_rows(rows: Vec<Vec<bool>>) -> Result<Self, ShapeError> {
        let expected = rows.first().map(Vec::len).unwrap_or(0);
        if expected == 0 {
            return Err(ShapeError::Empty);
        }
        for (row, r) in rows.iter().enumerate() {
            if r.len() != expected {
                return Err(ShapeError::Ragged { row, len: r.len(), expected });
            }
        }
        Ok(Self { rows })
    }

    /// Catalog shapes are rectangular and non-empty by construction.
    pub fn of(kind: TetrominoKind) -> Self {
        Self {
            rows: kind
                .shape()
                .iter()
                .map(|row| row.iter().map(|&c| c != 0).collect())
                .collect(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.rows[0].len()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_filled(&self, col: usize, row: usize) -> bool {
        self.rows.get(row).and_then(|r| r.get(col)).copied().unwrap_or(false)
    }

    /// (col, row) of every occupied cell, row-major.
    pub fn blocks(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().enumerate().flat_map(|(row, r)| {
            r.iter()
                .enumerate()
                .filter(|(_, filled)| **filled)
                .map(move |(col, _)| (col, row))
        })
    }

    /// 90° clockwise: transpose, then reverse each resulting row.
    pub fn rotated_cw(&self) -> Self {
        let (w, h) = (self.width(), self.height());
        let rows = (0..w)
            .map(|x| (0..h).rev().map(|y| self.rows[y][x]).collect())
            .collect();
        Self { rows }
    }
}

/// Active piece. Translation is done by mutating `x` / `y` on a candidate copy;
/// rotation produces a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub kind: TetrominoKind,
    pub shape: Shape,
    pub x: i32,
    pub y: i32,
}

impl Piece {
    pub fn new(kind: TetrominoKind, x: i32, y: i32) -> Self {
        Self {
            kind,
            shape: Shape::of(kind),
            x,
            y,
        }
    }

    /// Rotated copy; position is kept as-is (no wall kick).
    pub fn rotate_clockwise(&self) -> Self {
        Self {
            kind: self.kind,
            shape: self.shape.rotated_cw(),
            x: self.x,
            y: self.y,
        }
    }

    /// Board coordinates of every occupied cell.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.shape
            .blocks()
            .map(|(col, row)| (self.x + col as i32, self.y + row as i32))
    }

    pub fn height(&self) -> usize {
        self.shape.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ragged_shape_rejected() {
        let err = Shape::from_rows(vec![vec![true, true], vec![true]]).unwrap_err();
        assert_eq!(err, ShapeError::Ragged { row: 1, len: 1, expected: 2 });
        assert_eq!(Shape::from_rows(vec![]).unwrap_err(), ShapeError::Empty);
    }

    #[test]
    fn test_rotate_t_clockwise() {
        // 010      10
        // 111  ->  11
        //          10
        let p = Piece::new(TetrominoKind::T, 3, 0).rotate_clockwise();
        let expected = Shape::from_rows(vec![
            vec![true, false],
            vec![true, true],
            vec![true, false],
        ])
        .unwrap();
        assert_eq!(p.shape, expected);
        assert_eq!((p.x, p.y), (3, 0));
    }

    #[test]
    fn test_i_piece_swaps_bounding_box() {
        let p = Piece::new(TetrominoKind::I, 3, 0);
        assert_eq!((p.shape.width(), p.height()), (4, 1));
        let r = p.rotate_clockwise();
        assert_eq!((r.shape.width(), r.height()), (1, 4));
    }

    #[test]
    fn test_four_rotations_is_identity() {
        for kind in TetrominoKind::ALL {
            let p = Piece::new(kind, 0, 0);
            let back = p
                .rotate_clockwise()
                .rotate_clockwise()
                .rotate_clockwise()
                .rotate_clockwise();
            assert_eq!(back.shape, p.shape, "{:?}", kind);
        }
    }

    #[test]
    fn test_rotation_leaves_original_untouched() {
        let p = Piece::new(TetrominoKind::L, 2, 5);
        let before = p.clone();
        let _ = p.rotate_clockwise();
        assert_eq!(p, before);
    }

    #[test]
    fn test_cells_are_offset_by_anchor() {
        let p = Piece::new(TetrominoKind::O, 4, 18);
        let cells: Vec<_> = p.cells().collect();
        assert_eq!(cells, vec![(4, 18), (5, 18), (4, 19), (5, 19)]);
    }
}
