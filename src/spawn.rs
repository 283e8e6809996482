//! Random piece spawner with an injectable, seedable generator.

use crate::piece::Piece;
use crate::tetromino::TetrominoKind;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct Spawner {
    rng: StdRng,
    spawn_x: i32,
}

impl Spawner {
    /// Spawner for a board `cols` wide, seeded from OS entropy.
    pub fn new(cols: usize) -> Self {
        Self::with_rng(cols, StdRng::from_entropy())
    }

    /// Deterministic sequence for tests and `--seed`.
    pub fn seeded(cols: usize, seed: u64) -> Self {
        Self::with_rng(cols, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(cols: usize, rng: StdRng) -> Self {
        Self {
            rng,
            spawn_x: spawn_column(cols),
        }
    }

    /// Uniform pick among the 7 kinds, placed at the spawn column on row 0.
    pub fn spawn(&mut self) -> Piece {
        let kind = TetrominoKind::ALL[self.rng.gen_range(0..TetrominoKind::ALL.len())];
        self.spawn_kind(kind)
    }

    pub fn spawn_kind(&self, kind: TetrominoKind) -> Piece {
        Piece::new(kind, self.spawn_x, 0)
    }
}

/// Fixed spawn column: 3 on a 10-wide board, for every kind.
pub fn spawn_column(cols: usize) -> i32 {
    (cols as i32 / 2 - 2).max(0)
}
