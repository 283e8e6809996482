//! Cosmetic particles spawned by line clears and game over. Positions are in board cells
//! (fractional), velocities in cells per second.

use crate::board::ClearedCell;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::style::Color;
use std::f32::consts::TAU;

/// Effect tuning is in pixels; this many pixels make one board cell.
const PX_PER_CELL: f32 = 30.0;

const PARTICLES_PER_CELL: usize = 4;
const SMOKE_PER_COLUMN: usize = 2;
const SMOKE_COLOR: Color = Color::Rgb(0x88, 0x88, 0x88);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Particle,
    Smoke,
    Bubble,
    Heart,
    Bird,
    Cloud,
}

impl EffectKind {
    pub fn glyph(self, life_ratio: f32) -> &'static str {
        match self {
            Self::Particle => {
                if life_ratio > 0.5 {
                    "•"
                } else {
                    "·"
                }
            }
            Self::Smoke => {
                if life_ratio > 0.6 {
                    "▓"
                } else if life_ratio > 0.3 {
                    "▒"
                } else {
                    "░"
                }
            }
            Self::Bubble => {
                if life_ratio > 0.5 {
                    "o"
                } else {
                    "O"
                }
            }
            Self::Heart => "♥",
            Self::Bird => "v",
            Self::Cloud => "☁",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    pub kind: EffectKind,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Seconds left.
    pub life: f32,
    pub max_life: f32,
    pub size: f32,
    pub rotation: f32,
    pub rotation_speed: f32,
    pub color: Color,
}

impl Effect {
    /// 1.0 when fresh, 0.0 when expired.
    pub fn life_ratio(&self) -> f32 {
        if self.max_life <= 0.0 {
            return 0.0;
        }
        (self.life / self.max_life).clamp(0.0, 1.0)
    }
}

#[derive(Debug)]
pub struct EffectManager {
    effects: Vec<Effect>,
    rng: StdRng,
    /// Seconds since creation; drives the bubble wobble.
    clock: f32,
}

impl EffectManager {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            effects: Vec::new(),
            rng,
            clock: 0.0,
        }
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    pub fn add(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Step every effect by `dt` seconds and drop the expired ones.
    pub fn update(&mut self, dt: f32) {
        self.clock += dt;
        let clock = self.clock;
        for e in &mut self.effects {
            e.x += e.vx * dt;
            e.y += e.vy * dt;
            match e.kind {
                EffectKind::Smoke => {
                    e.vx *= 0.98;
                    e.vy *= 0.98;
                    e.vy -= 100.0 / PX_PER_CELL * dt;
                }
                EffectKind::Bubble => {
                    e.vx += (clock * 4.0 + e.x).sin() * 0.15 / PX_PER_CELL;
                }
                _ => {
                    e.vy += 120.0 / PX_PER_CELL * dt;
                }
            }
            e.rotation += e.rotation_speed * dt;
            e.life -= dt;
        }
        self.effects.retain(|e| e.life > 0.0);
    }

    /// Burst for a line clear: particles and a bubble per cell, more for bigger clears.
    pub fn on_lines_cleared(&mut self, count: u32, cells: &[ClearedCell]) {
        for cell in cells {
            let (cx, cy) = (cell.x as f32 + 0.5, cell.y as f32 + 0.5);
            self.spawn_particles(cx, cy, PARTICLES_PER_CELL);
            self.spawn_bubbles(cx, cy, cell.kind.color(), 1);
        }
        let Some((mid_x, mid_y)) = centroid(cells) else {
            return;
        };
        if count >= 2 {
            self.spawn_heart(mid_x, mid_y);
        }
        if count >= 3 {
            self.spawn_bird(mid_x, mid_y);
        }
        if count >= 4 {
            self.spawn_cloud(mid_x, mid_y);
        }
    }

    /// Smoke along the top row.
    pub fn on_game_over(&mut self, cols: usize) {
        for x in 0..cols {
            self.spawn_smoke(x as f32 + 0.5, 0.5, SMOKE_PER_COLUMN, SMOKE_COLOR);
        }
    }

    fn jitter(&mut self, half_width: f32) -> f32 {
        (self.rng.r#gen::<f32>() * 2.0 - 1.0) * half_width
    }

    fn unit(&mut self) -> f32 {
        self.rng.r#gen::<f32>()
    }

    pub fn spawn_particles(&mut self, x: f32, y: f32, count: usize) {
        for _ in 0..count {
            let angle = self.unit() * TAU;
            let speed = (80.0 + self.unit() * 180.0) / PX_PER_CELL;
            let life = 0.7 + self.unit() * 0.3;
            let size = 3.0 + self.unit() * 3.0;
            self.add(Effect {
                kind: EffectKind::Particle,
                x,
                y,
                vx: angle.cos() * speed,
                vy: angle.sin() * speed - 80.0 / PX_PER_CELL,
                life,
                max_life: 1.0,
                size,
                rotation: 0.0,
                rotation_speed: 0.0,
                color: Color::White,
            });
        }
    }

    pub fn spawn_smoke(&mut self, x: f32, y: f32, count: usize, color: Color) {
        for _ in 0..count {
            let angle = self.unit() * TAU;
            let speed = (250.0 + self.unit() * 30.0) / PX_PER_CELL;
            let effect = Effect {
                kind: EffectKind::Smoke,
                x: x + self.jitter(5.0 / PX_PER_CELL),
                y: y + self.jitter(5.0 / PX_PER_CELL),
                vx: angle.cos() * speed,
                vy: -speed - self.unit() * 40.0 / PX_PER_CELL,
                life: 1.2 + self.unit() * 0.4,
                max_life: 1.6,
                size: 10.0 + self.unit() * 20.0,
                rotation: 0.0,
                rotation_speed: self.jitter(1.0),
                color,
            };
            self.add(effect);
        }
    }

    pub fn spawn_bubbles(&mut self, x: f32, y: f32, color: Color, count: usize) {
        for _ in 0..count {
            let effect = Effect {
                kind: EffectKind::Bubble,
                x: x + self.jitter(4.0 / PX_PER_CELL),
                y: y + self.jitter(4.0 / PX_PER_CELL),
                vx: self.jitter(10.0 / PX_PER_CELL),
                vy: -(130.0 + self.unit() * 50.0) / PX_PER_CELL,
                life: 1.6 + self.unit() * 0.6,
                max_life: 2.2,
                size: 6.0 + self.unit() * 3.0,
                rotation: 0.0,
                rotation_speed: 0.0,
                color,
            };
            self.add(effect);
        }
    }

    pub fn spawn_heart(&mut self, x: f32, y: f32) {
        let effect = Effect {
            kind: EffectKind::Heart,
            x,
            y,
            vx: self.jitter(50.0 / PX_PER_CELL),
            vy: (-200.0 - self.unit() * 200.0) / PX_PER_CELL,
            life: 1.1,
            max_life: 1.5,
            size: 20.0 + self.unit() * 10.0,
            rotation: 0.0,
            rotation_speed: 0.0,
            color: Color::Rgb(0xff, 0x4d, 0x6d),
        };
        self.add(effect);
    }

    pub fn spawn_bird(&mut self, x: f32, y: f32) {
        let effect = Effect {
            kind: EffectKind::Bird,
            x,
            y,
            vx: self.jitter(150.0 / PX_PER_CELL),
            vy: (-200.0 - self.unit() * 200.0) / PX_PER_CELL,
            life: 1.1,
            max_life: 1.4,
            size: 30.0 + self.unit() * 10.0,
            rotation: 0.0,
            rotation_speed: 0.0,
            color: Color::White,
        };
        self.add(effect);
    }

    pub fn spawn_cloud(&mut self, x: f32, y: f32) {
        let effect = Effect {
            kind: EffectKind::Cloud,
            x,
            y,
            vx: self.jitter(25.0 / PX_PER_CELL),
            vy: (-200.0 - self.unit() * 150.0) / PX_PER_CELL,
            life: 1.6,
            max_life: 1.6,
            size: 22.0 + self.unit() * 18.0,
            rotation: 0.0,
            rotation_speed: 0.0,
            color: Color::Rgb(0xe0, 0xe8, 0xf0),
        };
        self.add(effect);
    }
}

fn centroid(cells: &[ClearedCell]) -> Option<(f32, f32)> {
    if cells.is_empty() {
        return None;
    }
    let n = cells.len() as f32;
    let sx: f32 = cells.iter().map(|c| c.x as f32 + 0.5).sum();
    let sy: f32 = cells.iter().map(|c| c.y as f32 + 0.5).sum();
    Some((sx / n, sy / n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tetromino::TetrominoKind;

    fn row_cells(y: usize, kind: TetrominoKind) -> Vec<ClearedCell> {
        (0..10).map(|x| ClearedCell { x, y, kind }).collect()
    }

    fn count(em: &EffectManager, kind: EffectKind) -> usize {
        em.effects().iter().filter(|e| e.kind == kind).count()
    }

    #[test]
    fn test_single_line_burst() {
        let mut em = EffectManager::new(Some(3));
        em.on_lines_cleared(1, &row_cells(19, TetrominoKind::S));
        assert_eq!(count(&em, EffectKind::Particle), 10 * PARTICLES_PER_CELL);
        assert_eq!(count(&em, EffectKind::Bubble), 10);
        assert_eq!(count(&em, EffectKind::Heart), 0);
        assert!(em
            .effects()
            .iter()
            .filter(|e| e.kind == EffectKind::Bubble)
            .all(|e| e.color == TetrominoKind::S.color()));
    }

    #[test]
    fn test_tetris_adds_heart_bird_cloud() {
        let mut em = EffectManager::new(Some(3));
        let cells: Vec<_> = (16..20).flat_map(|y| row_cells(y, TetrominoKind::I)).collect();
        em.on_lines_cleared(4, &cells);
        assert_eq!(count(&em, EffectKind::Heart), 1);
        assert_eq!(count(&em, EffectKind::Bird), 1);
        assert_eq!(count(&em, EffectKind::Cloud), 1);
    }

    #[test]
    fn test_effects_expire() {
        let mut em = EffectManager::new(Some(5));
        em.on_lines_cleared(1, &row_cells(10, TetrominoKind::T));
        em.on_game_over(10);
        assert!(!em.is_empty());
        for _ in 0..300 {
            em.update(1.0 / 60.0);
        }
        assert!(em.is_empty());
    }

    #[test]
    fn test_gravity_pulls_particles_down() {
        let mut em = EffectManager::new(Some(1));
        em.add(Effect {
            kind: EffectKind::Particle,
            x: 5.0,
            y: 5.0,
            vx: 0.0,
            vy: 0.0,
            life: 1.0,
            max_life: 1.0,
            size: 3.0,
            rotation: 0.0,
            rotation_speed: 0.0,
            color: Color::White,
        });
        em.update(0.1);
        em.update(0.1);
        let e = &em.effects()[0];
        assert!(e.vy > 0.0);
        assert!(e.y > 5.0);
        assert!((e.life - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_smoke_rises() {
        let mut em = EffectManager::new(Some(2));
        em.spawn_smoke(3.0, 3.0, 4, SMOKE_COLOR);
        em.update(0.2);
        assert!(em.effects().iter().all(|e| e.y < 3.0));
    }

    #[test]
    fn test_seeded_managers_match() {
        let mut a = EffectManager::new(Some(77));
        let mut b = EffectManager::new(Some(77));
        a.spawn_particles(1.0, 1.0, 8);
        b.spawn_particles(1.0, 1.0, 8);
        assert_eq!(a.effects(), b.effects());
    }

    #[test]
    fn test_life_ratio_bounds() {
        let mut e = Effect {
            kind: EffectKind::Heart,
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            life: 3.0,
            max_life: 1.5,
            size: 20.0,
            rotation: 0.0,
            rotation_speed: 0.0,
            color: Color::Red,
        };
        assert_eq!(e.life_ratio(), 1.0);
        e.life = -0.1;
        assert_eq!(e.life_ratio(), 0.0);
    }
}
