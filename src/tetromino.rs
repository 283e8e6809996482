//! Tetromino catalog: the 7 spawn shapes and their colours.

use ratatui::style::Color;

/// Tetromino kinds (I, O, T, S, Z, J, L). Also the colour tag of a locked cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TetrominoKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl TetrominoKind {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::T, Self::S, Self::Z, Self::J, Self::L];

    /// Spawn-orientation occupancy rows (1 = block).
    pub fn shape(self) -> &'static [&'static [u8]] {
        match self {
            Self::I => &[&[1, 1, 1, 1]],
            Self::O => &[&[1, 1], &[1, 1]],
            Self::T => &[&[0, 1, 0], &[1, 1, 1]],
            Self::S => &[&[0, 1, 1], &[1, 1, 0]],
            Self::Z => &[&[1, 1, 0], &[0, 1, 1]],
            Self::J => &[&[1, 0, 0], &[1, 1, 1]],
            Self::L => &[&[0, 0, 1], &[1, 1, 1]],
        }
    }

    pub fn color(self) -> Color {
        match self {
            Self::I => Color::Rgb(0xf2, 0x00, 0xff), // pink
            Self::O => Color::Rgb(0xff, 0xff, 0x00), // yellow
            Self::T => Color::Rgb(0x93, 0x13, 0xf5), // purple
            Self::S => Color::Rgb(0x0b, 0xed, 0x0b), // green
            Self::Z => Color::Rgb(0xff, 0x00, 0x00), // red
            Self::J => Color::Rgb(0x22, 0x71, 0xe7), // blue
            Self::L => Color::Rgb(0xff, 0xa5, 0x00), // orange
        }
    }

    pub fn name(self) -> char {
        match self {
            Self::I => 'I',
            Self::O => 'O',
            Self::T => 'T',
            Self::S => 'S',
            Self::Z => 'Z',
            Self::J => 'J',
            Self::L => 'L',
        }
    }
}
