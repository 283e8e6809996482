//! Terminal colours for the board and panels, loadable from a btop-style
//! `theme[key]="#RRGGBB"` file. Piece colours are fixed by the tetromino catalog.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Board background (empty cells).
    pub bg: Color,
    /// Faint grid dots on empty cells.
    pub grid: Color,
    /// Board and panel borders.
    pub border: Color,
    /// Body text.
    pub text: Color,
    /// Titles and labels.
    pub title: Color,
    /// Highlights: paused badge, selected text, line-clear flash.
    pub accent: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            bg: Color::Rgb(0x10, 0x10, 0x14),
            grid: Color::Rgb(0x26, 0x26, 0x2e),
            border: Color::Rgb(0x3f, 0x3f, 0x46),
            text: Color::Rgb(0xd4, 0xd4, 0xd8),
            title: Color::Rgb(0x2d, 0xd4, 0xbf),
            accent: Color::Rgb(0xfd, 0xe0, 0x47),
        }
    }
}

impl Theme {
    /// Missing path → defaults. Unknown or malformed keys fall back per key.
    pub fn load(path: Option<&Path>) -> Result<Self, ThemeError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let s = std::fs::read_to_string(path)?;
        Ok(Self::from_map(&parse_theme_file(&s)))
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |keys: &[&str]| keys.iter().find_map(|k| map.get(*k).and_then(|v| parse_hex(v).ok()));
        let d = Self::default();
        Self {
            bg: get(&["board_bg", "main_bg", "meter_bg"]).unwrap_or(d.bg),
            grid: get(&["grid", "div_line"]).unwrap_or(d.grid),
            border: get(&["border", "div_line"]).unwrap_or(d.border),
            text: get(&["text", "main_fg"]).unwrap_or(d.text),
            title: get(&["title"]).unwrap_or(d.title),
            accent: get(&["accent", "hi_fg"]).unwrap_or(d.accent),
        }
    }
}

/// `theme[key]="value"` lines into a map; `#` comments and junk lines are skipped.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let rest = line.strip_prefix("theme[")?;
            let (key, rest) = rest.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// "#RRGGBB" or "#RGB" into a ratatui colour.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let hex = s.trim().trim_start_matches('#');
    let bad = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(bad)
    };
    match hex.len() {
        6 => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => Ok(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => Err(bad()),
    }
}
