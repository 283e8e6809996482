//! Key bindings. Fixed: arrows move/rotate, P pauses, M mutes, +/- set volume, Q/Esc quits, R restarts after game over.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    MoveDown,
    Rotate,
    Pause,
    ToggleMute,
    VolumeUp,
    VolumeDown,
    Restart,
    Quit,
    None,
}

/// Map key event to game action. Ctrl+C always quits.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers.contains(KeyModifiers::CONTROL) {
        return if code == KeyCode::Char('c') { Action::Quit } else { Action::None };
    }
    match code {
        KeyCode::Left => Action::MoveLeft,
        KeyCode::Right => Action::MoveRight,
        KeyCode::Down => Action::MoveDown,
        KeyCode::Up => Action::Rotate,
        KeyCode::Char('p' | 'P') => Action::Pause,
        KeyCode::Char('m' | 'M') => Action::ToggleMute,
        KeyCode::Char('+' | '=') => Action::VolumeUp,
        KeyCode::Char('-') => Action::VolumeDown,
        KeyCode::Char('r' | 'R') => Action::Restart,
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        _ => Action::None,
    }
}
