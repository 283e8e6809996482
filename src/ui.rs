//! Layout and drawing: board, falling piece, effects, sidebar, pause overlay and game-over panel.

use crate::app::{Screen, ScorePanel, SubmitPhase};
use crate::board::Cell;
use crate::effects::EffectManager;
use crate::game::{GameState, Status};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal columns per board cell; cells are drawn as "██" so they look square.
const CELL_WIDTH: u16 = 2;
const SIDEBAR_WIDTH: u16 = 26;
const SIDEBAR_TOP_ROWS: usize = 5;
const GAME_OVER_WIDTH: u16 = 38;

/// Effects at least this big (in pixels) are drawn bold.
const BOLD_EFFECT_SIZE: f32 = 20.0;

/// Duration of the line-clear flash in ms.
const LINE_CLEAR_FADE_MS: u32 = 350;

/// Everything the renderer reads. Nothing in here is mutated while drawing.
pub struct View<'a> {
    pub screen: Screen,
    pub state: &'a GameState,
    pub theme: &'a Theme,
    pub effects: &'a EffectManager,
    pub scores: &'a ScorePanel,
    pub muted: bool,
    pub volume: f32,
}

/// TachyonFX flash over the rows of the last clear. The effect is built lazily on the
/// first frame because its filter needs the on-screen board rect.
pub struct LineClearFlash {
    rows: Vec<usize>,
    effect: Option<Effect>,
    last_frame: Option<Instant>,
}

impl LineClearFlash {
    pub fn new(rows: Vec<usize>) -> Self {
        Self {
            rows,
            effect: None,
            last_frame: None,
        }
    }

    pub fn done(&self) -> bool {
        self.effect.as_ref().is_some_and(|e| e.done())
    }
}

/// Outer size (border included) of the board for a grid of `cols` x `rows`.
fn board_outer_size(cols: usize, rows: usize) -> (u16, u16) {
    (cols as u16 * CELL_WIDTH + 2, rows as u16 + 2)
}

/// Board and sidebar rects, centered in `area` the same way on every screen.
fn layout(area: Rect, cols: usize, rows: usize) -> (Rect, Rect) {
    let (bw, bh) = board_outer_size(cols, rows);
    let total_w = bw + SIDEBAR_WIDTH;

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(bh),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    (inner[0], inner[1])
}

/// Board cells area (no border) for the given frame area.
fn board_rect(area: Rect, state: &GameState) -> Rect {
    let (outer, _) = layout(area, state.board.cols(), state.board.rows());
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: (state.board.cols() as u16 * CELL_WIDTH).min(outer.width.saturating_sub(2)),
        height: (state.board.rows() as u16).min(outer.height.saturating_sub(2)),
    }
}

/// Linear blend from `bg` (ratio 0) to `color` (ratio 1). Non-RGB colours are left alone.
fn fade_toward(color: Color, bg: Color, ratio: f32) -> Color {
    match (color, bg) {
        (Color::Rgb(r, g, b), Color::Rgb(br, bgg, bb)) => {
            let t = ratio.clamp(0.0, 1.0);
            let mix = |c: u8, base: u8| (base as f32 + (c as f32 - base as f32) * t).round() as u8;
            Color::Rgb(mix(r, br), mix(g, bgg), mix(b, bb))
        }
        _ => color,
    }
}

/// Draw the current screen. Starts or advances `flash` when one is pending.
pub fn draw(frame: &mut Frame, view: &View, flash: &mut Option<LineClearFlash>, now: Instant) {
    let area = frame.area();
    let (board_area, sidebar_area) = layout(area, view.state.board.cols(), view.state.board.rows());

    draw_board(frame, view, board_area);
    draw_effects(frame, view, board_rect(area, view.state));
    draw_sidebar(frame, view, sidebar_area);

    if let Some(flash) = flash.as_mut() {
        apply_line_clear_flash(frame, view, area, flash, now);
    }

    match view.screen {
        Screen::Playing if view.state.status == Status::Paused => {
            draw_pause_overlay(frame, view.theme, board_area)
        }
        Screen::Playing => {}
        Screen::GameOver => draw_game_over(frame, view, area),
    }
}

fn draw_board(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border).bg(theme.bg))
        .title(Span::styled(" Stackfall ", Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let buf = frame.buffer_mut();
    let max_x = inner.x + inner.width;
    let max_y = inner.y + inner.height;
    let mut paint = |x: usize, y: usize, symbol: [&str; 2], style: Style| {
        let rx = inner.x + x as u16 * CELL_WIDTH;
        let ry = inner.y + y as u16;
        if ry >= max_y {
            return;
        }
        for (i, s) in symbol.iter().enumerate() {
            let cx = rx + i as u16;
            if cx < max_x {
                buf[(cx, ry)].set_symbol(s).set_style(style);
            }
        }
    };

    for (y, row) in view.state.board.iter_rows().enumerate() {
        for (x, cell) in row.iter().enumerate() {
            match cell {
                Cell::Empty => paint(x, y, ["·", " "], Style::default().fg(theme.grid).bg(theme.bg)),
                Cell::Filled(kind) => {
                    paint(x, y, ["█", "█"], Style::default().fg(kind.color()).bg(theme.bg))
                }
            }
        }
    }

    // Cells above the top edge are not drawn.
    if view.state.status != Status::GameOver {
        let piece = &view.state.piece;
        let style = Style::default().fg(piece.kind.color()).bg(theme.bg);
        for (x, y) in piece.cells() {
            if x >= 0 && y >= 0 {
                paint(x as usize, y as usize, ["█", "█"], style);
            }
        }
    }
}

fn draw_effects(frame: &mut Frame, view: &View, board: Rect) {
    if view.effects.is_empty() {
        return;
    }
    let buf = frame.buffer_mut();
    for effect in view.effects.effects() {
        if effect.x < 0.0 || effect.y < 0.0 {
            continue;
        }
        let rx = board.x + (effect.x * CELL_WIDTH as f32) as u16;
        let ry = board.y + effect.y as u16;
        if rx >= board.x + board.width || ry >= board.y + board.height {
            continue;
        }
        let ratio = effect.life_ratio();
        let color = fade_toward(effect.color, view.theme.bg, ratio);
        let cell = &mut buf[(rx, ry)];
        cell.set_symbol(effect.kind.glyph(ratio)).set_fg(color);
        if effect.size >= BOLD_EFFECT_SIZE {
            cell.modifier.insert(Modifier::BOLD);
        }
    }
}

/// Create the flash on first use, then advance it by the time since the last frame.
fn apply_line_clear_flash(
    frame: &mut Frame,
    view: &View,
    area: Rect,
    flash: &mut LineClearFlash,
    now: Instant,
) {
    let rect = board_rect(area, view.state);
    let delta = flash
        .last_frame
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    flash.last_frame = Some(now);

    if flash.effect.is_none() {
        let rows: HashSet<u16> = flash
            .rows
            .iter()
            .map(|&y| rect.y + y as u16)
            .filter(|&y| y < rect.y + rect.height)
            .collect();
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| rows.contains(&pos.y)));
        let accent = view.theme.accent;
        let effect = fx::fade_from(accent, accent, (LINE_CLEAR_FADE_MS, Interpolation::QuadOut))
            .with_filter(filter)
            .with_area(rect);
        flash.effect = Some(effect);
    }

    if let Some(effect) = flash.effect.as_mut() {
        frame.render_effect(effect, rect, TfxDuration::from_millis(delta_ms));
    }
}

fn section(frame: &mut Frame, theme: &Theme, area: Rect, title: &str) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border).bg(theme.bg))
        .title(Span::styled(format!(" {title} "), Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());
    inner
}

fn draw_sidebar(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let label = Style::default().fg(theme.title);
    let text = Style::default().fg(theme.text);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Stats
            Constraint::Length(9), // Controls
            Constraint::Min(4),    // Top scores
        ])
        .split(area);

    let status = match view.state.status {
        Status::Running => Span::styled("Playing", text),
        Status::Paused => Span::styled("Paused", Style::default().fg(theme.accent)),
        Status::GameOver => Span::styled("Game over", Style::default().fg(Color::Red)),
    };
    let sound = if view.muted {
        "muted".to_string()
    } else {
        format!("{:.0}%", view.volume * 100.0)
    };
    let stats = vec![
        Line::from(vec![
            Span::styled("Score: ", label),
            Span::styled(view.state.score.to_string(), text.bold()),
        ]),
        Line::from(vec![Span::styled("State: ", label), status]),
        Line::from(vec![
            Span::styled("Drop: ", label),
            Span::styled(format!("{} ms", view.state.drop_interval().as_millis()), text),
        ]),
        Line::from(vec![Span::styled("Sound: ", label), Span::styled(sound, text)]),
    ];
    let inner = section(frame, theme, chunks[0], "Stats");
    Paragraph::new(stats).render(inner, frame.buffer_mut());

    let controls = [
        ("← →", "Move"),
        ("↓", "Move down"),
        ("↑", "Rotate"),
        ("P", "Pause"),
        ("M", "Mute"),
        ("+ -", "Volume"),
        ("Q", "Quit"),
    ];
    let lines: Vec<Line> = controls
        .iter()
        .map(|(key, what)| {
            Line::from(vec![
                Span::styled(format!("{key:<5}"), label),
                Span::styled(*what, text),
            ])
        })
        .collect();
    let inner = section(frame, theme, chunks[1], "Controls");
    Paragraph::new(lines).render(inner, frame.buffer_mut());

    let inner = section(frame, theme, chunks[2], "Top");
    let lines = if view.scores.enabled {
        let mut lines = entry_lines(view.scores, SIDEBAR_TOP_ROWS, inner.width, theme);
        if let Some(msg) = &view.scores.status {
            lines.push(Line::from(Span::styled(msg.clone(), Style::default().fg(theme.grid))));
        }
        lines
    } else {
        vec![Line::from(Span::styled(
            "Offline. Pass --leaderboard URL to compete.",
            Style::default().fg(theme.grid),
        ))]
    };
    Paragraph::new(lines)
        .wrap(ratatui::widgets::Wrap { trim: true })
        .render(inner, frame.buffer_mut());
}

/// "1. name ... score" lines, at most `limit`.
fn entry_lines(scores: &ScorePanel, limit: usize, width: u16, theme: &Theme) -> Vec<Line<'static>> {
    if scores.entries.is_empty() {
        return vec![Line::from(Span::styled("No scores yet", Style::default().fg(theme.grid)))];
    }
    let name_w = (width as usize).saturating_sub(10).max(4);
    scores
        .entries
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, entry)| {
            let name: String = entry.name.chars().take(name_w).collect();
            Line::from(vec![
                Span::styled(format!("{:>2}. ", i + 1), Style::default().fg(theme.title)),
                Span::styled(format!("{name:<name_w$}"), Style::default().fg(theme.text)),
                Span::styled(format!("{:>4}", entry.score), Style::default().fg(theme.accent)),
            ])
        })
        .collect()
}

fn popup_rect(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

/// Paint the popup background so the board does not show through.
fn clear_rect(frame: &mut Frame, rect: Rect, bg: Color) {
    let buf = frame.buffer_mut();
    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            buf[(x, y)].set_symbol(" ").set_style(Style::default().bg(bg));
        }
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = popup_rect(area, 20, 5);
    clear_rect(frame, popup, theme.bg);
    let lines = vec![
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(theme.accent),
        )),
        Line::from(""),
        Line::from(Span::styled("P Resume  Q Quit", Style::default().fg(theme.text))),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let scores = view.scores;
    let text = Style::default().fg(theme.text);
    let dim = Style::default().fg(theme.grid);

    let mut lines: Vec<Line> = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(format!(" Score: {} ", view.state.score), text.bold())),
        Line::from(""),
    ];

    if scores.enabled {
        match scores.phase {
            SubmitPhase::Typing => lines.push(Line::from(vec![
                Span::styled("Name: ", Style::default().fg(theme.title)),
                Span::styled(scores.name.clone(), Style::default().fg(theme.accent)),
                Span::styled("_", Style::default().fg(theme.accent).slow_blink()),
            ])),
            SubmitPhase::Sending => lines.push(Line::from(Span::styled("Submitting…", dim))),
            SubmitPhase::Done => {}
        }
        if let Some(msg) = &scores.status {
            lines.push(Line::from(Span::styled(msg.clone(), dim)));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Top 10", Style::default().fg(theme.title))));
        let width = GAME_OVER_WIDTH.saturating_sub(8);
        lines.extend(entry_lines(scores, crate::leaderboard::TOP_LIMIT, width, theme));
        lines.push(Line::from(""));
    }

    let hint = if scores.enabled && scores.phase == SubmitPhase::Typing {
        "Enter Submit    Esc Skip"
    } else {
        "R Restart    Q Quit"
    };
    lines.push(Line::from(Span::styled(hint, text)));
    lines.push(Line::from(""));

    let popup = popup_rect(area, GAME_OVER_WIDTH, lines.len() as u16 + 2);
    clear_rect(frame, popup, theme.bg);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border).bg(theme.bg))
                .title(Span::styled(" Stackfall ", Style::default().fg(theme.title))),
        )
        .render(popup, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::leaderboard::Entry;
    use crate::spawn::Spawner;
    use crate::tetromino::TetrominoKind;
    use chrono::Utc;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::time::Duration;

    fn state() -> GameState {
        GameState::with_spawner(
            Board::new(10, 20),
            Spawner::seeded(10, 3),
            Duration::from_millis(500),
        )
    }

    fn render(view: &View) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        let mut flash = None;
        terminal
            .draw(|f| draw(f, view, &mut flash, Instant::now()))
            .unwrap();
        let buf = terminal.backend().buffer().clone();
        (0..buf.area.height)
            .map(|y| {
                (0..buf.area.width)
                    .map(|x| buf[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect()
    }

    fn view<'a>(
        screen: Screen,
        state: &'a GameState,
        theme: &'a Theme,
        effects: &'a EffectManager,
        scores: &'a ScorePanel,
    ) -> View<'a> {
        View {
            screen,
            state,
            theme,
            effects,
            scores,
            muted: false,
            volume: 0.6,
        }
    }

    #[test]
    fn test_board_fits_and_centers() {
        let (board, sidebar) = layout(Rect::new(0, 0, 80, 30), 10, 20);
        assert_eq!((board.width, board.height), (22, 22));
        assert_eq!(sidebar.x, board.x + board.width);
        assert_eq!(board.x, (80 - 22 - SIDEBAR_WIDTH) / 2);
    }

    #[test]
    fn test_locked_cells_are_drawn() {
        let mut state = state();
        state.board.set(0, 19, Cell::Filled(TetrominoKind::T));
        let (theme, effects, scores) = (Theme::default(), EffectManager::new(Some(1)), ScorePanel::default());
        let rows = render(&view(Screen::Playing, &state, &theme, &effects, &scores));

        let rect = board_rect(Rect::new(0, 0, 80, 30), &state);
        let bottom = &rows[(rect.y + 19) as usize];
        let col = bottom.chars().nth(rect.x as usize).unwrap();
        assert_eq!(col, '█');
    }

    #[test]
    fn test_pause_overlay_shows() {
        let mut state = state();
        state.toggle_pause();
        let (theme, effects, scores) = (Theme::default(), EffectManager::new(Some(1)), ScorePanel::default());
        let rows = render(&view(Screen::Playing, &state, &theme, &effects, &scores));
        assert!(rows.iter().any(|r| r.contains("Paused")));
    }

    #[test]
    fn test_game_over_lists_entries_and_name() {
        let state = state();
        let (theme, effects) = (Theme::default(), EffectManager::new(Some(1)));
        let scores = ScorePanel {
            enabled: true,
            entries: vec![Entry {
                name: "Ada".into(),
                score: 42,
                created_at: Utc::now(),
            }],
            name: "Bob".into(),
            phase: SubmitPhase::Typing,
            ..ScorePanel::default()
        };
        let rows = render(&view(Screen::GameOver, &state, &theme, &effects, &scores));
        assert!(rows.iter().any(|r| r.contains("Game Over")));
        assert!(rows.iter().any(|r| r.contains("Name: Bob")));
        assert!(rows.iter().any(|r| r.contains("Ada") && r.contains("42")));
        assert!(rows.iter().any(|r| r.contains("Enter Submit")));
    }

    #[test]
    fn test_game_over_offline_offers_restart() {
        let state = state();
        let (theme, effects, scores) = (Theme::default(), EffectManager::new(Some(1)), ScorePanel::default());
        let rows = render(&view(Screen::GameOver, &state, &theme, &effects, &scores));
        assert!(rows.iter().any(|r| r.contains("R Restart")));
        assert!(!rows.iter().any(|r| r.contains("Top 10")));
    }

    #[test]
    fn test_fade_toward() {
        let bg = Color::Rgb(0, 0, 0);
        assert_eq!(fade_toward(Color::Rgb(200, 100, 50), bg, 1.0), Color::Rgb(200, 100, 50));
        assert_eq!(fade_toward(Color::Rgb(200, 100, 50), bg, 0.5), Color::Rgb(100, 50, 25));
        assert_eq!(fade_toward(Color::Rgb(200, 100, 50), bg, 0.0), bg);
        assert_eq!(fade_toward(Color::Red, bg, 0.5), Color::Red);
    }

    #[test]
    fn test_flash_runs_to_completion() {
        let state = state();
        let (theme, effects, scores) = (Theme::default(), EffectManager::new(Some(1)), ScorePanel::default());
        let v = view(Screen::Playing, &state, &theme, &effects, &scores);
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        let mut flash = Some(LineClearFlash::new(vec![19]));
        let start = Instant::now();
        terminal.draw(|f| draw(f, &v, &mut flash, start)).unwrap();
        assert!(!flash.as_ref().unwrap().done());
        let later = start + Duration::from_millis(LINE_CLEAR_FADE_MS as u64 + 50);
        terminal.draw(|f| draw(f, &v, &mut flash, later)).unwrap();
        assert!(flash.as_ref().unwrap().done());
    }
}
