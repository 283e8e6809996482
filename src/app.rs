//! App: terminal init, frame loop, event fan-out and key handling.

use crate::GameConfig;
use crate::effects::EffectManager;
use crate::game::{GameEvent, GameState};
use crate::input::{Action, key_to_action};
use crate::leaderboard::Entry;
use crate::leaderboard::client::{ClientEvent, LeaderboardClient};
use crate::sound::SoundManager;
use crate::theme::Theme;
use crate::ui::{self, LineClearFlash, View};
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::info;

/// ~60 FPS.
const FRAME: Duration = Duration::from_millis(16);
const NAME_MAX_LEN: usize = 16;
const VOLUME_STEP: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
}

/// Where the game-over name prompt is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmitPhase {
    Typing,
    Sending,
    #[default]
    Done,
}

/// Leaderboard data shown in the sidebar and on the game-over panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScorePanel {
    /// A leaderboard URL was configured.
    pub enabled: bool,
    pub entries: Vec<Entry>,
    /// One-line result of the last request.
    pub status: Option<String>,
    pub name: String,
    pub phase: SubmitPhase,
}

impl ScorePanel {
    fn push_char(&mut self, c: char) {
        if !c.is_control() && self.name.chars().count() < NAME_MAX_LEN {
            self.name.push(c);
        }
    }

    /// Fold a finished request into the panel. True when the top list should be refetched.
    fn apply(&mut self, event: ClientEvent) -> bool {
        match event {
            ClientEvent::Loaded(entries) => {
                self.entries = entries;
                false
            }
            ClientEvent::LoadFailed(msg) => {
                self.status = Some(format!("Leaderboard unavailable: {msg}"));
                false
            }
            ClientEvent::Submitted => {
                self.phase = SubmitPhase::Done;
                self.status = Some("Score submitted".into());
                true
            }
            ClientEvent::SubmitFailed(msg) => {
                // Back to the prompt so the player can try again.
                self.phase = SubmitPhase::Typing;
                self.status = Some(format!("Submit failed: {msg}"));
                false
            }
        }
    }
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    state: GameState,
    screen: Screen,
    sound: SoundManager,
    effects: EffectManager,
    client: Option<LeaderboardClient>,
    scores: ScorePanel,
    flash: Option<LineClearFlash>,
    last_frame: Instant,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Result<Self> {
        let client = config
            .leaderboard_url
            .as_deref()
            .map(LeaderboardClient::spawn)
            .transpose()
            .context("start leaderboard client")?;
        let sound = SoundManager::init(config.sounds_dir.clone(), config.muted, config.volume);
        Ok(Self::with_parts(config, theme, sound, client))
    }

    fn with_parts(
        config: GameConfig,
        theme: Theme,
        sound: SoundManager,
        client: Option<LeaderboardClient>,
    ) -> Self {
        if let Some(client) = &client {
            client.fetch_top();
        }
        Self {
            state: GameState::new(&config),
            effects: EffectManager::new(config.seed),
            scores: ScorePanel {
                enabled: client.is_some(),
                ..ScorePanel::default()
            },
            config,
            theme,
            screen: Screen::Playing,
            sound,
            client,
            flash: None,
            last_frame: Instant::now(),
        }
    }

    fn restart(&mut self) {
        self.state.restart();
        self.effects.clear();
        self.flash = None;
        self.screen = Screen::Playing;
        self.scores.phase = SubmitPhase::Done;
        self.scores.status = None;
        if let Some(client) = &self.client {
            client.fetch_top();
        }
    }

    /// Advance simulation and cosmetics by one frame.
    fn tick(&mut self, elapsed: Duration) {
        self.state.update(elapsed);
        self.effects.update(elapsed.as_secs_f32());
        self.dispatch_events();
        self.poll_leaderboard();
    }

    /// Fan game events out to sound, effects and the screen machine.
    fn dispatch_events(&mut self) {
        for event in self.state.drain_events() {
            self.sound.play(event.sound());
            match event {
                GameEvent::LinesCleared(cleared) => {
                    if self.config.no_animation {
                        continue;
                    }
                    self.effects.on_lines_cleared(cleared.count, &cleared.cells);
                    let rows: BTreeSet<usize> = cleared.cells.iter().map(|c| c.y).collect();
                    self.flash = Some(LineClearFlash::new(rows.into_iter().collect()));
                }
                GameEvent::GameOver => {
                    if !self.config.no_animation {
                        self.effects.on_game_over(self.state.board.cols());
                    }
                    self.screen = Screen::GameOver;
                    self.scores.status = None;
                    if let Some(client) = &self.client {
                        self.scores.phase = SubmitPhase::Typing;
                        client.fetch_top();
                    }
                }
                GameEvent::Move | GameEvent::Rotate | GameEvent::Drop => {}
            }
        }
    }

    fn poll_leaderboard(&mut self) {
        let Some(client) = &self.client else {
            return;
        };
        while let Some(event) = client.try_poll() {
            if self.scores.apply(event) {
                client.fetch_top();
            }
        }
    }

    fn submit_score(&mut self) {
        let name = self.scores.name.trim();
        if name.is_empty() {
            self.scores.status = Some("Enter a name first".into());
            return;
        }
        let Some(client) = &self.client else {
            return;
        };
        info!(name, score = self.state.score, "submitting score");
        client.submit(name.to_string(), i64::from(self.state.score));
        self.scores.phase = SubmitPhase::Sending;
        self.scores.status = None;
    }

    fn toggle_mute(&mut self) {
        let muted = !self.sound.is_muted();
        self.sound.set_muted(muted);
    }

    fn nudge_volume(&mut self, delta: f32) {
        let volume = self.sound.volume() + delta;
        self.sound.set_volume(volume);
    }

    /// Returns false when the player asked to quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.screen {
            Screen::Playing => self.handle_play_key(key),
            Screen::GameOver => self.handle_game_over_key(key),
        }
    }

    fn handle_play_key(&mut self, key: KeyEvent) -> bool {
        match key_to_action(key) {
            Action::Quit => return false,
            Action::MoveLeft => {
                self.state.try_shift(-1, 0);
            }
            Action::MoveRight => {
                self.state.try_shift(1, 0);
            }
            Action::MoveDown => {
                self.state.try_shift(0, 1);
            }
            Action::Rotate => {
                self.state.try_rotate();
            }
            Action::Pause => self.state.toggle_pause(),
            Action::ToggleMute => self.toggle_mute(),
            Action::VolumeUp => self.nudge_volume(VOLUME_STEP),
            Action::VolumeDown => self.nudge_volume(-VOLUME_STEP),
            Action::Restart | Action::None => {}
        }
        true
    }

    fn handle_game_over_key(&mut self, key: KeyEvent) -> bool {
        if self.scores.phase == SubmitPhase::Typing {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                return key.code != KeyCode::Char('c');
            }
            match key.code {
                KeyCode::Char(c) => self.scores.push_char(c),
                KeyCode::Backspace => {
                    self.scores.name.pop();
                }
                KeyCode::Enter => self.submit_score(),
                KeyCode::Esc => self.scores.phase = SubmitPhase::Done,
                _ => {}
            }
            return true;
        }
        match key_to_action(key) {
            Action::Quit => return false,
            Action::Restart => self.restart(),
            Action::ToggleMute => self.toggle_mute(),
            Action::VolumeUp => self.nudge_volume(VOLUME_STEP),
            Action::VolumeDown => self.nudge_volume(-VOLUME_STEP),
            _ => {}
        }
        true
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode().context("enable raw mode")?;
        let mut stdout = std::io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err).context("enter alternate screen");
        }

        info!(
            width = self.config.width,
            height = self.config.height,
            seed = ?self.config.seed,
            "session started"
        );
        let result = ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))
            .context("create terminal")
            .and_then(|mut terminal| {
                let result = self.run_loop(&mut terminal);
                let _ = terminal.show_cursor();
                result
            });

        // Restore
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;
        info!(score = self.state.score, "session ended");

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        self.last_frame = Instant::now();
        loop {
            let now = Instant::now();
            let elapsed = now.saturating_duration_since(self.last_frame);
            self.last_frame = now;
            self.tick(elapsed);

            let view = View {
                screen: self.screen,
                state: &self.state,
                theme: &self.theme,
                effects: &self.effects,
                scores: &self.scores,
                muted: self.sound.is_muted(),
                volume: self.sound.volume(),
            };
            terminal.draw(|f| ui::draw(f, &view, &mut self.flash, now))?;
            if self.flash.as_ref().is_some_and(LineClearFlash::done) {
                self.flash = None;
            }

            let timeout = FRAME.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        // Only presses; repeats and releases would double-move.
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if !self.handle_key(key) {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
