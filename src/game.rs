//! Game state: board, falling piece, score, gravity timer and the Running/Paused/GameOver machine.

use crate::board::{Board, ClearedLines, has_collision};
use crate::piece::Piece;
use crate::sound::SoundName;
use crate::spawn::Spawner;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_DROP_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Paused,
    GameOver,
}

/// Something the host should fan out to sound / effects. The core never looks at the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    Move,
    Rotate,
    /// Piece locked into the board.
    Drop,
    LinesCleared(ClearedLines),
    GameOver,
}

impl GameEvent {
    pub fn sound(&self) -> SoundName {
        match self {
            Self::Move => SoundName::Move,
            Self::Rotate => SoundName::Rotate,
            Self::Drop => SoundName::Drop,
            Self::LinesCleared(_) => SoundName::Clear,
            Self::GameOver => SoundName::GameOver,
        }
    }
}

/// One play session. Mutated only from the frame loop.
#[derive(Debug)]
pub struct GameState {
    pub board: Board,
    pub piece: Piece,
    /// Number of cleared lines.
    pub score: u32,
    pub status: Status,
    drop_timer: Duration,
    drop_interval: Duration,
    spawner: Spawner,
    events: Vec<GameEvent>,
}

impl GameState {
    pub fn new(config: &crate::GameConfig) -> Self {
        let board = Board::new(config.width, config.height);
        let spawner = match config.seed {
            Some(seed) => Spawner::seeded(board.cols(), seed),
            None => Spawner::new(board.cols()),
        };
        Self::with_spawner(board, spawner, Duration::from_millis(config.drop_interval_ms))
    }

    pub fn with_spawner(board: Board, mut spawner: Spawner, drop_interval: Duration) -> Self {
        let piece = spawner.spawn();
        Self {
            board,
            piece,
            score: 0,
            status: Status::Running,
            drop_timer: Duration::ZERO,
            drop_interval,
            spawner,
            events: Vec::new(),
        }
    }

    /// Fresh board, piece, score and timer. The spawner keeps its sequence.
    pub fn restart(&mut self) {
        self.board = Board::new(self.board.cols() as u16, self.board.rows() as u16);
        self.piece = self.spawner.spawn();
        self.score = 0;
        self.status = Status::Running;
        self.drop_timer = Duration::ZERO;
        self.events.clear();
        info!("session restarted");
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    pub fn drop_interval(&self) -> Duration {
        self.drop_interval
    }

    /// Advance the simulation by one frame's elapsed time.
    pub fn update(&mut self, elapsed: Duration) {
        if !self.is_running() {
            return;
        }
        self.drop_timer += elapsed;
        if self.drop_timer >= self.drop_interval {
            self.gravity_step();
            // Full reset; leftover time is dropped.
            self.drop_timer = Duration::ZERO;
        }
    }

    /// Forced one-row descent; locks the piece when it is resting.
    fn gravity_step(&mut self) {
        let mut candidate = self.piece.clone();
        candidate.y += 1;
        if !has_collision(&self.board, &candidate) {
            self.piece = candidate;
            return;
        }
        self.lock_and_spawn();
    }

    fn lock_and_spawn(&mut self) {
        self.board.lock_piece(&self.piece);
        self.events.push(GameEvent::Drop);
        debug!(kind = %self.piece.kind.name(), x = self.piece.x, y = self.piece.y, "piece locked");

        let cleared = self.board.clear_lines();
        if cleared.count > 0 {
            self.score += cleared.count;
            debug!(lines = cleared.count, score = self.score, "lines cleared");
            self.events.push(GameEvent::LinesCleared(cleared));
        }

        self.piece = self.spawner.spawn();
        if self.board.game_over() {
            self.status = Status::GameOver;
            self.events.push(GameEvent::GameOver);
            info!(score = self.score, "game over");
        }
    }

    /// Commit `candidate` unless it collides or the game is not running.
    fn try_commit(&mut self, candidate: Piece) -> bool {
        if !self.is_running() || has_collision(&self.board, &candidate) {
            return false;
        }
        self.piece = candidate;
        true
    }

    /// Translate the piece by (dx, dy). Rejected moves leave everything untouched.
    pub fn try_shift(&mut self, dx: i32, dy: i32) -> bool {
        let mut candidate = self.piece.clone();
        candidate.x += dx;
        candidate.y += dy;
        let moved = self.try_commit(candidate);
        if moved {
            self.events.push(GameEvent::Move);
        }
        moved
    }

    pub fn try_rotate(&mut self) -> bool {
        let rotated = self.try_commit(self.piece.rotate_clockwise());
        if rotated {
            self.events.push(GameEvent::Rotate);
        }
        rotated
    }

    /// Running <-> Paused. No effect once the game is over.
    pub fn toggle_pause(&mut self) {
        self.status = match self.status {
            Status::Running => Status::Paused,
            Status::Paused => Status::Running,
            Status::GameOver => Status::GameOver,
        };
    }

    /// Events since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Cell;
    use crate::tetromino::TetrominoKind;

    const INTERVAL: Duration = Duration::from_millis(500);

    fn state_with(kind: TetrominoKind, x: i32, y: i32) -> GameState {
        let mut state = GameState::with_spawner(Board::default(), Spawner::seeded(10, 9), INTERVAL);
        state.piece = Piece::new(kind, x, y);
        state
    }

    fn fill_row_except(board: &mut Board, y: usize, gap: &[usize]) {
        for x in 0..board.cols() {
            if !gap.contains(&x) {
                board.set(x, y, Cell::Filled(TetrominoKind::Z));
            }
        }
    }

    #[test]
    fn test_gravity_waits_for_interval() {
        let mut state = state_with(TetrominoKind::O, 4, 0);
        state.update(Duration::from_millis(200));
        state.update(Duration::from_millis(200));
        assert_eq!(state.piece.y, 0);
        state.update(Duration::from_millis(100));
        assert_eq!(state.piece.y, 1);
    }

    #[test]
    fn test_drop_timer_fully_resets() {
        let mut state = state_with(TetrominoKind::O, 4, 0);
        state.update(Duration::from_millis(900));
        assert_eq!(state.piece.y, 1);
        assert_eq!(state.drop_timer, Duration::ZERO);
        // 400 ms of leftover time was discarded, so one more short frame does nothing.
        state.update(Duration::from_millis(100));
        assert_eq!(state.piece.y, 1);
    }

    #[test]
    fn test_lock_on_floor_spawns_next() {
        let mut state = state_with(TetrominoKind::O, 4, 18);
        state.update(INTERVAL);
        assert_eq!(state.board.get(4, 18), Some(Cell::Filled(TetrominoKind::O)));
        assert_eq!(state.board.get(5, 19), Some(Cell::Filled(TetrominoKind::O)));
        assert_eq!((state.piece.x, state.piece.y), (3, 0));
        assert_eq!(state.drain_events(), vec![GameEvent::Drop]);
        assert_eq!(state.status, Status::Running);
    }

    #[test]
    fn test_line_clear_scores_count() {
        let mut state = state_with(TetrominoKind::O, 4, 18);
        fill_row_except(&mut state.board, 18, &[4, 5]);
        fill_row_except(&mut state.board, 19, &[4, 5]);
        state.update(INTERVAL);
        assert_eq!(state.score, 2);
        let events = state.drain_events();
        assert_eq!(events[0], GameEvent::Drop);
        match &events[1] {
            GameEvent::LinesCleared(cleared) => {
                assert_eq!(cleared.count, 2);
                assert_eq!(cleared.cells.len(), 20);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(state.board.iter_rows().all(|r| r.iter().all(|c| !c.is_filled())));
    }

    #[test]
    fn test_lock_into_top_row_ends_game() {
        let mut state = state_with(TetrominoKind::I, 3, 0);
        state.board.set(4, 1, Cell::Filled(TetrominoKind::S));
        state.update(INTERVAL);
        assert_eq!(state.status, Status::GameOver);
        assert_eq!(state.drain_events(), vec![GameEvent::Drop, GameEvent::GameOver]);

        // Simulation is halted.
        let piece = state.piece.clone();
        state.update(INTERVAL * 4);
        assert!(!state.try_shift(1, 0));
        assert!(!state.try_rotate());
        assert_eq!(state.piece, piece);
        state.toggle_pause();
        assert_eq!(state.status, Status::GameOver);
    }

    #[test]
    fn test_shift_rejected_at_wall() {
        let mut state = state_with(TetrominoKind::I, 0, 5);
        assert!(!state.try_shift(-1, 0));
        assert_eq!(state.piece.x, 0);
        assert!(state.try_shift(1, 0));
        assert_eq!(state.piece.x, 1);
        assert_eq!(state.drain_events(), vec![GameEvent::Move]);
    }

    #[test]
    fn test_soft_move_down_does_not_lock() {
        let mut state = state_with(TetrominoKind::O, 4, 18);
        assert!(!state.try_shift(0, 1));
        assert_eq!(state.piece.y, 18);
        assert!(state.board.iter_rows().all(|r| r.iter().all(|c| !c.is_filled())));
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_rotate_rejected_when_blocked() {
        // Horizontal I at the floor cannot stand up.
        let mut state = state_with(TetrominoKind::I, 3, 19);
        assert!(!state.try_rotate());
        assert_eq!(state.piece.shape.width(), 4);
        state.piece.y = 10;
        assert!(state.try_rotate());
        assert_eq!(state.piece.height(), 4);
        assert_eq!(state.drain_events(), vec![GameEvent::Rotate]);
    }

    #[test]
    fn test_pause_suspends_gravity_and_input() {
        let mut state = state_with(TetrominoKind::T, 3, 0);
        state.toggle_pause();
        assert_eq!(state.status, Status::Paused);
        state.update(INTERVAL * 3);
        assert_eq!(state.piece.y, 0);
        assert!(!state.try_shift(1, 0));
        assert!(!state.try_rotate());
        state.toggle_pause();
        assert_eq!(state.status, Status::Running);
        state.update(INTERVAL);
        assert_eq!(state.piece.y, 1);
    }

    #[test]
    fn test_restart_resets_session() {
        let mut state = state_with(TetrominoKind::I, 3, 0);
        state.board.set(4, 1, Cell::Filled(TetrominoKind::S));
        state.update(INTERVAL);
        assert_eq!(state.status, Status::GameOver);
        state.score = 7;
        state.restart();
        assert_eq!(state.status, Status::Running);
        assert_eq!(state.score, 0);
        assert_eq!(state.drop_timer, Duration::ZERO);
        assert!(!state.board.game_over());
        assert!(state.drain_events().is_empty());
        assert_eq!((state.board.cols(), state.board.rows()), (10, 20));
    }

    #[test]
    fn test_new_from_config_is_deterministic_with_seed() {
        let config = crate::GameConfig {
            seed: Some(11),
            ..crate::GameConfig::default()
        };
        let a = GameState::new(&config);
        let b = GameState::new(&config);
        assert_eq!(a.piece, b.piece);
        assert_eq!(a.drop_interval(), Duration::from_millis(DEFAULT_DROP_INTERVAL_MS));
    }

    #[test]
    fn test_event_sounds() {
        assert_eq!(GameEvent::Move.sound(), SoundName::Move);
        assert_eq!(GameEvent::Drop.sound(), SoundName::Drop);
        assert_eq!(
            GameEvent::LinesCleared(ClearedLines::default()).sound(),
            SoundName::Clear
        );
        assert_eq!(GameEvent::GameOver.sound(), SoundName::GameOver);
    }
}
