//! Stackfall: falling-block puzzle game in the terminal, with a small HTTP leaderboard.

mod app;
mod board;
mod effects;
mod game;
mod input;
mod leaderboard;
mod logging;
mod piece;
mod sound;
mod spawn;
mod tetromino;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, Subcommand};
use leaderboard::{JsonFileStore, LeaderboardStore, MemoryStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Options derived from CLI that affect the simulation and its collaborators.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub width: u16,
    pub height: u16,
    pub drop_interval_ms: u64,
    pub seed: Option<u64>,
    pub no_animation: bool,
    pub muted: bool,
    pub volume: f32,
    pub sounds_dir: Option<PathBuf>,
    pub leaderboard_url: Option<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: board::DEFAULT_COLS,
            height: board::DEFAULT_ROWS,
            drop_interval_ms: game::DEFAULT_DROP_INTERVAL_MS,
            seed: None,
            no_animation: false,
            muted: false,
            volume: sound::DEFAULT_VOLUME,
            sounds_dir: None,
            leaderboard_url: None,
        }
    }
}

impl GameConfig {
    fn from_args(args: &Args) -> Self {
        Self {
            width: args.width,
            height: args.height,
            drop_interval_ms: args.drop_interval_ms,
            seed: args.seed,
            no_animation: args.no_animation,
            muted: args.mute,
            volume: args.volume,
            sounds_dir: args.sounds.clone(),
            leaderboard_url: args.leaderboard.clone(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    match &args.command {
        Some(Command::Serve { addr, store, memory }) => {
            logging::init_server()?;
            let store: Arc<dyn LeaderboardStore> = if *memory {
                Arc::new(MemoryStore::new())
            } else {
                let file = JsonFileStore::new(store.clone().unwrap_or_else(JsonFileStore::default_path));
                tracing::info!("leaderboard store: {}", file.path().display());
                Arc::new(file)
            };
            let addr = leaderboard::server::resolve_addr(*addr, |k| std::env::var(k).ok());
            let runtime = tokio::runtime::Runtime::new().context("start tokio runtime")?;
            runtime.block_on(leaderboard::server::serve(addr, store))
        }
        None => {
            logging::init_game(args.log_file.as_deref())?;
            let theme = theme::Theme::load(args.theme.as_deref())
                .with_context(|| format!("load theme {:?}", args.theme))?;
            let config = GameConfig::from_args(&args);
            let mut app = App::new(config, theme)?;
            app.run()
        }
    }
}

/// Falling-block puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "stackfall",
    version,
    about = "Falling-block puzzle in the terminal. Clear full rows to score; submit your score to a leaderboard.",
    long_about = "Stackfall is a classic falling-block puzzle for the terminal.\n\n\
        Pieces fall one row every drop interval. Complete a horizontal row to clear it; \
        each cleared row is one point. The game ends when a block locks into the top row.\n\n\
        CONTROLS:\n  Left/Right  Move    Up   Rotate    Down   Move down\n  P           Pause   M   Mute      + / -  Volume\n  Q / Esc     Quit    R   Restart (after game over)\n\n\
        Run `stackfall serve` to host the leaderboard and pass --leaderboard http://HOST:PORT to submit scores."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Board width in columns.
    #[arg(long, default_value = "10", value_name = "COLS", value_parser = clap::value_parser!(u16).range(4..=40))]
    pub width: u16,

    /// Board height in rows.
    #[arg(long, default_value = "20", value_name = "ROWS", value_parser = clap::value_parser!(u16).range(4..=60))]
    pub height: u16,

    /// Milliseconds between forced one-row drops.
    #[arg(long, default_value = "500", value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub drop_interval_ms: u64,

    /// Seed for piece selection and effects (same seed, same piece sequence).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]="#hex"). Built-in dark theme if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Disable particles and the line-clear flash.
    #[arg(long)]
    pub no_animation: bool,

    /// Start with sound muted (M toggles in game).
    #[arg(long)]
    pub mute: bool,

    /// Sound volume 0.0..=1.0.
    #[arg(long, default_value = "0.6", value_name = "VOL")]
    pub volume: f32,

    /// Directory with move.ogg, rotate.ogg, drop.ogg, clear.ogg, gameover.ogg (needs the `audio` feature).
    #[arg(long, value_name = "DIR")]
    pub sounds: Option<PathBuf>,

    /// Leaderboard server root, e.g. http://127.0.0.1:4000. Enables score submission.
    #[arg(long, value_name = "URL")]
    pub leaderboard: Option<String>,

    /// Write logs here (RUST_LOG filters, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the leaderboard HTTP server.
    Serve {
        /// Listen address. Falls back to STACKFALL_LEADERBOARD_ADDR, STACKFALL_LEADERBOARD_PORT, then 127.0.0.1:4000.
        #[arg(long, value_name = "ADDR")]
        addr: Option<SocketAddr>,

        /// JSON file holding the table. Defaults to the config dir.
        #[arg(long, value_name = "FILE", conflicts_with = "memory")]
        store: Option<PathBuf>,

        /// Keep entries in memory only.
        #[arg(long)]
        memory: bool,
    },
}
